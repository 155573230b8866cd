//! CLI error types with exit code handling
//!
//! Library errors are folded into [`CliError`], which knows its exit code
//! and carries a hint for the operator where one helps.

use debintake_api::ErrorKind;
use debintake_core::PublishError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Settings, changes file or batch rejected
    #[error("Validation failed: {message}")]
    #[diagnostic(code(debintake::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// The service refused a request or was unreachable
    #[error("{message}")]
    #[diagnostic(code(debintake::cli::api))]
    Api {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("{message}")]
    #[diagnostic(code(debintake::cli::lock))]
    Lock {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(debintake::cli::io))]
    Io { message: String },

    #[error("{message}")]
    #[diagnostic(code(debintake::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Api { .. } => exit_codes::API_ERROR,
            CliError::Lock { .. } => exit_codes::LOCK_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: None,
        }
    }

    pub fn validation_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<PublishError> for CliError {
    fn from(err: PublishError) -> Self {
        let message = err.to_string();
        match &err {
            PublishError::DistributionNotAllowed { .. } => CliError::validation_with_help(
                message,
                "Allowed distributions are configured with allowed_distributions in settings.yaml",
            ),
            PublishError::InvalidChanges { .. }
            | PublishError::InvalidBatch { .. }
            | PublishError::Settings { .. }
            | PublishError::YamlParse(_) => CliError::validation(message),
            PublishError::LockTimeout { path, .. } => CliError::Lock {
                message,
                help: Some(format!(
                    "Another publish is running. If no debintake process is alive, remove {}",
                    path.display()
                )),
            },
            PublishError::Io(_) => CliError::Io { message },
            PublishError::CleanupCommand { .. } => CliError::Other { message },
            PublishError::Phase { source, .. } | PublishError::Api(source) => match source.kind() {
                ErrorKind::Io => CliError::Io { message },
                ErrorKind::Transport => CliError::Api {
                    message,
                    help: source
                        .status()
                        .is_none()
                        .then(|| "Check api_url and that the aptly API is running".to_string()),
                },
                ErrorKind::Descriptor | ErrorKind::Validation => CliError::Other { message },
            },
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use debintake_api::ApiError;
    use debintake_core::Phase;
    use std::path::PathBuf;

    #[test]
    fn test_exit_codes() {
        let err: CliError = PublishError::DistributionNotAllowed {
            distribution: "sid".to_string(),
            allowed: "bookworm".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_codes::VALIDATION_ERROR);

        let err: CliError = PublishError::LockTimeout {
            path: PathBuf::from("/run/debintake/publish.lock"),
            waited_secs: 600,
        }
        .into();
        assert_eq!(err.exit_code(), exit_codes::LOCK_ERROR);

        let err: CliError =
            PublishError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")).into();
        assert_eq!(err.exit_code(), exit_codes::IO_ERROR);
    }

    #[test]
    fn test_api_failure_keeps_phase() {
        let err: CliError = PublishError::Phase {
            phase: Phase::Publish,
            source: ApiError::Timeout {
                timeout: std::time::Duration::from_secs(30),
            },
        }
        .into();
        assert_eq!(err.exit_code(), exit_codes::API_ERROR);
        assert!(err.to_string().starts_with("publish failed"));
    }
}
