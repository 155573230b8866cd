//! Workflow error types

use debintake_api::{ApiError, ErrorReason};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Step of a workflow, reported with the failure that stopped it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Upload,
    EnsureRepository,
    Register,
    Snapshot,
    Publish,
    Inspect,
    Cleanup,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Upload => "upload",
            Phase::EnsureRepository => "repository setup",
            Phase::Register => "package registration",
            Phase::Snapshot => "snapshot",
            Phase::Publish => "publish",
            Phase::Inspect => "inspection",
            Phase::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("{phase} failed: {source}")]
    Phase {
        phase: Phase,
        #[source]
        source: ApiError,
    },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Could not acquire publish lock {path} within {waited_secs}s")]
    LockTimeout { path: PathBuf, waited_secs: u64 },

    #[error("Distribution '{distribution}' is not allowed (allowed: {allowed})")]
    DistributionNotAllowed {
        distribution: String,
        allowed: String,
    },

    #[error("Invalid changes file {path}: {message}")]
    InvalidChanges { path: PathBuf, message: String },

    #[error("Invalid intake batch: {message}")]
    InvalidBatch { message: String },

    #[error("Invalid settings: {message}")]
    Settings { message: String },

    #[error("Database cleanup command failed: {message}")]
    CleanupCommand { message: String },

    #[error("Failed to parse settings: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PublishError {
    /// The API error behind this failure, if any
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            PublishError::Phase { source, .. } => Some(source),
            PublishError::Api(e) => Some(e),
            _ => None,
        }
    }

    pub fn reason(&self) -> Option<&ErrorReason> {
        self.api_error().and_then(ApiError::reason)
    }
}

pub type Result<T> = std::result::Result<T, PublishError>;

/// Attach the workflow phase to an API failure
pub trait DuringPhase<T> {
    fn during(self, phase: Phase) -> Result<T>;
}

impl<T> DuringPhase<T> for std::result::Result<T, ApiError> {
    fn during(self, phase: Phase) -> Result<T> {
        self.map_err(|source| PublishError::Phase { phase, source })
    }
}
