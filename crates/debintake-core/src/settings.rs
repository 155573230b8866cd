//! Intake settings
//!
//! Stored in `~/.config/debintake/settings.yaml`; a missing file means
//! defaults everywhere.

use debintake_api::{BasicAuth, ClientConfig, ParamValue, SigningOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PublishError, Result};
use crate::lock::LockWait;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeSettings {
    /// Base URL of the aptly API
    pub api_url: String,

    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    pub username: Option<String>,
    pub password: Option<String>,

    /// Origin of published repositories; also used in their label
    pub vendor: String,

    /// GPG key the service signs releases with
    pub signing_key: String,
    pub keyring: String,

    pub allowed_distributions: Vec<String>,
    pub architectures: Vec<String>,

    /// Marker file guarding the mutating phase of every workflow
    pub lock_path: PathBuf,
    #[serde(with = "humantime_serde")]
    pub lock_poll_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub lock_timeout: Duration,

    /// Truncate intake files once their import is published (the intake
    /// directory may not allow removal)
    pub truncate_uploaded: bool,

    pub include: IncludeOptions,

    /// Package versions kept per architecture by `clean`
    pub keep_versions: usize,

    /// Command run after cleanup, e.g. `["aptly", "db", "cleanup"]`
    pub db_cleanup_command: Option<Vec<String>>,
}

impl Default for IntakeSettings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080/".to_string(),
            request_timeout: Duration::from_secs(30),
            username: None,
            password: None,
            vendor: "Droidian".to_string(),
            signing_key: "3027CDD5DF3C0181264550A062F62D66F658C408".to_string(),
            keyring: "/var/lib/aptly-api/.gnupg/pubring.kbx".to_string(),
            allowed_distributions: ["bullseye", "bookworm", "trixie"]
                .map(String::from)
                .to_vec(),
            architectures: ["source", "amd64", "i386", "arm64", "armhf"]
                .map(String::from)
                .to_vec(),
            lock_path: PathBuf::from("/run/debintake/publish.lock"),
            lock_poll_interval: Duration::from_secs(5),
            lock_timeout: Duration::from_secs(600),
            truncate_uploaded: true,
            include: IncludeOptions::default(),
            keep_versions: 3,
            db_cleanup_command: None,
        }
    }
}

/// Flags passed through to `RepositoryDirectory.include`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncludeOptions {
    pub no_remove_files: bool,
    pub force_replace: bool,
    pub ignore_signature: bool,
    pub accept_unsigned: bool,
}

impl IntakeSettings {
    /// Load settings from default location
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load settings from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Self = serde_yaml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Get default settings path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| PublishError::Settings {
            message: "Could not determine config directory".to_string(),
        })?;
        Ok(config_dir.join("debintake").join("settings.yaml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.allowed_distributions.is_empty() {
            return Err(PublishError::Settings {
                message: "allowed_distributions must not be empty".to_string(),
            });
        }
        if self.request_timeout.is_zero() {
            return Err(PublishError::Settings {
                message: "request_timeout must be greater than zero".to_string(),
            });
        }
        if self.lock_poll_interval.is_zero() {
            return Err(PublishError::Settings {
                message: "lock_poll_interval must be greater than zero".to_string(),
            });
        }
        if self.keep_versions == 0 {
            return Err(PublishError::Settings {
                message: "keep_versions must be at least 1".to_string(),
            });
        }
        if let Some(command) = &self.db_cleanup_command {
            if command.is_empty() {
                return Err(PublishError::Settings {
                    message: "db_cleanup_command must name a program".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn is_allowed(&self, distribution: &str) -> bool {
        self.allowed_distributions.iter().any(|d| d == distribution)
    }

    /// Label of the published repository for `channel`
    pub fn label(&self, channel: &str) -> String {
        format!("{} ({} channel)", self.vendor, channel)
    }

    pub fn signing_options(&self) -> debintake_api::Result<SigningOptions> {
        SigningOptions::new([
            ("Skip", ParamValue::Bool(false)),
            ("GpgKey", ParamValue::from(&self.signing_key)),
            ("Keyring", ParamValue::from(&self.keyring)),
        ])
    }

    pub fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::new(&self.api_url).with_timeout(self.request_timeout);
        match &self.username {
            Some(username) => {
                config.with_credentials(BasicAuth::new(username, self.password.clone()))
            }
            None => config,
        }
    }

    pub fn lock_wait(&self) -> LockWait {
        LockWait {
            poll_interval: self.lock_poll_interval,
            timeout: self.lock_timeout,
        }
    }
}
