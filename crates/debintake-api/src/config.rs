//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::{ApiError, Result};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP basic authentication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    pub password: Option<String>,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: Option<String>) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

/// Where and how to reach the aptly API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub url: String,
    pub timeout: Duration,
    pub credentials: Option<BasicAuth>,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_TIMEOUT,
            credentials: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_credentials(mut self, credentials: BasicAuth) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Parsed base URL, normalized to end with `/` so that relative routes
    /// extend any path prefix instead of replacing its last segment.
    pub fn base_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.url).map_err(|e| ApiError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ApiError::InvalidUrl {
                url: self.url.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let config = ClientConfig::new("http://aptly.local:8080/aptly");
        assert_eq!(config.base_url().unwrap().as_str(), "http://aptly.local:8080/aptly/");

        let config = ClientConfig::new("http://aptly.local:8080");
        assert_eq!(config.base_url().unwrap().as_str(), "http://aptly.local:8080/");
    }

    #[test]
    fn test_base_url_rejects_bad_input() {
        assert!(matches!(
            ClientConfig::new("not a url").base_url(),
            Err(ApiError::InvalidUrl { .. })
        ));
        assert!(matches!(
            ClientConfig::new("ftp://aptly.local/").base_url(),
            Err(ApiError::InvalidUrl { reason, .. }) if reason.contains("ftp")
        ));
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("http://localhost:8080/");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.credentials.is_none());

        let config = config
            .with_timeout(Duration::from_millis(500))
            .with_credentials(BasicAuth::new("ci", Some("secret".to_string())));
        assert_eq!(config.timeout, Duration::from_millis(500));
        assert_eq!(config.credentials.unwrap().username, "ci");
    }
}
