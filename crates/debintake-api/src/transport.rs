//! HTTP transport and response classification

use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::config::{BasicAuth, ClientConfig};
use crate::error::{ApiError, ErrorReason, Result};
use crate::request::ApiRequest;

/// Message used when a failure body cannot be parsed as JSON
pub const NON_JSON_ERROR: &str = "non-JSON error body";

/// Message used when a JSON failure body has no `error` field
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Sends built requests to the service
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    base_url: Url,
    credentials: Option<BasicAuth>,
    timeout: Duration,
}

impl Transport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = config.base_url()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("debintake/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Network {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url,
            credentials: config.credentials.clone(),
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for a route relative to the API base
    pub fn resolve(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidUrl {
                url: format!("{}{}", self.base_url, path),
                reason: e.to_string(),
            })
    }

    /// Send a request and classify the response
    pub async fn execute(&self, request: ApiRequest) -> Result<Value> {
        let url = self.resolve(&request.path)?;
        tracing::debug!(verb = %request.verb, %url, "aptly request");

        let mut builder = self.client.request(request.verb.as_method(), url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(auth) = &self.credentials {
            builder = builder.basic_auth(&auth.username, auth.password.as_deref());
        }

        if let Some(file) = request.file {
            let part = Part::bytes(file.content).file_name(file.file_name);
            builder = builder.multipart(Form::new().part("file", part));
        } else if !request.body.is_empty() {
            builder = builder.json(&request.body);
        }

        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| self.map_send_error(e))?;

        tracing::debug!(status, bytes = body.len(), "aptly response");
        classify(status, &body)
    }

    fn map_send_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout {
                timeout: self.timeout,
            }
        } else {
            ApiError::Network {
                message: e.to_string(),
            }
        }
    }
}

/// Turn a status code and raw body into a result.
///
/// aptly reports failures either as `{"error": ".."}` or as a list of
/// `{"error": .., "meta": ..}` objects; the first message is used.
pub fn classify(status: u16, body: &[u8]) -> Result<Value> {
    if (200..300).contains(&status) {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        return Ok(serde_json::from_slice(body)?);
    }

    let message = match serde_json::from_slice::<Value>(body) {
        Ok(json) => error_message(&json).unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
        Err(_) => NON_JSON_ERROR.to_string(),
    };

    tracing::debug!(status, %message, "aptly request failed");
    Err(ApiError::Http {
        status,
        reason: ErrorReason::classify(&message),
        message,
    })
}

fn error_message(json: &Value) -> Option<String> {
    let error = match json {
        Value::Array(items) => items.first()?.get("error")?,
        other => other.get("error")?,
    };
    Some(match error {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}
