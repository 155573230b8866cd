//! Error types for API calls

use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use thiserror::Error;

/// API call errors
#[derive(Debug, Error)]
pub enum ApiError {
    // ============ Descriptor Errors ============
    #[error("Descriptor not found: {entity}.{method}")]
    DescriptorNotFound { entity: String, method: String },

    #[error("Operation requires a bound context: {entity}.{method}")]
    UnboundContext { entity: String, method: String },

    #[error("Collection operation {entity}.{method} cannot be called on a bound context")]
    AlreadyBound { entity: String, method: String },

    // ============ Validation Errors ============
    #[error("Validation failed: wrong number of arguments: expected {expected}, got {got}")]
    ArgumentCount { expected: usize, got: usize },

    #[error("Validation failed: parameter {param}: expected {expected}, got {actual}")]
    TypeMismatch {
        param: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Validation failed: unknown parameter {param} for {route}")]
    UnknownParameter { param: String, route: String },

    #[error("Validation failed: route {route} needs placeholder '{placeholder}'")]
    MissingPlaceholder { placeholder: String, route: String },

    #[error("Validation failed: '{value}' cannot be used as {placeholder} in a route")]
    InvalidPlaceholder { placeholder: String, value: String },

    #[error("Validation failed: malformed route template {route}")]
    InvalidRoute { route: String },

    #[error("Validation failed: signing option '{key}' is not allowed")]
    SigningKeyNotAllowed { key: String },

    #[error("Validation failed: signing option '{key}' expects {expected}, got {actual}")]
    SigningValueType {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },

    // ============ Transport Errors ============
    #[error("HTTP error: {status} - {message}")]
    Http {
        status: u16,
        message: String,
        reason: ErrorReason,
    },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Request timeout after {}ms", .timeout.as_millis())]
    Timeout { timeout: Duration },

    #[error("Invalid response body: {message}")]
    InvalidResponse { message: String },

    #[error("Invalid API URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    // ============ IO Errors ============
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Broad class of an [`ApiError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown entity/method or wrong invocation shape; a mapping defect
    Descriptor,
    /// Arguments do not fit the descriptor; nothing was sent
    Validation,
    /// The request was sent (or attempted) and failed
    Transport,
    /// Local file access
    Io,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::DescriptorNotFound { .. }
            | ApiError::UnboundContext { .. }
            | ApiError::AlreadyBound { .. } => ErrorKind::Descriptor,
            ApiError::ArgumentCount { .. }
            | ApiError::TypeMismatch { .. }
            | ApiError::UnknownParameter { .. }
            | ApiError::MissingPlaceholder { .. }
            | ApiError::InvalidPlaceholder { .. }
            | ApiError::InvalidRoute { .. }
            | ApiError::SigningKeyNotAllowed { .. }
            | ApiError::SigningValueType { .. } => ErrorKind::Validation,
            ApiError::Http { .. }
            | ApiError::Network { .. }
            | ApiError::Timeout { .. }
            | ApiError::InvalidResponse { .. }
            | ApiError::InvalidUrl { .. } => ErrorKind::Transport,
            ApiError::Io(_) => ErrorKind::Io,
        }
    }

    /// HTTP status of a failed call, if the service answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classified reason of a failed call, if the service answered
    pub fn reason(&self) -> Option<&ErrorReason> {
        match self {
            ApiError::Http { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// Result type for API calls
pub type Result<T> = std::result::Result<T, ApiError>;

impl From<url::ParseError> for ApiError {
    fn from(e: url::ParseError) -> Self {
        ApiError::InvalidUrl {
            url: String::new(),
            reason: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::InvalidResponse {
            message: e.to_string(),
        }
    }
}

/// Machine-checkable reason attached to an HTTP failure.
///
/// aptly reports failures as prose in the `error` field; the mapping from
/// that prose to a reason lives here and nowhere else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorReason {
    /// A switch named a component the published distribution does not have
    ComponentNotPublished { component: Option<String> },
    /// The object (usually a snapshot) is still referenced by a publish
    SnapshotPublished,
    Other,
}

static COMPONENT_NOT_PUBLISHED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:component\s+(\S+)\s+)?is\s+not\s+(?:in|part\s+of)\s+(?:the\s+)?published\s+repository")
        .expect("valid regex")
});

static SNAPSHOT_PUBLISHED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bis\s+published\b").expect("valid regex"));

impl ErrorReason {
    pub fn classify(message: &str) -> Self {
        if let Some(captures) = COMPONENT_NOT_PUBLISHED.captures(message) {
            return ErrorReason::ComponentNotPublished {
                component: captures.get(1).map(|m| m.as_str().to_string()),
            };
        }
        if SNAPSHOT_PUBLISHED.is_match(message) {
            return ErrorReason::SnapshotPublished;
        }
        ErrorReason::Other
    }
}
