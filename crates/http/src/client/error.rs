//! Client error types

use haven_core::CoreError;
use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server answered with a non-2xx status
    #[error("Server error {status}: {message}")]
    Http { status: u16, message: String },

    /// A refresh was attempted with no refresh token stored
    #[error("No refresh token available")]
    NoRefreshToken,

    /// The refresh endpoint rejected the refresh token
    #[error("Token refresh failed ({status}): {message}")]
    RefreshFailed { status: u16, message: String },

    /// A concurrent request already failed to refresh this token and ended the session
    #[error("Session expired, log in again")]
    SessionExpired,

    /// Input rejected before it reached the server
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Credential store failure
    #[error("Credential storage error: {0}")]
    Storage(#[from] CoreError),
}

impl ClientError {
    /// Create error from HTTP status code and response body
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        Self::Http {
            status: status.as_u16(),
            message: describe_error_body(status, body),
        }
    }

    /// HTTP status carried by this error, if any
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::RefreshFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server answered 401
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. })
    }

    /// Whether the server answered 404
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Http { status: 404, .. })
    }

    /// Whether the session is gone and the user has to log in again
    pub const fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            Self::Http { status: 401, .. }
                | Self::NoRefreshToken
                | Self::RefreshFailed { .. }
                | Self::SessionExpired
        )
    }
}

/// Turn an error body into one readable line
///
/// Field errors (`{"password": ["Too short."], "detail": "..."}`) are
/// flattened and joined with spaces. Non-JSON bodies are used as-is, and an
/// empty body falls back to the status reason.
pub fn describe_error_body(status: reqwest::StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return status.to_string();
    }

    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => {
            let mut messages = Vec::new();
            collect_messages(&value, &mut messages);
            if messages.is_empty() {
                status.to_string()
            } else {
                messages.join(" ")
            }
        }
        Err(_) => body.to_string(),
    }
}

fn collect_messages(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::String(message) => out.push(message.clone()),
        serde_json::Value::Array(items) => {
            for item in items {
                collect_messages(item, out);
            }
        }
        serde_json::Value::Object(fields) => {
            for field in fields.values() {
                collect_messages(field, out);
            }
        }
        serde_json::Value::Number(n) => out.push(n.to_string()),
        serde_json::Value::Bool(_) | serde_json::Value::Null => {}
    }
}
