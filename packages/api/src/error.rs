//! # Failure classification
//!
//! Every API call resolves to a decoded payload or an [`ApiError`]. The
//! classification rules, applied by [`classify`] to each response:
//!
//! 1. A body carrying an `err` (or `error`) field is a failure even when the
//!    transport status is 2xx. Some endpoints report rejections with 200.
//! 2. Otherwise a non-2xx status is a failure classified by status code.
//! 3. Otherwise the body must decode into the expected type; a body that does
//!    not parse is a [`ApiError::Server`] failure, never silently dropped.
//!
//! | Status | Variant |
//! |--------|---------|
//! | 401 | [`ApiError::Unauthorized`] (bad credentials, expired or invalid token) |
//! | 404 | [`ApiError::NotFound`] |
//! | other 4xx, or an error field on a 2xx | [`ApiError::Validation`] |
//! | 5xx | [`ApiError::Server`] |
//! | no response | [`ApiError::Network`] |
//!
//! 403 is a permission refusal for a valid session, so it is a validation
//! failure rather than an expiry signal.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Failure categories surfaced to views for messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Auth,
    Validation,
    NotFound,
    Transport,
    Server,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("server error: {0}")]
    Server(String),
}

impl ApiError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ApiError::Unauthorized(_) => FailureKind::Auth,
            ApiError::NotFound(_) => FailureKind::NotFound,
            ApiError::Validation(_) => FailureKind::Validation,
            ApiError::Network(_) => FailureKind::Transport,
            ApiError::Server(_) => FailureKind::Server,
        }
    }

    /// Whether this failure means the current credential is no longer valid.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Message suitable for inline display.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Unauthorized(m)
            | ApiError::NotFound(m)
            | ApiError::Validation(m)
            | ApiError::Network(m)
            | ApiError::Server(m) => m,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Network(e.to_string())
    }
}

/// Turn an HTTP status and raw body into a typed result.
pub fn classify<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ApiError> {
    let parsed: Result<Value, _> = if body.trim().is_empty() {
        Ok(Value::Null)
    } else {
        serde_json::from_str(body)
    };

    match parsed {
        Ok(value) => {
            if let Some(message) = error_field(&value) {
                return Err(from_status(status, message, true));
            }
            if !(200..300).contains(&status) {
                return Err(from_status(status, default_message(status), false));
            }
            serde_json::from_value(value)
                .map_err(|e| ApiError::Server(format!("unexpected response body: {}", e)))
        }
        Err(e) => {
            if (200..300).contains(&status) {
                Err(ApiError::Server(format!("malformed response body: {}", e)))
            } else {
                Err(from_status(status, default_message(status), false))
            }
        }
    }
}

fn error_field(value: &Value) -> Option<String> {
    let field = value.get("err").or_else(|| value.get("error"))?;
    match field {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn from_status(status: u16, message: String, explicit: bool) -> ApiError {
    match status {
        401 => ApiError::Unauthorized(message),
        404 => ApiError::NotFound(message),
        500..=599 => ApiError::Server(message),
        200..=299 if explicit => ApiError::Validation(message),
        400..=499 => ApiError::Validation(message),
        _ => ApiError::Server(message),
    }
}

fn default_message(status: u16) -> String {
    match status {
        401 => "Unauthorized".to_string(),
        404 => "Not found".to_string(),
        400..=499 => format!("Request rejected ({})", status),
        _ => format!("Unexpected status {}", status),
    }
}
