//! Error types for hypermedia API operations.
//!
//! Every fallible operation in this crate returns [`Result`], whose error side is
//! [`HalError`]. Nothing is swallowed: the caller decides what to show and when.
//!
//! # Error Categories
//!
//! | Category | Variants | Cause |
//! |----------|----------|-------|
//! | Navigation | `MissingRelation`, `MissingParameters`, `InvalidTemplate` | Programmer or contract error, no network call made |
//! | Server | `Http` | Response outside `2xx` |
//! | Network | `Transport`, `Push` | No response / socket failure |
//! | Payload | `Decode` | Body did not match the expected shape |
//! | Setup | `Config` | Invalid client configuration |
//!
//! # Display strings
//!
//! [`describe_error`] turns any error into the single line a user should see. It runs the
//! same ordered fallback chain as [`describe_value`], so problem-detail bodies
//! (`{title, detail}`) win over generic messages:
//!
//! ```
//! use serde_json::json;
//! use turnstile_hal::error::describe_value;
//!
//! assert_eq!(describe_value(&json!({"error": {"detail": "D", "title": "T"}})), "D");
//! assert_eq!(describe_value(&json!({"error": {"title": "T"}})), "T");
//! assert_eq!(describe_value(&json!({"status": 0})), "Connection error");
//! ```

use serde_json::{json, Value};
use thiserror::Error;

/// Result type for hypermedia API operations.
pub type Result<T> = std::result::Result<T, HalError>;

/// Status code the root endpoint answers with when the requested API version is not served.
pub const VERSION_MISMATCH_STATUS: u16 = 417;

/// A response outside the `2xx` range, kept intact for the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpFailure {
    /// HTTP status code as received.
    pub status: u16,
    /// Decoded body. Non-JSON text is kept as a JSON string, an empty body as `null`.
    pub body: Value,
}

impl HttpFailure {
    /// Build a failure from raw response bytes.
    pub fn from_bytes(status: u16, body: &[u8]) -> Self {
        let body = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(body)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
        };
        HttpFailure { status, body }
    }
}

impl std::fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.body {
            Value::Null => write!(f, "HTTP {}", self.status),
            Value::String(text) => write!(f, "HTTP {}: {}", self.status, text),
            other => write!(f, "HTTP {}: {}", self.status, other),
        }
    }
}

/// Errors that can occur while navigating or calling the hypermedia API.
///
/// The enum is `Clone` so that one failed root fetch can be handed to every caller
/// that was waiting on it.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum HalError {
    /// The resource does not carry the requested relation.
    #[error("Expected relation '{relation}' from {resource}")]
    MissingRelation {
        /// Relation name the caller asked for.
        relation: String,
        /// Short description of the resource that was searched.
        resource: String,
    },

    /// A templated link was followed without any parameters.
    #[error("Parameters required for templated link {href}")]
    MissingParameters {
        /// The template that could not be expanded.
        href: String,
    },

    /// The link template is malformed.
    #[error("Invalid URI template: {0}")]
    InvalidTemplate(String),

    /// The server answered outside `2xx`.
    #[error("{0}")]
    Http(HttpFailure),

    /// No response was obtained (connection refused, DNS, timeout, ...).
    #[error("Transport error: {0}")]
    Transport(String),

    /// A body or push frame could not be decoded into the expected type.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The push channel failed.
    #[error("Push channel error: {0}")]
    Push(String),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for HalError {
    fn from(err: serde_json::Error) -> Self {
        HalError::Decode(err.to_string())
    }
}

impl From<HttpFailure> for HalError {
    fn from(failure: HttpFailure) -> Self {
        HalError::Http(failure)
    }
}

impl HalError {
    /// HTTP status associated with this error.
    ///
    /// Transport failures report `0`, as a browser would for a request that never
    /// got an answer. Errors raised before any request report `None`.
    #[inline]
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            HalError::Http(failure) => Some(failure.status),
            HalError::Transport(_) => Some(0),
            _ => None,
        }
    }

    /// Whether the server refused the requested API version (HTTP 417).
    #[inline]
    #[must_use]
    pub fn is_version_mismatch(&self) -> bool {
        self.status() == Some(VERSION_MISMATCH_STATUS)
    }

    /// Whether the target resource no longer exists (HTTP 404).
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Project this error into the loosely typed shape the display chain understands:
    /// `{status, error: <body>, message}`.
    pub fn to_value(&self) -> Value {
        match self {
            HalError::Http(failure) => json!({
                "status": failure.status,
                "error": failure.body,
                "message": self.to_string(),
            }),
            HalError::Transport(message) => json!({
                "status": 0,
                "message": message,
            }),
            other => json!({ "message": other.to_string() }),
        }
    }
}

/// Human readable text for an error, suitable for a transient UI message.
pub fn describe_error(error: &HalError) -> String {
    describe_value(&error.to_value())
}

/// Human readable text for an arbitrary error shape.
///
/// Tried in order: a literal string, `error.detail`, `error.title`, `error.message`
/// (each also looked up one level deeper, under `error.error`), status `0`
/// ("Connection error") and `405` ("Unknown API error"), a scalar `error`, `message`,
/// `error` itself, and finally the value rendered as JSON.
pub fn describe_value(error: &Value) -> String {
    match error {
        Value::Null => return "Unknown".to_string(),
        Value::String(text) => return text.clone(),
        _ => {}
    }

    let nested = error.get("error");
    // an HTTP body may itself wrap a problem object under `error`
    let inner = nested.and_then(|e| e.get("error")).filter(|e| e.is_object());
    for key in ["detail", "title", "message"] {
        for source in [nested, inner].into_iter().flatten() {
            if let Some(text) = source.get(key).and_then(non_empty) {
                return text;
            }
        }
    }

    match error.get("status").and_then(Value::as_u64) {
        Some(0) => return "Connection error".to_string(),
        Some(405) => return "Unknown API error".to_string(),
        _ => {}
    }

    if let Some(text) = nested
        .filter(|e| !e.is_object() && !e.is_array())
        .and_then(non_empty)
    {
        return text;
    }

    if let Some(text) = error.get("message").and_then(non_empty) {
        return text;
    }
    if let Some(text) = nested.and_then(non_empty) {
        return text;
    }
    error.to_string()
}

fn non_empty(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
