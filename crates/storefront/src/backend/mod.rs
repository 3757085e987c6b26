//! REST client for the shop backend.
//!
//! # Architecture
//!
//! - The backend is the source of truth: no local persistence, direct calls
//! - Every request carries the visitor's bearer token when one is present
//! - Product list and detail responses are cached via `moka` (5 minute TTL)
//! - Error bodies are reduced to one human-readable message by
//!   [`extract_error_message`], shared by every call
//!
//! # Example
//!
//! ```rust,ignore
//! use cafe_origen_storefront::backend::BackendClient;
//!
//! let client = BackendClient::new(&config.backend)?;
//!
//! let auth = client.login("ana@example.com", "secret").await?;
//! let favorites = client.get_favorites(&auth.token).await?;
//! ```

mod cache;
mod client;
pub mod types;

pub use client::BackendClient;
pub use types::*;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport failure (connection refused, TLS, malformed response).
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// The backend did not answer within the configured timeout.
    #[error("Backend request timed out")]
    Timeout,

    /// The bearer token was missing, expired or rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}

impl BackendError {
    /// Build the error for a non-success response from its status and body.
    #[must_use]
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = extract_error_message(status.as_u16(), body);
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized(message),
            StatusCode::NOT_FOUND => Self::NotFound(message),
            _ => Self::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// The message shown to the visitor in the alert banner.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Http(_) => "Could not reach the server. Please try again later.".to_string(),
            Self::Timeout => "The server took too long to respond. Please try again.".to_string(),
            Self::Unauthorized(message) | Self::NotFound(message) | Self::Api { message, .. } => {
                message.clone()
            }
            Self::Parse(_) => "Unexpected response from the server.".to_string(),
        }
    }

    /// Whether the backend rejected the session token.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Whether the backend answered and refused the request, as opposed to
    /// being unreachable or failing itself.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        match self {
            Self::Unauthorized(_) | Self::NotFound(_) => true,
            Self::Api { status, .. } => *status < 500,
            Self::Http(_) | Self::Timeout | Self::Parse(_) => false,
        }
    }

    /// Status for a page that could not be rendered because of this error.
    #[must_use]
    pub const fn gateway_status(&self) -> StatusCode {
        if matches!(self, Self::Timeout) {
            StatusCode::GATEWAY_TIMEOUT
        } else {
            StatusCode::BAD_GATEWAY
        }
    }
}

/// Reduce an error response body to a single message.
///
/// Tries, in order: an `errors` object or array (string values joined with
/// newlines), then the `error`, `msg` and `message` strings, and finally a
/// default chosen by status code.
#[must_use]
pub fn extract_error_message(status: u16, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    if let Some(Value::Object(map)) = &parsed {
        if let Some(errors) = map.get("errors") {
            let mut messages = Vec::new();
            collect_strings(errors, &mut messages);
            if !messages.is_empty() {
                return messages.join("\n");
            }
        }

        for key in ["error", "msg", "message"] {
            if let Some(Value::String(message)) = map.get(key)
                && !message.trim().is_empty()
            {
                return message.clone();
            }
        }
    }

    default_message(status)
}

/// The fallback message for a status code whose body carried none.
#[must_use]
pub fn default_message(status: u16) -> String {
    match status {
        401 => "Unauthorized. Please log in again.".to_string(),
        403 => "Forbidden. You do not have permission to access this resource.".to_string(),
        404 => "Not found.".to_string(),
        500..=599 => "Internal server error. Please try again later.".to_string(),
        _ => format!("Unexpected response from the server (status {status})"),
    }
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) if !s.trim().is_empty() => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}
