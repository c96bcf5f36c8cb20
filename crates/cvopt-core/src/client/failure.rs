//! Typed failures produced once at the HTTP boundary.
//!
//! Nothing downstream of the client re-parses transport errors or response
//! bodies; flows and the workflow only ever see a [`Failure`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Categories of request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Missing or malformed local input; never reaches the network
    Validation,
    /// 4xx from the service
    Rejected,
    /// 402: the feature needs a paid plan
    PaymentRequired,
    /// 401: the session is gone; the token store has been cleared
    Unauthenticated,
    /// Network error, timeout or 5xx
    Transient,
}

impl FailureKind {
    /// Only transient failures are worth another attempt.
    pub fn is_retryable(self) -> bool {
        matches!(self, FailureKind::Transient)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Validation => write!(f, "validation"),
            FailureKind::Rejected => write!(f, "rejected"),
            FailureKind::PaymentRequired => write!(f, "payment_required"),
            FailureKind::Unauthenticated => write!(f, "unauthenticated"),
            FailureKind::Transient => write!(f, "transient"),
        }
    }
}

/// A failed request with its category and a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Validation, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Rejected, message)
    }

    pub fn payment_required(message: impl Into<String>) -> Self {
        Self::new(FailureKind::PaymentRequired, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Unauthenticated, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Transient, message)
    }

    /// Classifies a non-2xx response.
    ///
    /// The message comes from the structured error body when there is one,
    /// otherwise `fallback` is used.
    pub fn from_status(status: u16, body: &str, fallback: &str) -> Self {
        let extracted = extract_error_message(body);
        match status {
            401 => Self::unauthenticated(
                extracted.unwrap_or_else(|| "Your session has expired. Please sign in again.".into()),
            ),
            402 => Self::payment_required(
                extracted.unwrap_or_else(|| "This feature requires a paid plan.".into()),
            ),
            400..=499 => Self::rejected(extracted.unwrap_or_else(|| fallback.to_string())),
            _ => {
                let message = match extracted {
                    Some(detail) => format!("Server error (HTTP {status}): {detail}"),
                    None => format!("Server error (HTTP {status})"),
                };
                Self::transient(message)
            }
        }
    }

    /// Maps a transport-level error (connect, timeout, body read).
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::transient("Request timed out")
        } else if err.is_connect() {
            Self::transient("Could not reach the server")
        } else {
            Self::transient(format!("Request failed: {err}"))
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Failure {}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, Failure>;

/// Pulls a human-readable message out of an error body.
///
/// Understands `{"detail": "..."}`, validation lists shaped like
/// `{"detail": [{"msg": "..."}]}`, and `message` / `error` fields.
pub fn extract_error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;

    if let Some(detail) = json.get("detail")
        && let Some(message) = message_from_value(detail)
    {
        return Some(message);
    }

    ["message", "error"]
        .iter()
        .filter_map(|key| json.get(*key))
        .find_map(message_from_value)
}

fn message_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(message_from_value).collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        Value::Object(map) => ["msg", "message", "detail"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(message_from_value),
        _ => None,
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
