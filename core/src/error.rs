//! Error types for the task API client and the error-body normalizer.
//!
//! # Design
//! Every non-2xx response is reduced to a `NormalizedError` whatever shape
//! the backend used for its body. Decoding is two-step: the raw body is
//! classified as `ErrorPayload::Structured` (valid JSON) or
//! `ErrorPayload::Unparseable`, then collapsed into a single display message.
//! `ApiError::Status` displays exactly that message, so callers that only
//! show `err.to_string()` see the backend's text.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Message used when the error body is missing or is not JSON.
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred";

/// Message used when the error body carries no usable `detail`.
pub const REQUEST_FAILED: &str = "Request failed";

/// Errors returned by `TaskClient` and `SessionAuthClient`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("{}", .0.message)]
    Status(NormalizedError),

    /// The request never produced a response (connection refused, DNS, I/O).
    #[error("transport error: {0}")]
    Transport(String),

    /// A 2xx response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The base URL (or another startup setting) is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Input rejected locally, before any request was sent.
    #[error("{0}")]
    Validation(String),
}

impl ApiError {
    /// HTTP status for `Status` errors, `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status(e) => Some(e.status),
            _ => None,
        }
    }
}

/// The `{message, status, code}` shape produced for every failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedError {
    pub message: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// What to do with a message field holding an empty string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyMessage {
    /// Report `""` as the message.
    Keep,
    /// Use the fallback message instead.
    Fallback,
}

/// First decode step of an error body.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorPayload {
    /// The body was valid JSON.
    Structured(Value),
    /// The body was empty or not JSON.
    Unparseable,
}

impl ErrorPayload {
    pub fn decode(body: &str) -> Self {
        match serde_json::from_str(body) {
            Ok(value) => ErrorPayload::Structured(value),
            Err(_) => ErrorPayload::Unparseable,
        }
    }
}

impl NormalizedError {
    /// Normalize a task-service error body, which carries its text in `detail`.
    pub fn from_body(status: u16, body: &str) -> Self {
        Self::normalize(
            status,
            body,
            "detail",
            UNEXPECTED_ERROR,
            REQUEST_FAILED,
            EmptyMessage::Keep,
        )
    }

    /// Normalize an error body whose text lives in `field`.
    ///
    /// `unparseable` is the message for a missing or non-JSON body and
    /// `fallback` is used when the field is absent, and also for an empty
    /// string field when `empty` is `EmptyMessage::Fallback`.
    pub fn normalize(
        status: u16,
        body: &str,
        field: &str,
        unparseable: &str,
        fallback: &str,
        empty: EmptyMessage,
    ) -> Self {
        match ErrorPayload::decode(body) {
            ErrorPayload::Unparseable => NormalizedError {
                message: unparseable.to_string(),
                status,
                code: None,
            },
            ErrorPayload::Structured(value) => {
                let object = value.as_object();
                let message = object
                    .and_then(|o| o.get(field))
                    .map(display_message)
                    .filter(|m| empty == EmptyMessage::Keep || !m.is_empty())
                    .unwrap_or_else(|| fallback.to_string());
                let code = object
                    .and_then(|o| o.get("code"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                NormalizedError {
                    message,
                    status,
                    code,
                }
            }
        }
    }
}

/// Strings are used verbatim, anything else as compact JSON text.
fn display_message(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
