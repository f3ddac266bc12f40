//! The API response envelope.
//!
//! Every HTTP response body is `{success, data}` on the happy path and
//! `{success: false, error: {message, code}}` on failure.

use serde::{Deserialize, Serialize};

/// Standard response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Whether the request succeeded.
    pub success: bool,
    /// Payload, present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error details, present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorInfo>,
}

/// Machine-readable error details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorInfo {
    /// Human-readable message.
    pub message: String,
    /// Stable error code, e.g. `RATE_LIMIT`.
    pub code: String,
}

impl<T> ApiEnvelope<T> {
    /// A successful envelope wrapping `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiEnvelope<()> {
    /// An error envelope with a message and a stable code.
    pub fn error(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiErrorInfo {
                message: message.into(),
                code: code.into(),
            }),
        }
    }
}
