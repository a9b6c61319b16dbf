//! Error types for the maxbot framework.
//!
//! This module defines the error taxonomy shared by every layer:
//!
//! - [`DecodeError`]: an inbound payload could not be turned into an [`Update`](crate::Update)
//! - [`TransportError`]: the HTTP round-trip itself failed
//! - [`ApiError`]: a platform API call failed (transport, status or body)

use thiserror::Error;

// =============================================================================
// Decode Errors
// =============================================================================

/// Errors raised while decoding inbound payloads.
///
/// Decoding is lenient: only the envelope's mandatory fields produce these
/// errors. Malformed nested objects are dropped with a warning instead.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The payload is not valid JSON.
    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload (or an entry in a batch) is not a JSON object.
    #[error("Expected a JSON object, got {got}")]
    NotAnObject { got: &'static str },

    /// A mandatory field is absent.
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    /// A mandatory field has the wrong shape.
    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl DecodeError {
    /// Creates an invalid field error.
    pub fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Names the JSON kind of a value for error messages.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Result type for decode operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors that occur below the API layer, while talking HTTP.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// The request could not be sent or the response could not be read.
    #[error("Request to {url} failed: {reason}")]
    RequestFailed { url: String, reason: String },

    /// The request did not complete in time.
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    /// The configured base URL or a request path is not a valid URL.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

// =============================================================================
// API Errors
// =============================================================================

/// Errors returned by a [`PlatformClient`](crate::PlatformClient).
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport-level failure.
    #[error("Network error: {0}")]
    Transport(#[from] TransportError),

    /// The platform answered with a non-success HTTP status.
    #[error("HTTP {status} error: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("Invalid JSON response: {0}")]
    InvalidResponse(String),

    /// The client does not implement this call.
    #[error("API call not supported by this client")]
    NotSupported,
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::InvalidResponse(e.to_string())
    }
}

impl From<DecodeError> for ApiError {
    fn from(e: DecodeError) -> Self {
        ApiError::InvalidResponse(e.to_string())
    }
}

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
