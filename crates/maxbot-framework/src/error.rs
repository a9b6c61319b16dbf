//! Error types for the framework layer.

use thiserror::Error;

/// Boxed error type returned by handlers and middleware.
pub use tower::BoxError;

/// Result of running a handler, a middleware stage or a whole pipeline.
pub type HandlerResult = Result<(), BoxError>;

/// Errors that occur when extracting a handler argument from the context.
///
/// An extraction failure skips the handler; it is not reported as an error.
#[derive(Error, Debug, Clone)]
pub enum ExtractError {
    /// The update does not carry the requested part.
    #[error("Update has no {0}")]
    Missing(&'static str),

    /// No per-update state of the requested type was inserted.
    #[error("No state of type {0} in context")]
    MissingState(&'static str),

    /// Custom extraction error.
    #[error("{0}")]
    Custom(String),
}

impl ExtractError {
    /// Creates a custom extraction error.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Errors raised when compiling a filter pattern.
#[derive(Error, Debug)]
pub enum PatternError {
    /// The regular expression does not compile.
    #[error("Invalid pattern '{pattern}': {source}")]
    Invalid {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A trailing `/.../flags` flag is not supported.
    #[error("Unsupported flag '{flag}' in pattern '{pattern}'")]
    UnsupportedFlag { pattern: String, flag: char },
}
