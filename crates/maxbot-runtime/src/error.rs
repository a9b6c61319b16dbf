//! Runtime error types.

use thiserror::Error;

use maxbot_core::{ApiError, DecodeError, TransportError, UpdateType};
use maxbot_framework::{BoxError, PatternError};

use crate::config::ConfigError;

/// Errors returned by [`Bot`](crate::Bot) operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP client could not be created.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// An API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// A webhook body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A filter pattern did not compile.
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] PatternError),

    /// `start` was called on a bot whose loop is already running.
    #[error("Polling loop is already running")]
    AlreadyRunning,

    /// A handler or middleware returned an error.
    #[error("Handler error: {0}")]
    Handler(BoxError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// A failure inside the polling loop, handed to the installed error handler.
#[derive(Error, Debug)]
pub enum PollError {
    /// Fetching the next page of updates failed. The cursor is unchanged.
    #[error("Failed to fetch updates: {0}")]
    Fetch(#[source] ApiError),

    /// A handler or middleware failed while processing one update. The
    /// cursor has already moved past it.
    #[error("Handler failed for {update_type} update: {source}")]
    Handler {
        update_type: UpdateType,
        #[source]
        source: BoxError,
    },
}

impl PollError {
    /// Returns true for fetch failures.
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch(_))
    }
}
