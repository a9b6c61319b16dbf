//! Configuration module for the maxbot runtime.
//!
//! This module provides layered configuration loading (files, environment,
//! programmatic overrides) and validation of the API, polling and logging
//! settings.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    ApiConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, MaxbotConfig,
    PollingConfig, SpanEventConfig,
};
pub use validation::validate_config;
