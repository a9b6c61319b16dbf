//! Maxbot Runtime - the engine that drives a bot.
//!
//! This crate provides:
//! - The [`Bot`]: handler registration, the long-poll loop and its cursor
//! - Webhook body decoding for bots that receive pushed updates
//! - Layered configuration (defaults, files, `MAXBOT_*` environment)
//! - Logging setup
//!
//! # Long polling
//!
//! ```ignore
//! use maxbot_runtime::{Bot, ConfigLoader};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new().load()?;
//!     let bot = Bot::from_config(&config)?;
//!
//!     bot.on_message(|message: Message| async move {
//!         tracing::info!(text = ?message.text(), "Got a message");
//!     });
//!
//!     // Runs until Ctrl+C or SIGTERM
//!     bot.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Webhooks
//!
//! The HTTP server is the application's own. Hand every request body to
//! [`Bot::handle_webhook`]:
//!
//! ```ignore
//! async fn webhook(State(bot): State<Bot>, body: Bytes) -> StatusCode {
//!     match bot.handle_webhook(&body).await {
//!         Ok(_) => StatusCode::OK,
//!         Err(_) => StatusCode::BAD_REQUEST,
//!     }
//! }
//! ```

pub mod bot;
pub mod config;
pub mod error;
pub mod logging;
pub mod webhook;

// Re-exports
pub use bot::{Bot, ErrorHandler, PollSettings};
pub use config::{
    ApiConfig, ConfigError, ConfigLoader, ConfigResult, LoggingConfig, MaxbotConfig,
    PollingConfig, Profile, load_config, load_config_from_file,
};
pub use error::{PollError, RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use webhook::decode_payload;

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for handler code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
