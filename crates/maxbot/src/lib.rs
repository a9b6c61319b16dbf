//! # Maxbot
//!
//! A type-safe bot framework for the MAX messenger platform API.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  get_updates   ┌──────────┐     ┌─────────────┐     ┌──────────────────┐
//! │ HttpClient │◀──────────────│   Bot    │────▶│ Middleware  │────▶│ Handler registry │
//! │            │  (long poll)   │  (loop)  │     │ A ▶ B ▶ ... │     │ by update type   │
//! └────────────┘                └──────────┘     └─────────────┘     └──────────────────┘
//!                                    ▲
//!                      webhook body ─┘ handle_webhook
//! ```
//!
//! - **Core**: the `Update` model and the `PlatformClient` seam
//! - **Transport**: the HTTP client for the platform API
//! - **Framework**: extractors, filters, middleware and the dispatcher
//! - **Runtime**: the `Bot`, its polling loop, configuration and logging
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use maxbot::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let bot = Bot::load()?;
//!
//!     bot.on_command("start", |message: Message, api: Api| async move {
//!         let Some(chat_id) = message.chat_id() else { return Ok(()) };
//!         api.call(
//!             ApiRequest::post("messages")
//!                 .query("chat_id", chat_id)
//!                 .body(serde_json::json!({ "text": "Hi!" })),
//!         )
//!         .await?;
//!         Ok::<_, BoxError>(())
//!     });
//!
//!     bot.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `http-client`: the reqwest-based platform client (default)
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use maxbot_core as core;
pub use maxbot_framework as framework;
pub use maxbot_runtime as runtime;
pub use maxbot_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use maxbot::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use maxbot_runtime::{Bot, ConfigLoader, MaxbotConfig, PollError, RuntimeError};

    // Model types handlers work with
    pub use maxbot_core::{
        ApiRequest, Attachment, AttachmentKind, CallbackQuery, Message, PlatformClient, Update,
        UpdateType, User,
    };

    // Extractors and handler plumbing
    pub use maxbot_framework::{
        Api, BotControl, BoxError, Captures, CommandArgs, FromContext, HandlerResult, Next,
        State, UpdateContext, from_fn,
    };

    #[cfg(feature = "http-client")]
    pub use maxbot_transport::HttpClient;
}
