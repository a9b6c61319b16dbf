//! # maxbot framework
//!
//! The dispatch layer between decoded updates and user code.
//!
//! This layer provides:
//! - Axum-style handlers with [`FromContext`] extractors
//! - A [`HandlerRegistry`] keyed by update type
//! - An onion [`Middleware`] pipeline run by the [`Dispatcher`]
//! - [`filter`] wrappers for commands, callback payloads, text and attachments
//! - [`BotControl`], the running flag shared with the polling loop

pub mod context;
pub mod control;
pub mod dispatcher;
pub mod error;
pub mod extractor;
pub mod filter;
pub mod handler;
pub mod middleware;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use context::UpdateContext;
pub use control::BotControl;
pub use dispatcher::Dispatcher;
pub use error::{BoxError, ExtractError, ExtractResult, HandlerResult, PatternError};
pub use extractor::{Api, Captures, CommandArgs, FromContext, State};
pub use filter::{CallbackPattern, compile_pattern, normalize_command, parse_command};
pub use handler::{BoxedHandler, Handler, IntoHandlerResult, into_handler};
pub use middleware::{BoxedMiddleware, Middleware, Next, from_fn};
pub use registry::HandlerRegistry;
