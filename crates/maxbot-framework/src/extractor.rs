//! Handler argument extraction.
//!
//! Any type implementing [`FromContext`] can appear as a handler parameter.
//! If extraction fails the handler is skipped for that update:
//!
//! ```rust,ignore
//! // Runs only for updates that carry a message.
//! async fn echo(message: Message, api: Api) -> Result<(), BoxError> {
//!     // ...
//! }
//!
//! // Runs for every update it is registered for.
//! async fn log(update: Arc<Update>, user: Option<User>) {
//!     // ...
//! }
//! ```

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

use maxbot_core::{CallbackQuery, Message, PlatformClient, Update, UpdateType, User};

use crate::context::UpdateContext;
use crate::control::BotControl;
use crate::error::{ExtractError, ExtractResult};

/// A type that can be extracted from an [`UpdateContext`].
pub trait FromContext: Sized {
    /// Attempts to extract this type from the given context.
    fn from_context(ctx: &Arc<UpdateContext>) -> ExtractResult<Self>;
}

impl FromContext for Arc<UpdateContext> {
    fn from_context(ctx: &Arc<UpdateContext>) -> ExtractResult<Self> {
        Ok(Arc::clone(ctx))
    }
}

impl FromContext for Arc<Update> {
    fn from_context(ctx: &Arc<UpdateContext>) -> ExtractResult<Self> {
        Ok(ctx.update_arc())
    }
}

impl FromContext for UpdateType {
    fn from_context(ctx: &Arc<UpdateContext>) -> ExtractResult<Self> {
        Ok(ctx.update().update_type)
    }
}

/// Extracts the update's message, or the message of the pressed callback.
impl FromContext for Message {
    fn from_context(ctx: &Arc<UpdateContext>) -> ExtractResult<Self> {
        let update = ctx.update();
        update
            .message
            .as_ref()
            .or_else(|| update.callback.as_ref().and_then(|c| c.message.as_ref()))
            .cloned()
            .ok_or(ExtractError::Missing("message"))
    }
}

impl FromContext for CallbackQuery {
    fn from_context(ctx: &Arc<UpdateContext>) -> ExtractResult<Self> {
        ctx.update()
            .callback
            .clone()
            .ok_or(ExtractError::Missing("callback"))
    }
}

/// Extracts the user the update is about, see [`Update::affected_user`].
impl FromContext for User {
    fn from_context(ctx: &Arc<UpdateContext>) -> ExtractResult<Self> {
        ctx.update()
            .affected_user()
            .cloned()
            .ok_or(ExtractError::Missing("user"))
    }
}

impl FromContext for BotControl {
    fn from_context(ctx: &Arc<UpdateContext>) -> ExtractResult<Self> {
        Ok(ctx.control().clone())
    }
}

impl<T: FromContext> FromContext for Option<T> {
    fn from_context(ctx: &Arc<UpdateContext>) -> ExtractResult<Self> {
        Ok(T::from_context(ctx).ok())
    }
}

// =============================================================================
// Api
// =============================================================================

/// The platform client, for making API calls from a handler.
#[derive(Clone)]
pub struct Api(pub Arc<dyn PlatformClient>);

impl Deref for Api {
    type Target = dyn PlatformClient;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl FromContext for Api {
    fn from_context(ctx: &Arc<UpdateContext>) -> ExtractResult<Self> {
        Ok(Api(Arc::clone(ctx.client())))
    }
}

// =============================================================================
// State
// =============================================================================

/// A value attached to the context by an earlier middleware stage.
///
/// ```rust,ignore
/// async fn greet(locale: State<Locale>) { /* ... */ }
/// ```
#[derive(Debug)]
pub struct State<T>(pub Arc<T>);

impl<T> Deref for State<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Send + Sync + 'static> FromContext for State<T> {
    fn from_context(ctx: &Arc<UpdateContext>) -> ExtractResult<Self> {
        ctx.require_state::<T>().map(State)
    }
}

// =============================================================================
// Filter outputs
// =============================================================================

/// Arguments following a matched command, split on single spaces.
///
/// Available to handlers registered through a command filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandArgs(pub Vec<String>);

impl CommandArgs {
    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl Deref for CommandArgs {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

impl FromContext for CommandArgs {
    fn from_context(ctx: &Arc<UpdateContext>) -> ExtractResult<Self> {
        ctx.require_state::<CommandArgs>().map(|args| (*args).clone())
    }
}

/// Capture groups of a matched text or callback pattern.
///
/// Group 0 is the whole match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    groups: Vec<Option<String>>,
    named: HashMap<String, String>,
}

impl Captures {
    pub(crate) fn from_regex(regex: &regex::Regex, haystack: &str) -> Option<Self> {
        let caps = regex.captures(haystack)?;
        let groups = caps
            .iter()
            .map(|m| m.map(|m| m.as_str().to_string()))
            .collect();
        let named = regex
            .capture_names()
            .flatten()
            .filter_map(|name| {
                caps.name(name)
                    .map(|m| (name.to_string(), m.as_str().to_string()))
            })
            .collect();
        Some(Self { groups, named })
    }

    /// Returns the group at `index`, if it participated in the match.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }

    /// Returns a named group.
    pub fn name(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    /// Number of groups including the whole match.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl FromContext for Captures {
    fn from_context(ctx: &Arc<UpdateContext>) -> ExtractResult<Self> {
        ctx.require_state::<Captures>().map(|caps| (*caps).clone())
    }
}
