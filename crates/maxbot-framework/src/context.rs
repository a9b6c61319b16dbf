//! Per-update context.
//!
//! One [`UpdateContext`] is created for every update entering the pipeline
//! and handed, wrapped in an `Arc`, to each middleware stage and handler. It
//! gives access to:
//!
//! - the [`Update`] being processed
//! - the [`PlatformClient`] for one-shot API calls
//! - the [`BotControl`] of the polling loop (to stop it from a handler)
//! - typed state that middleware can attach for later stages
//!
//! # Example
//!
//! ```rust,ignore
//! async fn handle(ctx: Arc<UpdateContext>) {
//!     if ctx.update().text() == Some("/quit") {
//!         ctx.stop();
//!     }
//! }
//! ```

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use maxbot_core::{PlatformClient, Update};

use crate::control::BotControl;
use crate::error::{ExtractError, ExtractResult};

type StateMap = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// The context handed to middleware and handlers for one update.
pub struct UpdateContext {
    update: Arc<Update>,
    client: Arc<dyn PlatformClient>,
    control: BotControl,
    state: RwLock<StateMap>,
}

impl UpdateContext {
    /// Creates a context for `update`.
    pub fn new(
        update: impl Into<Arc<Update>>,
        client: Arc<dyn PlatformClient>,
        control: BotControl,
    ) -> Self {
        Self {
            update: update.into(),
            client,
            control,
            state: RwLock::new(HashMap::new()),
        }
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    /// Returns the update being processed.
    pub fn update(&self) -> &Update {
        &self.update
    }

    /// Returns a shared handle to the update.
    pub fn update_arc(&self) -> Arc<Update> {
        Arc::clone(&self.update)
    }

    /// Returns the platform client.
    pub fn client(&self) -> &Arc<dyn PlatformClient> {
        &self.client
    }

    /// Returns the control handle of the polling loop.
    pub fn control(&self) -> &BotControl {
        &self.control
    }

    /// Requests the polling loop to stop after the current iteration.
    pub fn stop(&self) {
        self.control.stop();
    }

    // ─── Derived contexts ───────────────────────────────────────────────────

    /// Returns a context for a different update, sharing the client, the
    /// control handle and a copy of the current state.
    ///
    /// Middleware uses this to hand a rewritten update to the next stage.
    pub fn with_update(&self, update: impl Into<Arc<Update>>) -> Self {
        Self {
            update: update.into(),
            client: Arc::clone(&self.client),
            control: self.control.clone(),
            state: RwLock::new(self.state.read().clone()),
        }
    }

    /// Returns a copy of this context with `value` added to its state.
    ///
    /// The original context is left untouched, which keeps values attached by
    /// one filtered handler invisible to its siblings.
    pub fn fork_with<T: Send + Sync + 'static>(&self, value: T) -> Self {
        let forked = self.with_update(Arc::clone(&self.update));
        forked.insert_state(value);
        forked
    }

    // ─── State ──────────────────────────────────────────────────────────────

    /// Stores a value, replacing any previous value of the same type.
    pub fn insert_state<T: Send + Sync + 'static>(&self, value: T) {
        self.state.write().insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Returns the stored value of type `T`, if any.
    pub fn state<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let value = self.state.read().get(&TypeId::of::<T>()).cloned()?;
        value.downcast::<T>().ok()
    }

    /// Returns the stored value of type `T` or an extraction error.
    pub fn require_state<T: Send + Sync + 'static>(&self) -> ExtractResult<Arc<T>> {
        self.state::<T>()
            .ok_or(ExtractError::MissingState(type_name::<T>()))
    }

    /// Returns true if a value of type `T` is stored.
    pub fn has_state<T: Send + Sync + 'static>(&self) -> bool {
        self.state.read().contains_key(&TypeId::of::<T>())
    }
}

impl fmt::Debug for UpdateContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateContext")
            .field("update_type", &self.update.update_type)
            .field("timestamp", &self.update.timestamp)
            .field("running", &self.control.is_running())
            .finish_non_exhaustive()
    }
}
