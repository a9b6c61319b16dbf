//! Update dispatcher.
//!
//! The [`Dispatcher`] owns the middleware list and the [`HandlerRegistry`] of
//! one bot. For every update it snapshots the middleware list and the registry,
//! appends the registry invocation as the terminal stage and runs the chain:
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐        ┌──────────────────────────┐
//! │ middleware 1 │──▶│ middleware 2 │──▶ … ─▶│ registry (handlers by    │
//! │   (before)   │   │   (before)   │        │ update type, in order)   │
//! │   (after)  ◀─│───│─ (after)   ◀─│── … ◀──│                          │
//! └──────────────┘   └──────────────┘        └──────────────────────────┘
//! ```
//!
//! Both lists are snapshotted when an update enters: registering middleware or
//! handlers while it is in flight only affects the next update.
//!
//! The dispatcher also implements [`tower::Service`], so it can sit at the
//! bottom of a tower stack.

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use parking_lot::RwLock;
use tracing::{Instrument, Level, span};

use maxbot_core::UpdateType;

use crate::context::UpdateContext;
use crate::error::{BoxError, HandlerResult};
use crate::handler::BoxedHandler;
use crate::middleware::{BoxedMiddleware, Next};
use crate::registry::HandlerRegistry;

/// Middleware pipeline plus handler registry.
///
/// Cloning yields another handle to the same lists.
#[derive(Clone, Default)]
pub struct Dispatcher {
    middleware: Arc<RwLock<Vec<BoxedMiddleware>>>,
    registry: Arc<RwLock<Arc<HandlerRegistry>>>,
}

impl Dispatcher {
    /// Creates a dispatcher with no middleware and no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler for `update_type`.
    pub fn register(&self, update_type: UpdateType, handler: BoxedHandler) {
        Arc::make_mut(&mut *self.registry.write()).register(update_type, handler);
    }

    /// Appends a middleware stage. Stages run in the order they were added.
    pub fn add_middleware(&self, middleware: BoxedMiddleware) {
        self.middleware.write().push(middleware);
    }

    /// Returns the number of middleware stages.
    pub fn middleware_count(&self) -> usize {
        self.middleware.read().len()
    }

    /// Returns the total number of handlers.
    pub fn handler_count(&self) -> usize {
        self.registry.read().handler_count()
    }

    /// Returns every update type with at least one handler.
    pub fn registered_types(&self) -> Vec<UpdateType> {
        self.registry.read().registered_types()
    }

    /// Runs one update through the pipeline.
    ///
    /// Errors from any stage or handler that no middleware recovered are
    /// returned to the caller.
    pub async fn dispatch(&self, ctx: Arc<UpdateContext>) -> HandlerResult {
        let stages: Arc<[BoxedMiddleware]> = self.middleware.read().iter().cloned().collect();
        let registry = Arc::clone(&*self.registry.read());
        let terminal: BoxedHandler =
            Arc::new(move |ctx: Arc<UpdateContext>| registry.invoke(ctx));

        let span = span!(
            Level::DEBUG,
            "dispatch",
            update_type = %ctx.update().update_type,
            timestamp = ctx.update().timestamp
        );
        Next::new(stages, terminal).run(ctx).instrument(span).await
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("middleware_count", &self.middleware_count())
            .field("registry", &**self.registry.read())
            .finish()
    }
}

// =============================================================================
// Tower Service
// =============================================================================

impl tower::Service<Arc<UpdateContext>> for Dispatcher {
    type Response = ();
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<(), BoxError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, ctx: Arc<UpdateContext>) -> Self::Future {
        let this = self.clone();
        Box::pin(async move { this.dispatch(ctx).await })
    }
}
