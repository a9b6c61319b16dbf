//! Onion-style middleware.
//!
//! Each stage receives the context and a [`Next`] continuation. It may run
//! code before and after calling the continuation, call it several times, or
//! not call it at all, which ends the chain without running the handlers.
//!
//! ```rust,ignore
//! bot.use_middleware(|ctx: Arc<UpdateContext>, next: Next| async move {
//!     let started = Instant::now();
//!     let result = next.run(ctx).await;
//!     debug!(elapsed = ?started.elapsed(), "Update handled");
//!     result
//! });
//! ```
//!
//! An error returned by any later stage or handler comes back out of
//! `next.run`, where the stage may recover it or pass it on.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::context::UpdateContext;
use crate::error::HandlerResult;
use crate::handler::BoxedHandler;

/// A pipeline stage wrapping everything registered after it.
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, ctx: Arc<UpdateContext>, next: Next) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Middleware for F
where
    F: Fn(Arc<UpdateContext>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn handle(&self, ctx: Arc<UpdateContext>, next: Next) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self)(ctx, next))
    }
}

/// A type-erased middleware stage.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// Wraps a closure as middleware, letting the compiler infer its argument types.
///
/// ```rust,ignore
/// bot.use_middleware(from_fn(|ctx, next| async move { next.run(ctx).await }));
/// ```
pub fn from_fn<F, Fut>(f: F) -> F
where
    F: Fn(Arc<UpdateContext>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    f
}

/// The continuation handed to a middleware stage.
///
/// Holds the remaining stages of a pipeline snapshot plus the terminal
/// dispatch step. Cloning is cheap.
#[derive(Clone)]
pub struct Next {
    stages: Arc<[BoxedMiddleware]>,
    index: usize,
    terminal: BoxedHandler,
}

impl Next {
    /// Creates a continuation over `stages` that ends in `terminal`.
    pub fn new(stages: Arc<[BoxedMiddleware]>, terminal: BoxedHandler) -> Self {
        Self {
            stages,
            index: 0,
            terminal,
        }
    }

    /// Runs the rest of the pipeline.
    pub fn run(&self, ctx: Arc<UpdateContext>) -> BoxFuture<'static, HandlerResult> {
        match self.stages.get(self.index) {
            Some(stage) => {
                let next = Self {
                    stages: Arc::clone(&self.stages),
                    index: self.index + 1,
                    terminal: Arc::clone(&self.terminal),
                };
                stage.handle(ctx, next)
            }
            None => (self.terminal)(ctx),
        }
    }

    /// Number of stages left before the terminal step.
    pub fn remaining(&self) -> usize {
        self.stages.len() - self.index
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.remaining())
            .finish_non_exhaustive()
    }
}
