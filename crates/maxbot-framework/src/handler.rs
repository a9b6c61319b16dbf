//! Handler system.
//!
//! Handlers are plain async functions whose parameters implement
//! [`FromContext`]. The [`Handler`] trait is implemented for every such
//! function of up to eight parameters, in the same way Axum does it.
//!
//! # Example
//!
//! ```rust,ignore
//! // No parameters
//! async fn ping() {}
//!
//! // Extractors
//! async fn echo(message: Message, api: Api) -> Result<(), BoxError> {
//!     let chat_id = message.chat_id().unwrap_or_default();
//!     api.call(ApiRequest::post("messages").query("chat_id", chat_id)).await?;
//!     Ok(())
//! }
//!
//! // The raw context
//! async fn stop(ctx: Arc<UpdateContext>) {
//!     ctx.stop();
//! }
//! ```
//!
//! A handler whose extractor fails is skipped for that update. A handler that
//! returns `Err` aborts the remaining handlers and the error travels back
//! through the middleware pipeline to its caller.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::trace;

use crate::context::UpdateContext;
use crate::error::{BoxError, HandlerResult};
use crate::extractor::FromContext;

// ============================================================================
// IntoHandlerResult - Handler return values
// ============================================================================

/// A type that can be returned from a handler.
pub trait IntoHandlerResult: Send {
    fn into_handler_result(self) -> HandlerResult;
}

impl IntoHandlerResult for () {
    fn into_handler_result(self) -> HandlerResult {
        Ok(())
    }
}

impl<E> IntoHandlerResult for Result<(), E>
where
    E: Into<BoxError> + Send,
{
    fn into_handler_result(self) -> HandlerResult {
        self.map_err(Into::into)
    }
}

// ============================================================================
// Handler Trait
// ============================================================================

/// The core trait for update handlers.
///
/// Implemented automatically for async functions that take 0-8 parameters
/// implementing [`FromContext`] and return a type implementing
/// [`IntoHandlerResult`].
#[async_trait]
pub trait Handler<T>: Clone + Send + Sync + 'static {
    /// Calls the handler with the given context.
    async fn call(self, ctx: Arc<UpdateContext>) -> HandlerResult;
}

// ============================================================================
// BoxedHandler - Type-erased handler stored in collections
// ============================================================================

/// A type-erased handler.
///
/// Internally a closure that captures the original handler and calls a clone
/// of it on each invocation.
pub type BoxedHandler =
    Arc<dyn Fn(Arc<UpdateContext>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Converts a handler function into a boxed handler.
pub fn into_handler<F, T>(f: F) -> BoxedHandler
where
    F: Handler<T>,
    T: 'static,
{
    Arc::new(move |ctx| f.clone().call(ctx))
}

// ============================================================================
// Handler implementations for functions (Axum-style)
// ============================================================================

macro_rules! impl_handler {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case, unused_variables)]
        #[async_trait]
        impl<F, Fut, Res, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = Res> + Send + 'static,
            Res: IntoHandlerResult + 'static,
            $( $ty: FromContext + Send + 'static, )*
        {
            async fn call(self, ctx: Arc<UpdateContext>) -> HandlerResult {
                $(
                    let $ty = match $ty::from_context(&ctx) {
                        Ok(value) => value,
                        Err(e) => {
                            trace!(error = %e, "Extractor rejected update, skipping handler");
                            return Ok(());
                        }
                    };
                )*

                (self)($($ty,)*).await.into_handler_result()
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);
