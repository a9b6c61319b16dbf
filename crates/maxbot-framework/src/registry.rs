//! Handler registry.
//!
//! Maps each [`UpdateType`] to the handlers registered for it. Registration
//! appends; invocation runs the handlers in registration order, one after the
//! other, and stops at the first error.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::trace;

use maxbot_core::UpdateType;

use crate::context::UpdateContext;
use crate::error::HandlerResult;
use crate::handler::BoxedHandler;

/// Ordered handler lists keyed by update type.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<UpdateType, Vec<BoxedHandler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler for `update_type`.
    pub fn register(&mut self, update_type: UpdateType, handler: BoxedHandler) {
        self.handlers.entry(update_type).or_default().push(handler);
    }

    /// Returns the handlers registered for `update_type`, in order.
    pub fn handlers_for(&self, update_type: UpdateType) -> &[BoxedHandler] {
        self.handlers
            .get(&update_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns every update type with at least one handler.
    pub fn registered_types(&self) -> Vec<UpdateType> {
        self.handlers
            .iter()
            .filter(|(_, handlers)| !handlers.is_empty())
            .map(|(update_type, _)| *update_type)
            .collect()
    }

    /// Returns the total number of handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    /// Returns true if no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handler_count() == 0
    }

    /// Runs the handlers registered for the context's update type.
    ///
    /// The handler list is copied before the returned future starts, so the
    /// registry may change while the handlers run. An update type without
    /// handlers is a no-op.
    pub fn invoke(&self, ctx: Arc<UpdateContext>) -> BoxFuture<'static, HandlerResult> {
        let update_type = ctx.update().update_type;
        let handlers = self.handlers_for(update_type).to_vec();

        Box::pin(async move {
            if handlers.is_empty() {
                trace!(update_type = %update_type, "No handlers registered");
                return Ok(());
            }

            for (index, handler) in handlers.iter().enumerate() {
                trace!(update_type = %update_type, index, "Invoking handler");
                handler(Arc::clone(&ctx)).await?;
            }
            Ok(())
        })
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("types", &self.registered_types())
            .field("handler_count", &self.handler_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::handler::into_handler;
    use crate::testing::{context_for, text_update};
    use maxbot_core::Update;
    use parking_lot::Mutex;

    fn push(log: &Arc<Mutex<Vec<u32>>>, n: u32) -> BoxedHandler {
        let log = log.clone();
        into_handler(move || {
            let log = log.clone();
            async move {
                log.lock().push(n);
            }
        })
    }

    #[tokio::test]
    async fn test_invocation_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        registry.register(UpdateType::MessageCreated, push(&log, 1));
        registry.register(UpdateType::MessageCreated, push(&log, 2));
        registry.register(UpdateType::BotStarted, push(&log, 3));
        registry.register(UpdateType::MessageCreated, push(&log, 4));

        registry
            .invoke(Arc::new(context_for(text_update("x"))))
            .await
            .unwrap();
        assert_eq!(*log.lock(), vec![1, 2, 4]);
        assert_eq!(
            registry.registered_types(),
            vec![UpdateType::MessageCreated, UpdateType::BotStarted]
        );
    }

    #[tokio::test]
    async fn test_no_handlers_is_noop() {
        let registry = HandlerRegistry::new();
        let ctx = Arc::new(context_for(Update::new(UpdateType::DialogMuted, 1)));
        tokio_test::assert_ok!(registry.invoke(ctx).await);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_error_aborts_remaining() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        registry.register(UpdateType::MessageCreated, push(&log, 1));
        registry.register(
            UpdateType::MessageCreated,
            into_handler(|| async { Err::<(), BoxError>("handler failed".into()) }),
        );
        registry.register(UpdateType::MessageCreated, push(&log, 3));

        let err = registry
            .invoke(Arc::new(context_for(text_update("x"))))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "handler failed");
        assert_eq!(*log.lock(), vec![1]);
    }
}
