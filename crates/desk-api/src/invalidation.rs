//! Process-wide "session invalidated" broadcast.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Name of the broadcast, kept for hosts that bridge it onto their own
/// event bus.
pub const SESSION_INVALIDATED_EVENT: &str = "auth:unauthorized";

type Handler = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: Vec<(u64, Handler)>,
}

/// Observer list for session invalidation. Shared by every clone of a
/// pipeline.
#[derive(Default)]
pub struct InvalidationHub {
    registry: Mutex<Registry>,
}

impl InvalidationHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a handler. It stays registered until the returned
    /// subscription is dropped.
    pub fn subscribe<F>(self: &Arc<Self>, handler: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.handlers.push((id, Arc::new(handler)));

        Subscription {
            hub: Arc::downgrade(self),
            id,
        }
    }

    /// Invoke every registered handler.
    pub fn notify(&self) {
        // Snapshot so handlers may subscribe or unsubscribe re-entrantly.
        let handlers: Vec<Handler> = self
            .registry
            .lock()
            .handlers
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();

        debug!(
            event = SESSION_INVALIDATED_EVENT,
            handlers = handlers.len(),
            "Broadcasting session invalidation"
        );

        for handler in handlers {
            handler();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().handlers.len()
    }

    fn unsubscribe(&self, id: u64) {
        self.registry
            .lock()
            .handlers
            .retain(|(handler_id, _)| *handler_id != id);
    }
}

/// Registration handle returned by [`InvalidationHub::subscribe`].
/// Dropping it deregisters the handler.
#[must_use = "dropping a Subscription deregisters its handler"]
pub struct Subscription {
    hub: Weak<InvalidationHub>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = count.clone();
        (count, move || {
            handle.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_notify_reaches_every_subscriber() {
        let hub = InvalidationHub::new();
        let (first, first_handler) = counter();
        let (second, second_handler) = counter();
        let _a = hub.subscribe(first_handler);
        let _b = hub.subscribe(second_handler);

        hub.notify();
        hub.notify();

        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(second.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_dropping_subscription_deregisters() {
        let hub = InvalidationHub::new();
        let (count, handler) = counter();
        let subscription = hub.subscribe(handler);
        assert_eq!(hub.subscriber_count(), 1);

        drop(subscription);
        assert_eq!(hub.subscriber_count(), 0);

        hub.notify();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subscription_outliving_hub_is_harmless() {
        let hub = InvalidationHub::new();
        let subscription = hub.subscribe(|| {});
        drop(hub);
        drop(subscription);
    }

    #[test]
    fn test_handler_may_subscribe_during_notify() {
        let hub = InvalidationHub::new();
        let inner_hub = hub.clone();
        let late = Arc::new(Mutex::new(Vec::new()));
        let late_handle = late.clone();
        let _outer = hub.subscribe(move || {
            late_handle.lock().push(inner_hub.subscribe(|| {}));
        });

        hub.notify();
        assert_eq!(hub.subscriber_count(), 2);
    }
}
