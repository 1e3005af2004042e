//! The event channel: the publish/subscribe seam for change notifications.
//!
//! Every message published on a topic reaches every current subscriber,
//! in publish order, at most once per subscriber per publish. The
//! in-memory bus here is the test implementation; production channels
//! sit on whatever eventing primitive the host bridge provides.

use std::sync::Arc;

use serde_json::Value as JsonValue;

/// A subscriber callback. Invoked once per delivered payload.
pub type EventHandler = Arc<dyn Fn(&JsonValue) + Send + Sync>;

/// Publish/subscribe channel for host-originated notifications.
///
/// Registration is synchronous from the caller's view; delivery happens
/// later, per published message.
pub trait EventChannel: Send + Sync {
    /// Register a handler on a topic. The handler runs for every
    /// message published while the returned [`Subscription`] is live.
    fn subscribe(&self, topic: &str, handler: EventHandler) -> Subscription;
}

/// A live registration on an event topic.
///
/// Unsubscribing is idempotent and also happens on drop, so holding the
/// guard scopes the registration. After `unsubscribe` returns, the
/// handler will not run for messages published strictly afterwards;
/// a delivery already in progress may still complete.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wrap a cancel action. Channel implementations call this.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Deregister the handler. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("live", &self.cancel.is_some())
            .finish()
    }
}

/// A simple in-memory event bus for testing.
///
/// Delivery is synchronous in `publish`, in registration order.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{RwLock, Weak};

    /// In-memory implementation of [`EventChannel`].
    pub struct MemoryBus {
        self_ref: Weak<MemoryBus>,
        inner: RwLock<BusInner>,
    }

    #[derive(Default)]
    struct BusInner {
        next_id: u64,
        topics: HashMap<String, Vec<(u64, EventHandler)>>,
    }

    impl MemoryBus {
        /// Create a new bus.
        pub fn new() -> Arc<Self> {
            Arc::new_cyclic(|me| Self {
                self_ref: me.clone(),
                inner: RwLock::new(BusInner::default()),
            })
        }

        /// Publish a payload to every current subscriber of `topic`.
        ///
        /// Handlers are snapshotted before invocation, so a handler may
        /// subscribe or unsubscribe without deadlocking the bus.
        pub fn publish(&self, topic: &str, payload: &JsonValue) {
            let handlers: Vec<EventHandler> = {
                let inner = self.inner.read().expect("bus lock poisoned");
                inner
                    .topics
                    .get(topic)
                    .map(|subs| subs.iter().map(|(_, h)| Arc::clone(h)).collect())
                    .unwrap_or_default()
            };

            for handler in handlers {
                handler(payload);
            }
        }
    }

    impl EventChannel for MemoryBus {
        fn subscribe(&self, topic: &str, handler: EventHandler) -> Subscription {
            let id = {
                let mut inner = self.inner.write().expect("bus lock poisoned");
                let id = inner.next_id;
                inner.next_id += 1;
                inner
                    .topics
                    .entry(topic.to_string())
                    .or_default()
                    .push((id, handler));
                id
            };

            let bus = self.self_ref.clone();
            let topic = topic.to_string();
            Subscription::new(move || {
                if let Some(bus) = bus.upgrade() {
                    let mut inner = bus.inner.write().expect("bus lock poisoned");
                    if let Some(subs) = inner.topics.get_mut(&topic) {
                        subs.retain(|(sub_id, _)| *sub_id != id);
                    }
                }
            })
        }
    }
}
