//! Change notification demultiplexing.
//!
//! The host publishes every mutation on one shared topic. The router
//! lets many independent subscribers share that broadcast without
//! cross-talk: each registration decodes the payload under the active
//! wire generation and applies its (store, optional key) predicate
//! before the subscriber's callback runs.
//!
//! There is one router per bridge, created with it and torn down with
//! it; the rest of the crate only ever sees the narrow
//! subscribe/unsubscribe capability.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use satchel_channel::{EventChannel, EventHandler, Subscription};
use satchel_core::{ChangeNotice, StoreId, WireGeneration, CHANGE_TOPIC};

/// Demultiplexes the shared change topic into per-subscriber callbacks.
pub struct ChangeRouter {
    events: Arc<dyn EventChannel>,
    generation: WireGeneration,
    topic: String,
}

impl ChangeRouter {
    /// A router over the given event channel, decoding payloads under
    /// `generation`, on the well-known change topic.
    pub fn new(events: Arc<dyn EventChannel>, generation: WireGeneration) -> Self {
        Self {
            events,
            generation,
            topic: CHANGE_TOPIC.to_string(),
        }
    }

    /// Override the change topic.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Subscribe to every change of one store.
    ///
    /// Callbacks fire in the topic's publish order for this subscriber;
    /// no order is guaranteed across subscribers. Dropping or
    /// unsubscribing the returned guard stops delivery for messages
    /// published strictly afterwards.
    pub fn watch_store<F>(&self, store: StoreId, callback: F) -> Subscription
    where
        F: Fn(&ChangeNotice) + Send + Sync + 'static,
    {
        self.register(store, None, callback)
    }

    /// Subscribe to changes of one key of one store.
    ///
    /// The callback never fires for another key or another store, even
    /// though all of it travels the same broadcast topic.
    pub fn watch_key<F>(&self, store: StoreId, key: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&ChangeNotice) + Send + Sync + 'static,
    {
        self.register(store, Some(key.into()), callback)
    }

    fn register<F>(&self, store: StoreId, key: Option<String>, callback: F) -> Subscription
    where
        F: Fn(&ChangeNotice) + Send + Sync + 'static,
    {
        let generation = self.generation;
        let handler: EventHandler = Arc::new(move |payload: &JsonValue| {
            let notice = match ChangeNotice::from_payload(generation, payload) {
                Ok(notice) => notice,
                Err(err) => {
                    tracing::warn!(%err, "dropping undecodable change payload");
                    return;
                }
            };
            if notice.store != store {
                return;
            }
            if let Some(key) = &key {
                if notice.key != *key {
                    return;
                }
            }
            callback(&notice);
        });
        self.events.subscribe(&self.topic, handler)
    }
}

impl std::fmt::Debug for ChangeRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeRouter")
            .field("topic", &self.topic)
            .field("generation", &self.generation)
            .finish()
    }
}
