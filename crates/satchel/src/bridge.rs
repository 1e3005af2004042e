//! The Bridge: unified client API over the two channel capabilities.
//!
//! A bridge owns the call channel, the event channel, and the one
//! change router for this process, and speaks exactly one wire
//! generation, fixed at construction.

use std::sync::Arc;

use satchel_channel::{CallChannel, EventChannel, Subscription};
use satchel_client::{ChangeRouter, LazyStore, RemoteHandle, StoreProxy};
use satchel_core::{
    ChangeNotice, HostRequest, HostResponse, StoreId, StoreOptions, WireError, WireGeneration,
    CHANGE_TOPIC,
};

use crate::error::Result;

/// Configuration for a [`Bridge`].
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Which historical wire contract the host speaks.
    pub generation: WireGeneration,
    /// The change topic. Hosts publish on [`CHANGE_TOPIC`] unless
    /// configured otherwise.
    pub change_topic: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            generation: WireGeneration::HandleAddressed,
            change_topic: CHANGE_TOPIC.to_string(),
        }
    }
}

impl BridgeConfig {
    /// A legacy-generation configuration.
    pub fn legacy() -> Self {
        Self {
            generation: WireGeneration::PathAddressed,
            ..Self::default()
        }
    }
}

/// The main client entry point.
///
/// Provides:
/// - eager and lazy store opening
/// - lookup of already-created stores
/// - store- and key-scoped change subscriptions
pub struct Bridge {
    call: Arc<dyn CallChannel>,
    router: ChangeRouter,
    generation: WireGeneration,
}

impl Bridge {
    /// Create a bridge over the two channels.
    pub fn new(
        call: Arc<dyn CallChannel>,
        events: Arc<dyn EventChannel>,
        config: BridgeConfig,
    ) -> Self {
        let router =
            ChangeRouter::new(events, config.generation).with_topic(config.change_topic.clone());
        Self {
            call,
            router,
            generation: config.generation,
        }
    }

    /// The wire generation this bridge speaks.
    pub fn generation(&self) -> WireGeneration {
        self.generation
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Store Access
    // ─────────────────────────────────────────────────────────────────────────

    /// Open (or create) the store at `path` now, with one round trip.
    ///
    /// Under the current generation the returned proxy owns a resource
    /// handle; the caller must [`close`](StoreProxy::close) it on every
    /// exit path or the host-side slot leaks until teardown.
    pub async fn open(&self, path: impl Into<String>, options: StoreOptions) -> Result<StoreProxy> {
        let path = path.into();
        tracing::debug!(%path, generation = ?self.generation, "opening store");
        match self.generation {
            WireGeneration::PathAddressed => {
                let response = self
                    .call
                    .call(HostRequest::Load {
                        path: path.clone(),
                        options,
                    })
                    .await?;
                match response {
                    HostResponse::Ok => Ok(StoreProxy::for_path(Arc::clone(&self.call), path)),
                    other => Err(WireError::UnexpectedResponse {
                        expected: "ok",
                        got: other.kind(),
                    }
                    .into()),
                }
            }
            WireGeneration::HandleAddressed => {
                let handle = RemoteHandle::acquire(Arc::clone(&self.call), path, options).await?;
                Ok(StoreProxy::for_handle(handle))
            }
        }
    }

    /// Wrap `path` without touching the host; the store is created on
    /// the wrapper's first operation, single-flight.
    pub fn lazy(&self, path: impl Into<String>, options: StoreOptions) -> LazyStore {
        LazyStore::new(Arc::clone(&self.call), self.generation, path, options)
    }

    /// Look up an already-created store without creating one.
    ///
    /// Returns `None` if the host has no live instance for `path`.
    /// This is a current-generation operation; a legacy host rejects it
    /// and that rejection surfaces unmodified.
    pub async fn existing(&self, path: impl Into<String>) -> Result<Option<StoreProxy>> {
        let response = self
            .call
            .call(HostRequest::GetStore { path: path.into() })
            .await?;
        match response {
            HostResponse::MaybeHandle(Some(rid)) => {
                let handle = RemoteHandle::adopt(Arc::clone(&self.call), rid);
                Ok(Some(StoreProxy::for_handle(handle)))
            }
            HostResponse::MaybeHandle(None) => Ok(None),
            other => Err(WireError::UnexpectedResponse {
                expected: "maybe_handle",
                got: other.kind(),
            }
            .into()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Change Subscriptions
    // ─────────────────────────────────────────────────────────────────────────

    /// Subscribe to every change of one store.
    pub fn watch_store<F>(&self, store: StoreId, callback: F) -> Subscription
    where
        F: Fn(&ChangeNotice) + Send + Sync + 'static,
    {
        self.router.watch_store(store, callback)
    }

    /// Subscribe to changes of one key of one store.
    pub fn watch_key<F>(&self, store: StoreId, key: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&ChangeNotice) + Send + Sync + 'static,
    {
        self.router.watch_key(store, key, callback)
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("generation", &self.generation)
            .finish()
    }
}
