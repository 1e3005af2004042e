//! Lazy store wrapper: defer creation to first use, single-flight.
//!
//! The one correctness property here: however many operations race on
//! first use, the host sees at most one creation call per wrapper
//! instance. The slot is locked across the creation round trip, so
//! concurrent callers queue on the lock and find the proxy already in
//! place.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tokio::sync::Mutex;

use satchel_channel::CallChannel;
use satchel_core::{
    HostRequest, HostResponse, Lookup, StoreOptions, WireError, WireGeneration,
};

use crate::error::Result;
use crate::handle::RemoteHandle;
use crate::proxy::StoreProxy;

/// A store that is created on first operation.
///
/// After [`close`](Self::close) the wrapper is reusable: the slot is
/// cleared and the next operation re-creates the store. A failed
/// creation is not cached either — the next operation retries.
///
/// The options are forwarded on whichever creation call actually runs.
/// If another client already created the same identity with different
/// options, the host's existing instance wins; that race is host-side
/// and not detectable here.
pub struct LazyStore {
    channel: Arc<dyn CallChannel>,
    generation: WireGeneration,
    path: String,
    options: StoreOptions,
    slot: Mutex<Option<Arc<StoreProxy>>>,
}

impl LazyStore {
    /// Wrap `path` without touching the host.
    pub fn new(
        channel: Arc<dyn CallChannel>,
        generation: WireGeneration,
        path: impl Into<String>,
        options: StoreOptions,
    ) -> Self {
        Self {
            channel,
            generation,
            path: path.into(),
            options,
            slot: Mutex::new(None),
        }
    }

    /// The wrapped path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the proxy, creating the store on first use.
    async fn acquire(&self) -> Result<Arc<StoreProxy>> {
        let mut slot = self.slot.lock().await;
        if let Some(proxy) = slot.as_ref() {
            return Ok(Arc::clone(proxy));
        }

        let proxy = match self.generation {
            WireGeneration::PathAddressed => {
                let response = self
                    .channel
                    .call(HostRequest::Load {
                        path: self.path.clone(),
                        options: self.options.clone(),
                    })
                    .await?;
                match response {
                    HostResponse::Ok => {
                        StoreProxy::for_path(Arc::clone(&self.channel), self.path.clone())
                    }
                    other => {
                        return Err(WireError::UnexpectedResponse {
                            expected: "ok",
                            got: other.kind(),
                        }
                        .into())
                    }
                }
            }
            WireGeneration::HandleAddressed => {
                let handle = RemoteHandle::acquire(
                    Arc::clone(&self.channel),
                    self.path.clone(),
                    self.options.clone(),
                )
                .await?;
                StoreProxy::for_handle(handle)
            }
        };

        let proxy = Arc::new(proxy);
        *slot = Some(Arc::clone(&proxy));
        Ok(proxy)
    }

    /// Insert or overwrite a key.
    pub async fn set(&self, key: impl Into<String>, value: JsonValue) -> Result<()> {
        self.acquire().await?.set(key, value).await
    }

    /// Look a key up, preserving the present-null vs. absent distinction.
    pub async fn get(&self, key: impl Into<String>) -> Result<Lookup> {
        self.acquire().await?.get(key).await
    }

    /// Whether a key exists.
    pub async fn has(&self, key: impl Into<String>) -> Result<bool> {
        self.acquire().await?.has(key).await
    }

    /// Remove a key. Returns true iff a key was removed.
    pub async fn delete(&self, key: impl Into<String>) -> Result<bool> {
        self.acquire().await?.delete(key).await
    }

    /// Remove all entries.
    pub async fn clear(&self) -> Result<()> {
        self.acquire().await?.clear().await
    }

    /// Restore configured default values.
    pub async fn reset(&self) -> Result<()> {
        self.acquire().await?.reset().await
    }

    /// Keys snapshot at call time.
    pub async fn keys(&self) -> Result<Vec<String>> {
        self.acquire().await?.keys().await
    }

    /// Values snapshot at call time.
    pub async fn values(&self) -> Result<Vec<JsonValue>> {
        self.acquire().await?.values().await
    }

    /// Entries snapshot at call time.
    pub async fn entries(&self) -> Result<Vec<(String, JsonValue)>> {
        self.acquire().await?.entries().await
    }

    /// Number of entries.
    pub async fn length(&self) -> Result<u64> {
        self.acquire().await?.length().await
    }

    /// Replace in-memory state from disk. Publishes no changes.
    pub async fn reload(&self) -> Result<()> {
        self.acquire().await?.reload().await
    }

    /// Flush in-memory state to backing storage.
    pub async fn save(&self) -> Result<()> {
        self.acquire().await?.save().await
    }

    /// Close the store and clear the slot.
    ///
    /// Under the current generation this releases the resource handle.
    /// Under the legacy generation there is no handle; the slot is
    /// simply cleared. Either way the next operation re-creates the
    /// store. Closing a never-created wrapper is a no-op.
    pub async fn close(&self) -> Result<()> {
        let taken = self.slot.lock().await.take();
        match (taken, self.generation) {
            (Some(proxy), WireGeneration::HandleAddressed) => proxy.close().await,
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for LazyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyStore")
            .field("path", &self.path)
            .field("generation", &self.generation)
            .finish()
    }
}
