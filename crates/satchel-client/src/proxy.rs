//! The store proxy: one call-channel round trip per operation.
//!
//! A proxy addresses the host by exactly one scheme for its whole
//! lifetime: by path (legacy generation) or through a [`RemoteHandle`]
//! (current generation). The two are never mixed. The proxy performs no
//! retries and no caching; every operation is one round trip whose
//! result, including any host error, goes straight back to the caller.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use satchel_channel::CallChannel;
use satchel_core::{HostRequest, HostResponse, Lookup, StoreId, WireError};

use crate::error::{ClientError, Result};
use crate::handle::RemoteHandle;

enum Addressing {
    /// Legacy generation: every request carries the path.
    Path { channel: Arc<dyn CallChannel>, path: String },
    /// Current generation: requests carry the handle's resource id.
    Handle(RemoteHandle),
}

/// The callable surface of one remote store instance.
pub struct StoreProxy {
    addressing: Addressing,
}

impl StoreProxy {
    /// A path-addressed proxy (legacy generation). The store should
    /// already have been loaded host-side.
    pub fn for_path(channel: Arc<dyn CallChannel>, path: impl Into<String>) -> Self {
        Self {
            addressing: Addressing::Path {
                channel,
                path: path.into(),
            },
        }
    }

    /// A handle-addressed proxy (current generation) over an acquired
    /// handle.
    pub fn for_handle(handle: RemoteHandle) -> Self {
        Self {
            addressing: Addressing::Handle(handle),
        }
    }

    /// This proxy's store identity.
    pub fn store_id(&self) -> StoreId {
        match &self.addressing {
            Addressing::Path { path, .. } => StoreId::path(path.clone()),
            Addressing::Handle(handle) => handle.store_id(),
        }
    }

    /// The active identity, failing fast on a released handle.
    fn target(&self) -> Result<StoreId> {
        match &self.addressing {
            Addressing::Path { path, .. } => Ok(StoreId::path(path.clone())),
            Addressing::Handle(handle) => {
                handle.ensure_live()?;
                Ok(handle.store_id())
            }
        }
    }

    async fn call(&self, request: HostRequest) -> Result<HostResponse> {
        let channel = match &self.addressing {
            Addressing::Path { channel, .. } => channel,
            Addressing::Handle(handle) => handle.channel(),
        };
        Ok(channel.call(request).await?)
    }

    /// Insert or overwrite a key.
    pub async fn set(&self, key: impl Into<String>, value: JsonValue) -> Result<()> {
        let store = self.target()?;
        expect_ok(self.call(HostRequest::Set { store, key: key.into(), value }).await?)
    }

    /// Look a key up, preserving the present-null vs. absent distinction.
    pub async fn get(&self, key: impl Into<String>) -> Result<Lookup> {
        let store = self.target()?;
        match self.call(HostRequest::Get { store, key: key.into() }).await? {
            HostResponse::Lookup(wire) => Ok(wire.decode()),
            other => Err(unexpected("lookup", other)),
        }
    }

    /// Whether a key exists.
    pub async fn has(&self, key: impl Into<String>) -> Result<bool> {
        let store = self.target()?;
        expect_flag(self.call(HostRequest::Has { store, key: key.into() }).await?)
    }

    /// Remove a key. Returns true iff a key was removed.
    pub async fn delete(&self, key: impl Into<String>) -> Result<bool> {
        let store = self.target()?;
        expect_flag(self.call(HostRequest::Delete { store, key: key.into() }).await?)
    }

    /// Remove all entries. Does not restore defaults.
    pub async fn clear(&self) -> Result<()> {
        let store = self.target()?;
        expect_ok(self.call(HostRequest::Clear { store }).await?)
    }

    /// Restore configured default values. Observationally identical to
    /// [`clear`](Self::clear) when the host has no defaults for this
    /// store, but a distinct operation on the wire.
    pub async fn reset(&self) -> Result<()> {
        let store = self.target()?;
        expect_ok(self.call(HostRequest::Reset { store }).await?)
    }

    /// Keys snapshot at call time. No consistency guarantee with any
    /// other call.
    pub async fn keys(&self) -> Result<Vec<String>> {
        let store = self.target()?;
        match self.call(HostRequest::Keys { store }).await? {
            HostResponse::Keys(keys) => Ok(keys),
            other => Err(unexpected("keys", other)),
        }
    }

    /// Values snapshot at call time.
    pub async fn values(&self) -> Result<Vec<JsonValue>> {
        let store = self.target()?;
        match self.call(HostRequest::Values { store }).await? {
            HostResponse::Values(values) => Ok(values),
            other => Err(unexpected("values", other)),
        }
    }

    /// Entries snapshot at call time.
    pub async fn entries(&self) -> Result<Vec<(String, JsonValue)>> {
        let store = self.target()?;
        match self.call(HostRequest::Entries { store }).await? {
            HostResponse::Entries(entries) => Ok(entries),
            other => Err(unexpected("entries", other)),
        }
    }

    /// Number of entries.
    pub async fn length(&self) -> Result<u64> {
        let store = self.target()?;
        match self.call(HostRequest::Length { store }).await? {
            HostResponse::Length(len) => Ok(len),
            other => Err(unexpected("length", other)),
        }
    }

    /// Replace in-memory state from the host's on-disk state. The host
    /// publishes no change notifications for this.
    pub async fn reload(&self) -> Result<()> {
        let store = self.target()?;
        expect_ok(self.call(HostRequest::Reload { store }).await?)
    }

    /// Flush in-memory state to backing storage. Mutations are not
    /// durable until this (or host-driven autosave) completes.
    pub async fn save(&self) -> Result<()> {
        let store = self.target()?;
        expect_ok(self.call(HostRequest::Save { store }).await?)
    }

    /// Release the underlying resource handle.
    ///
    /// Only handle-addressed proxies hold one; on a path-addressed
    /// proxy this fails with [`ClientError::NoHandle`].
    pub async fn close(&self) -> Result<()> {
        match &self.addressing {
            Addressing::Path { .. } => Err(ClientError::NoHandle),
            Addressing::Handle(handle) => handle.release().await,
        }
    }
}

impl std::fmt::Debug for StoreProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreProxy")
            .field("store", &self.store_id())
            .finish()
    }
}

fn unexpected(expected: &'static str, got: HostResponse) -> ClientError {
    WireError::UnexpectedResponse {
        expected,
        got: got.kind(),
    }
    .into()
}

fn expect_ok(response: HostResponse) -> Result<()> {
    match response {
        HostResponse::Ok => Ok(()),
        other => Err(unexpected("ok", other)),
    }
}

fn expect_flag(response: HostResponse) -> Result<bool> {
    match response {
        HostResponse::Flag(flag) => Ok(flag),
        other => Err(unexpected("flag", other)),
    }
}
