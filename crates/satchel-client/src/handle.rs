//! Remote resource handles: client-side ownership of a host-side store slot.
//!
//! Acquiring a handle consumes a resource slot in the host process. The
//! slot is freed only by [`RemoteHandle::release`]; a handle dropped
//! without release leaks its slot until host teardown. Callers must
//! release on every exit path, including error paths.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use satchel_channel::CallChannel;
use satchel_core::{HostRequest, HostResponse, ResourceId, StoreId, StoreOptions, WireError};

use crate::error::{ClientError, Result};

/// A reference to a live store instance in the host process.
///
/// Cheaply cloneable; all clones share one released flag. After
/// `release` is initiated, every operation through any clone fails
/// locally with [`ClientError::UseAfterClose`].
#[derive(Clone)]
pub struct RemoteHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    rid: ResourceId,
    channel: Arc<dyn CallChannel>,
    released: AtomicBool,
}

impl RemoteHandle {
    /// Open (or create) the store at `path` and take ownership of the
    /// returned resource slot.
    ///
    /// One `Load` round trip. Transport failures and host rejections
    /// surface unmodified.
    pub async fn acquire(
        channel: Arc<dyn CallChannel>,
        path: impl Into<String>,
        options: StoreOptions,
    ) -> Result<Self> {
        let response = channel
            .call(HostRequest::Load {
                path: path.into(),
                options,
            })
            .await?;

        match response {
            HostResponse::Handle(rid) => {
                tracing::debug!(%rid, "acquired store handle");
                Ok(Self {
                    inner: Arc::new(HandleInner {
                        rid,
                        channel,
                        released: AtomicBool::new(false),
                    }),
                })
            }
            other => Err(WireError::UnexpectedResponse {
                expected: "handle",
                got: other.kind(),
            }
            .into()),
        }
    }

    /// Take ownership of a resource id the host already issued, e.g.
    /// from a `get_store` lookup of an existing instance.
    ///
    /// The same release obligation applies as for
    /// [`acquire`](Self::acquire).
    pub fn adopt(channel: Arc<dyn CallChannel>, rid: ResourceId) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                rid,
                channel,
                released: AtomicBool::new(false),
            }),
        }
    }

    /// The host-assigned resource id.
    pub fn rid(&self) -> ResourceId {
        self.inner.rid
    }

    /// This handle's store identity.
    pub fn store_id(&self) -> StoreId {
        StoreId::handle(self.inner.rid)
    }

    /// Whether release has been initiated.
    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::Acquire)
    }

    /// Fail fast if the handle was released.
    pub(crate) fn ensure_live(&self) -> Result<()> {
        if self.is_released() {
            Err(ClientError::UseAfterClose)
        } else {
            Ok(())
        }
    }

    /// The channel this handle was acquired on.
    pub(crate) fn channel(&self) -> &Arc<dyn CallChannel> {
        &self.inner.channel
    }

    /// Free the host-side slot.
    ///
    /// Idempotent: the second and later calls return `Ok` without a
    /// round trip. The handle counts as released as soon as the first
    /// call starts — even if the `Close` round trip then fails, the
    /// handle must not be reused, and the failure is surfaced.
    pub async fn release(&self) -> Result<()> {
        if self.inner.released.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        tracing::debug!(rid = %self.inner.rid, "releasing store handle");
        self.inner
            .channel
            .call(HostRequest::Close {
                rid: self.inner.rid,
            })
            .await?;
        Ok(())
    }
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        // Release is async and cannot run here.
        if !self.released.load(Ordering::Acquire) {
            tracing::warn!(
                rid = %self.rid,
                "store handle dropped without release; host-side slot leaks until teardown"
            );
        }
    }
}

impl std::fmt::Debug for RemoteHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteHandle")
            .field("rid", &self.inner.rid)
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedChannel;

    #[tokio::test]
    async fn test_acquire_and_release() {
        let channel = ScriptedChannel::new(vec![
            HostResponse::Handle(ResourceId::from_raw(1)),
            HostResponse::Ok,
        ]);

        let handle = RemoteHandle::acquire(channel.clone_arc(), "settings.json", StoreOptions::new())
            .await
            .unwrap();
        assert_eq!(handle.rid(), ResourceId::from_raw(1));
        assert!(!handle.is_released());

        handle.release().await.unwrap();
        assert!(handle.is_released());
        assert_eq!(channel.ops(), vec!["load", "close"]);
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let channel = ScriptedChannel::new(vec![
            HostResponse::Handle(ResourceId::from_raw(2)),
            HostResponse::Ok,
        ]);

        let handle = RemoteHandle::acquire(channel.clone_arc(), "s.json", StoreOptions::new())
            .await
            .unwrap();
        handle.release().await.unwrap();
        handle.release().await.unwrap();

        // Only one close went out.
        assert_eq!(channel.ops(), vec!["load", "close"]);
    }

    #[tokio::test]
    async fn test_release_shared_across_clones() {
        let channel = ScriptedChannel::new(vec![
            HostResponse::Handle(ResourceId::from_raw(3)),
            HostResponse::Ok,
        ]);

        let handle = RemoteHandle::acquire(channel.clone_arc(), "s.json", StoreOptions::new())
            .await
            .unwrap();
        let clone = handle.clone();
        handle.release().await.unwrap();

        assert!(clone.is_released());
        assert!(matches!(
            clone.ensure_live(),
            Err(ClientError::UseAfterClose)
        ));
    }

    #[tokio::test]
    async fn test_acquire_rejects_wrong_shape() {
        let channel = ScriptedChannel::new(vec![HostResponse::Ok]);
        let err = RemoteHandle::acquire(channel.clone_arc(), "s.json", StoreOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Wire(_)));
    }
}
