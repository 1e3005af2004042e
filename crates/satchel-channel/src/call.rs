//! The call channel: the request/response seam to the host engine.
//!
//! Implementations may sit on any transport. The client issues exactly
//! one `call` per store operation and treats the channel as a black box.

use async_trait::async_trait;

use satchel_core::{HostRequest, HostResponse};

use crate::error::Result;

/// Asynchronous request/response channel to the host engine.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait CallChannel: Send + Sync {
    /// Issue one request and await the host's response.
    ///
    /// Fails with [`ChannelError::Unreachable`](crate::ChannelError::Unreachable)
    /// if the host cannot be reached, or
    /// [`ChannelError::Rejected`](crate::ChannelError::Rejected) with the
    /// host's own message if the host refuses the request.
    async fn call(&self, request: HostRequest) -> Result<HostResponse>;
}
