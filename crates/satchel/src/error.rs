//! Error types for the Bridge.

use thiserror::Error;

use satchel_channel::ChannelError;
use satchel_client::ClientError;
use satchel_core::WireError;

/// Errors that can occur during Bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Client-layer error (includes channel and wire errors raised
    /// through a proxy).
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// Channel error raised directly by the bridge.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Wire-shape error raised directly by the bridge.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),
}

/// Result type for Bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
