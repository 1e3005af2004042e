//! Error types for the client layer.

use thiserror::Error;

use satchel_channel::ChannelError;
use satchel_core::WireError;

/// Errors that can occur during client operations.
///
/// Host-reported errors pass through [`ClientError::Channel`] unchanged;
/// this layer performs no retries and no rewriting. Locally detectable
/// misuse gets its own variant so it cannot be mistaken for a transport
/// failure.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure or host rejection, verbatim from the channel.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// The host answered with a shape this operation does not expect.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// An operation was issued through a handle that was already
    /// released. Detected locally; never forwarded to the host.
    #[error("operation on a released store handle")]
    UseAfterClose,

    /// `close` was called on a path-addressed store, which holds no
    /// host-side resource slot.
    #[error("path-addressed store has no handle to close")]
    NoHandle,
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
