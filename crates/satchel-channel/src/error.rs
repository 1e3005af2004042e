//! Error types for the channel seams.

use thiserror::Error;

/// Errors a channel implementation may surface.
///
/// The client layer never retries and never rewrites these; retry and
/// backoff policy, if any, belongs to the channel implementation.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The transport could not reach the host process.
    #[error("host unreachable: {0}")]
    Unreachable(String),

    /// The host received the request and rejected it. The message is
    /// the host's, verbatim.
    #[error("host rejected request: {0}")]
    Rejected(String),
}

/// Result type for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;
