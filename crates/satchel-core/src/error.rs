//! Error types for the Satchel core.

use thiserror::Error;

/// Errors raised while encoding or decoding wire shapes.
#[derive(Debug, Error)]
pub enum WireError {
    /// A change-topic payload did not match the active generation's shape.
    #[error("malformed change payload: {0}")]
    MalformedPayload(String),

    /// The host answered a request with the wrong response variant.
    #[error("unexpected response: expected {expected}, got {got}")]
    UnexpectedResponse {
        expected: &'static str,
        got: &'static str,
    },
}
