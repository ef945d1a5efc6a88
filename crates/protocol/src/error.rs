//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while encoding or decoding messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Decode(serde_json::Error),

    #[error("failed to encode message: {0}")]
    Encode(serde_json::Error),
}
