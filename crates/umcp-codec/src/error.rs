//! Codec error types.

use thiserror::Error;

/// Errors from encoding or decoding event-stream frames.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Malformed frame: {reason}")]
    Malformed { reason: String },

    #[error("Stream ended before the terminal frame")]
    StreamTruncated,

    #[error("Transport error while reading stream: {0}")]
    Transport(String),
}
