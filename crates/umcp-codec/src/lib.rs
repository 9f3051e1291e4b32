//! Event-stream framing for MCP envelopes.
//!
//! Each reply is a sequence of `data: <json>` frames separated by blank lines
//! and closed by the sentinel frame `data: [DONE]`.

mod decoder;
mod error;
mod frame;
mod stream;

pub use decoder::{Decoded, FrameDecoder, decode_all};
pub use error::CodecError;
pub use frame::{DONE_MARKER, TERMINAL_FRAME, encode_frame, encode_reply};
pub use stream::FrameStream;
