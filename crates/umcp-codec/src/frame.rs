//! Frame encoding (server side).

use bytes::Bytes;
use umcp_types::Envelope;

use crate::error::CodecError;

/// Prefix of every data line.
pub const DATA_PREFIX: &str = "data:";

/// Payload of the sentinel frame that ends a reply.
pub const DONE_MARKER: &str = "[DONE]";

/// The complete sentinel frame, as written on the wire.
pub const TERMINAL_FRAME: &str = "data: [DONE]\n\n";

/// Encode one envelope as `data: <compact json>\n\n`.
pub fn encode_frame(envelope: &Envelope) -> Result<Bytes, CodecError> {
    let json = serde_json::to_string(envelope)?;
    let mut frame = String::with_capacity(json.len() + 8);
    frame.push_str(DATA_PREFIX);
    frame.push(' ');
    frame.push_str(&json);
    frame.push_str("\n\n");
    Ok(Bytes::from(frame))
}

/// Encode a whole reply: one frame per envelope, then the sentinel frame.
pub fn encode_reply<'a>(
    envelopes: impl IntoIterator<Item = &'a Envelope>,
) -> Result<Vec<Bytes>, CodecError> {
    let mut frames = envelopes
        .into_iter()
        .map(encode_frame)
        .collect::<Result<Vec<_>, _>>()?;
    frames.push(Bytes::from_static(TERMINAL_FRAME.as_bytes()));
    Ok(frames)
}
