//! Incremental frame decoder (client side).
//!
//! Bytes may arrive in arbitrary chunks. Complete lines are processed as soon
//! as they are available; a blank line dispatches the data lines collected so
//! far as one event. The event carrying `[DONE]` ends the reply.

use bytes::{Buf, BytesMut};
use umcp_types::Envelope;

use crate::error::CodecError;
use crate::frame::DONE_MARKER;

/// One decoded unit of a reply stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Message(Envelope),
    Done,
}

/// Incremental decoder that turns event-stream bytes into envelopes.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
    data_lines: Vec<String>,
    done: bool,
    held: Option<CodecError>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the terminal frame has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed a chunk of bytes and return every frame it completed.
    ///
    /// An empty vector means the frame in progress is still incomplete. When
    /// a malformed frame follows good ones in the same chunk, the good frames
    /// are returned and the error is held until [`take_error`](Self::take_error),
    /// the next `feed` or [`finish`](Self::finish).
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Decoded>, CodecError> {
        if let Some(e) = self.held.take() {
            return Err(e);
        }
        if self.done {
            return Ok(Vec::new());
        }
        self.buffer.extend_from_slice(chunk);

        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.split_to(pos);
            self.buffer.advance(1);
            if let Err(e) = self.process_line(&line, &mut out) {
                if out.is_empty() {
                    return Err(e);
                }
                self.held = Some(e);
                break;
            }
            if self.done {
                self.buffer.clear();
                break;
            }
        }
        Ok(out)
    }

    /// Signal end of input.
    ///
    /// A trailing unterminated line or event is flushed first. Fails with
    /// [`CodecError::StreamTruncated`] if the terminal frame never arrived.
    pub fn finish(&mut self) -> Result<Vec<Decoded>, CodecError> {
        if let Some(e) = self.held.take() {
            return Err(e);
        }
        let mut out = Vec::new();
        if !self.done && !self.buffer.is_empty() {
            let line = self.buffer.split();
            self.process_line(&line, &mut out)?;
        }
        if !self.done {
            self.dispatch(&mut out)?;
        }
        if self.done {
            Ok(out)
        } else {
            Err(CodecError::StreamTruncated)
        }
    }

    /// Take the error held back by the last [`feed`](Self::feed), if any.
    pub fn take_error(&mut self) -> Option<CodecError> {
        self.held.take()
    }

    fn process_line(&mut self, raw: &[u8], out: &mut Vec<Decoded>) -> Result<(), CodecError> {
        let line = std::str::from_utf8(raw).map_err(|e| CodecError::Malformed {
            reason: format!("invalid UTF-8: {e}"),
        })?;
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.is_empty() {
            return self.dispatch(out);
        }
        if line.starts_with(':') {
            return Ok(());
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => self.data_lines.push(value.to_string()),
            // event, id, retry and unknown fields carry nothing we need
            other => tracing::trace!("Ignoring event-stream field '{other}'"),
        }
        Ok(())
    }

    fn dispatch(&mut self, out: &mut Vec<Decoded>) -> Result<(), CodecError> {
        if self.data_lines.is_empty() {
            return Ok(());
        }
        let data = self.data_lines.join("\n");
        self.data_lines.clear();

        let data = data.trim();
        if data == DONE_MARKER {
            self.done = true;
            out.push(Decoded::Done);
            return Ok(());
        }
        if data.is_empty() {
            return Ok(());
        }

        let envelope: Envelope =
            serde_json::from_str(data).map_err(|e| CodecError::Malformed {
                reason: format!("{e}: {data}"),
            })?;
        out.push(Decoded::Message(envelope));
        Ok(())
    }
}

/// Decode a complete reply body into its envelopes.
pub fn decode_all(body: &[u8]) -> Result<Vec<Envelope>, CodecError> {
    let mut decoder = FrameDecoder::new();
    let mut frames = decoder.feed(body)?;
    frames.extend(decoder.finish()?);
    Ok(frames
        .into_iter()
        .filter_map(|frame| match frame {
            Decoded::Message(envelope) => Some(envelope),
            Decoded::Done => None,
        })
        .collect())
}
