//! Async stream that decodes event-stream bytes into envelopes.

use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_core::Stream;
use pin_project_lite::pin_project;
use umcp_types::Envelope;

use crate::decoder::{Decoded, FrameDecoder};
use crate::error::CodecError;

pin_project! {
    /// An async stream of [`Envelope`]s read from a reply body.
    ///
    /// Ends after the terminal frame. If the byte stream closes first, the
    /// last item is [`CodecError::StreamTruncated`].
    pub struct FrameStream<S> {
        #[pin]
        inner: S,
        decoder: FrameDecoder,
        ready: VecDeque<Envelope>,
        failed: Option<CodecError>,
        finished: bool,
    }
}

impl<S> FrameStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::new(),
            ready: VecDeque::new(),
            failed: None,
            finished: false,
        }
    }
}

impl<S, E> Stream for FrameStream<S>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    type Item = Result<Envelope, CodecError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(envelope) = this.ready.pop_front() {
                return Poll::Ready(Some(Ok(envelope)));
            }
            if let Some(e) = this.failed.take() {
                return Poll::Ready(Some(Err(e)));
            }
            if *this.finished {
                return Poll::Ready(None);
            }

            let decoded = match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => this.decoder.feed(&chunk),
                Poll::Ready(Some(Err(e))) => {
                    *this.finished = true;
                    return Poll::Ready(Some(Err(CodecError::Transport(e.to_string()))));
                }
                Poll::Ready(None) => {
                    *this.finished = true;
                    this.decoder.finish()
                }
                Poll::Pending => return Poll::Pending,
            };

            match decoded {
                Ok(frames) => {
                    for frame in frames {
                        match frame {
                            Decoded::Message(envelope) => this.ready.push_back(envelope),
                            Decoded::Done => *this.finished = true,
                        }
                    }
                    if let Some(e) = this.decoder.take_error() {
                        *this.finished = true;
                        *this.failed = Some(e);
                    }
                }
                Err(e) => {
                    *this.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use futures_util::stream;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn yields_envelopes_then_ends_at_terminal_frame() {
        let mut s = FrameStream::new(chunks(&[
            "data: {\"jsonrpc\":\"2.0\",\"id\":1,",
            "\"result\":{}}\n\nda",
            "ta: [DONE]\n\n",
        ]));
        let first = s.next().await.unwrap().unwrap();
        assert_eq!(first.id(), Some(&umcp_types::RequestId::from(1)));
        assert!(s.next().await.is_none());
    }

    #[tokio::test]
    async fn truncated_stream_reports_error() {
        let mut s = FrameStream::new(chunks(&["data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n\n"]));
        assert!(s.next().await.unwrap().is_ok());
        let err = s.next().await.unwrap().unwrap_err();
        assert!(matches!(err, CodecError::StreamTruncated));
        assert!(s.next().await.is_none());
    }

    #[tokio::test]
    async fn envelopes_before_a_malformed_frame_are_delivered() {
        let mut s = FrameStream::new(chunks(&[
            "data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n\ndata: {oops}\n\n",
        ]));
        assert!(s.next().await.unwrap().is_ok());
        let err = s.next().await.unwrap().unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
        assert!(s.next().await.is_none());
    }

    #[tokio::test]
    async fn transport_error_is_surfaced() {
        let inner = stream::iter(vec![Err::<Bytes, _>(std::io::Error::other("reset"))]);
        let mut s = FrameStream::new(inner);
        let err = s.next().await.unwrap().unwrap_err();
        assert!(matches!(err, CodecError::Transport(_)));
    }
}
