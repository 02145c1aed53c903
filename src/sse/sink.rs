//! Downstream side of a relay.
//!
//! The HTTP response body is fed from a bounded channel. Each write is one
//! body frame, so hyper flushes it as soon as it is polled; the bound gives
//! backpressure when the client reads slowly. When the client goes away,
//! hyper drops the body, the receiver closes, and every pending or future
//! write on the sink fails.

use std::io;

use axum::body::Body;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Frames buffered between the relay and hyper.
const SINK_CAPACITY: usize = 16;

/// The downstream consumer is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("downstream consumer closed")]
pub struct SinkClosed;

/// Write half of a streaming response body.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<Result<Bytes, io::Error>>,
}

impl EventSink {
    /// Create a sink together with the response body it feeds.
    pub fn channel() -> (Self, Body) {
        let (sink, rx) = Self::with_receiver(SINK_CAPACITY);
        (sink, Body::from_stream(ReceiverStream::new(rx)))
    }

    /// Create a sink with a raw receiver, for callers that consume frames
    /// themselves.
    pub fn with_receiver(
        capacity: usize,
    ) -> (Self, mpsc::Receiver<Result<Bytes, io::Error>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Write one chunk of text, waiting for room in the channel.
    pub async fn send(&self, text: impl Into<Bytes>) -> Result<(), SinkClosed> {
        self.tx.send(Ok(text.into())).await.map_err(|_| SinkClosed)
    }

    /// Resolves once the consumer has gone away.
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}
