//! Upstream SSE body → downstream response.
//!
//! # Responsibilities
//! - Pull chunks from the upstream body until it ends, fails, or the
//!   downstream consumer disappears
//! - Reassemble lines across chunk boundaries and apply the line policy
//! - Write each surviving line as its own frame
//!
//! # Design Decisions
//! - Explicit pull loop; every await races the cancellation token and the
//!   sink's closed signal, so a disconnect stops the loop without another
//!   upstream read
//! - The body is owned by the relay and dropped on every exit path, which
//!   aborts the upstream connection when the relay stops early
//! - Read errors end the stream quietly: headers are already committed

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::observability::metrics;
use crate::sse::line::{render, LineBuffer};
use crate::sse::sink::{EventSink, SinkClosed};

/// Line counts for one relay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub forwarded: u64,
    pub dropped: u64,
}

/// How a relay run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Upstream body ended normally.
    Completed(RelayStats),
    /// Downstream went away (or the token was cancelled); not an error.
    Cancelled(RelayStats),
    /// Reading the upstream body failed.
    Failed { error: String, stats: RelayStats },
}

impl RelayOutcome {
    pub fn stats(&self) -> RelayStats {
        match self {
            RelayOutcome::Completed(stats) | RelayOutcome::Cancelled(stats) => *stats,
            RelayOutcome::Failed { stats, .. } => *stats,
        }
    }
}

/// Stream `body` into `sink` until one side is done.
///
/// Cancels `cancel` when it notices the downstream is gone, so anything else
/// holding the token observes the disconnect too.
pub async fn relay<S, E>(body: S, sink: EventSink, cancel: CancellationToken) -> RelayOutcome
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::fmt::Display,
{
    let mut body = std::pin::pin!(body);
    let mut lines = LineBuffer::new();
    let mut stats = RelayStats::default();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return RelayOutcome::Cancelled(stats),
            _ = sink.closed() => {
                cancel.cancel();
                return RelayOutcome::Cancelled(stats);
            }
            next = body.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                lines.push(&chunk);
                while let Some(line) = lines.next_line() {
                    if emit(&sink, &cancel, &line, &mut stats).await.is_err() {
                        cancel.cancel();
                        return RelayOutcome::Cancelled(stats);
                    }
                }
            }
            Some(Err(e)) => {
                tracing::warn!(
                    error = %e,
                    forwarded = stats.forwarded,
                    "Error reading upstream stream; closing downstream response"
                );
                return RelayOutcome::Failed {
                    error: e.to_string(),
                    stats,
                };
            }
            None => {
                if let Some(line) = lines.finish() {
                    if emit(&sink, &cancel, &line, &mut stats).await.is_err() {
                        cancel.cancel();
                        return RelayOutcome::Cancelled(stats);
                    }
                }
                return RelayOutcome::Completed(stats);
            }
        }
    }
}

async fn emit(
    sink: &EventSink,
    cancel: &CancellationToken,
    line: &str,
    stats: &mut RelayStats,
) -> Result<(), SinkClosed> {
    let Some(text) = render(line) else {
        stats.dropped += 1;
        metrics::record_sse_line("dropped");
        return Ok(());
    };

    let frame = Bytes::from(text.into_owned());
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SinkClosed),
        sent = sink.send(frame) => {
            sent?;
            stats.forwarded += 1;
            metrics::record_sse_line("forwarded");
            Ok(())
        }
    }
}
