//! Server-Sent-Events relay subsystem.
//!
//! # Data Flow
//! ```text
//! upstream body (byte chunks, arbitrary boundaries)
//!     → line.rs (LineBuffer: reassemble lines; render: per-line policy)
//!     → relay.rs (pull loop, cancellation, outcome)
//!     → sink.rs (bounded channel → streaming response body)
//!     → downstream client
//! ```
//!
//! # Line Policy
//! - blank line → `\n` (event boundary preserved)
//! - `data: [DONE]` → `data: [DONE]\n\n`
//! - `data:` with empty payload → dropped
//! - `data:` JSON with `"choices": []` → dropped (keepalive chunks)
//! - everything else → forwarded unchanged

pub mod line;
pub mod relay;
pub mod sink;

pub use line::{render, DataPayload, LineBuffer, SseLine, DONE_EVENT};
pub use relay::{relay, RelayOutcome, RelayStats};
pub use sink::{EventSink, SinkClosed};
