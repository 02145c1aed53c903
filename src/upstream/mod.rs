//! Upstream chat-completion API subsystem.
//!
//! # Data Flow
//! ```text
//! outbound payload + call context (path, credential, user agent)
//!     → client.rs (URL + headers, POST, wait for head)
//!     → 2xx: UpstreamResponse (body streamed by the SSE relay)
//!     → otherwise: error.rs (Connection | Status | Cancelled)
//!
//! status page
//!     → probe.rs (GET endpoint, 1.5 s timeout)
//! ```
//!
//! # Design Decisions
//! - One shared reqwest client (connection pool) per process
//! - Cancellation is an error variant so callers can absorb it silently
//! - No retries

pub mod client;
pub mod error;
pub mod probe;

pub use client::{CallContext, UpstreamClient, UpstreamResponse};
pub use error::UpstreamError;
pub use probe::{ProbeResult, UpstreamProbe};
