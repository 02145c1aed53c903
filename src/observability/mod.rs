//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields (request_id, path, status) instead of formatted strings
//! - Request ID flows from the inbound request to the upstream call
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
