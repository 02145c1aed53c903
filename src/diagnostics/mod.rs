//! Diagnostics subsystem.
//!
//! # Data Flow
//! ```text
//! request handler
//!     → state.rs (record RequestSummary, mark success/failure)
//!
//! GET / or /status
//!     → state.rs (snapshot) + upstream probe
//!     → status_page.rs (HTML)
//! ```
//!
//! # Design Decisions
//! - Shared via Arc; atomics for scalars, a mutex for the log
//! - Log is bounded by `diagnostics.request_log_capacity`
//! - Credentials are masked before they are stored

pub mod state;
pub mod status_page;

pub use state::{mask_credential, DiagnosticsState, LastOutcome, RequestSummary};
pub use status_page::{render_status_page, StatusView};
