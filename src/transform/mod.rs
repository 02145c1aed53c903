//! Request payload transformation.
//!
//! # Data Flow
//! ```text
//! inbound JSON object
//!     → payload.rs (shape detection, system turn, stream = true)
//!     → outbound JSON object (serialized by the upstream client)
//!
//! inbound JSON object
//!     → inspect.rs (model, message count, tool names)
//!     → request log
//! ```
//!
//! # Design Decisions
//! - Payloads stay as ordered `serde_json::Map`s so unknown keys pass through untouched
//! - The transform is total; no business validation beyond JSON well-formedness

pub mod inspect;
pub mod payload;

pub use inspect::PayloadInfo;
pub use payload::{system_message, transform, Payload, Shape, SYSTEM_PROMPT};
