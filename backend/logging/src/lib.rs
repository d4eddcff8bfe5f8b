//! Structured logging for skuforge runs.
//!
//! Handles subscriber setup (console plus optional rolling NDJSON file),
//! secret redaction, and per-folder run events.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EventLogEntry, RunEvent, RunEventLogger};
pub use logger::{LogSettings, init_logger};
pub use redact::redact_sensitive_data;
