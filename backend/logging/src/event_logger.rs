//! Run Event Logger
//!
//! Structured per-folder events (processed, skipped, failed) and the run
//! summary, emitted through `tracing` under the `run_events` target.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    FolderProcessed {
        folder: String,
        sku: String,
        strategy: String,
        known_fields: usize,
        replaced: bool,
    },
    FolderSkipped {
        folder: String,
        reason: String,
    },
    FolderFailed {
        folder: String,
        kind: String,
        reason: String,
    },
    RunCompleted {
        processed: usize,
        skipped: usize,
        failed: usize,
        aborted: bool,
    },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: RunEvent,
}

impl EventLogEntry {
    /// Build an entry with free-text reasons redacted.
    pub fn new(run_id: &str, mut event: RunEvent) -> Self {
        match &mut event {
            RunEvent::FolderSkipped { reason, .. } | RunEvent::FolderFailed { reason, .. } => {
                *reason = redact_sensitive_data(reason);
            }
            RunEvent::FolderProcessed { .. } | RunEvent::RunCompleted { .. } => {}
        }
        Self {
            run_id: run_id.into(),
            timestamp: Utc::now(),
            event,
        }
    }
}

pub struct RunEventLogger;

impl RunEventLogger {
    pub fn log_event(run_id: &str, event: RunEvent) {
        let entry = EventLogEntry::new(run_id, event);
        match serde_json::to_string(&entry) {
            Ok(json) => info!(target: "run_events", event = %json, "Run event"),
            Err(_) => info!(target: "run_events", event = ?entry, "Run event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_reasons_are_redacted() {
        let entry = EventLogEntry::new(
            "run-1",
            RunEvent::FolderFailed {
                folder: "BAG_01".into(),
                kind: "fatal".into(),
                reason: "HTTP 401 with Bearer abcdef123456".into(),
            },
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event"]["type"], "folder_failed");
        assert_eq!(json["event"]["reason"], "HTTP 401 with [REDACTED_TOKEN]");
        assert_eq!(json["run_id"], "run-1");
    }

    #[test]
    fn summary_event_serializes_counts() {
        let entry = EventLogEntry::new(
            "run-2",
            RunEvent::RunCompleted { processed: 3, skipped: 1, failed: 0, aborted: false },
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event"]["type"], "run_completed");
        assert_eq!(json["event"]["processed"], 3);
    }
}
