use std::path::PathBuf;

use serde::Serialize;
use skuforge_core::PipelineError;

/// Why one folder did not make it into the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderFailure {
    pub folder: PathBuf,
    pub kind: String,
    pub reason: String,
}

impl FolderFailure {
    pub fn new(folder: impl Into<PathBuf>, err: &PipelineError) -> Self {
        Self {
            folder: folder.into(),
            kind: err.kind().to_string(),
            reason: err.to_string(),
        }
    }
}

/// Outcome counts of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Skipped and failed folders, in processing order.
    pub failures: Vec<FolderFailure>,
    /// The error that stopped the run early, if any.
    pub aborted: Option<FolderFailure>,
    pub exported: usize,
    pub export_failures: usize,
}

impl RunSummary {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            ..Self::default()
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    pub(crate) fn record_skip(&mut self, failure: FolderFailure) {
        self.skipped += 1;
        self.failures.push(failure);
    }

    pub(crate) fn record_failure(&mut self, failure: FolderFailure) {
        self.failed += 1;
        self.failures.push(failure);
    }

    pub(crate) fn record_abort(&mut self, failure: FolderFailure) {
        self.record_failure(failure.clone());
        self.aborted = Some(failure);
    }
}
