//! Per-folder pipeline: collect, describe, parse, record, export.

pub mod export;
pub mod runner;
pub mod summary;

pub use export::{ArtifactSet, DirectoryMirror, ExportQueue, ExportReport, Exporter};
pub use runner::Pipeline;
pub use summary::{FolderFailure, RunSummary};
