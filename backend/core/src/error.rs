use std::path::PathBuf;

use thiserror::Error;

/// Error taxonomy for one pipeline run.
///
/// Folder-level errors skip the folder and let the run continue;
/// run-level errors (see [`PipelineError::is_run_fatal`]) abort it.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no supported images found in {}", folder.display())]
    EmptyFolder { folder: PathBuf },

    #[error("model unavailable after {attempts} attempt(s): {message}")]
    Transient { attempts: u32, message: String },

    #[error("fatal model error: {0}")]
    Fatal(String),

    #[error(
        "images in {} total {total} bytes and cannot be reduced below the {limit} byte limit",
        folder.display()
    )]
    PayloadTooLarge {
        folder: PathBuf,
        total: usize,
        limit: usize,
    },

    #[error("model response could not be parsed ({} bytes)", raw.len())]
    UnparsableResponse { raw: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("inventory error: {0}")]
    Inventory(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must abort the whole run instead of one folder.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::Fatal(_) | PipelineError::Inventory(_) | PipelineError::Config(_)
        )
    }

    /// Short stable name used in logs and run summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::EmptyFolder { .. } => "empty_folder",
            PipelineError::Transient { .. } => "transient",
            PipelineError::Fatal(_) => "fatal",
            PipelineError::PayloadTooLarge { .. } => "payload_too_large",
            PipelineError::UnparsableResponse { .. } => "unparsable_response",
            PipelineError::Io { .. } => "io",
            PipelineError::Inventory(_) => "inventory",
            PipelineError::Config(_) => "config",
        }
    }
}
