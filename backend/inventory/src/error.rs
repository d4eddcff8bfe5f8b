use std::path::PathBuf;

use skuforge_core::PipelineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("failed to read inventory {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("inventory {path} has no SKU column (header: {header})")]
    MissingSkuColumn { path: PathBuf, header: String },

    #[error("failed to encode inventory: {0}")]
    Encode(String),

    #[error("failed to write inventory {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<InventoryError> for PipelineError {
    fn from(err: InventoryError) -> Self {
        PipelineError::Inventory(err.to_string())
    }
}
