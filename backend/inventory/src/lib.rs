//! Inventory aggregation and output files.

pub mod artifacts;
pub mod error;
pub mod fsutil;
pub mod store;
pub mod table;

pub use artifacts::{ArtifactWriter, WrittenArtifacts, FAILED_DIR};
pub use error::InventoryError;
pub use store::{InventoryStore, DEFAULT_INVENTORY_FILE};
pub use table::InventoryTable;
