//! Inventory CSV persistence.
//!
//! The header row holds the field labels in canonical order and every
//! following row is one product. Saving rewrites the whole file through a
//! temp file and a rename.

use std::path::{Path, PathBuf};

use skuforge_core::{Field, ProductRecord};
use tracing::{debug, info, warn};

use crate::error::InventoryError;
use crate::fsutil::write_atomic;
use crate::table::InventoryTable;

pub const DEFAULT_INVENTORY_FILE: &str = "inventory.csv";

#[derive(Debug, Clone)]
pub struct InventoryStore {
    path: PathBuf,
}

impl InventoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the table. A missing file is an empty inventory.
    pub fn load(&self) -> Result<InventoryTable, InventoryError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No inventory yet, starting empty");
            return Ok(InventoryTable::new());
        }

        let read_err = |source| InventoryError::Read {
            path: self.path.clone(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(read_err)?;

        let header = reader.headers().map_err(read_err)?.clone();
        if header.iter().all(|h| h.trim().is_empty()) {
            return Ok(InventoryTable::new());
        }

        let columns: Vec<Option<Field>> = header.iter().map(column_field).collect();
        let sku_col = columns
            .iter()
            .position(|c| *c == Some(Field::Sku))
            .ok_or_else(|| InventoryError::MissingSkuColumn {
                path: self.path.clone(),
                header: header.iter().collect::<Vec<_>>().join(","),
            })?;

        let mut table = InventoryTable::new();
        for (line, row) in reader.records().enumerate() {
            let row = row.map_err(read_err)?;
            let sku = row.get(sku_col).map(str::trim).unwrap_or_default();
            if sku.is_empty() {
                warn!(path = %self.path.display(), row = line + 2, "Skipping inventory row without SKU");
                continue;
            }

            let mut record = ProductRecord::new(sku);
            for (value, field) in row.iter().zip(&columns) {
                match field {
                    Some(Field::Sku) | None => {}
                    Some(field) => record.set(*field, value),
                }
            }
            table.upsert(record);
        }

        info!(path = %self.path.display(), rows = table.len(), "Loaded inventory");
        Ok(table)
    }

    /// Render the table as CSV bytes.
    pub fn render(table: &InventoryTable) -> Result<Vec<u8>, InventoryError> {
        let encode_err = |e: csv::Error| InventoryError::Encode(e.to_string());
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(Field::ALL.iter().map(|f| f.label()))
            .map_err(encode_err)?;
        for record in table.all_records() {
            writer.write_record(record.iter().map(|(_, v)| v)).map_err(encode_err)?;
        }
        writer
            .into_inner()
            .map_err(|e| InventoryError::Encode(e.to_string()))
    }

    /// Persist the whole table atomically.
    pub fn save(&self, table: &InventoryTable) -> Result<(), InventoryError> {
        let bytes = Self::render(table)?;
        write_atomic(&self.path, &bytes).map_err(|source| InventoryError::Write {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), rows = table.len(), "Flushed inventory");
        Ok(())
    }
}

/// Header cells match field labels, or machine keys for hand-made files.
fn column_field(header: &str) -> Option<Field> {
    let header = header.trim().trim_start_matches('\u{feff}');
    Field::from_label(header).or_else(|| Field::from_key(header))
}
