//! Insertion-ordered inventory keyed by SKU.

use std::collections::HashMap;

use skuforge_core::ProductRecord;

/// One row per SKU, kept in first-seen order.
///
/// Re-describing a known SKU replaces its whole row in place; new SKUs
/// are appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryTable {
    rows: Vec<ProductRecord>,
    index: HashMap<String, usize>,
}

impl InventoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from records in order. Later duplicates replace earlier ones.
    pub fn from_records(records: impl IntoIterator<Item = ProductRecord>) -> Self {
        let mut table = Self::new();
        for record in records {
            table.upsert(record);
        }
        table
    }

    /// Insert or replace the row for `record.sku()`. Returns the replaced row.
    pub fn upsert(&mut self, record: ProductRecord) -> Option<ProductRecord> {
        match self.index.get(record.sku()) {
            Some(&pos) => Some(std::mem::replace(&mut self.rows[pos], record)),
            None => {
                self.index.insert(record.sku().to_string(), self.rows.len());
                self.rows.push(record);
                None
            }
        }
    }

    pub fn all_records(&self) -> &[ProductRecord] {
        &self.rows
    }

    pub fn get(&self, sku: &str) -> Option<&ProductRecord> {
        self.index.get(sku).map(|&pos| &self.rows[pos])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skuforge_core::Field;

    fn record(sku: &str, brand: &str) -> ProductRecord {
        let mut r = ProductRecord::new(sku);
        r.set(Field::Brand, brand);
        r
    }

    #[test]
    fn new_skus_append_in_order() {
        let mut table = InventoryTable::new();
        assert!(table.upsert(record("A", "Chanel")).is_none());
        assert!(table.upsert(record("B", "Gucci")).is_none());
        assert!(table.upsert(record("C", "Prada")).is_none());

        let skus: Vec<&str> = table.all_records().iter().map(|r| r.sku()).collect();
        assert_eq!(skus, ["A", "B", "C"]);
    }

    #[test]
    fn known_sku_is_replaced_in_position() {
        let mut table = InventoryTable::from_records([
            record("A", "Chanel"),
            record("B", "Gucci"),
            record("C", "Prada"),
        ]);

        let mut updated = ProductRecord::new("B");
        updated.set(Field::Color, "Black");
        let previous = table.upsert(updated).unwrap();
        assert_eq!(previous.get(Field::Brand), "Gucci");

        assert_eq!(table.len(), 3);
        assert_eq!(table.all_records()[1].sku(), "B");
        // whole-row replacement: the old brand does not survive
        assert_eq!(table.get("B").unwrap().get(Field::Brand), "Unknown");
        assert_eq!(table.get("B").unwrap().get(Field::Color), "Black");
        assert_eq!(table.get("C").unwrap().get(Field::Brand), "Prada");
    }

    #[test]
    fn duplicate_rows_collapse_on_load() {
        let table = InventoryTable::from_records([record("A", "Old"), record("A", "New")]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("A").unwrap().get(Field::Brand), "New");
        assert!(table.get("Z").is_none());
    }
}
