//! `skuforge inventory`: show the inventory table.

use std::path::{Path, PathBuf};

use anyhow::Result;
use skuforge_config::SkuforgeConfig;
use skuforge_core::{Field, ProductRecord, UNKNOWN};
use skuforge_inventory::InventoryStore;

use crate::run_cmd::{inventory_path, output_dir};
use crate::terminal_output::{self, paint, Column, DIM};

/// Columns shown in the terminal table; the CSV holds every field.
const TABLE_FIELDS: [Field; 7] = [
    Field::Sku,
    Field::Brand,
    Field::Model,
    Field::Color,
    Field::Condition,
    Field::PriceEstimate,
    Field::ReferenceNumber,
];

pub fn run(config: &SkuforgeConfig, output: Option<PathBuf>, json: bool) -> Result<()> {
    let path = inventory_path(config, &output_dir(config, output.as_deref()));
    let table = InventoryStore::new(&path).load()?;

    if json {
        println!("{}", serde_json::to_string_pretty(table.all_records())?);
        return Ok(());
    }
    if table.is_empty() {
        terminal_output::note_info(&format!("Inventory at {} is empty", path.display()));
        return Ok(());
    }

    print!("{}", render(table.all_records()));
    summarize(table.all_records(), &path);
    Ok(())
}

fn render(records: &[ProductRecord]) -> String {
    let mut columns: Vec<Column> = TABLE_FIELDS
        .iter()
        .map(|f| Column::left(f.label()).max_width(28))
        .collect();
    columns.push(Column::right("Known"));

    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|record| {
            let mut row: Vec<String> = TABLE_FIELDS
                .iter()
                .map(|f| match record.get(*f) {
                    UNKNOWN => paint(DIM, UNKNOWN),
                    value => value.to_string(),
                })
                .collect();
            row.push(format!("{}/{}", record.known_count(), Field::ALL.len() - 1));
            row
        })
        .collect();
    terminal_output::render_table(&columns, &rows)
}

fn summarize(records: &[ProductRecord], path: &Path) {
    terminal_output::note_info(&format!("{} product(s) in {}", records.len(), path.display()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal_output::strip_ansi;

    #[test]
    fn renders_one_line_per_record() {
        let mut a = ProductRecord::new("CHANEL_BOY_BLACK_JK0145");
        a.set(Field::Brand, "Chanel");
        a.set(Field::Color, "Black");
        let out = strip_ansi(&render(&[a, ProductRecord::new("B")]));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("Price Estimate"));
        assert!(lines[2].contains("Chanel"));
        assert!(lines[2].ends_with("2/10"));
        assert!(lines[3].ends_with("0/10"));
    }
}
