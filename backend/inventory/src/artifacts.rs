//! Per-SKU output files.
//!
//! Layout under the output directory:
//!
//! ```text
//! <out>/<SKU>/<SKU>_description.json
//! <out>/<SKU>/<SKU>_description.txt
//! <out>/<SKU>/<SKU>_raw.txt          (when raw responses are kept)
//! <out>/<SKU>/<image files>          (when images are copied)
//! <out>/_failed/<folder>_raw.txt     (unparsable responses)
//! ```

use std::path::{Path, PathBuf};

use skuforge_core::{ImageBatch, PipelineError, ProductRecord};
use tracing::{debug, info, warn};

use crate::fsutil::write_atomic;

/// Directory holding raw responses that could not be parsed.
pub const FAILED_DIR: &str = "_failed";

/// Files written for one SKU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifacts {
    pub sku: String,
    pub sku_dir: PathBuf,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    out_dir: PathBuf,
    keep_raw: bool,
    copy_images: bool,
}

impl ArtifactWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            keep_raw: false,
            copy_images: false,
        }
    }

    pub fn keep_raw_responses(mut self, keep: bool) -> Self {
        self.keep_raw = keep;
        self
    }

    pub fn copy_images(mut self, copy: bool) -> Self {
        self.copy_images = copy;
        self
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn sku_dir(&self, sku: &str) -> PathBuf {
        self.out_dir.join(sku)
    }

    /// Write the description files for `record`. Rewriting the same record
    /// produces byte-identical files.
    pub fn write_description(
        &self,
        record: &ProductRecord,
        raw: &str,
    ) -> Result<WrittenArtifacts, PipelineError> {
        let sku = record.sku();
        let sku_dir = self.sku_dir(sku);
        let mut files = Vec::new();

        let json_path = sku_dir.join(format!("{sku}_description.json"));
        let mut json = serde_json::to_string_pretty(record)
            .map_err(|e| PipelineError::Fatal(format!("cannot serialize record {sku}: {e}")))?;
        json.push('\n');
        write_file(&json_path, json.as_bytes())?;
        files.push(json_path);

        let txt_path = sku_dir.join(format!("{sku}_description.txt"));
        write_file(&txt_path, render_text(record).as_bytes())?;
        files.push(txt_path);

        if self.keep_raw {
            let raw_path = sku_dir.join(format!("{sku}_raw.txt"));
            write_file(&raw_path, raw.as_bytes())?;
            files.push(raw_path);
        }

        info!(sku, dir = %sku_dir.display(), files = files.len(), "Wrote description");
        Ok(WrittenArtifacts {
            sku: sku.to_string(),
            sku_dir,
            files,
        })
    }

    /// Copy the batch images next to the description, when enabled.
    pub fn copy_batch_images(
        &self,
        sku: &str,
        batch: &ImageBatch,
    ) -> Result<Vec<PathBuf>, PipelineError> {
        if !self.copy_images {
            return Ok(Vec::new());
        }

        let sku_dir = self.sku_dir(sku);
        if same_dir(&sku_dir, batch.folder()) {
            debug!(sku, "Images already live in the output folder");
            return Ok(Vec::new());
        }
        std::fs::create_dir_all(&sku_dir).map_err(|e| PipelineError::io(&sku_dir, e))?;

        let mut copied = Vec::with_capacity(batch.len());
        for (src, name) in batch.images().iter().zip(batch.file_names()) {
            let dest = sku_dir.join(name);
            std::fs::copy(src, &dest).map_err(|e| PipelineError::io(src, e))?;
            copied.push(dest);
        }
        debug!(sku, count = copied.len(), "Copied images");
        Ok(copied)
    }

    /// Keep an unparsable response for later inspection.
    pub fn preserve_failed_response(
        &self,
        folder_name: &str,
        raw: &str,
    ) -> Result<PathBuf, PipelineError> {
        let path = self
            .out_dir
            .join(FAILED_DIR)
            .join(format!("{folder_name}_raw.txt"));
        write_file(&path, raw.as_bytes())?;
        warn!(folder = folder_name, path = %path.display(), "Preserved unparsable response");
        Ok(path)
    }
}

/// `Label: value` lines in canonical order.
pub fn render_text(record: &ProductRecord) -> String {
    record
        .iter()
        .map(|(field, value)| format!("{}: {}\n", field.label(), value))
        .collect()
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    write_atomic(path, bytes).map_err(|e| PipelineError::io(path, e))
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skuforge_core::Field;

    fn record() -> ProductRecord {
        let mut r = ProductRecord::new("CHANEL_BOY_BLACK_JK0145");
        r.set(Field::Brand, "Chanel");
        r.set(Field::Color, "Black");
        r
    }

    #[test]
    fn writes_json_and_text_with_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path());

        let written = writer.write_description(&record(), "raw").unwrap();
        assert_eq!(written.files.len(), 2);
        assert_eq!(written.sku_dir, dir.path().join("CHANEL_BOY_BLACK_JK0145"));

        let json = std::fs::read_to_string(&written.files[0]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_object().unwrap().len(), Field::ALL.len());
        assert_eq!(value["brand"], "Chanel");
        assert_eq!(value["size"], "Unknown");
        assert!(json.find("\"sku\"").unwrap() < json.find("\"notes\"").unwrap());

        let text = std::fs::read_to_string(&written.files[1]).unwrap();
        assert!(text.starts_with("SKU: CHANEL_BOY_BLACK_JK0145\nBrand: Chanel\n"));
        assert!(text.ends_with("Notes: Unknown\n"));
        assert_eq!(text.lines().count(), Field::ALL.len());
    }

    #[test]
    fn rewrite_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path()).keep_raw_responses(true);

        let first = writer.write_description(&record(), "{\"brand\": \"chanel\"}").unwrap();
        let before: Vec<Vec<u8>> = first.files.iter().map(|f| std::fs::read(f).unwrap()).collect();
        let second = writer.write_description(&record(), "{\"brand\": \"chanel\"}").unwrap();
        let after: Vec<Vec<u8>> = second.files.iter().map(|f| std::fs::read(f).unwrap()).collect();

        assert_eq!(first, second);
        assert_eq!(before, after);
        assert!(second.files[2].ends_with("CHANEL_BOY_BLACK_JK0145_raw.txt"));
    }

    #[test]
    fn failed_responses_go_to_the_failed_folder() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let path = writer.preserve_failed_response("BAG_01", "no idea").unwrap();
        assert_eq!(path, dir.path().join("_failed").join("BAG_01_raw.txt"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "no idea");
    }

    #[test]
    fn copies_images_only_when_enabled() {
        let input = tempfile::tempdir().unwrap();
        std::fs::write(input.path().join("1.jpg"), b"img").unwrap();
        let batch = ImageBatch::new(input.path(), "SKU1", vec![input.path().join("1.jpg")]).unwrap();
        let out = tempfile::tempdir().unwrap();

        let off = ArtifactWriter::new(out.path());
        assert!(off.copy_batch_images("SKU1", &batch).unwrap().is_empty());

        let on = ArtifactWriter::new(out.path()).copy_images(true);
        let copied = on.copy_batch_images("SKU1", &batch).unwrap();
        assert_eq!(copied, vec![out.path().join("SKU1").join("1.jpg")]);
        assert_eq!(std::fs::read(&copied[0]).unwrap(), b"img");
    }
}
