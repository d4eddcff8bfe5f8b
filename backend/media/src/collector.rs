//! Image collector: turns a SKU folder into an ordered [`ImageBatch`].

use std::fs;
use std::path::{Path, PathBuf};

use skuforge_core::{ImageBatch, PipelineError};
use tracing::debug;

/// Extensions accepted as product photos (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "tif", "tiff"];

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// Default SKU for a folder: its final path segment.
pub fn default_sku(folder: &Path) -> String {
    if let Some(name) = folder.file_name() {
        return name.to_string_lossy().into_owned();
    }
    // "." or ".." have no file name of their own
    fs::canonicalize(folder)
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| folder.to_string_lossy().into_owned())
}

/// Collect every supported image directly inside `folder`, sorted by file name.
pub fn collect_images(folder: &Path) -> Result<ImageBatch, PipelineError> {
    let entries = fs::read_dir(folder).map_err(|e| PipelineError::io(folder, e))?;

    let mut images = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::io(folder, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if is_supported_image(&path) {
            images.push(path);
        } else {
            debug!(path = %path.display(), "Skipping unsupported file");
        }
    }

    let batch = ImageBatch::new(folder, default_sku(folder), images)?;
    debug!(
        folder = %folder.display(),
        sku = %batch.default_sku(),
        images = batch.len(),
        "Collected image batch"
    );
    Ok(batch)
}

/// Immediate, non-hidden sub-directories of `root`, sorted by name.
pub fn list_sku_folders(root: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let entries = fs::read_dir(root).map_err(|e| PipelineError::io(root, e))?;

    let mut folders = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::io(root, e))?;
        let path = entry.path();
        let hidden = path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with('.'))
            .unwrap_or(true);
        if path.is_dir() && !hidden {
            folders.push(path);
        }
    }

    skuforge_core::types::sort_by_file_name(&mut folders);
    Ok(folders)
}
