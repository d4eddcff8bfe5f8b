//! Request payload encoding with a total-size budget.
//!
//! Images are sent as-is while the batch fits the provider limit. Past the
//! limit, the largest image is downscaled (aspect ratio kept) and
//! re-encoded as JPEG, one step at a time, until the batch fits.

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use skuforge_core::{ImageBatch, ImagePayload, PipelineError};
use tracing::{debug, info};

use crate::mime_detect::detect_mime_type;

/// Size limits applied to one request's images.
#[derive(Debug, Clone)]
pub struct PayloadBudget {
    /// Hard cap on the summed image bytes of one request.
    pub max_total_bytes: usize,
    /// Images are never shrunk below this size on their longest side.
    pub min_dimension: u32,
    /// Scale factor applied per downscale step, in percent.
    pub step_percent: u32,
    pub jpeg_quality: u8,
}

impl Default for PayloadBudget {
    fn default() -> Self {
        Self {
            // Gemini rejects inline request bodies above 20 MB
            max_total_bytes: 18 * 1024 * 1024,
            min_dimension: 256,
            step_percent: 75,
            jpeg_quality: 85,
        }
    }
}

/// Read and encode every image of the batch, in batch order.
pub fn encode_batch(
    batch: &ImageBatch,
    budget: &PayloadBudget,
) -> Result<Vec<ImagePayload>, PipelineError> {
    let mut payloads = Vec::with_capacity(batch.len());
    for (path, file_name) in batch.images().iter().zip(batch.file_names()) {
        let data = std::fs::read(path).map_err(|e| PipelineError::io(path, e))?;
        payloads.push(ImagePayload {
            file_name,
            mime_type: detect_mime_type(path).to_string(),
            data,
        });
    }

    fit_to_budget(batch.folder(), &mut payloads, budget)?;
    Ok(payloads)
}

/// Shrink the largest images until the summed size fits the budget.
///
/// A batch that cannot fit is a folder-level failure, never a run abort.
pub fn fit_to_budget(
    folder: &Path,
    payloads: &mut [ImagePayload],
    budget: &PayloadBudget,
) -> Result<(), PipelineError> {
    let mut total: usize = payloads.iter().map(|p| p.data.len()).sum();
    if total <= budget.max_total_bytes {
        return Ok(());
    }

    info!(
        total_bytes = total,
        limit = budget.max_total_bytes,
        "Image payload over budget, downscaling"
    );

    let mut shrinkable = vec![true; payloads.len()];
    while total > budget.max_total_bytes {
        let Some(index) = largest_shrinkable(payloads, &shrinkable) else {
            return Err(PipelineError::PayloadTooLarge {
                folder: folder.to_path_buf(),
                total,
                limit: budget.max_total_bytes,
            });
        };

        let payload = &mut payloads[index];
        match downscale(&payload.data, budget) {
            Some(smaller) if smaller.len() < payload.data.len() => {
                debug!(
                    file = %payload.file_name,
                    before = payload.data.len(),
                    after = smaller.len(),
                    "Downscaled image"
                );
                total = total - payload.data.len() + smaller.len();
                payload.data = smaller;
                payload.mime_type = "image/jpeg".to_string();
            }
            _ => shrinkable[index] = false,
        }
    }

    Ok(())
}

fn largest_shrinkable(payloads: &[ImagePayload], shrinkable: &[bool]) -> Option<usize> {
    payloads
        .iter()
        .enumerate()
        .filter(|(i, _)| shrinkable[*i])
        // max_by_key keeps the last maximum; reverse so ties pick the first image
        .rev()
        .max_by_key(|(_, p)| p.data.len())
        .map(|(i, _)| i)
}

/// One downscale step. `None` when the image cannot be decoded or is
/// already at the minimum size.
fn downscale(data: &[u8], budget: &PayloadBudget) -> Option<Vec<u8>> {
    let img = image::load_from_memory(data).ok()?;
    let (width, height) = (img.width(), img.height());
    if width.max(height) <= budget.min_dimension {
        return None;
    }

    let new_width = (width * budget.step_percent / 100).max(1);
    let new_height = (height * budget.step_percent / 100).max(1);
    let resized = img.resize(new_width, new_height, FilterType::Lanczos3);

    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, budget.jpeg_quality);
    resized.to_rgb8().write_with_encoder(encoder).ok()?;
    Some(buffer.into_inner())
}
