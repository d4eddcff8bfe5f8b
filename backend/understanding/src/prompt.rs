//! Prompt builder for product listing requests.
//!
//! The prompt text is a pure function of the batch file names, the SKU hint
//! and the configured extra context, so golden tests can pin it exactly.

use skuforge_core::ImageBatch;

/// Fixed instruction template. `{sku_hint}`, `{image_count}` and
/// `{image_list}` are substituted per request.
pub const LISTING_PROMPT_TEMPLATE: &str = r#"Analyze these product images and produce a product listing.

Reference SKU: {sku_hint}
Images provided: {image_count} ({image_list})

Respond with ONLY one JSON object inside a ```json fenced block, with exactly these keys:
{
  "sku": "The reference SKU above, unless the images clearly show a different stock code",
  "brand": "Brand name, e.g. Chanel, Louis Vuitton, Hermes, Gucci",
  "model": "Model or line name, e.g. Boy, Classic Flap, Speedy, Birkin",
  "material": "Main material, e.g. lambskin leather, canvas, cotton",
  "color": "Main color, e.g. black, beige, red, brown",
  "size": "Size class (mini, small, medium, large) with measurements in inches if visible",
  "year": "Year of production if identifiable",
  "condition": "Condition grade as a percentage, e.g. 85%",
  "price_estimate": "Recommended selling price in GBP for this condition",
  "reference_number": "Serial, date code or reference number if legible",
  "notes": "Observations about exterior, interior, hardware, and any accessories"
}

Guidance:
- Condition reflects visible wear only: scuffs, corner rubbing, creasing, hardware scratches, interior marks. 100% means unused.
- Estimate the price from typical resale prices for this model in comparable condition, in GBP.
- If a field cannot be determined from the images, use the value "Unknown". Never omit a key and never leave a value empty.
- If JSON is impossible, reply with one "key: value" line per field using the same keys."#;

/// Builds the instruction payload for one image batch.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    extra_context: Option<String>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Free-form context appended after the fixed template (e.g. seller notes).
    pub fn with_extra_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.extra_context = if context.trim().is_empty() {
            None
        } else {
            Some(context.trim().to_string())
        };
        self
    }

    pub fn build(&self, batch: &ImageBatch, sku_hint: &str) -> String {
        let mut prompt = LISTING_PROMPT_TEMPLATE
            .replace("{sku_hint}", sku_hint)
            .replace("{image_count}", &batch.len().to_string())
            .replace("{image_list}", &batch.file_names().join(", "));

        if let Some(context) = &self.extra_context {
            prompt.push_str("\n\nAdditional context from the seller:\n");
            prompt.push_str(context);
        }
        prompt
    }
}

/// Build the prompt with no extra context.
pub fn build_prompt(batch: &ImageBatch, sku_hint: &str) -> String {
    PromptBuilder::new().build(batch, sku_hint)
}
