//! Image side of the pipeline: finding a folder's photos and turning them
//! into request payloads that fit the provider's size limit.

pub mod collector;
pub mod encode;
pub mod mime_detect;

pub use collector::{collect_images, default_sku, is_supported_image, list_sku_folders};
pub use encode::{encode_batch, PayloadBudget};
pub use mime_detect::detect_mime_type;
