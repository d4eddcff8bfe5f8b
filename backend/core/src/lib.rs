pub mod error;
pub mod traits;
pub mod types;

pub use error::PipelineError;
pub use traits::{ImagePayload, ModelError, VisionModel, VisionRequest};
pub use types::{Field, ImageBatch, ProductRecord, UNKNOWN};
