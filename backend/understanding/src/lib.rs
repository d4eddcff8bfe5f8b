//! Model side of the pipeline: building the listing prompt and calling a
//! vision LLM with bounded retries.

pub mod client;
pub mod mock;
pub mod prompt;
pub mod retry;
pub mod vision;

pub use client::ModelClient;
pub use mock::MockVisionModel;
pub use prompt::{build_prompt, PromptBuilder};
pub use retry::RetryPolicy;
pub use vision::{build_provider, GeminiVision, OpenAiVision, ProviderKind};
