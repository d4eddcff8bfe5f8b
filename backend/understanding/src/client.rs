//! Model client: encodes a batch, calls the provider with a bounded
//! timeout, and retries transient failures with exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use skuforge_core::{ImageBatch, ImagePayload, ModelError, PipelineError, VisionModel, VisionRequest};
use skuforge_media::{encode_batch, PayloadBudget};
use tracing::{info, warn};

use crate::prompt::PromptBuilder;
use crate::retry::RetryPolicy;

/// Request timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

pub struct ModelClient {
    provider: Arc<dyn VisionModel>,
    model: String,
    retry: RetryPolicy,
    timeout: Duration,
    budget: PayloadBudget,
    max_images: Option<usize>,
}

impl ModelClient {
    pub fn new(provider: Arc<dyn VisionModel>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            retry: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
            budget: PayloadBudget::default(),
            max_images: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_budget(mut self, budget: PayloadBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Send at most `max` images per request (the first ones in batch order).
    pub fn with_max_images(mut self, max: usize) -> Self {
        self.max_images = (max > 0).then_some(max);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Worst-case wall time of one [`ModelClient::describe_batch`] call.
    pub fn max_call_duration(&self) -> Duration {
        self.timeout * self.retry.max_attempts + self.retry.total_backoff()
    }

    /// Apply the configured image cap, keeping the first images in batch order.
    pub fn cap_batch(&self, batch: &ImageBatch) -> ImageBatch {
        let mut capped = batch.clone();
        if let Some(max) = self.max_images {
            let dropped = capped.truncate(max);
            if dropped > 0 {
                warn!(
                    sku = %batch.default_sku(),
                    total = batch.len(),
                    sent = capped.len(),
                    "Batch exceeds image limit, sending the first images only"
                );
            }
        }
        capped
    }

    /// Describe a batch. The prompt is built from the same capped image
    /// list that gets encoded, so both always agree.
    pub async fn describe_batch(
        &self,
        batch: &ImageBatch,
        prompt: &PromptBuilder,
        sku_hint: &str,
    ) -> Result<String, PipelineError> {
        let batch = self.cap_batch(batch);
        let text = prompt.build(&batch, sku_hint);
        let images = encode_batch(&batch, &self.budget)?;
        self.describe_images(&text, images).await
    }

    /// Send the prompt and already-encoded images.
    pub async fn describe_images(
        &self,
        prompt: &str,
        images: Vec<ImagePayload>,
    ) -> Result<String, PipelineError> {
        let request = VisionRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            images,
        };
        self.send_with_retry(&request).await
    }

    async fn send_with_retry(&self, request: &VisionRequest) -> Result<String, PipelineError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(self.timeout, self.provider.describe(request)).await {
                Ok(result) => result,
                Err(_) => Err(ModelError::Transient(format!(
                    "no response within {}s",
                    self.timeout.as_secs()
                ))),
            };

            match outcome {
                Ok(text) => {
                    info!(
                        provider = %self.provider.name(),
                        attempt,
                        response_bytes = text.len(),
                        "Model call succeeded"
                    );
                    return Ok(text);
                }
                Err(ModelError::Fatal(message)) => {
                    warn!(provider = %self.provider.name(), attempt, %message, "Model call failed fatally");
                    return Err(PipelineError::Fatal(message));
                }
                Err(ModelError::Transient(message)) => {
                    if !self.retry.should_retry(attempt) {
                        warn!(attempt, %message, "Model retry policy exhausted");
                        return Err(PipelineError::Transient {
                            attempts: attempt,
                            message,
                        });
                    }
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        attempt,
                        max = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        %message,
                        "Model call failed, will retry"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
