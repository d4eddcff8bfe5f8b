use async_trait::async_trait;
use thiserror::Error;

/// Failure of a single model call, classified for the retry policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Network failure, timeout, rate limit or server error. Worth retrying.
    #[error("transient model error: {0}")]
    Transient(String),

    /// Auth failure, malformed request or unknown model. Never retried.
    #[error("fatal model error: {0}")]
    Fatal(String),
}

impl ModelError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ModelError::Transient(_))
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = format!("HTTP {status}: {}", body.trim());
        match status {
            408 | 429 | 500..=599 => ModelError::Transient(message),
            _ => ModelError::Fatal(message),
        }
    }
}

/// One encoded image of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Request to a vision model: one prompt plus the ordered batch images.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub model: String,
    pub prompt: String,
    pub images: Vec<ImagePayload>,
}

impl VisionRequest {
    pub fn payload_bytes(&self) -> usize {
        self.images.iter().map(|i| i.data.len()).sum()
    }
}

/// Trait for remote multimodal models that describe an image batch.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Provider name (e.g., "gemini", "openai").
    fn name(&self) -> &str;

    /// Send the prompt and images, returning the model's raw text.
    async fn describe(&self, request: &VisionRequest) -> Result<String, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_http_statuses() {
        assert!(ModelError::from_status(429, "slow down").is_transient());
        assert!(ModelError::from_status(503, "").is_transient());
        assert!(ModelError::from_status(408, "").is_transient());
        assert!(!ModelError::from_status(401, "bad key").is_transient());
        assert!(!ModelError::from_status(404, "no such model").is_transient());
    }
}
