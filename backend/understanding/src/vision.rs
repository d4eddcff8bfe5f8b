//! Vision providers: describe an image batch using a remote multimodal LLM.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::Deserialize;
use skuforge_core::{ModelError, VisionModel, VisionRequest};
use tracing::{debug, info, warn};

use crate::mock::MockVisionModel;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Supported vision providers, by configuration name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
    Mock,
}

impl ProviderKind {
    pub fn parse(name: &str) -> Result<Self, ModelError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" | "openai-compatible" => Ok(Self::OpenAi),
            "mock" => Ok(Self::Mock),
            other => Err(ModelError::Fatal(format!("unsupported model provider '{other}'"))),
        }
    }
}

/// Build a provider from configuration. Missing keys are fatal.
pub fn build_provider(
    kind: ProviderKind,
    api_key: Option<&str>,
    base_url: Option<&str>,
) -> Result<Arc<dyn VisionModel>, ModelError> {
    let require_key = || {
        api_key
            .filter(|k| !k.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| ModelError::Fatal("model API key is not configured".to_string()))
    };

    let provider: Arc<dyn VisionModel> = match kind {
        ProviderKind::Gemini => {
            let mut p = GeminiVision::new(require_key()?);
            if let Some(url) = base_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        }
        ProviderKind::OpenAi => {
            let mut p = OpenAiVision::new(require_key()?);
            if let Some(url) = base_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        }
        ProviderKind::Mock => Arc::new(MockVisionModel::default()),
    };
    Ok(provider)
}

/// Map a reqwest failure onto the retry taxonomy.
fn classify_transport(err: reqwest::Error) -> ModelError {
    if err.is_builder() {
        ModelError::Fatal(format!("malformed request: {err}"))
    } else {
        ModelError::Transient(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Gemini
// ---------------------------------------------------------------------------

/// Google Gemini `generateContent` provider with inline image data.
pub struct GeminiVision {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiVision {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn body(request: &VisionRequest) -> serde_json::Value {
        let mut parts = vec![serde_json::json!({ "text": request.prompt })];
        for image in &request.images {
            parts.push(serde_json::json!({
                "inlineData": { "mimeType": image.mime_type, "data": STANDARD.encode(&image.data) }
            }));
        }
        serde_json::json!({ "contents": [{ "parts": parts }] })
    }
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[async_trait]
impl VisionModel for GeminiVision {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn describe(&self, request: &VisionRequest) -> Result<String, ModelError> {
        let start = Instant::now();
        info!(
            model = %request.model,
            images = request.images.len(),
            payload_bytes = request.payload_bytes(),
            "[Vision] Describing batch via Gemini"
        );

        let url = format!("{}/models/{}:generateContent", self.base_url, request.model);
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::body(request))
            .send()
            .await
            .map_err(classify_transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ModelError::from_status(status.as_u16(), &body));
        }

        let parsed: GeminiResponse = resp
            .json()
            .await
            .map_err(|e| ModelError::Transient(format!("unreadable Gemini response: {e}")))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            warn!("[Vision] Gemini returned no text candidates");
        }
        debug!(latency_ms = start.elapsed().as_millis() as u64, "Gemini call finished");
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible chat completions
// ---------------------------------------------------------------------------

/// OpenAI-compatible chat completions provider with data-URL images.
pub struct OpenAiVision {
    client: Client,
    api_key: String,
    base_url: String,
    max_tokens: u32,
}

impl OpenAiVision {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: OPENAI_BASE_URL.to_string(),
            max_tokens: 2048,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn body(&self, request: &VisionRequest) -> serde_json::Value {
        let mut content = vec![serde_json::json!({ "type": "text", "text": request.prompt })];
        for image in &request.images {
            content.push(serde_json::json!({
                "type": "image_url",
                "image_url": {
                    "url": format!("data:{};base64,{}", image.mime_type, STANDARD.encode(&image.data))
                }
            }));
        }
        serde_json::json!({
            "model": request.model,
            "messages": [{ "role": "user", "content": content }],
            "max_tokens": self.max_tokens,
            "temperature": 0.0
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl VisionModel for OpenAiVision {
    fn name(&self) -> &str {
        "openai"
    }

    async fn describe(&self, request: &VisionRequest) -> Result<String, ModelError> {
        info!(
            model = %request.model,
            images = request.images.len(),
            "[Vision] Describing batch via OpenAI-compatible API"
        );

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.body(request))
            .send()
            .await
            .map_err(classify_transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ModelError::from_status(status.as_u16(), &body));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ModelError::Transient(format!("unreadable chat response: {e}")))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skuforge_core::ImagePayload;

    fn request() -> VisionRequest {
        VisionRequest {
            model: "gemini-2.5-flash".into(),
            prompt: "describe".into(),
            images: vec![ImagePayload {
                file_name: "1.jpg".into(),
                mime_type: "image/jpeg".into(),
                data: vec![1, 2, 3],
            }],
        }
    }

    #[test]
    fn parses_provider_names() {
        assert_eq!(ProviderKind::parse("Gemini").unwrap(), ProviderKind::Gemini);
        assert_eq!(ProviderKind::parse("openai").unwrap(), ProviderKind::OpenAi);
        assert!(matches!(ProviderKind::parse("claude"), Err(ModelError::Fatal(_))));
    }

    #[test]
    fn missing_key_is_fatal() {
        let err = build_provider(ProviderKind::Gemini, None, None).err().unwrap();
        assert!(!err.is_transient());
        assert!(build_provider(ProviderKind::Mock, None, None).is_ok());
    }

    #[test]
    fn gemini_body_inlines_images_after_prompt() {
        let body = GeminiVision::body(&request());
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "describe");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[1]["inlineData"]["data"], "AQID");
    }

    #[test]
    fn openai_body_uses_data_urls() {
        let body = OpenAiVision::new("sk-test").body(&request());
        let content = &body["messages"][0]["content"];
        assert_eq!(content[1]["image_url"]["url"], "data:image/jpeg;base64,AQID");
        assert_eq!(body["model"], "gemini-2.5-flash");
    }
}
