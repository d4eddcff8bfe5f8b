use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use skuforge_core::{ModelError, VisionModel, VisionRequest};

/// Reply used when no script is configured (offline runs).
pub const OFFLINE_RESPONSE: &str =
    r#"{"notes": "Generated offline by the mock provider; no model was called."}"#;

/// A scripted vision model for tests and offline runs.
///
/// Replies are taken from the script in order; once the script is empty,
/// the fallback reply is returned for every further call.
pub struct MockVisionModel {
    script: Mutex<VecDeque<Result<String, ModelError>>>,
    fallback: Result<String, ModelError>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl MockVisionModel {
    /// Always reply with `text`.
    pub fn always(text: impl Into<String>) -> Self {
        Self::with_fallback(Ok(text.into()))
    }

    /// Always fail with `error`.
    pub fn failing(error: ModelError) -> Self {
        Self::with_fallback(Err(error))
    }

    /// Play `replies` in order, then keep failing transiently.
    pub fn scripted(replies: Vec<Result<String, ModelError>>) -> Self {
        let mock = Self::with_fallback(Err(ModelError::Transient("mock script exhausted".into())));
        *mock.script.lock().unwrap_or_else(|p| p.into_inner()) = replies.into();
        mock
    }

    fn with_fallback(fallback: Result<String, ModelError>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    /// Number of `describe` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl Default for MockVisionModel {
    fn default() -> Self {
        Self::always(OFFLINE_RESPONSE)
    }
}

#[async_trait]
impl VisionModel for MockVisionModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn describe(&self, request: &VisionRequest) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap_or_else(|p| p.into_inner()) = Some(request.prompt.clone());

        let next = self
            .script
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}
