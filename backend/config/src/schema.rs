//! skuforge configuration schema.
//!
//! Every field is optional in the file; [`crate::apply_all_defaults`] fills
//! the gaps and the accessors fall back to the same defaults.

use serde::{Deserialize, Serialize};

use crate::defaults::*;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuforgeConfig {
    /// Vision model provider and request limits
    #[serde(default)]
    pub model: ModelConfig,

    /// Retry policy for model calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Output layout
    #[serde(default)]
    pub output: OutputConfig,

    /// Prompt customization
    #[serde(default)]
    pub prompt: PromptConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Artifact export
    #[serde(default)]
    pub export: ExportConfig,
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    /// `gemini`, `openai` or `mock`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Summed image bytes allowed in one request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload_bytes: Option<usize>,
    /// Images sent per request; 0 means no limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_images: Option<usize>,
}

impl ModelConfig {
    pub fn provider(&self) -> &str {
        self.provider.as_deref().unwrap_or(DEFAULT_PROVIDER)
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes.unwrap_or(DEFAULT_MAX_PAYLOAD_BYTES)
    }

    pub fn max_images(&self) -> usize {
        self.max_images.unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
}

impl RetryConfig {
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS)
    }

    pub fn base_delay_ms(&self) -> u64 {
        self.base_delay_ms.unwrap_or(DEFAULT_BASE_DELAY_MS)
    }

    pub fn backoff_factor(&self) -> f64 {
        self.backoff_factor.unwrap_or(DEFAULT_BACKOFF_FACTOR)
    }

    pub fn max_delay_ms(&self) -> u64 {
        self.max_delay_ms.unwrap_or(DEFAULT_MAX_DELAY_MS)
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    /// Inventory file name, relative to `dir` unless absolute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_images: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_raw_responses: Option<bool>,
}

impl OutputConfig {
    pub fn dir(&self) -> &str {
        self.dir.as_deref().unwrap_or(DEFAULT_OUTPUT_DIR)
    }

    pub fn inventory_file(&self) -> &str {
        self.inventory_file.as_deref().unwrap_or(DEFAULT_INVENTORY_FILE)
    }

    pub fn copy_images(&self) -> bool {
        self.copy_images.unwrap_or(false)
    }

    pub fn keep_raw_responses(&self) -> bool {
        self.keep_raw_responses.unwrap_or(true)
    }
}

// ---------------------------------------------------------------------------
// Prompt, logging, export
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptConfig {
    /// Appended to the listing prompt, e.g. seller conventions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_context: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for rolling NDJSON logs; console only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

impl LoggingConfig {
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Root the directory mirror copies artifacts into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror_dir: Option<String>,
}

impl ExportConfig {
    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(false)
    }
}
