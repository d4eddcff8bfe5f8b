//! Config defaults: applies default values to a parsed config.

use crate::schema::SkuforgeConfig;

pub const DEFAULT_PROVIDER: &str = "gemini";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Gemini rejects inline request bodies above 20 MB.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 18 * 1024 * 1024;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_INVENTORY_FILE: &str = "inventory.csv";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: SkuforgeConfig) -> SkuforgeConfig {
    let config = apply_model_defaults(config);
    let config = apply_retry_defaults(config);
    let config = apply_output_defaults(config);
    apply_logging_defaults(config)
}

fn apply_model_defaults(mut config: SkuforgeConfig) -> SkuforgeConfig {
    let model = &mut config.model;
    model.provider.get_or_insert_with(|| DEFAULT_PROVIDER.to_string());
    model.model.get_or_insert_with(|| DEFAULT_MODEL.to_string());
    model.timeout_secs.get_or_insert(DEFAULT_TIMEOUT_SECS);
    model.max_payload_bytes.get_or_insert(DEFAULT_MAX_PAYLOAD_BYTES);
    model.max_images.get_or_insert(0);
    config
}

fn apply_retry_defaults(mut config: SkuforgeConfig) -> SkuforgeConfig {
    let retry = &mut config.retry;
    retry.max_attempts.get_or_insert(DEFAULT_MAX_ATTEMPTS);
    retry.base_delay_ms.get_or_insert(DEFAULT_BASE_DELAY_MS);
    retry.backoff_factor.get_or_insert(DEFAULT_BACKOFF_FACTOR);
    retry.max_delay_ms.get_or_insert(DEFAULT_MAX_DELAY_MS);
    config
}

fn apply_output_defaults(mut config: SkuforgeConfig) -> SkuforgeConfig {
    let output = &mut config.output;
    output.dir.get_or_insert_with(|| DEFAULT_OUTPUT_DIR.to_string());
    output
        .inventory_file
        .get_or_insert_with(|| DEFAULT_INVENTORY_FILE.to_string());
    output.copy_images.get_or_insert(false);
    output.keep_raw_responses.get_or_insert(true);
    config.export.enabled.get_or_insert(false);
    config
}

fn apply_logging_defaults(mut config: SkuforgeConfig) -> SkuforgeConfig {
    let logging = &mut config.logging;
    logging.level.get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.json.get_or_insert(false);
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_every_unset_value() {
        let cfg = apply_all_defaults(SkuforgeConfig::default());
        assert_eq!(cfg.model.provider.as_deref(), Some(DEFAULT_PROVIDER));
        assert_eq!(cfg.retry.max_attempts, Some(3));
        assert_eq!(cfg.output.keep_raw_responses, Some(true));
        assert_eq!(cfg.logging.level.as_deref(), Some("info"));
        // secrets and optional paths stay unset
        assert!(cfg.model.api_key.is_none());
        assert!(cfg.export.mirror_dir.is_none());
    }

    #[test]
    fn does_not_override_user_values() {
        let mut cfg = SkuforgeConfig::default();
        cfg.retry.max_attempts = Some(5);
        cfg.output.dir = Some("listings".into());
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.retry.max_attempts, Some(5));
        assert_eq!(cfg.output.dir.as_deref(), Some("listings"));
    }
}
