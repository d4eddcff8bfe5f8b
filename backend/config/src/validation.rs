//! Config validation: checks with user-friendly error messages.

use crate::schema::SkuforgeConfig;
use thiserror::Error;

/// Provider names accepted in `model.provider`.
pub const KNOWN_PROVIDERS: &[&str] = &["gemini", "google", "openai", "openai-compatible", "mock"];

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &SkuforgeConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_model(config, &mut report);
    validate_retry(config, &mut report);
    validate_output(config, &mut report);
    validate_export(config, &mut report);
    report
}

fn validate_model(config: &SkuforgeConfig, report: &mut ValidationReport) {
    let model = &config.model;
    let provider = model.provider().to_ascii_lowercase();
    if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
        report.error(
            "model.provider",
            format!("Unknown provider '{provider}'. Use 'gemini', 'openai', or 'mock'"),
        );
    }
    if model.model().trim().is_empty() {
        report.error("model.model", "Model name cannot be empty");
    }
    if provider != "mock" && model.api_key.as_deref().map(str::trim).unwrap_or("").is_empty() {
        report.warn(
            "model.apiKey",
            "No API key configured; set it here or via GEMINI_API_KEY / OPENAI_API_KEY",
        );
    }
    if model.timeout_secs() == 0 {
        report.error("model.timeoutSecs", "timeoutSecs must be > 0");
    }
    if model.max_payload_bytes() < 64 * 1024 {
        report.error("model.maxPayloadBytes", "maxPayloadBytes must be at least 65536");
    }
}

fn validate_retry(config: &SkuforgeConfig, report: &mut ValidationReport) {
    let retry = &config.retry;
    if retry.max_attempts() == 0 {
        report.error("retry.maxAttempts", "maxAttempts must be >= 1");
    }
    let factor = retry.backoff_factor();
    if factor.is_nan() || factor <= 1.0 {
        report.error(
            "retry.backoffFactor",
            "backoffFactor must be > 1.0 so that retry delays keep growing",
        );
    }
    if retry.max_delay_ms() < retry.base_delay_ms() {
        report.warn("retry.maxDelayMs", "maxDelayMs is below baseDelayMs; every wait is capped");
    }
}

fn validate_output(config: &SkuforgeConfig, report: &mut ValidationReport) {
    let output = &config.output;
    if output.dir().trim().is_empty() {
        report.error("output.dir", "Output directory cannot be empty");
    }
    let inventory = output.inventory_file();
    if inventory.trim().is_empty() {
        report.error("output.inventoryFile", "Inventory file name cannot be empty");
    } else if !inventory.to_ascii_lowercase().ends_with(".csv") {
        report.warn("output.inventoryFile", "Inventory is written as CSV; consider a .csv name");
    }
}

fn validate_export(config: &SkuforgeConfig, report: &mut ValidationReport) {
    let export = &config.export;
    if export.enabled() && export.mirror_dir.as_deref().map(str::trim).unwrap_or("").is_empty() {
        report.error("export.mirrorDir", "mirrorDir is required when export is enabled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_only_warns_about_the_key() {
        let report = validate(&SkuforgeConfig::default());
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert_eq!(report.warnings[0].path, "model.apiKey");
    }

    #[test]
    fn mock_provider_needs_no_key() {
        let mut cfg = SkuforgeConfig::default();
        cfg.model.provider = Some("mock".into());
        assert!(validate(&cfg).warnings.is_empty());
    }

    #[test]
    fn rejects_unknown_provider_and_zero_attempts() {
        let mut cfg = SkuforgeConfig::default();
        cfg.model.provider = Some("claude".into());
        cfg.retry.max_attempts = Some(0);
        let report = validate(&cfg);
        let paths: Vec<&str> = report.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["model.provider", "retry.maxAttempts"]);
    }

    #[test]
    fn backoff_factor_must_grow_delays() {
        for factor in [1.0, 0.5, f64::NAN] {
            let mut cfg = SkuforgeConfig::default();
            cfg.retry.backoff_factor = Some(factor);
            let report = validate(&cfg);
            assert_eq!(report.errors.len(), 1, "factor {factor}");
            assert_eq!(report.errors[0].path, "retry.backoffFactor");
        }

        let mut cfg = SkuforgeConfig::default();
        cfg.retry.backoff_factor = Some(1.5);
        assert!(validate(&cfg).is_valid());
    }

    #[test]
    fn export_requires_mirror_dir() {
        let mut cfg = SkuforgeConfig::default();
        cfg.export.enabled = Some(true);
        let report = validate(&cfg);
        assert!(!report.is_valid());
        assert!(report.errors[0].path.contains("mirrorDir"));
    }
}
