//! `skuforge-config`: runtime configuration management.
//!
//! Provides:
//! - Typed config schema (model, retry, output, prompt, logging, export)
//! - YAML read/write with atomic backup rotation
//! - `${ENV_VAR}` substitution
//! - Config redaction for safe display
//! - Default value application
//! - Validation report

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{collect_referenced_vars, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config, load_raw_config, write_config};
pub use redact::redact;
pub use schema::{
    ExportConfig, LoggingConfig, ModelConfig, OutputConfig, PromptConfig, RetryConfig,
    SkuforgeConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use std::path::Path;

/// Load, apply env substitution and defaults, and validate a config file.
///
/// This is the main entry point for loading a config at runtime. Validation
/// warnings are logged; validation errors fail the load.
pub async fn load_and_prepare(path: &Path) -> Result<SkuforgeConfig> {
    let value = load_raw_config(path).await?;
    let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;

    let config: SkuforgeConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;
    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    if let Some(first) = report.errors.first() {
        for error in &report.errors {
            tracing::error!(path = %error.path, message = %error.message, "Config error");
        }
        bail!("{} config error(s); first: {first}", report.errors.len());
    }

    Ok(config)
}
