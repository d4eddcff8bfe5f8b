//! Config file read/write with atomic backup rotation.

use crate::schema::SkuforgeConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Number of rolling backups to keep.
const MAX_BACKUPS: usize = 3;

/// Resolve the skuforge config directory.
/// Priority: `SKUFORGE_CONFIG_DIR` env > `~/.skuforge/`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SKUFORGE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".skuforge"),
        None => PathBuf::from(".skuforge"),
    }
}

/// Resolve the full path to the main config file.
pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Read the config file as a JSON value tree (before env substitution).
///
/// Returns an empty object if the file doesn't exist (first run).
pub async fn load_raw_config(path: &Path) -> Result<serde_json::Value> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(serde_json::Value::Object(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(Default::default()));
    }

    let value: serde_json::Value = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;
    if value.is_null() {
        return Ok(serde_json::Value::Object(Default::default()));
    }

    info!(path = %path.display(), "Loaded config");
    Ok(value)
}

/// Load and parse the config from disk, without env substitution.
pub async fn load_config(path: &Path) -> Result<SkuforgeConfig> {
    let value = load_raw_config(path).await?;
    serde_json::from_value(value)
        .with_context(|| format!("Invalid config structure in: {}", path.display()))
}

/// Write config to disk atomically (write to temp file, rename).
///
/// Creates a rolling backup of the previous config before overwriting.
pub async fn write_config(config: &SkuforgeConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create config directory: {}", parent.display())
        })?;
    }

    if path.exists() {
        rotate_backups(path).await;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;

    let tmp_path = path.with_extension("yaml.tmp");
    fs::write(&tmp_path, yaml.as_bytes())
        .await
        .with_context(|| format!("Failed to write temp config: {}", tmp_path.display()))?;

    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to rename temp config to: {}", path.display()))?;

    info!(path = %path.display(), "Wrote config");
    Ok(())
}

/// Rotate backup files: config.yaml.bak.1 → .bak.2 → ... → .bak.N
async fn rotate_backups(path: &Path) {
    for i in (1..MAX_BACKUPS).rev() {
        let old = path.with_extension(format!("yaml.bak.{i}"));
        let new = path.with_extension(format!("yaml.bak.{}", i + 1));
        if old.exists() {
            if let Err(e) = fs::rename(&old, &new).await {
                warn!("Failed to rotate backup {}: {}", old.display(), e);
            }
        }
    }

    let bak = path.with_extension("yaml.bak.1");
    if let Err(e) = fs::copy(path, &bak).await {
        warn!("Failed to create backup {}: {}", bak.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&dir.path().join("config.yaml")).await.unwrap();
        assert_eq!(cfg, SkuforgeConfig::default());
    }

    #[tokio::test]
    async fn write_then_load_round_trips_and_backs_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(&dir.path().join("cfg"));

        let mut cfg = SkuforgeConfig::default();
        cfg.model.provider = Some("openai".into());
        write_config(&cfg, &path).await.unwrap();

        cfg.output.copy_images = Some(true);
        write_config(&cfg, &path).await.unwrap();

        assert_eq!(load_config(&path).await.unwrap(), cfg);
        let backup = load_config(&path.with_extension("yaml.bak.1")).await.unwrap();
        assert_eq!(backup.output.copy_images, None);
        assert!(!path.with_extension("yaml.tmp").exists());
    }

    #[tokio::test]
    async fn malformed_yaml_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "model: [unclosed").unwrap();
        let err = load_config(&path).await.unwrap_err();
        assert!(format!("{err:#}").contains("config.yaml"));
    }
}
