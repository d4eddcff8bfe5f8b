//! `skuforge config show|init`.

use std::path::Path;

use anyhow::{bail, Context, Result};
use skuforge_config::{apply_all_defaults, load_config, redact, write_config, SkuforgeConfig};

use crate::terminal_output;

/// Print the effective config (defaults applied, secrets masked).
pub async fn show(path: &Path) -> Result<()> {
    let config = apply_all_defaults(load_config(path).await?);
    let value = serde_json::to_value(&config).context("Failed to serialize config")?;
    let yaml = serde_yaml::to_string(&redact(&value)).context("Failed to render config")?;

    terminal_output::note_info(&format!("Config file: {}", path.display()));
    print!("{yaml}");
    Ok(())
}

/// Starter config: every default spelled out, key read from the environment.
pub fn starter_config() -> SkuforgeConfig {
    let mut config = apply_all_defaults(SkuforgeConfig::default());
    config.model.api_key = Some("${GEMINI_API_KEY}".to_string());
    config
}

/// Write a starter config file.
pub async fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }
    write_config(&starter_config(), path).await?;
    terminal_output::note_success(&format!("Wrote {}", path.display()));
    Ok(())
}
