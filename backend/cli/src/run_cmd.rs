//! `skuforge run`: describe SKU folders and update the inventory.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use skuforge_config::SkuforgeConfig;
use skuforge_inventory::{ArtifactWriter, InventoryStore};
use skuforge_media::PayloadBudget;
use skuforge_pipeline::{DirectoryMirror, Pipeline, RunSummary};
use skuforge_understanding::{build_provider, ModelClient, PromptBuilder, ProviderKind, RetryPolicy};
use tracing::info;

use crate::terminal_output::{self, Column};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// SKU folder to describe (repeatable)
    #[arg(long = "folder", value_name = "DIR", required_unless_present = "root", conflicts_with = "root")]
    pub folders: Vec<PathBuf>,

    /// Describe every sub-folder of this directory
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Output directory (overrides output.dir)
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Model provider: gemini, openai or mock (overrides model.provider)
    #[arg(long)]
    pub provider: Option<String>,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Environment variables consulted when the config has no API key.
fn key_env_vars(kind: ProviderKind) -> &'static [&'static str] {
    match kind {
        ProviderKind::Gemini => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
        ProviderKind::OpenAi => &["OPENAI_API_KEY"],
        ProviderKind::Mock => &[],
    }
}

pub fn resolve_api_key(config: &SkuforgeConfig, kind: ProviderKind) -> Option<String> {
    config
        .model
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .or_else(|| {
            key_env_vars(kind)
                .iter()
                .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
        })
}

pub fn output_dir(config: &SkuforgeConfig, overridden: Option<&Path>) -> PathBuf {
    overridden
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(config.output.dir()))
}

pub fn inventory_path(config: &SkuforgeConfig, out_dir: &Path) -> PathBuf {
    out_dir.join(config.output.inventory_file())
}

fn build_client(config: &SkuforgeConfig, provider: Option<&str>) -> Result<ModelClient> {
    let name = provider.unwrap_or(config.model.provider());
    let kind = ProviderKind::parse(name).map_err(|e| anyhow!(e))?;
    let api_key = resolve_api_key(config, kind);
    let model = build_provider(kind, api_key.as_deref(), config.model.base_url.as_deref())
        .map_err(|e| anyhow!(e))
        .with_context(|| format!("Cannot set up the '{name}' provider"))?;

    let retry = RetryPolicy {
        max_attempts: config.retry.max_attempts(),
        base_delay_ms: config.retry.base_delay_ms(),
        backoff_factor: config.retry.backoff_factor(),
        max_delay_ms: config.retry.max_delay_ms(),
    };
    let budget = PayloadBudget {
        max_total_bytes: config.model.max_payload_bytes(),
        ..PayloadBudget::default()
    };

    Ok(ModelClient::new(model, config.model.model())
        .with_retry(retry)
        .with_timeout(Duration::from_secs(config.model.timeout_secs()))
        .with_budget(budget)
        .with_max_images(config.model.max_images()))
}

pub fn build_pipeline(config: &SkuforgeConfig, args: &RunArgs) -> Result<Pipeline> {
    let client = build_client(config, args.provider.as_deref())?;
    let out_dir = output_dir(config, args.output.as_deref());
    let writer = ArtifactWriter::new(&out_dir)
        .keep_raw_responses(config.output.keep_raw_responses())
        .copy_images(config.output.copy_images());
    let store = InventoryStore::new(inventory_path(config, &out_dir));

    let mut prompt = PromptBuilder::new();
    if let Some(context) = &config.prompt.extra_context {
        prompt = prompt.with_extra_context(context.as_str());
    }

    let mut pipeline = Pipeline::new(client, writer, store).with_prompt(prompt);
    if config.export.enabled() {
        let mirror = config
            .export
            .mirror_dir
            .as_deref()
            .context("export.mirrorDir is required when export is enabled")?;
        pipeline = pipeline.with_exporter(Arc::new(DirectoryMirror::new(mirror)));
    }
    Ok(pipeline)
}

pub async fn run(args: RunArgs, config: SkuforgeConfig) -> Result<ExitCode> {
    let pipeline = build_pipeline(&config, &args)?;
    info!(inventory = %pipeline.store().path().display(), "Pipeline ready");

    let summary = match &args.root {
        Some(root) => pipeline.run_root(root).await?,
        None => pipeline.run(&args.folders).await?,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary, pipeline.store().path());
    }

    Ok(if summary.is_aborted() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_summary(summary: &RunSummary, inventory: &Path) {
    if !summary.failures.is_empty() {
        let columns = [
            Column::left("Folder"),
            Column::left("Kind"),
            Column::left("Reason").max_width(80),
        ];
        let rows: Vec<Vec<String>> = summary
            .failures
            .iter()
            .map(|f| vec![f.folder.display().to_string(), f.kind.clone(), f.reason.clone()])
            .collect();
        print!("{}", terminal_output::render_table(&columns, &rows));
    }

    let counts = format!(
        "{} processed, {} skipped, {} failed",
        summary.processed, summary.skipped, summary.failed
    );
    match &summary.aborted {
        Some(abort) => terminal_output::note_error(&format!("Run aborted ({counts}): {}", abort.reason)),
        None if summary.failed > 0 => terminal_output::note_warn(&counts),
        None => terminal_output::note_success(&counts),
    }
    if summary.exported > 0 || summary.export_failures > 0 {
        terminal_output::note_info(&format!(
            "{} exported, {} export failures",
            summary.exported, summary.export_failures
        ));
    }
    terminal_output::note_info(&format!("Inventory: {}", inventory.display()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_key_wins_over_environment() {
        let mut config = SkuforgeConfig::default();
        config.model.api_key = Some("from-config".into());
        assert_eq!(resolve_api_key(&config, ProviderKind::Gemini).as_deref(), Some("from-config"));
        assert_eq!(resolve_api_key(&SkuforgeConfig::default(), ProviderKind::Mock), None);
    }

    #[test]
    fn inventory_lives_in_the_output_dir() {
        let mut config = SkuforgeConfig::default();
        let out = output_dir(&config, Some(Path::new("/tmp/listings")));
        assert_eq!(inventory_path(&config, &out), PathBuf::from("/tmp/listings/inventory.csv"));

        config.output.inventory_file = Some("/srv/inventory.csv".into());
        assert_eq!(inventory_path(&config, &out), PathBuf::from("/srv/inventory.csv"));
    }

    #[tokio::test]
    async fn mock_run_writes_listing() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let folder = input.path().join("BAG_01");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join("1.jpg"), [0xff, 0xd8, 0xff]).unwrap();

        let args = RunArgs {
            folders: vec![folder],
            root: None,
            output: Some(out.path().to_path_buf()),
            provider: Some("mock".into()),
            json: true,
        };
        let code = run(args, SkuforgeConfig::default()).await.unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        assert!(out.path().join("BAG_01").join("BAG_01_description.json").exists());
        assert!(out.path().join("inventory.csv").exists());
    }
}
