//! CLI Doctor Command
//!
//! Checks that a run can start: config, provider key, output directory.

use std::path::Path;

use anyhow::Result;
use skuforge_config::{apply_all_defaults, load_config, validate};
use skuforge_understanding::ProviderKind;

use crate::run_cmd::{output_dir, resolve_api_key};

/// Executes the full doctor diagnosis. Returns whether every check passed.
pub async fn run(config_path: &Path) -> Result<bool> {
    println!("\n🔍 Running skuforge doctor...\n");

    println!("Checking configuration:");
    let config = match load_config(config_path).await {
        Ok(config) => {
            println!("  🟢 {} loaded", config_path.display());
            apply_all_defaults(config)
        }
        Err(e) => {
            println!("  🔴 {e:#}");
            println!("\n❌ Some checks failed! Please fix the errors above.");
            return Ok(false);
        }
    };

    let mut all_good = true;
    let report = validate(&config);
    for error in &report.errors {
        println!("  🔴 {}: {}", error.path, error.message);
        all_good = false;
    }
    for warning in &report.warnings {
        println!("  🟡 {}: {}", warning.path, warning.message);
    }

    println!("Checking model provider:");
    all_good &= check_provider(&config);

    println!("Checking output directory:");
    all_good &= check_output(&output_dir(&config, None));

    println!();
    if all_good {
        println!("✅ All checks passed! skuforge is ready.");
    } else {
        println!("❌ Some checks failed! Please fix the errors above.");
    }
    Ok(all_good)
}

fn check_provider(config: &skuforge_config::SkuforgeConfig) -> bool {
    let kind = match ProviderKind::parse(config.model.provider()) {
        Ok(kind) => kind,
        Err(e) => {
            println!("  🔴 {e}");
            return false;
        }
    };
    if kind == ProviderKind::Mock {
        println!("  🟡 mock provider selected; no model will be called");
        return true;
    }
    match resolve_api_key(config, kind) {
        Some(_) => {
            println!("  🟢 {} API key is set (model {})", config.model.provider(), config.model.model());
            true
        }
        None => {
            println!("  🔴 {} API key is missing (REQUIRED)", config.model.provider());
            false
        }
    }
}

fn check_output(dir: &Path) -> bool {
    if dir.exists() && !dir.is_dir() {
        println!("  🔴 {} exists and is not a directory", dir.display());
        return false;
    }
    if dir.is_dir() {
        println!("  🟢 {} exists", dir.display());
    } else {
        println!("  🟡 {} will be created on the first run", dir.display());
    }
    true
}
