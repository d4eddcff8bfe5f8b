mod config_cmd;
mod doctor_cmd;
mod inventory_cmd;
mod run_cmd;
mod terminal_output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use skuforge_config::{config_dir, config_file_path, load_and_prepare, SkuforgeConfig};
use skuforge_logging::{init_logger, LogSettings};

#[derive(Parser)]
#[command(name = "skuforge")]
#[command(about = "skuforge: product photos in, structured listings and inventory out")]
#[command(version)]
struct Cli {
    /// Config file (default: $SKUFORGE_CONFIG_DIR/config.yaml, else ~/.skuforge/config.yaml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe SKU folders with the vision model and update the inventory
    Run(run_cmd::RunArgs),
    /// Show the inventory table
    Inventory {
        /// Output directory holding the inventory (overrides output.dir)
        #[arg(long, value_name = "DIR")]
        output: Option<PathBuf>,
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Check that a run can start
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective config with secrets masked
    Show,
    /// Write a starter config file
    Init {
        /// Overwrite an existing file (the old one is kept as a backup)
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            terminal_output::note_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> Result<ExitCode> {
    let config_path = cli
        .config
        .unwrap_or_else(|| config_file_path(&config_dir()));

    match cli.command {
        Commands::Run(args) => {
            let config = load_and_prepare(&config_path).await?;
            init_logging(&config)?;
            run_cmd::run(args, config).await
        }
        Commands::Inventory { output, json } => {
            let config = load_and_prepare(&config_path).await?;
            init_logging(&config)?;
            inventory_cmd::run(&config, output, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { action } => {
            match action {
                ConfigAction::Show => config_cmd::show(&config_path).await?,
                ConfigAction::Init { force } => config_cmd::init(&config_path, force).await?,
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Doctor => {
            let healthy = doctor_cmd::run(&config_path).await?;
            Ok(if healthy { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}

fn init_logging(config: &SkuforgeConfig) -> Result<()> {
    init_logger(&LogSettings {
        level: config.logging.level().to_string(),
        dir: config.logging.dir.as_ref().map(PathBuf::from),
        json: config.logging.json.unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_requires_a_folder_or_root() {
        assert!(Cli::try_parse_from(["skuforge", "run"]).is_err());
        assert!(Cli::try_parse_from(["skuforge", "run", "--folder", "a", "--root", "b"]).is_err());

        let cli = Cli::try_parse_from([
            "skuforge", "run", "--folder", "a", "--folder", "b", "--provider", "mock",
        ])
        .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.folders, [PathBuf::from("a"), PathBuf::from("b")]);
                assert_eq!(args.provider.as_deref(), Some("mock"));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["skuforge", "doctor", "--config", "/tmp/c.yaml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.yaml")));
    }
}
