//! vaultdex CLI entry point

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vaultdex::{
    commands::{cmd_index, cmd_init, cmd_status, print_index_stats, print_status},
    config::Config,
    error::{Error, Result},
    pipeline::PipelineOptions,
    progress::LogWriterFactory,
    store::Store,
};

#[derive(Parser)]
#[command(name = "vaultdex")]
#[command(version, about = "Incremental indexer for linked markdown vaults", long_about = None)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
struct Cli {
    /// Vault directory to index
    #[arg(required = true)]
    vault: Option<PathBuf>,

    /// Number of concurrent extraction workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the SQLite index (overrides the config)
    #[arg(long, global = true, env = "VAULTDEX_DB")]
    db_path: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Show index status
    Status,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let writer = LogWriterFactory::for_stderr();
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_ansi(writer.is_pinned())
                .with_writer(writer),
        )
        .with(filter)
        .init();

    // Init doesn't need an existing config or database
    if let Some(Commands::Init { force }) = cli.command {
        let path = cli.config.unwrap_or_else(Config::default_config_path);
        let config = cmd_init(path, force)?;
        println!("✓ vaultdex initialized");
        println!("  Config: {}", config.paths.config_file.display());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref(), cli.db_path, cli.workers)?;
    let store = Store::connect(&config.paths.db_file).await?;

    let result = match (cli.command, cli.vault) {
        (Some(Commands::Status), _) => {
            let status = cmd_status(&config, &store).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
            Ok(())
        }

        (Some(Commands::Init { .. }), _) => unreachable!(),

        (None, Some(vault)) => {
            let options = PipelineOptions {
                workers: config.index.workers,
                show_progress: !cli.json && writer.is_pinned(),
            };

            cmd_index(&config, &store, &vault, options).await.map(|stats| {
                if cli.json {
                    match serde_json::to_string_pretty(&stats) {
                        Ok(out) => println!("{}", out),
                        Err(e) => error!("{}", e),
                    }
                } else {
                    print_index_stats(&stats);
                }
            })
        }

        (None, None) => Err(Error::Config("no vault directory given".to_string())),
    };

    store.close().await;
    result
}

/// Load the config and apply command-line overrides
fn load_config(
    path: Option<&Path>,
    db_path: Option<PathBuf>,
    workers: Option<usize>,
) -> Result<Config> {
    let mut config = Config::load_or_default(path)?;

    if let Some(db_path) = db_path {
        config.paths.db_file = db_path;
    }
    if let Some(workers) = workers {
        config.index.workers = workers;
    }

    config.validate()?;
    Ok(config)
}
