//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use msgtree_core::TreeConfig;
use tracing_subscriber::EnvFilter;

pub mod commands;

#[derive(Parser)]
#[command(name = "msgtree")]
#[command(version = "0.1")]
#[command(about = "Build, check and replay chat message trees")]
struct Cli {
    /// Log filter for diagnostics on stderr (e.g. "debug", "msgtree_core=trace")
    #[arg(long, global = true, env = "MSGTREE_LOG", value_name = "FILTER")]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Build a tree from a message file and print it
    Show {
        /// JSON array or JSONL file of messages ("-" for stdin)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print the tree as JSON (root ids plus an id-to-node map)
        #[arg(long)]
        json: bool,
    },
    /// Build a tree and verify its structure
    Check {
        /// JSON array or JSONL file of messages ("-" for stdin)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Also fail when the input needed orphan repair or held duplicate ids
        #[arg(long)]
        strict: bool,
    },
    /// Apply a JSONL mutation log in order and print the final tree
    Replay {
        /// JSONL file with one mutation per line
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print the tree as JSON (root ids plus an id-to-node map)
        #[arg(long)]
        json: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

/// Diagnostics go to stderr so stdout carries only the rendered tree. An
/// unparseable filter falls back to `warn`.
fn init_tracing(log: Option<&str>) {
    let filter = log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log.as_deref());

    match cli.command {
        Commands::Show { file, json } => {
            let config = TreeConfig::load().context("load config")?;
            commands::show::run(&file, json, config)
        }
        Commands::Check { file, strict } => {
            let config = TreeConfig::load().context("load config")?;
            commands::check::run(&file, strict, config)
        }
        Commands::Replay { file, json } => {
            let config = TreeConfig::load().context("load config")?;
            commands::replay::run(&file, json, config)
        }
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
    }
}
