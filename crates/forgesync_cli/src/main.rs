//! forgesync CLI - keeps a repository catalog in step with GitHub hosts.

mod catalog;
mod commands;
mod config;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::limits::OutputFormat;
use crate::commands::lookup::LookupOptions;
use crate::commands::run::RunOptions;

#[derive(Parser)]
#[command(name = "forgesync")]
#[command(version)]
#[command(about = "Repository sync engine for GitHub and GitHub Enterprise")]
#[command(
    long_about = "forgesync enumerates repositories on configured GitHub and GitHub Enterprise \
connections and writes one catalog record per repository. It also resolves single repositories \
on demand, falling back to a plain clone probe when the API quota runs low."
)]
#[command(after_long_help = r#"EXAMPLES
    Sync every configured connection, writing records to a file:
        $ forgesync run --output catalog.jsonl

    Resolve a repository by URI:
        $ forgesync lookup github.com/rust-lang/rust

    Resolve a repository by its node ID:
        $ forgesync lookup --external-id R_kgDO... --service-id https://github.com

    Show API quota for each connection:
        $ forgesync limits

CONFIGURATION
    forgesync reads configuration from:
      1. --config <PATH>, if given
      2. ~/.config/forgesync/config.toml (or $XDG_CONFIG_HOME/forgesync/config.toml)
      3. ./forgesync.toml
      4. Environment variables (FORGESYNC_* prefix, __ between sections)
      5. .env file in current directory

ENVIRONMENT VARIABLES
    FORGESYNC_SYNC__INTERVAL_SECS   Seconds between sync passes (default: 60)
    FORGESYNC_CLIENT__TIMEOUT_SECS  HTTP request timeout (default: 30)
    BYPASS_GITHUB_API               Resolve lookups without the API
    GITHUB_API_MIN_RATE_LIMIT       Quota below which lookups skip the API
    RUST_LOG                        Log filter (default: forgesync=info)
"#)]
pub(crate) struct Cli {
    /// Config file to use instead of the default locations
    #[arg(short, long, global = true, env = "FORGESYNC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync all configured connections until interrupted
    Run(RunOptions),
    /// Resolve one repository through the configured connections
    Lookup(LookupOptions),
    /// Show current rate limit status
    Limits {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// List the connections the configuration yields
    Connections {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so catalog records on stdout stay machine-readable.
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("forgesync=info,forgesync_cli=info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Completions { shell } => commands::meta::handle_completions(shell)?,
        Commands::Man { output } => commands::meta::handle_man(output)?,
        Commands::Run(opts) => {
            let config = config::Config::try_load(cli.config.as_deref())?;
            let shutdown = shutdown::setup_shutdown_handler();
            commands::run::handle_run(config, cli.config, opts, shutdown).await?;
        }
        Commands::Lookup(opts) => {
            let config = config::Config::load(cli.config.as_deref());
            commands::lookup::handle_lookup(&config, opts).await?;
        }
        Commands::Limits { output } => {
            let config = config::Config::load(cli.config.as_deref());
            commands::limits::handle_limits(&config, output).await?;
        }
        Commands::Connections { output } => {
            let config = config::Config::load(cli.config.as_deref());
            commands::connections::handle_connections(&config, output)?;
        }
    }

    Ok(())
}
