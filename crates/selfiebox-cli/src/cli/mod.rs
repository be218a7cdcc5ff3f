//! CLI entry and dispatch.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use selfiebox_core::config::{self, Config};

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "selfiebox")]
#[command(version)]
#[command(about = "Cut yourself out of a selfie and drop yourself onto another picture")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file to use instead of $SELFIEBOX_HOME/config.toml
    #[arg(long, global = true, value_name = "PATH", env = "SELFIEBOX_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Run the Telegram bot (long-polling)
    Bot,
    /// Composite two local images into a PNG
    Composite {
        /// Photo with the person to cut out
        #[arg(long, value_name = "FILE")]
        subject: PathBuf,

        /// Picture to place the person on
        #[arg(long, value_name = "FILE")]
        backdrop: PathBuf,

        /// Where to write the PNG
        #[arg(short, long, value_name = "FILE", default_value = "selfie.png")]
        output: PathBuf,

        /// Override the segmentation endpoint from config
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Print the config file path
    Path,
    /// Write a commented default config
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(config::paths::config_path);

    // Config commands must work even when the file on disk is broken.
    if let Commands::Config { command } = &cli.command {
        return match command {
            ConfigCommands::Path => {
                commands::config::path(&config_path);
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(&config_path),
        };
    }

    let config = Config::load_from(&config_path)
        .with_context(|| format!("load config from {}", config_path.display()))?;
    let _log_guard = logging::init(&config)?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli.command, config, &config_path).await })
}

async fn dispatch(command: Commands, mut config: Config, config_path: &Path) -> Result<()> {
    match command {
        Commands::Bot => commands::bot::run(config, config_path).await,
        Commands::Composite {
            subject,
            backdrop,
            output,
            endpoint,
        } => {
            if let Some(endpoint) = endpoint {
                config.segmentation.endpoint = endpoint;
            }
            commands::composite::run(commands::composite::CompositeOptions {
                subject: &subject,
                backdrop: &backdrop,
                output: &output,
                config: &config,
            })
            .await
        }
        Commands::Config { .. } => Ok(()),
    }
}
