//! CLI entry and dispatch.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use multibar_core::config::{self, ProgressConfig};
use multibar_core::logging;

mod commands;

#[derive(Parser)]
#[command(name = "multibar")]
#[command(version)]
#[command(about = "Render concurrent progress bars in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: $MULTIBAR_HOME/config.toml)
    #[arg(
        long = "config",
        global = true,
        value_name = "PATH",
        env = "MULTIBAR_CONFIG"
    )]
    config_file: Option<PathBuf>,

    /// Write logs to this file (filter with MULTIBAR_LOG)
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(flatten)]
    render: RenderArgs,
}

/// Overrides for the rendering defaults in the config file.
#[derive(clap::Args, Debug, Clone, Default)]
struct RenderArgs {
    /// Default bar width and fallback terminal width
    #[arg(long, global = true)]
    width: Option<usize>,

    /// Five character bar skin, e.g. "[=>-]"
    #[arg(long, global = true, value_name = "SKIN")]
    format: Option<String>,

    /// Refresh period in milliseconds
    #[arg(long = "refresh-ms", global = true, value_name = "MS")]
    refresh_ms: Option<u64>,
}

impl RenderArgs {
    fn apply(&self, config: &mut ProgressConfig) {
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(format) = &self.format {
            config.format.clone_from(format);
        }
        if let Some(ms) = self.refresh_ms {
            config.refresh_rate_ms = ms;
        }
    }
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Drive a single bar to completion
    Single {
        /// Number of steps
        #[arg(long, default_value_t = 100)]
        total: u64,

        /// Pause between steps in milliseconds
        #[arg(long = "delay-ms", value_name = "MS", default_value_t = 20)]
        delay_ms: u64,
    },

    /// Drive several bars concurrently
    Multi {
        /// Number of bars
        #[arg(long, default_value_t = 3)]
        bars: usize,

        /// Steps per bar
        #[arg(long, default_value_t = 100)]
        total: u64,

        /// Base pause between steps in milliseconds
        #[arg(long = "delay-ms", value_name = "MS", default_value_t = 20)]
        delay_ms: u64,

        /// Cancel every bar after this many milliseconds
        #[arg(long = "cancel-after-ms", value_name = "MS")]
        cancel_after_ms: Option<u64>,
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
    /// Write a default config file
    Init,
    /// Print the effective config, flags applied
    Show,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let _log = logging::init(cli.log_file.as_deref()).context("init logging")?;

    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let Cli {
        command,
        config_file,
        log_file: _,
        render,
    } = cli;
    let config_path = config_file.unwrap_or_else(config::paths::config_path);

    match command {
        Commands::Config {
            command: ConfigCommands::Path,
        } => {
            commands::config::path(&config_path);
            return Ok(());
        }
        Commands::Config {
            command: ConfigCommands::Init,
        } => return commands::config::init(&config_path),
        _ => {}
    }

    let mut config = ProgressConfig::load_from(&config_path).context("load config")?;
    render.apply(&mut config);
    config.validate().context("invalid render options")?;
    tracing::debug!(?config, "loaded config");

    match command {
        Commands::Single { total, delay_ms } => {
            commands::single::run(&config, total, Duration::from_millis(delay_ms)).await
        }
        Commands::Multi {
            bars,
            total,
            delay_ms,
            cancel_after_ms,
        } => {
            commands::multi::run(
                &config,
                commands::multi::MultiOptions {
                    bars,
                    total,
                    delay: Duration::from_millis(delay_ms),
                    cancel_after: cancel_after_ms.map(Duration::from_millis),
                },
            )
            .await
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => commands::config::show(&config),
            ConfigCommands::Path | ConfigCommands::Init => Ok(()),
        },
    }
}
