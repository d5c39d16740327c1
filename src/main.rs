//! uuidlens - entity UUID lens
//!
//! Main entry point for the uuidlens CLI.

mod cli;
mod commands;

use std::path::PathBuf;

use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use uuidlens_config::{ConfigLoader, LoggingConfig};

use crate::cli::{Cli, Commands};

/// Initialize tracing with console output and, when a directory is
/// configured, a daily rolling log file.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    // Console goes to stderr so command output on stdout stays parseable.
    let console = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    let file = match &logging.directory {
        Some(dir) => {
            let dir = PathBuf::from(ConfigLoader::expand_path(&dir.to_string_lossy()));
            std::fs::create_dir_all(&dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("uuidlens")
                .filename_suffix("log")
                .max_log_files(14)
                .build(&dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);

            // Keep the writer alive for the life of the process.
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file)
        .init();

    Ok(())
}

/// `~/.config/uuidlens/config.toml` or the platform equivalent.
fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("uuidlens")
        .join("config.toml")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // An explicit path must exist; the default one may be absent.
    let config = match &cli.config {
        Some(path) => ConfigLoader::load(path)?,
        None => ConfigLoader::load_or_default(&default_config_path())?,
    };

    init_tracing(&config.logging)?;

    match cli.command {
        Commands::Scan {
            snapshot,
            output,
            json,
        } => commands::scan(&config, &snapshot, output.as_deref(), json).await,
        Commands::Resolve { uuid, entity_type } => {
            commands::resolve(&config, &uuid, &entity_type).await
        }
        Commands::CheckConfig => commands::check_config(&config),
    }
}
