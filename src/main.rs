//! WebHands - DOM observation and element addressing over Chrome
//!
//! Main entry point for the WebHands CLI.

mod adapters;
mod cli;
mod commands;

use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use webhands_config::{Config, ConfigLoader};

use cli::{Cli, Commands};

/// Initialize tracing with console output and a daily rolling log file.
fn init_tracing(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = config.logging.log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("webhands")
        .filename_suffix("log")
        .max_log_files(30)
        .build(&log_dir)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // the guard flushes the file writer; it must live as long as the process
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    tracing_subscriber::registry()
        .with(env_filter)
        // stdout carries command output, so the console layer goes to stderr
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.exists().then_some(cli.config.as_path());
    let config = ConfigLoader::load_or_default(config_path)?;
    init_tracing(&config)?;

    match cli.command {
        Commands::State {
            url,
            vision,
            screenshot,
        } => commands::state(&config, &url, vision, &screenshot).await,
        Commands::Act { url, actions } => commands::act(&config, &url, &actions).await,
        Commands::Find {
            url,
            selector,
            include_hidden,
        } => commands::find(&config, &url, &selector, include_hidden).await,
        Commands::Watch { url, seconds } => commands::watch(&config, &url, seconds).await,
    }
}
