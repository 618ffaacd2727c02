use anyhow::Result;
use clap::Parser;
use wp_migrator::{cli, logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file before anything else (silently ignore if missing)
    dotenvy::dotenv().ok();

    let cli_args = cli::Cli::parse();
    let config = cli::load_config(cli_args.config.as_deref())?;

    // The wizard owns the terminal, so it only ever logs to files
    let mut log_config = logging::LogConfig::new()
        .with_debug_mode(cli_args.debug)
        .with_level(config.logging.level.clone())
        .with_console(!cli_args.is_interactive());

    if let Some(dir) = &config.logging.file {
        log_config = log_config.with_log_dir(dir.clone());
    }
    // Custom log directory from env
    if let Ok(log_dir) = std::env::var("DEBUG_LOGS_LOCATION") {
        log_config = log_config.with_log_dir(std::path::PathBuf::from(log_dir));
    }

    let log_dir = log_config.log_dir.clone();
    let _guard = logging::init_logging(log_config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    // Clean up old log files (keep last 7 days)
    if cli_args.debug
        && let Ok(removed) = logging::cleanup_logs_in(&log_dir, 7)
        && removed > 0
    {
        tracing::info!("Cleaned up {} old log file(s)", removed);
    }

    cli::run(cli_args, config).await
}
