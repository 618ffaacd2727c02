//! CLI Module
//!
//! Command-line interface for wp-migrator using Clap v4.

use crate::config::Config;
use crate::migration::form::{DEFAULT_LOCATION, LOCATIONS};
use crate::migration::{
    FieldKey, FieldValue, HttpMigrationClient, LogRecord, MigrationClient, SessionController,
    SessionEvent, SessionEventKind, StreamOutcome, spawn_session,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// wp-migrator - WordPress to Rocket.net migration wizard
#[derive(Parser, Debug)]
#[command(name = "wp-migrator")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug mode (writes log files to the log directory)
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the interactive migration wizard (default)
    Tui {
        /// Prefill the WP admin URL
        #[arg(long)]
        admin_url: Option<String>,

        /// Prefill the WP username
        #[arg(long)]
        username: Option<String>,
    },

    /// Launch a migration without the wizard and stream its log
    Run(RunArgs),

    /// List the Rocket.net regions
    Locations,

    /// Initialize configuration
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    Config,

    /// Log management operations
    Logs {
        #[command(subcommand)]
        operation: LogCommands,
    },
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// WP admin URL of the source site
    #[arg(long)]
    pub admin_url: String,

    /// WP admin username
    #[arg(long)]
    pub username: String,

    /// WP admin password
    #[arg(long, env = "WP_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Rocket.net API token
    #[arg(long, env = "ROCKET_API_TOKEN", hide_env_values = true, default_value = "")]
    pub rocket_token: String,

    /// Slug of the new Rocket.net site
    #[arg(long, default_value = "")]
    pub rocket_name: String,

    /// Region code (see `locations`); defaults to the configured region
    #[arg(long)]
    pub rocket_location: Option<u32>,

    /// Display label of the new site
    #[arg(long, default_value = "")]
    pub rocket_label: String,

    /// Run the remote browser in visual mode
    #[arg(long)]
    pub visual: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum LogCommands {
    /// Show log file location and status
    Status,
    /// Clean up old log files
    Clean {
        /// Maximum age in days (default: 7)
        #[arg(short = 'a', long, default_value = "7")]
        days: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    /// Whether the selected command draws a full-screen terminal UI
    pub fn is_interactive(&self) -> bool {
        matches!(self.command, None | Some(Commands::Tui { .. }))
    }
}

/// Main CLI entry point
pub async fn run(cli: Cli, config: Config) -> Result<()> {
    if cli.debug {
        tracing::info!("Debug mode enabled");
    }

    match cli.command {
        None => crate::tui::run(&config, Vec::new()).await,
        Some(Commands::Tui {
            admin_url,
            username,
        }) => {
            let mut prefill = Vec::new();
            if let Some(url) = admin_url {
                prefill.push((FieldKey::AdminUrl, FieldValue::from(url)));
            }
            if let Some(user) = username {
                prefill.push((FieldKey::Username, FieldValue::from(user)));
            }
            crate::tui::run(&config, prefill).await
        }
        Some(Commands::Run(args)) => cmd_run(&config, args).await,
        Some(Commands::Locations) => cmd_locations(&config),
        Some(Commands::Init { force }) => cmd_init(force),
        Some(Commands::Config) => cmd_config(&config),
        Some(Commands::Logs { operation }) => cmd_logs(operation),
    }
}

/// Load configuration from file or defaults
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let config = if let Some(path) = config_path {
        Config::load_from_path(path)?
    } else {
        Config::load()?
    };

    config.validate()?;

    Ok(config)
}

/// Fill a controller's form from `run` flags
fn apply_run_args(controller: &mut SessionController, args: &RunArgs) -> Result<()> {
    let mut fields: Vec<(FieldKey, FieldValue)> = vec![
        (FieldKey::AdminUrl, args.admin_url.as_str().into()),
        (FieldKey::Username, args.username.as_str().into()),
        (FieldKey::Password, args.password.as_str().into()),
        (FieldKey::RocketToken, args.rocket_token.as_str().into()),
        (FieldKey::RocketName, args.rocket_name.as_str().into()),
        (FieldKey::RocketLabel, args.rocket_label.as_str().into()),
        (FieldKey::Visual, args.visual.into()),
    ];
    if let Some(code) = args.rocket_location {
        fields.push((FieldKey::RocketLocation, code.to_string().into()));
    }

    for (key, value) in fields {
        controller
            .update_field(key, value)
            .with_context(|| format!("Invalid --{}", flag_name(key)))?;
    }
    Ok(())
}

fn flag_name(key: FieldKey) -> &'static str {
    match key {
        FieldKey::AdminUrl => "admin-url",
        FieldKey::Username => "username",
        FieldKey::Password => "password",
        FieldKey::RocketToken => "rocket-token",
        FieldKey::RocketName => "rocket-name",
        FieldKey::RocketLocation => "rocket-location",
        FieldKey::RocketLabel => "rocket-label",
        FieldKey::Visual => "visual",
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunSummary<'a> {
    #[serde(flatten)]
    outcome: &'a StreamOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    records: usize,
    errors: usize,
}

fn print_record(record: &LogRecord, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", record.text),
        OutputFormat::Json => println!("{}", serde_json::to_string(record)?),
    }
    Ok(())
}

/// Headless launch: same controller and consumer as the wizard, records
/// printed as they arrive
async fn cmd_run(config: &Config, args: RunArgs) -> Result<()> {
    let client: Arc<dyn MigrationClient> = Arc::new(HttpMigrationClient::new(&config.service)?);
    let format = args.format;

    let mut controller = SessionController::new(config.defaults.clone());
    apply_run_args(&mut controller, &args)?;
    controller.next()?;
    let ticket = controller.launch()?;
    tracing::info!(session = %ticket.session_id, endpoint = client.endpoint(), "headless run started");

    for record in controller.console().records() {
        print_record(record, format)?;
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let (tx, mut rx) = mpsc::unbounded_channel::<SessionEvent>();
    let task = spawn_session(client, ticket, tx, cancel);

    while let Some(event) = rx.recv().await {
        let finished = matches!(event.kind, SessionEventKind::Finished(_));
        if controller.apply(event)
            && !finished
            && let Some(record) = controller.console().last()
        {
            print_record(record, format)?;
        }
        if finished {
            break;
        }
    }
    task.await.context("Migration task panicked")?;

    let outcome = controller
        .last_outcome()
        .cloned()
        .unwrap_or(StreamOutcome::Cancelled);
    let console = controller.console();

    if format == OutputFormat::Json {
        let summary = RunSummary {
            outcome: &outcome,
            code: outcome.error_code().map(|c| c.as_str()),
            records: console.len(),
            errors: console.error_count(),
        };
        println!("{}", serde_json::to_string(&summary)?);
    }

    if outcome.is_success() {
        Ok(())
    } else {
        anyhow::bail!("Migration did not complete: {}", outcome.describe())
    }
}

fn cmd_locations(config: &Config) -> Result<()> {
    println!("Rocket.net regions\n");
    for loc in LOCATIONS {
        let marker = if loc.code == config.defaults.rocket_location {
            " (default)"
        } else if loc.code == DEFAULT_LOCATION {
            " (built-in default)"
        } else {
            ""
        };
        println!("  {:>3}  {}{}", loc.code, loc.label, marker);
    }
    Ok(())
}

/// Initialize configuration file
fn cmd_init(force: bool) -> Result<()> {
    println!("wp-migrator configuration initialization\n");

    let config_path =
        Config::system_config_path().context("Could not determine config directory")?;

    if config_path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at: {}\nUse --force to overwrite",
            config_path.display()
        );
    }

    Config::default().save(&config_path)?;

    println!("Configuration initialized at: {}", config_path.display());
    println!("\nNext steps:");
    println!("   1. Point [service].base_url at your migration service");
    println!("   2. Run 'wp-migrator' to start the wizard");

    Ok(())
}

/// Show configuration
fn cmd_config(config: &Config) -> Result<()> {
    println!("wp-migrator configuration\n");
    println!("Launch endpoint: {}", config.service.launch_url());
    println!(
        "Connect timeout: {}s",
        config.service.connect_timeout_secs
    );
    println!("Log level: {}", config.logging.level);
    println!(
        "Default region: {} ({})",
        config.defaults.rocket_location,
        crate::migration::form::location_label(config.defaults.rocket_location)
    );
    println!("Visual mode: {}", config.defaults.visual);

    if let Some(path) = Config::system_config_path() {
        println!(
            "\nConfig file: {} ({})",
            path.display(),
            if path.exists() { "present" } else { "not created" }
        );
    }

    Ok(())
}

fn cmd_logs(operation: LogCommands) -> Result<()> {
    use crate::logging;

    let log_dir = logging::default_log_dir();

    match operation {
        LogCommands::Status => {
            println!("wp-migrator logging status\n");
            println!("Log directory: {}", log_dir.display());

            let files = logging::list_log_files()?;
            if files.is_empty() {
                println!("Status: no logs found");
            } else {
                let total_size: u64 = files
                    .iter()
                    .filter_map(|p| std::fs::metadata(p).ok())
                    .map(|m| m.len())
                    .sum();
                println!("Log files: {}", files.len());
                println!("Total size: {:.2} MB", total_size as f64 / (1024.0 * 1024.0));
                println!("Latest log: {}", files[0].display());
            }

            println!("\nTo enable debug logging, run with -d flag:");
            println!("   wp-migrator -d");
            Ok(())
        }

        LogCommands::Clean { days } => {
            println!("Cleaning up log files older than {} days...\n", days);
            let removed = logging::cleanup_old_logs(days)?;
            if removed > 0 {
                println!("Removed {} old log file(s)", removed);
            } else {
                println!("No old log files to remove");
            }
            Ok(())
        }
    }
}
