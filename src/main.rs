//! Slot-Watch main entry point
//!
//! This is the command-line interface for the TestFlight slot watcher.

use anyhow::Context;
use clap::{Parser, Subcommand};
use slot_watch::config::{load_config_or_default, Config};
use slot_watch::notify::validate_webhook;
use slot_watch::storage::{add_target, open_store, remove_target, TargetStore};
use slot_watch::supervisor::{Pm2, Supervisor};
use slot_watch::watcher::{build_http_client, watch, Watcher};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Slot-Watch: TestFlight invite-slot watcher
///
/// Polls TestFlight public invite pages and posts to a Discord webhook when
/// slots open or fill up. Run without a subcommand to start watching.
#[derive(Parser, Debug)]
#[command(name = "slot-watch")]
#[command(version)]
#[command(about = "TestFlight invite-slot watcher", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (optional; defaults apply when absent)
    #[arg(short, long, value_name = "CONFIG", default_value = "slot-watch.toml")]
    config: PathBuf,

    /// Override the target store path
    #[arg(long, value_name = "PATH")]
    store: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch all targets until interrupted (default)
    Run,

    /// Run a single poll cycle and exit
    Check,

    /// List configured targets and their last known state
    List,

    /// Add a target, or replace the URL of an existing one
    Add {
        /// Unique target name
        name: String,
        /// TestFlight public invite URL
        url: String,
    },

    /// Remove a target
    Remove {
        /// Target name
        name: String,
    },

    /// Check a webhook URL and send it a test message
    ValidateWebhook {
        /// Webhook URL (defaults to the configured environment variable)
        url: Option<String>,
    },

    /// Start the watcher under pm2
    Start {
        /// pm2 process name
        #[arg(long, default_value = "slot-watch")]
        name: String,
    },

    /// Stop the pm2-managed watcher
    Stop {
        #[arg(long, default_value = "slot-watch")]
        name: String,
    },

    /// Restart the pm2-managed watcher with the current environment
    Restart {
        #[arg(long, default_value = "slot-watch")]
        name: String,
    },

    /// Show whether the pm2-managed watcher is running
    Status {
        #[arg(long, default_value = "slot-watch")]
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Values from .env win only where the process environment is silent
    if let Ok(path) = dotenv::dotenv() {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let mut config = load_config_or_default(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    if let Some(store) = &cli.store {
        config.storage.path = store.display().to_string();
    }

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => handle_run(&config).await?,
        Command::Check => handle_check(&config).await?,
        Command::List => handle_list(&config)?,
        Command::Add { name, url } => {
            let store = open_store(Path::new(&config.storage.path))?;
            match add_target(&store, &name, &url, &config.storage.url_prefix)? {
                Some(_) => println!("✓ Updated '{}'", name.trim()),
                None => println!("✓ Added '{}'", name.trim()),
            }
        }
        Command::Remove { name } => {
            let store = open_store(Path::new(&config.storage.path))?;
            remove_target(&store, &name)?;
            println!("✓ Removed '{}'", name);
        }
        Command::ValidateWebhook { url } => handle_validate_webhook(&config, url).await?,
        Command::Start { name } => {
            let exe = std::env::current_exe().context("Cannot locate the slot-watch executable")?;
            // pm2 runs the process from its own working directory
            let cwd = std::env::current_dir()?;
            let command = vec![
                exe.display().to_string(),
                "--config".to_string(),
                cwd.join(&cli.config).display().to_string(),
                "--store".to_string(),
                cwd.join(&config.storage.path).display().to_string(),
                "run".to_string(),
            ];
            Pm2::new().start(&name, &command).await?;
            warn_if_no_webhook(&config);
        }
        Command::Stop { name } => Pm2::new().stop(&name).await?,
        Command::Restart { name } => {
            Pm2::new().restart(&name).await?;
            warn_if_no_webhook(&config);
        }
        Command::Status { name } => {
            let running = Pm2::new().is_running(&name).await?;
            println!("{}: {}", name, if running { "running" } else { "not running" });
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("slot_watch=info,warn"),
            1 => EnvFilter::new("slot_watch=debug,info"),
            2 => EnvFilter::new("slot_watch=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the default mode: watch until SIGINT/SIGTERM
async fn handle_run(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Target store: {}", config.storage.path);
    watch(config).await.context("Watcher failed")?;
    Ok(())
}

/// Handles `check`: a single cycle, then a summary
async fn handle_check(config: &Config) -> anyhow::Result<()> {
    let watcher = Watcher::from_config(config)?;
    let report = watcher.run_cycle().await?;

    println!("Checked: {}", report.checked);
    println!("  Fetch failures: {}", report.fetch_failures);
    println!("  Notified: {}", report.notified);
    println!("  Suppressed by cooldown: {}", report.suppressed);
    println!("  Dispatch failures: {}", report.dispatch_failures);
    if report.dispatch_skipped > 0 {
        println!("  Skipped (no webhook): {}", report.dispatch_skipped);
    }
    Ok(())
}

/// Handles `list`: prints each target with its state
fn handle_list(config: &Config) -> anyhow::Result<()> {
    let store = open_store(Path::new(&config.storage.path))?;
    let targets = store.try_load()?;

    if targets.is_empty() {
        println!("No targets are configured.");
        return Ok(());
    }

    println!("Configured targets ({}):", targets.len());
    for target in targets.iter() {
        let state = target
            .state
            .map(|s| s.to_string())
            .unwrap_or_else(|| "never checked".to_string());
        let notified = target
            .last_notified_at
            .map(|t| format!(", last notified {}", t.format("%Y-%m-%d %H:%M:%S UTC")))
            .unwrap_or_default();
        println!("  - {} [{}{}]", target.name, state, notified);
        println!("    {}", target.url);
    }
    Ok(())
}

/// Handles `validate-webhook`
async fn handle_validate_webhook(config: &Config, url: Option<String>) -> anyhow::Result<()> {
    let url = url
        .or_else(|| config.notify.webhook_url())
        .with_context(|| format!("No URL given and {} is not set", config.notify.webhook_env))?;

    let client = build_http_client(&config.http)?;
    validate_webhook(&client, &url).await?;
    println!("✓ Webhook is valid; a test message was sent");
    Ok(())
}

fn warn_if_no_webhook(config: &Config) {
    if config.notify.webhook_url().is_none() {
        tracing::warn!(
            "{} is empty. Notifications are not set.",
            config.notify.webhook_env
        );
    }
}
