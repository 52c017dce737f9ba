//! Subscription Notifier - Main Entry Point
//!
//! Runs once: drains pending subscriber commands, updates the encrypted
//! subscription store, runs the handler for every subscriber and exits.
//! Meant to be started by an external scheduler (cron, systemd timer).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use secrecy::SecretString;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use subscription_notifier::config::{HandlerSpec, NotifierSettings};
use subscription_notifier::handler::{NoopHandler, ProcessHandler, SubscriptionHandler};
use subscription_notifier::notifier::Notifier;
use subscription_notifier::store::CipherStore;
use subscription_notifier::telegram::BotClient;

/// Scheduled Telegram notifier with an encrypted subscription store.
#[derive(Parser, Debug)]
#[command(name = "notifier")]
#[command(about = "Process pending subscriber commands and notify every subscriber")]
#[command(version)]
struct Args {
    /// Path to the encrypted subscription store (created if missing).
    store: PathBuf,

    /// Telegram bot token; also the store passphrase unless NOTIFIER_PASSPHRASE is set.
    token: String,

    /// Handler program run once per subscriber ("noop" or omitted for none).
    handler: Option<String>,

    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    // Load environment variables
    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let settings = NotifierSettings::from_env_with_defaults()
        .context("Failed to load notifier settings from environment")?;

    let cwd = std::env::current_dir().context("Failed to determine working directory")?;
    let handler = build_handler(
        HandlerSpec::parse(args.handler.as_deref(), &cwd).context("Invalid handler reference")?,
        &settings,
    );

    let passphrase = SecretString::from(
        settings
            .passphrase
            .clone()
            .unwrap_or_else(|| args.token.clone()),
    );

    let bot = BotClient::new(args.token, settings.request_timeout())
        .context("Failed to create Bot API client")?
        .with_base_url(settings.api_url.clone())
        .with_parse_mode(settings.parse_mode)
        .with_send_interval(settings.send_interval());

    let mut notifier = Notifier::new(bot, CipherStore::new(&args.store), passphrase, handler);

    info!("Starting notifier run (store: {})", args.store.display());
    let summary = notifier.run().await.context("Notifier run failed")?;

    info!(
        "Run complete: {} update(s) processed, {} subscriber(s) notified, cursor at {}",
        summary.updates,
        summary.subscriptions,
        summary.cursor.last_update_id()
    );

    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Builds the subscription handler selected on the command line.
fn build_handler(spec: HandlerSpec, settings: &NotifierSettings) -> Box<dyn SubscriptionHandler> {
    match spec {
        HandlerSpec::Noop => {
            info!("No handler configured; only subscriber commands will be processed");
            Box::new(NoopHandler)
        }
        HandlerSpec::Program(path) => {
            info!("Using handler program {}", path.display());
            Box::new(ProcessHandler::new(path, settings.handler_timeout()))
        }
    }
}
