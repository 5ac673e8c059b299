use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use ticket_watcher::config::AppConfig;
use ticket_watcher::navigator::PageNavigator;
use ticket_watcher::plugins::PluginManager;
use ticket_watcher::plugins::notifiers::{
    ConsoleNotifier, DesktopNotifier, DesktopOptions, DiscordConfig, DiscordNotifier,
};
use ticket_watcher::scheduler::CheckScheduler;
use ticket_watcher::scraper::ChromeLauncher;
use ticket_watcher::snapshots::SnapshotStore;

#[derive(Debug, Parser)]
#[command(name = "ticket-watcher", version, about = "Watch a ticket search result and alert when it changes")]
struct Cli {
    /// Extra configuration file layered over the built-in defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single check and exit
    #[arg(long)]
    once: bool,

    /// Expected baseline value; overrides watch.expected_value
    #[arg(long)]
    expected: Option<String>,

    /// Show the browser window
    #[arg(long)]
    headful: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if cli.expected.is_some() {
        config.watch.expected_value = cli.expected.clone();
    }
    if cli.headful {
        config.browser.headless = false;
    }

    // Initialize tracing; the guard flushes the log file on exit
    let _guard = ticket_watcher::logging::init(&config.logging).context("Failed to initialize logging")?;

    info!("Starting TCDD monitoring service");
    info!("Target: {}", config.target.url);
    info!(
        "Route: {} -> {} on {}",
        config.route.departure.text, config.route.arrival.text, config.calendar.date
    );
    if let Some(expected) = &config.watch.expected_value {
        info!("Expected value: {}", expected);
    }

    let snapshots = SnapshotStore::new(&config.screenshots);
    snapshots
        .prepare()
        .with_context(|| format!("Failed to create snapshot directory {}", snapshots.dir().display()))?;

    let notifiers = build_notifiers(&config).await;
    let enabled = notifiers.list_notifier_types().await;
    if enabled.is_empty() {
        warn!("No notifiers enabled; changes will only be logged");
    } else {
        info!("Notifiers: {}", enabled.join(", "));
    }
    let interval = config.scheduler.interval();
    let expected = config.watch.expected_value.clone();
    let launcher = Arc::new(ChromeLauncher::new(config.browser.clone()));
    let navigator = Arc::new(PageNavigator::new(Arc::new(config), launcher, snapshots));

    let mut scheduler = CheckScheduler::new(navigator, notifiers, interval, expected);

    if cli.once {
        let result = scheduler.run_once().await;
        info!("Single check finished: {:?}", result);
        return Ok(());
    }

    tokio::select! {
        _ = scheduler.run(None) => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            info!("Shutting down...");
        }
    }

    Ok(())
}

async fn build_notifiers(config: &AppConfig) -> PluginManager {
    let manager = PluginManager::new();
    let notifications = &config.notifications;

    if notifications.console {
        manager.register_notifier(Box::new(ConsoleNotifier::new())).await;
    }

    let desktop = DesktopOptions::from_config(notifications);
    if desktop.sound || desktop.toast || desktop.speech {
        let notifier = DesktopNotifier::for_host(desktop);
        info!("Desktop alerts via {} commands", notifier.platform());
        manager.register_notifier(Box::new(notifier)).await;
    }

    if let Some(webhook_url) = &notifications.discord_webhook_url {
        match DiscordConfig::new(webhook_url.clone(), Some(notifications.discord_username.clone())) {
            Ok(discord) => manager.register_notifier(Box::new(DiscordNotifier::new(discord))).await,
            Err(e) => warn!("Discord notifier disabled: {}", e),
        }
    }

    manager
}
