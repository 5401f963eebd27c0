//! Market Notifier Entry Point
//!
//! 1. Loads configuration (config.yaml + environment)
//! 2. Restores the market registry from the state file
//! 3. Starts the rotation scheduler
//! 4. Starts the command feed and command consumer
//! 5. Waits for Ctrl+C and shuts every task down

use std::path::PathBuf;
use std::sync::Arc;

use tokio::signal;
use tracing::{error, info};

use market_notifier::adapters::{TelegramClient, YahooPriceSource};
use market_notifier::config::{self, constants, SanitizedValue};
use market_notifier::core::{
    command_task, inbound_feed_task, ChannelBundle, CommandProcessor, ConfigStore,
    RotationScheduler, SchedulerControl,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env files (if they exist)
    dotenvy::dotenv().ok();
    dotenvy::from_filename("config.env").ok();

    config::init_logging();

    info!("Market notifier starting...");

    let config_path = std::env::var("CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.yaml"));

    let settings = match config::load_settings(&config_path) {
        Ok(settings) => settings,
        Err(e) => {
            error!("[ERROR] Configuration failed: {}", e);
            std::process::exit(1);
        }
    };
    let timezone = settings.tz()?;

    info!(
        bot_token = %SanitizedValue::new(&settings.bot_token),
        channel_id = %settings.channel_id,
        interval_minutes = settings.interval_minutes,
        state_file = %settings.state_file.display(),
        timezone = %timezone,
        "[CONFIG] Settings loaded"
    );
    constants::log_configuration();

    // Registry
    let store = ConfigStore::new(settings.state_file.clone());
    let registry = store.load().into_shared();

    // Collaborators
    let telegram = Arc::new(TelegramClient::new(
        settings.telegram_api_base.clone(),
        settings.bot_token.clone(),
        settings.channel_id.clone(),
        constants::feed_poll_timeout(),
    ));
    let prices = Arc::new(YahooPriceSource::new(settings.price_api_base.clone()));

    let channels = ChannelBundle::new(constants::command_queue_capacity());
    let control = SchedulerControl::new(settings.interval()).into_shared();

    let scheduler = RotationScheduler::new(
        registry.clone(),
        prices,
        telegram.clone(),
        control.clone(),
        constants::fetch_timeout(),
        timezone,
    );
    let processor = CommandProcessor::new(registry, store, control, telegram.clone());

    let scheduler_handle = tokio::spawn(scheduler.run(channels.subscribe_shutdown()));
    let command_handle = tokio::spawn(command_task(
        channels.command_rx,
        processor,
        channels.shutdown_tx.subscribe(),
    ));
    let feed_handle = tokio::spawn(inbound_feed_task(
        telegram,
        channels.command_queue.clone(),
        constants::feed_error_backoff(),
        channels.shutdown_tx.subscribe(),
    ));

    info!("Market notifier running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => info!("[SHUTDOWN] Graceful shutdown initiated"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
    let _ = channels.shutdown_tx.send(());

    for (name, handle) in [
        ("scheduler", scheduler_handle),
        ("commands", command_handle),
        ("feed", feed_handle),
    ] {
        if let Err(e) = handle.await {
            error!(task = name, error = %e, "Task ended abnormally");
        }
    }

    info!("[SHUTDOWN] Clean exit");
    Ok(())
}
