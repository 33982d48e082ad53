use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use passtrack::{
    config::Settings,
    conversation::{run_event_consumer, ConversationEngine},
    db::Database,
    health::serve_health,
    locale::MessageCatalog,
    reconcile::ReconcileController,
    status::{MidpassClient, StatusSource},
    telegram::{run_update_poller, ChatEvent, Notifier, TelegramClient},
};

/// Backpressure bound on the inbound event queue; the poller stops reading
/// new updates while the consumer is behind.
const EVENT_QUEUE_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let settings = Settings::from_env().context("configuration error")?;
    info!("passtrack starting up...");

    let catalog = match &settings.locale_path {
        Some(path) => MessageCatalog::load(path)?,
        None => MessageCatalog::builtin(),
    };

    let db = Database::new(settings.db_path.clone())?;

    let telegram = Arc::new(TelegramClient::new(
        &settings.bot_token,
        settings.http_timeout,
    )?);
    let bot = telegram
        .authenticate()
        .await
        .context("Telegram authentication failed")?;
    info!(
        "authenticated as bot {} ({})",
        bot.username.as_deref().unwrap_or("?"),
        bot.id
    );

    let status_source: Arc<dyn StatusSource> = Arc::new(MidpassClient::new(
        settings.midpass_base_url.clone(),
        settings.http_timeout,
    )?);
    let notifier: Arc<dyn Notifier> = telegram.clone();

    let shutdown = CancellationToken::new();

    let mut reconciler = ReconcileController::new();
    reconciler.start(
        db.clone(),
        status_source.clone(),
        notifier.clone(),
        catalog.clone(),
        settings.reconcile_interval,
        settings.stale_threshold_checks,
    )?;

    let (event_tx, event_rx) = mpsc::channel::<ChatEvent>(EVENT_QUEUE_CAPACITY);

    let poller = tokio::spawn(run_update_poller(
        telegram.clone(),
        event_tx,
        shutdown.clone(),
    ));

    let engine = Arc::new(ConversationEngine::new(
        db,
        status_source,
        notifier,
        catalog,
    ));
    let consumer = tokio::spawn(run_event_consumer(engine, event_rx, shutdown.clone()));

    let mut health = tokio::spawn(serve_health(
        settings.health_addr.clone(),
        shutdown.clone(),
    ));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for shutdown signal")?;
            info!("shutdown signal received");
        }
        result = &mut health => {
            shutdown.cancel();
            reconciler.stop().await?;
            result.context("health task panicked")??;
            anyhow::bail!("health endpoint exited unexpectedly");
        }
    }

    shutdown.cancel();
    reconciler.stop().await?;
    let _ = poller.await;
    let _ = consumer.await;
    let _ = health.await;

    info!("passtrack stopped");
    Ok(())
}
