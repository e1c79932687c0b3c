//! Live-news forwarding bot — binary entrypoint.
//! Loads configuration, restores the seen-item store, and runs the poll
//! loop until ctrl-c.

use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use livenews_bot::feed::xueqiu::XueqiuFeed;
use livenews_bot::publish::telegram::TelegramPublisher;
use livenews_bot::{BotConfig, Poller, PollerCfg, SeenStore};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("livenews_bot=info,poller=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    // Missing secrets are the only fatal error; everything past this point
    // is logged and retried.
    let cfg = BotConfig::from_env()?;

    let feed = XueqiuFeed::new()?;
    let publisher = TelegramPublisher::new(&cfg.bot_token, &cfg.channel_id);

    let seen = match &cfg.state_path {
        Some(path) => SeenStore::load(path).await,
        None => SeenStore::new(),
    };
    if !seen.is_empty() {
        tracing::info!(entries = seen.len(), "restored seen-item snapshot");
    }

    let poller = Poller::new(
        feed,
        publisher,
        seen,
        PollerCfg {
            interval_secs: cfg.poll_interval_secs,
            seen_retention_secs: cfg.seen_retention_secs,
            max_publish_attempts: cfg.max_publish_attempts,
            state_path: cfg.state_path.clone(),
        },
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    tracing::info!(
        interval_secs = cfg.poll_interval_secs,
        channel = %cfg.channel_id,
        "starting poll loop"
    );
    poller.run(shutdown_rx).await
}
