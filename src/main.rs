mod bot;
mod config;
mod joke;
mod platform;
mod store;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::Bot;
use crate::config::Config;
use crate::joke::JokeClient;
use crate::platform::slack::SlackSession;
use crate::store::RunStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,norrisbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Configuration loaded");
    info!("  Bot name: {}", config.name);
    info!("  Database: {}", config.db_path.display());

    let store = RunStore::open(&config.db_path)?;

    let session = Arc::new(
        SlackSession::new(&config.api_key, &config.app_token)
            .context("Failed to create Slack session")?,
    );

    let jokes = Arc::new(JokeClient::new());
    let bot = Arc::new(Bot::new(config.name, store, jokes, session.clone()));

    info!("Bot is starting...");

    let (events_tx, events_rx) = mpsc::channel(256);
    let bot_task = tokio::spawn(bot::run(bot, events_rx));

    // The session owns the sender; when it ends, the event loop drains and
    // stops. A session that cannot start takes the process down with it.
    let result = session.run(events_tx).await;
    bot_task.await.ok();
    result
}
