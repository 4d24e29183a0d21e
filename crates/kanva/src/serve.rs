// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kanva serve` command implementation.
//!
//! Wires the Telegram adapter, the SQLite store, and the Gemini provider
//! into the engine loop, then runs until a shutdown signal arrives. The
//! media-group sweeper and the failed-generation replay scheduler run as
//! background tasks on the same cancellation token.

use std::sync::Arc;

use kanva_config::KanvaConfig;
use kanva_core::KanvaError;
use kanva_engine::{Engine, EngineDeps, GeminiFactory, MediaGroupCache, replay, shutdown};
use kanva_storage::Database;
use kanva_telegram::{TelegramChannel, start_polling};
use tokio::sync::mpsc;
use tracing::info;

/// Inbound event buffer between the polling task and the engine.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Runs the `kanva serve` command.
pub async fn run_serve(config: KanvaConfig) -> Result<(), KanvaError> {
    init_tracing(&config.relay.log_level);

    info!(name = config.relay.name.as_str(), "starting kanva serve");

    let token = config
        .telegram
        .bot_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            eprintln!(
                "error: Telegram bot token required. Set telegram.bot_token in kanva.toml \
                 or the KANVA_TELEGRAM_BOT_TOKEN environment variable."
            );
            KanvaError::Config("telegram.bot_token is not set".to_string())
        })?;
    let channel = TelegramChannel::new(token)?;

    let db = Arc::new(Database::open(&config.storage.database_path).await?);
    info!(
        path = config.storage.database_path.as_str(),
        "storage initialized"
    );

    let cancel = shutdown::install_signal_handler();

    let media_groups = Arc::new(MediaGroupCache::new());
    tokio::spawn(media_groups.clone().run_sweep_loop(cancel.clone()));

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let poll_handle = start_polling(channel.bot().clone(), tx);

    let deps = EngineDeps {
        channel: Arc::new(channel),
        db: db.clone(),
        factory: Arc::new(GeminiFactory),
        media_groups,
        config: Arc::new(config),
    };

    tokio::spawn(replay::run_replay_loop(deps.clone(), cancel.clone()));

    Engine::new(deps).run(rx, cancel).await;

    poll_handle.abort();
    db.close().await?;
    info!("kanva serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kanva={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
