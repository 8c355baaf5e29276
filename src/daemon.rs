//! Daemon mode: presence monitor + Telegram command listener.
//!
//! Runs up to three tasks against one shared [`StateStore`]:
//! 1. the monitor loop (sole writer of player status)
//! 2. the `/status` command listener (reader)
//! 3. the liveness endpoint, when a port is configured
//!
//! SIGTERM/SIGINT cancel all of them.

use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::Result;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::channel::Channel;
use crate::channel::telegram::TelegramChannel;
use crate::commands::CommandListener;
use crate::config::WatchConfig;
use crate::health;
use crate::monitor::Monitor;
use crate::notifier::Notifier;
use crate::presence::chess_com::ChessComClient;
use crate::presence::{PresenceSource, fetch_report};
use crate::snapshot::render_status;
use crate::state::StateStore;

/// Run the daemon in the foreground until a shutdown signal arrives.
pub async fn start(config: WatchConfig) -> Result<()> {
    let tz = config.resolved_timezone();
    let channel: Arc<dyn Channel> =
        Arc::new(TelegramChannel::new(config.telegram.bot_token.clone())?);
    let source: Arc<dyn PresenceSource> = Arc::new(ChessComClient::new()?);
    let notifier = Notifier::new(channel.clone(), config.telegram.chat_id);
    let store = StateStore::new(&config.usernames);

    info!(
        "starting: {} user(s), interval {}s, timezone {tz}",
        config.usernames.len(),
        config.check_interval_secs
    );

    let cancel = CancellationToken::new();
    spawn_shutdown_handler(cancel.clone());

    let monitor = Monitor::new(
        source,
        store.clone(),
        notifier.clone(),
        tz,
        Duration::from_secs(config.check_interval_secs),
    );
    let listener = CommandListener::new(channel, notifier, store, tz, config.telegram.chat_id);

    let mut tasks = JoinSet::new();
    tasks.spawn(monitor.run(cancel.clone()));
    tasks.spawn(listener.run(cancel.clone()));
    if let Some(port) = config.health_port {
        let health_cancel = cancel.clone();
        tasks.spawn(async move {
            if let Err(e) = health::serve(port, health_cancel).await {
                error!("{e:#}");
            }
        });
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!("daemon task ended abnormally: {e}");
        }
    }

    info!("shut down");
    Ok(())
}

/// Cancel `cancel` on SIGTERM or Ctrl-C.
fn spawn_shutdown_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {}
                        _ = sigterm.recv() => {}
                    }
                }
                Err(e) => {
                    warn!("failed to install SIGTERM handler: {e}");
                    let _ = ctrl_c.await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }
        info!("shutdown signal received");
        cancel.cancel();
    });
}

/// Look every player up once and print the status table to stdout.
///
/// Sends nothing to Telegram.
pub async fn print_status(config: &WatchConfig) -> Result<()> {
    let tz = config.resolved_timezone();
    let source = ChessComClient::new()?;
    let store = StateStore::new(&config.usernames);

    for username in store.usernames().await {
        let id = match source.resolve_id(&username).await {
            Ok(id) => id,
            Err(e) => {
                warn!("[X] id not found for {username}: {e}");
                continue;
            }
        };
        let report = fetch_report(&source, &username, &id, None).await;
        store.set_id(&username, id).await;
        store.record_last_seen(&username, report.last_seen).await;
        store.swap_status(&username, report.status).await;
    }

    let directory = store.usernames().await;
    println!("{}", render_status(&directory, &store.snapshot().await, &tz));
    Ok(())
}
