//! Command listener: answers `/status` from the authorized chat.
//!
//! Owns the update cursor: each poll asks for updates after the last one
//! processed, so nothing is handled twice while the process is up.

use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::channel::{Channel, ChannelEvent, InboundUpdate};
use crate::notifier::Notifier;
use crate::snapshot::render_status;
use crate::state::StateStore;

/// The only command the bot understands.
pub const STATUS_COMMAND: &str = "status";

/// Pause between long polls.
pub const POLL_DELAY: Duration = Duration::from_secs(2);

/// Whether an inbound event is the status command: exactly `/status`,
/// any case. The channel strips a `@botname` suffix addressed to this bot.
pub fn is_status_command(event: &ChannelEvent) -> bool {
    matches!(
        event,
        ChannelEvent::Command { command, args, .. }
            if command.eq_ignore_ascii_case(STATUS_COMMAND) && args.is_empty()
    )
}

pub struct CommandListener {
    channel: Arc<dyn Channel>,
    notifier: Notifier,
    store: StateStore,
    tz: Tz,
    /// Only this chat may issue commands; `None` accepts any chat.
    authorized_chat: Option<i64>,
    /// Highest update id processed so far.
    cursor: Option<i64>,
}

impl CommandListener {
    pub fn new(
        channel: Arc<dyn Channel>,
        notifier: Notifier,
        store: StateStore,
        tz: Tz,
        authorized_chat: Option<i64>,
    ) -> Self {
        Self {
            channel,
            notifier,
            store,
            tz,
            authorized_chat,
            cursor: None,
        }
    }

    pub fn cursor(&self) -> Option<i64> {
        self.cursor
    }

    fn is_authorized(&self, chat_id: i64) -> bool {
        self.authorized_chat.is_none_or(|allowed| allowed == chat_id)
    }

    /// Fetch and handle one batch of updates. Returns how many were handled.
    pub async fn poll_once(&mut self) -> color_eyre::Result<usize> {
        let offset = self.cursor.map(|c| c + 1);
        let updates = self.channel.get_updates(offset).await?;
        let count = updates.len();
        for update in updates {
            self.handle_update(update).await;
        }
        Ok(count)
    }

    /// Advance the cursor past `update` and act on it if it is ours.
    pub async fn handle_update(&mut self, update: InboundUpdate) {
        self.cursor = Some(self.cursor.map_or(update.update_id, |c| c.max(update.update_id)));

        let Some(event) = update.event else {
            return;
        };

        if !self.is_authorized(event.chat_id()) {
            debug!(
                "ignoring update {} from unauthorized chat {}",
                update.update_id,
                event.chat_id()
            );
            return;
        }

        if is_status_command(&event) {
            info!("/status requested by chat {}", event.chat_id());
            self.send_status().await;
        }
    }

    async fn send_status(&self) {
        let directory = self.store.usernames().await;
        let snapshot = self.store.snapshot().await;
        let text = render_status(&directory, &snapshot, &self.tz);
        self.notifier.send(&text).await;
    }

    /// Poll until `cancel` fires. Exits at once if the channel has no credentials.
    pub async fn run(mut self, cancel: CancellationToken) {
        if !self.channel.is_configured() {
            warn!(
                "{} not configured, command listener disabled",
                self.channel.name()
            );
            return;
        }
        info!("listening for commands on {}", self.channel.name());

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.poll_once() => result,
            };
            if let Err(e) = result {
                error!("command poll error: {e}");
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(POLL_DELAY) => {}
            }
        }

        info!("command listener stopped");
    }
}
