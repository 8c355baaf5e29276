//! Fire-and-forget delivery to the configured chat.

use std::sync::Arc;

use tracing::{debug, error};

use crate::channel::{Channel, OutboundMessage};

/// Sends text to one recipient chat. Failures are logged, never returned.
#[derive(Clone)]
pub struct Notifier {
    channel: Arc<dyn Channel>,
    chat_id: Option<i64>,
}

impl Notifier {
    pub fn new(channel: Arc<dyn Channel>, chat_id: Option<i64>) -> Self {
        Self { channel, chat_id }
    }

    pub async fn send(&self, text: &str) {
        let Some(chat_id) = self.chat_id else {
            error!("CHAT_ID not set, dropping message");
            return;
        };

        let msg = OutboundMessage {
            chat_id,
            text: text.to_string(),
        };
        match self.channel.send_message(&msg).await {
            Ok(()) => debug!("sent {} bytes via {}", msg.text.len(), self.channel.name()),
            Err(e) => error!("{} send error: {e}", self.channel.name()),
        }
    }
}
