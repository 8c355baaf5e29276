//! Channel abstraction for the messaging side (Telegram today).

pub mod telegram;

use async_trait::async_trait;

/// An inbound message, already split into command or plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A regular text message.
    Message { chat_id: i64, text: String },

    /// A slash command (e.g. `/status`), with any `@botname` suffix removed.
    Command {
        chat_id: i64,
        command: String,
        args: String,
    },
}

impl ChannelEvent {
    pub fn chat_id(&self) -> i64 {
        match self {
            Self::Message { chat_id, .. } | Self::Command { chat_id, .. } => *chat_id,
        }
    }
}

/// One item from the inbound queue. `event` is `None` for updates that carry
/// nothing we understand (edits, stickers, joins); they still advance the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundUpdate {
    pub update_id: i64,
    pub event: Option<ChannelEvent>,
}

/// A message to send through a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat_id: i64,
    pub text: String,
}

/// Trait for messaging channel integrations.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Whether the channel has the credentials it needs to talk to anyone.
    fn is_configured(&self) -> bool {
        true
    }

    /// Long-poll for updates with ids at or after `offset`.
    async fn get_updates(&self, offset: Option<i64>) -> color_eyre::Result<Vec<InboundUpdate>>;

    /// Send a message through this channel.
    async fn send_message(&self, msg: &OutboundMessage) -> color_eyre::Result<()>;
}
