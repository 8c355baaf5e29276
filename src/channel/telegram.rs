//! Telegram Bot API client using raw reqwest (no framework).
//!
//! Long-polls `getUpdates` and sends plain-text replies via `sendMessage`.
//! The update offset is owned by the caller, not by this client.
//! The bot's own username is looked up once via `getMe` so that commands
//! addressed to another bot (`/status@otherbot`) in a group are ignored.

use std::time::Duration;

use super::{Channel, ChannelEvent, InboundUpdate, OutboundMessage};
use async_trait::async_trait;
use color_eyre::eyre::{Result, WrapErr};
use serde::Deserialize;
use tokio::sync::OnceCell;

/// Maximum message length for Telegram (we chunk below this).
const MAX_MESSAGE_LEN: usize = 4000;

/// Seconds Telegram holds a `getUpdates` request open.
const LONG_POLL_SECS: u64 = 30;

/// Client-side ceiling on a long poll; a little above [`LONG_POLL_SECS`].
const LONG_POLL_TIMEOUT: Duration = Duration::from_secs(35);

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Telegram Bot API client.
pub struct TelegramChannel {
    bot_token: String,
    client: reqwest::Client,
    username: OnceCell<String>,
}

// --- Telegram API response types ---

#[derive(Debug, Deserialize)]
struct TgResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgUpdate {
    update_id: i64,
    message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    chat: TgChat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    username: Option<String>,
}

impl TelegramChannel {
    pub fn new(bot_token: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .wrap_err("failed to build Telegram HTTP client")?;

        Ok(Self {
            bot_token,
            client,
            username: OnceCell::new(),
        })
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.bot_token)
    }

    /// The bot's own username, fetched on first use and cached.
    async fn own_username(&self) -> Result<&str> {
        let name = self
            .username
            .get_or_try_init(|| async {
                let body: TgResponse<TgUser> = self
                    .client
                    .get(self.api_url("getMe"))
                    .timeout(SEND_TIMEOUT)
                    .send()
                    .await
                    .wrap_err("getMe request failed")?
                    .json()
                    .await
                    .wrap_err("failed to decode getMe response")?;
                if !body.ok {
                    let desc = body.description.unwrap_or_default();
                    color_eyre::eyre::bail!("getMe failed: {desc}");
                }
                body.result
                    .and_then(|user| user.username)
                    .ok_or_else(|| color_eyre::eyre::eyre!("getMe returned no username"))
            })
            .await?;
        Ok(name.as_str())
    }

    /// Parse a message into a ChannelEvent.
    ///
    /// Commands suffixed with another bot's name are dropped.
    fn parse_message(msg: &TgMessage, own_username: &str) -> Option<ChannelEvent> {
        let text = msg.text.as_deref()?.trim();
        if text.is_empty() {
            return None;
        }

        if let Some(rest) = text.strip_prefix('/') {
            // Split command from args: "/status abc" -> ("status", "abc")
            let (command, args) = match rest.split_once(char::is_whitespace) {
                Some((cmd, args)) => (cmd, args),
                None => (rest, ""),
            };
            // Strip @botname suffix from commands like "/status@mybot"
            let command = match command.split_once('@') {
                Some((cmd, bot)) if bot.eq_ignore_ascii_case(own_username) => cmd,
                Some(_) => return None,
                None => command,
            };
            Some(ChannelEvent::Command {
                chat_id: msg.chat.id,
                command: command.to_owned(),
                args: args.trim().to_owned(),
            })
        } else {
            Some(ChannelEvent::Message {
                chat_id: msg.chat.id,
                text: text.to_owned(),
            })
        }
    }

    fn parse_update(update: TgUpdate, own_username: &str) -> InboundUpdate {
        InboundUpdate {
            update_id: update.update_id,
            event: update
                .message
                .as_ref()
                .and_then(|msg| Self::parse_message(msg, own_username)),
        }
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn is_configured(&self) -> bool {
        !self.bot_token.is_empty()
    }

    async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<InboundUpdate>> {
        if !self.is_configured() {
            color_eyre::eyre::bail!("bot token not configured");
        }
        let own_username = self.own_username().await?;

        let mut query = vec![("timeout", LONG_POLL_SECS.to_string())];
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }

        let resp = self
            .client
            .get(self.api_url("getUpdates"))
            .query(&query)
            .timeout(LONG_POLL_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable>".to_string());
            color_eyre::eyre::bail!("getUpdates returned {status}: {body}");
        }

        let body: TgResponse<Vec<TgUpdate>> = resp.json().await?;
        if !body.ok {
            let desc = body.description.unwrap_or_default();
            color_eyre::eyre::bail!("Telegram API error: {desc}");
        }

        Ok(body
            .result
            .unwrap_or_default()
            .into_iter()
            .map(|update| Self::parse_update(update, own_username))
            .collect())
    }

    async fn send_message(&self, msg: &OutboundMessage) -> Result<()> {
        if !self.is_configured() {
            color_eyre::eyre::bail!("bot token not configured");
        }

        for chunk in chunk_message(&msg.text) {
            let resp = self
                .client
                .post(self.api_url("sendMessage"))
                .timeout(SEND_TIMEOUT)
                .json(&serde_json::json!({
                    "chat_id": msg.chat_id,
                    "text": chunk,
                }))
                .send()
                .await?;

            let body: TgResponse<serde_json::Value> = resp.json().await?;
            if !body.ok {
                let desc = body.description.unwrap_or_default();
                color_eyre::eyre::bail!("sendMessage failed: {desc}");
            }
        }
        Ok(())
    }
}

/// Split a message into chunks that fit within Telegram's limit.
fn chunk_message(text: &str) -> Vec<&str> {
    if text.len() <= MAX_MESSAGE_LEN {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= MAX_MESSAGE_LEN {
            chunks.push(remaining);
            break;
        }

        // Split at a newline within the limit, else at the last char boundary.
        let mut limit = MAX_MESSAGE_LEN;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }
        let split_at = remaining[..limit].rfind('\n').unwrap_or(limit);

        let (chunk, rest) = remaining.split_at(split_at);
        chunks.push(chunk);
        // Skip the newline we split on.
        remaining = rest.strip_prefix('\n').unwrap_or(rest);
    }

    chunks
}
