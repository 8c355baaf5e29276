//! Fakes shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chesswatch::channel::{Channel, ChannelEvent, InboundUpdate, OutboundMessage};
use chesswatch::presence::{FetchError, Presence, PresenceSource};

/// Presence source that replays a script per player.
///
/// Each presence step is `Some(status)` for an answer or `None` for a failed
/// request. An exhausted script keeps failing.
#[derive(Default)]
pub struct ScriptedSource {
    scripts: Mutex<HashMap<String, VecDeque<Option<Presence>>>>,
    last_online: HashMap<String, i64>,
    unresolvable: HashSet<String>,
    resolve_failures: Mutex<HashMap<String, u32>>,
    resolve_calls: Mutex<HashMap<String, u32>>,
    presence_calls: Mutex<u32>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(self, username: &str, script: &[Option<Presence>]) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(id_for(username), script.iter().copied().collect());
        self
    }

    pub fn last_online(mut self, username: &str, ts: i64) -> Self {
        self.last_online.insert(username.to_string(), ts);
        self
    }

    pub fn unresolvable(mut self, username: &str) -> Self {
        self.unresolvable.insert(username.to_string());
        self
    }

    /// Fail the first `failures` id lookups for `username`.
    pub fn flaky_resolve(self, username: &str, failures: u32) -> Self {
        self.resolve_failures
            .lock()
            .unwrap()
            .insert(username.to_string(), failures);
        self
    }

    pub fn resolve_calls(&self, username: &str) -> u32 {
        self.resolve_calls
            .lock()
            .unwrap()
            .get(username)
            .copied()
            .unwrap_or(0)
    }

    /// Presence lookups made so far, across all players.
    pub fn presence_calls(&self) -> u32 {
        *self.presence_calls.lock().unwrap()
    }
}

pub fn id_for(username: &str) -> String {
    format!("uuid-{username}")
}

#[async_trait]
impl PresenceSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn resolve_id(&self, username: &str) -> Result<String, FetchError> {
        *self
            .resolve_calls
            .lock()
            .unwrap()
            .entry(username.to_string())
            .or_default() += 1;

        if self.unresolvable.contains(username) {
            return Err(FetchError::Status {
                endpoint: "popup",
                status: 404,
            });
        }
        if let Some(left) = self.resolve_failures.lock().unwrap().get_mut(username)
            && *left > 0
        {
            *left -= 1;
            return Err(FetchError::MissingField("uuid"));
        }
        Ok(id_for(username))
    }

    async fn last_online(&self, username: &str) -> Result<Option<i64>, FetchError> {
        Ok(self.last_online.get(username).copied())
    }

    async fn presence(&self, id: &str) -> Result<Presence, FetchError> {
        *self.presence_calls.lock().unwrap() += 1;
        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(id)
            .and_then(VecDeque::pop_front)
            .flatten();
        step.ok_or(FetchError::Status {
            endpoint: "presence",
            status: 503,
        })
    }
}

/// Channel that records sends and serves canned update batches.
pub struct RecordingChannel {
    configured: bool,
    batches: Mutex<VecDeque<Vec<InboundUpdate>>>,
    offsets: Mutex<Vec<Option<i64>>>,
    sent: Mutex<Vec<OutboundMessage>>,
}

impl Default for RecordingChannel {
    fn default() -> Self {
        Self {
            configured: true,
            batches: Mutex::new(VecDeque::new()),
            offsets: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::default()
        }
    }

    pub fn with_batch(self, batch: Vec<InboundUpdate>) -> Self {
        self.batches.lock().unwrap().push_back(batch);
        self
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn offsets(&self) -> Vec<Option<i64>> {
        self.offsets.lock().unwrap().clone()
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn get_updates(&self, offset: Option<i64>) -> color_eyre::Result<Vec<InboundUpdate>> {
        self.offsets.lock().unwrap().push(offset);
        Ok(self.batches.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn send_message(&self, msg: &OutboundMessage) -> color_eyre::Result<()> {
        self.sent.lock().unwrap().push(msg.clone());
        Ok(())
    }
}

pub fn status_update(update_id: i64, chat_id: i64) -> InboundUpdate {
    command_update(update_id, chat_id, "status", "")
}

pub fn command_update(update_id: i64, chat_id: i64, command: &str, args: &str) -> InboundUpdate {
    InboundUpdate {
        update_id,
        event: Some(ChannelEvent::Command {
            chat_id,
            command: command.to_string(),
            args: args.to_string(),
        }),
    }
}

pub fn text_update(update_id: i64, chat_id: i64, text: &str) -> InboundUpdate {
    InboundUpdate {
        update_id,
        event: Some(ChannelEvent::Message {
            chat_id,
            text: text.to_string(),
        }),
    }
}
