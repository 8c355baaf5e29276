//! In-memory player state shared by the monitor and the command listener.
//!
//! The store is created once from the configured directory and never grows
//! or shrinks. The monitor is the only writer; readers get cloned snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::presence::Presence;

/// Everything known about one watched player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedUser {
    pub username: String,
    /// Opaque platform id, `None` until resolution succeeds.
    pub id: Option<String>,
    /// Epoch seconds the player was last online.
    pub last_seen: Option<i64>,
    pub status: Presence,
}

impl TrackedUser {
    fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            id: None,
            last_seen: None,
            status: Presence::Unknown,
        }
    }
}

/// A read-only copy of every tracked user, in directory order.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub users: Vec<TrackedUser>,
}

impl StatusSnapshot {
    pub fn get(&self, username: &str) -> Option<&TrackedUser> {
        self.users.iter().find(|u| u.username == username)
    }
}

#[derive(Debug, Default)]
struct Directory {
    order: Vec<String>,
    users: HashMap<String, TrackedUser>,
}

/// Cloneable handle to the shared player table.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    inner: Arc<RwLock<Directory>>,
}

impl StateStore {
    /// One entry per username; repeats after the first are ignored.
    pub fn new<S: AsRef<str>>(usernames: &[S]) -> Self {
        let mut dir = Directory::default();
        for name in usernames {
            let name = name.as_ref();
            if dir.users.contains_key(name) {
                continue;
            }
            dir.order.push(name.to_string());
            dir.users.insert(name.to_string(), TrackedUser::new(name));
        }
        Self {
            inner: Arc::new(RwLock::new(dir)),
        }
    }

    /// Usernames in directory order.
    pub async fn usernames(&self) -> Vec<String> {
        self.inner.read().await.order.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.order.len()
    }

    pub async fn get(&self, username: &str) -> Option<TrackedUser> {
        self.inner.read().await.users.get(username).cloned()
    }

    /// Record a resolved platform id. Unknown usernames are ignored.
    pub async fn set_id(&self, username: &str, id: String) {
        if let Some(user) = self.inner.write().await.users.get_mut(username) {
            user.id = Some(id);
        }
    }

    /// Record a last-seen time. `None` keeps whatever was there.
    pub async fn record_last_seen(&self, username: &str, last_seen: Option<i64>) {
        let Some(ts) = last_seen else {
            return;
        };
        if let Some(user) = self.inner.write().await.users.get_mut(username) {
            user.last_seen = Some(ts);
        }
    }

    /// Store a new status and return the one it replaced, under one lock.
    ///
    /// Returns `None` for usernames outside the directory.
    pub async fn swap_status(&self, username: &str, status: Presence) -> Option<Presence> {
        let mut dir = self.inner.write().await;
        let user = dir.users.get_mut(username)?;
        Some(std::mem::replace(&mut user.status, status))
    }

    pub async fn snapshot(&self) -> StatusSnapshot {
        let dir = self.inner.read().await;
        let users = dir
            .order
            .iter()
            .filter_map(|name| dir.users.get(name).cloned())
            .collect();
        StatusSnapshot { users }
    }
}
