//! Player presence: what the platform says about a user right now.
//!
//! A [`PresenceSource`] answers three questions: the opaque id behind a
//! username, when the player was last online, and whether that id is online
//! at this moment. [`fetch_report`] combines the last two and absorbs every
//! failure so the monitor loop never sees an error.

pub mod chess_com;

use async_trait::async_trait;
use tracing::warn;

/// Online state as last reported by the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Presence {
    Online,
    Offline,
    /// No usable answer: never fetched, fetch failed, or a status we do not know.
    #[default]
    Unknown,
}

impl Presence {
    /// Map a raw presence string from the API.
    pub fn from_api(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "online" => Self::Online,
            "offline" => Self::Offline,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Presence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a single lookup produced nothing.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("response has no `{0}`")]
    MissingField(&'static str),
}

/// One sweep's view of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceReport {
    pub status: Presence,
    /// Epoch seconds of the last time the player was online.
    pub last_seen: Option<i64>,
}

/// A platform that can be asked about player presence.
#[async_trait]
pub trait PresenceSource: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Resolve the opaque id the presence endpoint is keyed by.
    async fn resolve_id(&self, username: &str) -> Result<String, FetchError>;

    /// Epoch seconds the player was last online, if the platform says.
    async fn last_online(&self, username: &str) -> Result<Option<i64>, FetchError>;

    /// Current presence of a resolved id.
    async fn presence(&self, id: &str) -> Result<Presence, FetchError>;
}

/// Ask `source` about one user, never failing.
///
/// A failed presence lookup reports [`Presence::Unknown`]; a failed
/// last-online lookup keeps `prior_last_seen`.
pub async fn fetch_report(
    source: &dyn PresenceSource,
    username: &str,
    id: &str,
    prior_last_seen: Option<i64>,
) -> PresenceReport {
    let status = match source.presence(id).await {
        Ok(status) => status,
        Err(e) => {
            warn!("presence lookup failed for {username}: {e}");
            Presence::Unknown
        }
    };

    let last_seen = match source.last_online(username).await {
        Ok(Some(ts)) => Some(ts),
        Ok(None) => prior_last_seen,
        Err(e) => {
            warn!("last_online lookup failed for {username}: {e}");
            prior_last_seen
        }
    };

    PresenceReport { status, last_seen }
}
