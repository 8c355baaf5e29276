//! chess.com presence source: public API plus the site's presence service.
//!
//! Three endpoints are involved:
//! - `callback/user/popup/{username}` resolves the player's `uuid`
//! - `pub/player/{username}` carries `last_online` (epoch seconds)
//! - `service/presence/users?ids={uuid}` reports the live status
//!
//! The site endpoints reject non-browser user agents, so every request
//! carries a desktop Chrome UA. Rate limits and gateway errors are retried
//! here with exponential backoff; anything else is returned as a [`FetchError`].

use std::time::Duration;

use async_trait::async_trait;
use color_eyre::eyre::{Result, WrapErr};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{FetchError, Presence, PresenceSource};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Total tries per request, including the first.
const MAX_ATTEMPTS: u32 = 5;

const BACKOFF_BASE: Duration = Duration::from_millis(500);

const SITE_BASE: &str = "https://www.chess.com";
const API_BASE: &str = "https://api.chess.com";

// --- response shapes ---

#[derive(Debug, Deserialize)]
struct PopupResponse {
    uuid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlayerResponse {
    last_online: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct PresenceResponse {
    #[serde(default)]
    users: Vec<PresenceUser>,
}

#[derive(Debug, Deserialize)]
struct PresenceUser {
    status: Option<String>,
}

/// chess.com client, reused across sweeps for connection pooling.
pub struct ChessComClient {
    client: reqwest::Client,
    site_base: String,
    api_base: String,
}

impl ChessComClient {
    pub fn new() -> Result<Self> {
        Self::with_base_urls(SITE_BASE, API_BASE)
    }

    /// Point the client at other hosts (a proxy or a local stand-in).
    pub fn with_base_urls(site_base: &str, api_base: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .wrap_err("failed to build chess.com HTTP client")?;

        Ok(Self {
            client,
            site_base: site_base.trim_end_matches('/').to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    /// GET `url` and decode JSON, retrying transient failures.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let mut attempt = 1;
        loop {
            match self.client.get(url).query(query).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(resp.json::<T>().await?),
                Ok(resp) if is_retryable(resp.status()) && attempt < MAX_ATTEMPTS => {
                    debug!(
                        "{endpoint} returned {}, retrying ({attempt}/{MAX_ATTEMPTS})",
                        resp.status()
                    );
                }
                Ok(resp) => {
                    return Err(FetchError::Status {
                        endpoint,
                        status: resp.status().as_u16(),
                    });
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < MAX_ATTEMPTS => {
                    debug!("{endpoint} request failed: {e}, retrying ({attempt}/{MAX_ATTEMPTS})");
                }
                Err(e) => return Err(e.into()),
            }

            tokio::time::sleep(backoff(attempt)).await;
            attempt += 1;
        }
    }
}

/// Statuses worth another try: rate limiting and gateway trouble.
fn is_retryable(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

/// Delay after the `attempt`-th failure: 0.5s, 1s, 2s, 4s.
fn backoff(attempt: u32) -> Duration {
    BACKOFF_BASE * 2u32.pow(attempt.saturating_sub(1))
}

#[async_trait]
impl PresenceSource for ChessComClient {
    fn name(&self) -> &str {
        "chess.com"
    }

    async fn resolve_id(&self, username: &str) -> Result<String, FetchError> {
        let url = format!("{}/callback/user/popup/{username}", self.site_base);
        let popup: PopupResponse = self.get_json("popup", &url, &[]).await?;
        popup
            .uuid
            .filter(|id| !id.is_empty())
            .ok_or(FetchError::MissingField("uuid"))
    }

    async fn last_online(&self, username: &str) -> Result<Option<i64>, FetchError> {
        let url = format!("{}/pub/player/{username}", self.api_base);
        let player: PlayerResponse = self.get_json("player", &url, &[]).await?;
        Ok(player.last_online)
    }

    async fn presence(&self, id: &str) -> Result<Presence, FetchError> {
        let url = format!("{}/service/presence/users", self.site_base);
        let resp: PresenceResponse = self.get_json("presence", &url, &[("ids", id)]).await?;
        let status = resp
            .users
            .into_iter()
            .next()
            .and_then(|u| u.status)
            .ok_or(FetchError::MissingField("users[0].status"))?;
        Ok(Presence::from_api(&status))
    }
}
