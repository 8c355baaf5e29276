//! Monitor loop: sweeps every tracked player and announces new arrivals.
//!
//! Each sweep walks the directory in order, asks the presence source about
//! every resolved player, and sends exactly one notification per
//! offline→online (or unknown→online) edge. A failed lookup leaves the stored
//! status alone so the next good answer is compared against real data.
//!
//! Players whose id could not be resolved at startup are retried on later
//! sweeps, backing off 1, 2, 4 … sweeps up to [`MAX_RESOLVE_BACKOFF`].
//!
//! Sweeps always run on the configured interval. A sweep where every lookup
//! failed is logged but does not shorten the wait.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::notifier::Notifier;
use crate::presence::{Presence, PresenceSource, fetch_report};
use crate::snapshot::{format_last_seen, online_notification};
use crate::state::StateStore;

/// Longest wait, in sweeps, between id resolution attempts for one player.
pub const MAX_RESOLVE_BACKOFF: u64 = 32;

/// Tally of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Players with an id that were asked about.
    pub checked: usize,
    /// Of those, how many gave no usable answer.
    pub failed: usize,
    /// Online notifications sent.
    pub notified: usize,
    /// Players whose id was resolved during this sweep.
    pub resolved: usize,
}

impl CycleReport {
    /// Every checked player failed, usually an upstream outage.
    pub fn all_failed(&self) -> bool {
        self.checked > 0 && self.failed == self.checked
    }
}

/// True only on a transition into `Online`.
pub fn is_online_edge(previous: Presence, current: Presence) -> bool {
    current == Presence::Online && previous != Presence::Online
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Check {
    Failed,
    Quiet,
    Notified,
}

/// Retry bookkeeping for a player without an id.
#[derive(Debug, Clone, Copy)]
struct PendingResolve {
    failures: u32,
    next_cycle: u64,
}

impl PendingResolve {
    fn after_failure(failures: u32, cycle: u64) -> Self {
        let wait = 2u64
            .saturating_pow(failures.saturating_sub(1))
            .min(MAX_RESOLVE_BACKOFF);
        Self {
            failures,
            next_cycle: cycle + wait,
        }
    }
}

pub struct Monitor {
    source: Arc<dyn PresenceSource>,
    store: StateStore,
    notifier: Notifier,
    tz: Tz,
    interval: Duration,
    cycle: u64,
    pending: HashMap<String, PendingResolve>,
}

impl Monitor {
    pub fn new(
        source: Arc<dyn PresenceSource>,
        store: StateStore,
        notifier: Notifier,
        tz: Tz,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            store,
            notifier,
            tz,
            interval,
            cycle: 0,
            pending: HashMap::new(),
        }
    }

    /// Players still waiting for an id, in no particular order.
    pub fn unresolved(&self) -> Vec<&str> {
        self.pending.keys().map(String::as_str).collect()
    }

    /// Resolve ids and initial last-seen times for the whole directory.
    ///
    /// Returns how many players were resolved.
    pub async fn resolve_all(&mut self) -> usize {
        let mut resolved = 0;
        for username in self.store.usernames().await {
            if self.resolve_user(&username).await {
                resolved += 1;
            } else {
                self.pending
                    .insert(username, PendingResolve::after_failure(1, self.cycle));
            }
        }
        resolved
    }

    async fn resolve_user(&self, username: &str) -> bool {
        let id = match self.source.resolve_id(username).await {
            Ok(id) => id,
            Err(e) => {
                warn!("[X] id not found for {username}: {e}");
                return false;
            }
        };

        let last_seen = match self.source.last_online(username).await {
            Ok(ts) => ts,
            Err(e) => {
                warn!("last_online lookup failed for {username}: {e}");
                None
            }
        };

        info!(
            "[+] {username} id: {id}, last online: {}",
            format_last_seen(last_seen, &self.tz)
        );
        self.store.set_id(username, id).await;
        self.store.record_last_seen(username, last_seen).await;
        true
    }

    /// Retry players whose backoff has elapsed. Returns how many resolved.
    async fn retry_pending(&mut self) -> usize {
        let due: Vec<(String, PendingResolve)> = self
            .pending
            .iter()
            .filter(|(_, p)| p.next_cycle <= self.cycle)
            .map(|(name, p)| (name.clone(), *p))
            .collect();

        let mut resolved = 0;
        for (username, pending) in due {
            if self.resolve_user(&username).await {
                self.pending.remove(&username);
                resolved += 1;
            } else {
                let next = PendingResolve::after_failure(pending.failures + 1, self.cycle);
                debug!(
                    "next id lookup for {username} in {} sweep(s)",
                    next.next_cycle - self.cycle
                );
                self.pending.insert(username, next);
            }
        }
        resolved
    }

    /// Run one sweep over the directory. Per-player failures are counted,
    /// never propagated.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.cycle += 1;
        let mut report = CycleReport {
            resolved: self.retry_pending().await,
            ..CycleReport::default()
        };

        for user in self.store.snapshot().await.users {
            let Some(id) = user.id else {
                continue;
            };
            report.checked += 1;
            match self.check_user(&user.username, &id, user.last_seen).await {
                Check::Failed => report.failed += 1,
                Check::Notified => report.notified += 1,
                Check::Quiet => {}
            }
        }

        report
    }

    async fn check_user(&self, username: &str, id: &str, prior_last_seen: Option<i64>) -> Check {
        let report = fetch_report(self.source.as_ref(), username, id, prior_last_seen).await;
        self.store.record_last_seen(username, report.last_seen).await;

        if report.status == Presence::Unknown {
            debug!("no presence data for {username}");
            return Check::Failed;
        }

        let previous = self
            .store
            .swap_status(username, report.status)
            .await
            .unwrap_or_default();

        if is_online_edge(previous, report.status) {
            info!("{username} is now online (was {previous})");
            self.notifier
                .send(&online_notification(username, report.last_seen, &self.tz))
                .await;
            return Check::Notified;
        }

        if previous != report.status {
            info!("{username}: {previous} -> {}", report.status);
        }
        Check::Quiet
    }

    /// Resolve the directory, then sweep until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        let total = self.store.len().await;
        let resolved = tokio::select! {
            _ = cancel.cancelled() => return,
            n = self.resolve_all() => n,
        };
        info!(
            "[~] monitoring {resolved}/{total} user(s) on {} every {}s",
            self.source.name(),
            self.interval.as_secs()
        );

        loop {
            let report = tokio::select! {
                _ = cancel.cancelled() => break,
                report = self.run_cycle() => report,
            };

            if report.all_failed() {
                error!(
                    "sweep {}: all {} presence checks failed",
                    self.cycle, report.checked
                );
            } else {
                debug!(
                    "sweep {}: {} checked, {} failed, {} notified",
                    self.cycle, report.checked, report.failed, report.notified
                );
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("monitor stopped after {} sweep(s)", self.cycle);
    }
}
