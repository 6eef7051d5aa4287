use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::events::{EventBus, MonitorEvent, MonitorStatus};
use super::metrics::PollMetrics;
use super::predicate::MatchRule;
use crate::api::{ListingClient, ListingError, ListingSnapshot};
use crate::core::error::{WatchError, WatchResult};
use crate::proxy::{ProxyIdentity, ProxyPool};
use crate::watchlist::WatchedItem;

pub const REASON_NOT_FOUND: &str = "listing no longer available";
pub const REASON_TOO_MANY_ERRORS: &str = "too many consecutive upstream errors";

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub fetch_timeout: Duration,
    /// The monitor fails on this many upstream errors in a row; 0 retries forever.
    pub max_consecutive_errors: u32,
    pub match_rule: MatchRule,
    pub use_proxies: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(10),
            max_consecutive_errors: 5,
            match_rule: MatchRule::default(),
            use_proxies: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MonitorState {
    pub item: WatchedItem,
    pub leased_proxy: Option<ProxyIdentity>,
    pub status: MonitorStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorOutcome {
    Matched(ListingSnapshot),
    Failed(String),
    Stopped,
}

impl MonitorOutcome {
    pub fn status(&self) -> MonitorStatus {
        match self {
            MonitorOutcome::Matched(_) => MonitorStatus::Matched,
            MonitorOutcome::Failed(_) => MonitorStatus::Failed,
            MonitorOutcome::Stopped => MonitorStatus::Stopped,
        }
    }
}

/// Polls one watched item until its target shows up, the listing goes away,
/// upstream keeps failing, or a stop is requested.
///
/// State machine: `Idle -> Polling -> {Matched, Failed, Stopped}`. A leased
/// proxy is held for the monitor's whole life and handed back exactly once
/// before the terminal status becomes visible.
pub struct Monitor {
    id: Uuid,
    state: MonitorState,
    client: Arc<dyn ListingClient>,
    pool: Arc<ProxyPool>,
    settings: MonitorSettings,
    events: Arc<EventBus>,
    metrics: Arc<PollMetrics>,
    status_tx: watch::Sender<MonitorStatus>,
}

impl Monitor {
    pub fn new(
        item: WatchedItem,
        client: Arc<dyn ListingClient>,
        pool: Arc<ProxyPool>,
        settings: MonitorSettings,
        events: Arc<EventBus>,
        metrics: Arc<PollMetrics>,
    ) -> Self {
        let (status_tx, _) = watch::channel(MonitorStatus::Idle);
        Self {
            id: Uuid::new_v4(),
            state: MonitorState {
                item,
                leased_proxy: None,
                status: MonitorStatus::Idle,
            },
            client,
            pool,
            settings,
            events,
            metrics,
            status_tx,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> MonitorStatus {
        self.state.status
    }

    pub fn leased_proxy(&self) -> Option<&ProxyIdentity> {
        self.state.leased_proxy.as_ref()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<MonitorStatus> {
        self.status_tx.subscribe()
    }

    /// Start-time proxy lease. With proxies disabled this is a no-op and the
    /// monitor polls over the direct connection.
    pub fn acquire_proxy(&mut self) -> WatchResult<()> {
        if !self.settings.use_proxies || self.state.leased_proxy.is_some() {
            return Ok(());
        }

        match self.pool.try_lease() {
            Ok(proxy) => {
                debug!("Monitor for '{}' leased proxy {}", self.state.item.label, proxy.address);
                self.state.leased_proxy = Some(proxy);
                Ok(())
            }
            Err(_) => Err(WatchError::NoProxyAvailable),
        }
    }

    /// Run the polling loop to a terminal state.
    ///
    /// `stop` is checked between polls only; a fetch already in flight is
    /// allowed to finish.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> MonitorOutcome {
        self.set_status(MonitorStatus::Polling);
        self.events.publish(MonitorEvent::new(
            self.state.item.label.clone(),
            self.id,
            MonitorStatus::Polling,
        ));

        info!(
            "👀 Watching '{}' for float {} / price {} via {}",
            self.state.item.label,
            self.state.item.target_float,
            self.state.item.target_price,
            self.state
                .leased_proxy
                .as_ref()
                .map(|p| p.address.as_str())
                .unwrap_or("direct connection")
        );

        let mut consecutive_errors: u32 = 0;

        let outcome = loop {
            let stop_requested = *stop.borrow();
            if stop_requested {
                break MonitorOutcome::Stopped;
            }

            match self.poll_once().await {
                Ok(snapshot) => {
                    consecutive_errors = 0;
                    if self.settings.match_rule.matches(&self.state.item, &snapshot) {
                        self.metrics.record_match();
                        break MonitorOutcome::Matched(snapshot);
                    }
                    debug!(
                        "No match for '{}': float {} at ${}",
                        self.state.item.label, snapshot.float, snapshot.price
                    );
                }
                Err(ListingError::NotFound(detail)) => {
                    self.metrics.record_not_found();
                    warn!("Listing for '{}' is gone: {}", self.state.item.label, detail);
                    break MonitorOutcome::Failed(REASON_NOT_FOUND.to_string());
                }
                Err(ListingError::Upstream(detail)) => {
                    self.metrics.record_upstream_error();
                    consecutive_errors += 1;
                    warn!(
                        "Upstream error for '{}' ({} in a row): {}",
                        self.state.item.label, consecutive_errors, detail
                    );
                    let limit = self.settings.max_consecutive_errors;
                    if limit > 0 && consecutive_errors >= limit {
                        break MonitorOutcome::Failed(REASON_TOO_MANY_ERRORS.to_string());
                    }
                }
                Err(ListingError::InvalidReference(detail)) => {
                    break MonitorOutcome::Failed(detail);
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
                changed = stop.changed() => {
                    // Supervisor gone: nobody can observe us any more.
                    if changed.is_err() {
                        break MonitorOutcome::Stopped;
                    }
                }
            }
        };

        self.release_proxy();
        self.set_status(outcome.status());

        match &outcome {
            MonitorOutcome::Matched(snapshot) => info!(
                "🎯 MATCH '{}': float {} at ${}",
                self.state.item.label, snapshot.float, snapshot.price
            ),
            MonitorOutcome::Failed(reason) => {
                warn!("❌ Monitor for '{}' failed: {}", self.state.item.label, reason)
            }
            MonitorOutcome::Stopped => info!("⏹️  Monitor for '{}' stopped", self.state.item.label),
        }

        outcome
    }

    async fn poll_once(&self) -> Result<ListingSnapshot, ListingError> {
        let started = Instant::now();
        let fetch = self
            .client
            .poll(&self.state.item, self.state.leased_proxy.clone());

        let result = match tokio::time::timeout(self.settings.fetch_timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(ListingError::Upstream(format!(
                "fetch timed out after {:?}",
                self.settings.fetch_timeout
            ))),
        };

        self.metrics.record_poll(started.elapsed());
        if result.is_ok() {
            self.metrics.record_success();
        }
        result
    }

    fn release_proxy(&mut self) {
        if let Some(proxy) = self.state.leased_proxy.take() {
            self.pool.release(&proxy);
        }
    }

    fn set_status(&mut self, status: MonitorStatus) {
        self.state.status = status;
        self.status_tx.send_replace(status);
    }
}

impl Drop for Monitor {
    // Covers monitors dropped before reaching a terminal state (never run,
    // or unwound by a panic).
    fn drop(&mut self) {
        self.release_proxy();
    }
}
