use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use super::events::{EventBus, MonitorEvent, MonitorStatus};
use super::metrics::PollMetrics;
use super::monitor::{Monitor, MonitorOutcome, MonitorSettings};
use crate::api::ListingClient;
use crate::core::error::WatchResult;
use crate::proxy::ProxyPool;
use crate::watchlist::WatchedItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started(Uuid),
    AlreadyActive,
}

struct MonitorHandle {
    id: Uuid,
    stop: watch::Sender<bool>,
    status: watch::Receiver<MonitorStatus>,
    // Taken by whoever waits for the monitor to finish.
    task: Option<JoinHandle<MonitorOutcome>>,
}

impl MonitorHandle {
    fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(false, |task| task.is_finished())
    }
}

enum StopWaiter {
    Task(Uuid, JoinHandle<MonitorOutcome>),
    Status(watch::Receiver<MonitorStatus>),
}

struct SupervisorInner {
    client: Arc<dyn ListingClient>,
    pool: Arc<ProxyPool>,
    settings: MonitorSettings,
    events: Arc<EventBus>,
    metrics: Arc<PollMetrics>,
    active: Mutex<HashMap<String, MonitorHandle>>,
}

/// Owns the set of running monitors, one per watched label.
#[derive(Clone)]
pub struct MonitorSupervisor {
    inner: Arc<SupervisorInner>,
}

impl MonitorSupervisor {
    pub fn new(
        client: Arc<dyn ListingClient>,
        pool: Arc<ProxyPool>,
        settings: MonitorSettings,
        events: Arc<EventBus>,
        metrics: Arc<PollMetrics>,
    ) -> Self {
        Self {
            inner: Arc::new(SupervisorInner {
                client,
                pool,
                settings,
                events,
                metrics,
                active: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Start monitoring `item` unless a monitor for its label is already
    /// running. A missing proxy fails only this start.
    pub async fn start(&self, item: WatchedItem) -> WatchResult<StartOutcome> {
        let mut active = self.inner.active.lock().await;

        if let Some(handle) = active.get(&item.label) {
            if !handle.is_finished() {
                tracing::debug!("Monitor for '{}' already running", item.label);
                return Ok(StartOutcome::AlreadyActive);
            }
            // Task ended without deregistering (it panicked).
            tracing::warn!("Discarding dead monitor entry for '{}'", item.label);
            active.remove(&item.label);
        }

        let mut monitor = Monitor::new(
            item.clone(),
            self.inner.client.clone(),
            self.inner.pool.clone(),
            self.inner.settings.clone(),
            self.inner.events.clone(),
            self.inner.metrics.clone(),
        );
        let id = monitor.id();

        if let Err(e) = monitor.acquire_proxy() {
            drop(active);
            tracing::warn!("Cannot start monitor for '{}': {}", item.label, e);
            self.inner.events.publish(
                MonitorEvent::new(item.label.clone(), id, MonitorStatus::Failed)
                    .with_reason(e.to_string()),
            );
            return Err(e);
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let status = monitor.subscribe_status();
        let inner = self.inner.clone();
        let label = item.label.clone();
        let span = tracing::info_span!("monitor", label = %label, id = %id);

        // The active map stays locked until the handle is in place, so the
        // task cannot deregister before it is registered.
        let task = tokio::spawn(
            async move {
                let outcome = monitor.run(stop_rx).await;
                inner.on_monitor_terminal(&label, id, &outcome).await;
                outcome
            }
            .instrument(span),
        );

        active.insert(
            item.label.clone(),
            MonitorHandle {
                id,
                stop: stop_tx,
                status,
                task: Some(task),
            },
        );

        tracing::info!("▶️  Started monitor for '{}' ({} active)", item.label, active.len());
        Ok(StartOutcome::Started(id))
    }

    /// Start every item that has no running monitor. Failures are reported
    /// per item and do not stop the batch.
    pub async fn start_all(&self, items: &[WatchedItem]) -> Vec<(String, WatchResult<StartOutcome>)> {
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            let result = self.start(item.clone()).await;
            results.push((item.label.clone(), result));
        }
        results
    }

    /// Ask the monitor for `label` to stop and wait until it has. Returns the
    /// final status, or `None` if nothing was running.
    pub async fn stop(&self, label: &str) -> Option<MonitorStatus> {
        let waiter = {
            let mut active = self.inner.active.lock().await;
            let handle = active.get_mut(label)?;
            Self::request_stop(handle)
        };
        Some(self.wait(label, waiter).await)
    }

    /// Stop every running monitor and wait for all of them, so no proxy
    /// lease survives shutdown.
    pub async fn stop_all(&self) {
        let waiters: Vec<(String, StopWaiter)> = {
            let mut active = self.inner.active.lock().await;
            active
                .iter_mut()
                .map(|(label, handle)| (label.clone(), Self::request_stop(handle)))
                .collect()
        };

        if waiters.is_empty() {
            return;
        }
        tracing::info!("⏹️  Stopping {} monitors...", waiters.len());

        join_all(
            waiters
                .into_iter()
                .map(|(label, waiter)| async move { self.wait(&label, waiter).await }),
        )
        .await;

        tracing::info!("✅ All monitors stopped");
    }

    pub async fn is_active(&self, label: &str) -> bool {
        self.inner.active.lock().await.contains_key(label)
    }

    pub async fn status(&self, label: &str) -> Option<MonitorStatus> {
        let active = self.inner.active.lock().await;
        active.get(label).map(|handle| *handle.status.borrow())
    }

    pub async fn active_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.inner.active.lock().await.keys().cloned().collect();
        labels.sort();
        labels
    }

    pub async fn active_count(&self) -> usize {
        self.inner.active.lock().await.len()
    }

    pub fn pool(&self) -> &Arc<ProxyPool> {
        &self.inner.pool
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.inner.events
    }

    fn request_stop(handle: &mut MonitorHandle) -> StopWaiter {
        // Err only means the monitor already finished.
        let _ = handle.stop.send(true);
        match handle.task.take() {
            Some(task) => StopWaiter::Task(handle.id, task),
            None => StopWaiter::Status(handle.status.clone()),
        }
    }

    async fn wait(&self, label: &str, waiter: StopWaiter) -> MonitorStatus {
        match waiter {
            StopWaiter::Task(id, task) => match task.await {
                Ok(outcome) => outcome.status(),
                Err(e) => {
                    tracing::error!("Monitor task for '{}' died: {}", label, e);
                    self.inner.forget(label, id).await;
                    MonitorStatus::Failed
                }
            },
            StopWaiter::Status(mut status) => {
                match status.wait_for(|s| s.is_terminal()).await {
                    Ok(s) => *s,
                    // Sender dropped without a terminal status: the task died.
                    Err(_) => MonitorStatus::Failed,
                }
            }
        }
    }
}

impl SupervisorInner {
    /// Called from the monitor's own task once it is terminal. The proxy has
    /// already been released at this point.
    async fn on_monitor_terminal(&self, label: &str, id: Uuid, outcome: &MonitorOutcome) {
        self.forget(label, id).await;

        let event = MonitorEvent::new(label, id, outcome.status());
        let event = match outcome {
            MonitorOutcome::Matched(snapshot) => event
                .with_reason(format!(
                    "float {} at ${} found",
                    snapshot.float, snapshot.price
                ))
                .with_snapshot(snapshot.clone()),
            MonitorOutcome::Failed(reason) => event.with_reason(reason.clone()),
            MonitorOutcome::Stopped => event,
        };
        self.events.publish(event);
    }

    async fn forget(&self, label: &str, id: Uuid) {
        let mut active = self.active.lock().await;
        if active.get(label).map(|handle| handle.id) == Some(id) {
            active.remove(label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::MockListingClient;
    use crate::api::{ListingError, ListingSnapshot, RarityColor};
    use crate::core::error::WatchError;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn item(label: &str) -> WatchedItem {
        WatchedItem::new(label, 0.18, dec!(12.00), RarityColor::WHITE)
    }

    fn never_matching() -> MockListingClient {
        let mut client = MockListingClient::new();
        client.expect_poll().returning(|item, _| {
            Ok(ListingSnapshot {
                float: 0.99,
                price: dec!(1000),
                title: item.label.clone(),
                image_ref: String::new(),
                rarity: String::new(),
            })
        });
        client
    }

    fn supervisor(client: MockListingClient, pool: ProxyPool, use_proxies: bool) -> MonitorSupervisor {
        MonitorSupervisor::new(
            Arc::new(client),
            Arc::new(pool),
            MonitorSettings {
                poll_interval: Duration::from_millis(10),
                fetch_timeout: Duration::from_secs(1),
                max_consecutive_errors: 3,
                use_proxies,
                ..MonitorSettings::default()
            },
            Arc::new(EventBus::new(64)),
            Arc::new(PollMetrics::new()),
        )
    }

    #[tokio::test]
    async fn test_second_start_is_noop() {
        let supervisor = supervisor(never_matching(), ProxyPool::empty(), false);

        let first = supervisor.start(item("AWP | Asiimov (Field-Tested)")).await.unwrap();
        let second = supervisor.start(item("AWP | Asiimov (Field-Tested)")).await.unwrap();

        assert!(matches!(first, StartOutcome::Started(_)));
        assert_eq!(second, StartOutcome::AlreadyActive);
        assert_eq!(supervisor.active_count().await, 1);

        supervisor.stop_all().await;
        assert_eq!(supervisor.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_no_proxy_fails_only_new_monitor() {
        let supervisor = supervisor(never_matching(), ProxyPool::new(["10.0.0.1:3128"]), true);
        let mut events = supervisor.events().subscribe();

        supervisor.start(item("A")).await.unwrap();
        let err = supervisor.start(item("B")).await.unwrap_err();
        assert!(matches!(err, WatchError::NoProxyAvailable));

        assert!(supervisor.is_active("A").await);
        assert!(!supervisor.is_active("B").await);

        let failed = loop {
            let event = events.recv().await.unwrap();
            if event.label == "B" {
                break event;
            }
        };
        assert_eq!(failed.status, MonitorStatus::Failed);

        supervisor.stop_all().await;
        assert_eq!(supervisor.pool().available(), 1);
        assert_eq!(supervisor.pool().stats().leases_returned, 1);
    }

    #[tokio::test]
    async fn test_terminal_monitor_deregisters_and_can_restart() {
        let mut client = MockListingClient::new();
        client
            .expect_poll()
            .returning(|_, _| Err(ListingError::NotFound("sold".into())));
        let supervisor = supervisor(client, ProxyPool::empty(), false);
        let mut events = supervisor.events().subscribe();

        supervisor.start(item("Glock-18 | Fade")).await.unwrap();

        let terminal = loop {
            let event = events.recv().await.unwrap();
            if event.is_terminal() {
                break event;
            }
        };
        assert_eq!(terminal.status, MonitorStatus::Failed);
        assert!(!supervisor.is_active("Glock-18 | Fade").await);

        let restarted = supervisor.start(item("Glock-18 | Fade")).await.unwrap();
        assert!(matches!(restarted, StartOutcome::Started(_)));
        supervisor.stop_all().await;
    }

    #[tokio::test]
    async fn test_stop_single_monitor() {
        let supervisor = supervisor(never_matching(), ProxyPool::empty(), false);
        supervisor.start(item("A")).await.unwrap();
        supervisor.start(item("B")).await.unwrap();

        assert_eq!(supervisor.stop("A").await, Some(MonitorStatus::Stopped));
        assert_eq!(supervisor.stop("missing").await, None);
        assert_eq!(supervisor.active_labels().await, vec!["B".to_string()]);

        supervisor.stop_all().await;
    }
}
