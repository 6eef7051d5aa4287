use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::api::ListingSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonitorStatus {
    Idle,
    Polling,
    Matched,
    Failed,
    Stopped,
}

impl MonitorStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            MonitorStatus::Matched | MonitorStatus::Failed | MonitorStatus::Stopped
        )
    }
}

impl std::fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            MonitorStatus::Idle => "idle",
            MonitorStatus::Polling => "polling",
            MonitorStatus::Matched => "matched",
            MonitorStatus::Failed => "failed",
            MonitorStatus::Stopped => "stopped",
        };
        f.write_str(text)
    }
}

/// Status change of one monitor, as shown on that item's row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorEvent {
    pub label: String,
    pub monitor_id: Uuid,
    pub status: MonitorStatus,
    pub reason: Option<String>,
    pub snapshot: Option<ListingSnapshot>,
    pub timestamp: DateTime<Utc>,
}

impl MonitorEvent {
    pub fn new(label: impl Into<String>, monitor_id: Uuid, status: MonitorStatus) -> Self {
        Self {
            label: label.into(),
            monitor_id,
            status,
            reason: None,
            snapshot: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_snapshot(mut self, snapshot: ListingSnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

pub struct EventBus {
    sender: broadcast::Sender<MonitorEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: MonitorEvent) {
        match self.sender.send(event) {
            Ok(receivers) => {
                tracing::trace!("📡 Monitor event delivered to {} receivers", receivers);
            }
            Err(broadcast::error::SendError(event)) => {
                tracing::debug!(
                    "No subscribers for {} event of '{}'",
                    event.status,
                    event.label
                );
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.sender.subscribe()
    }
}

/// Feed every event to `handler` until the bus and all monitors holding it
/// are gone. Returns only after the last published event was handled.
pub async fn drain_events<F>(mut rx: broadcast::Receiver<MonitorEvent>, mut handler: F)
where
    F: FnMut(&MonitorEvent),
{
    loop {
        match rx.recv().await {
            Ok(event) => handler(&event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Missed {} monitor events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!MonitorStatus::Idle.is_terminal());
        assert!(!MonitorStatus::Polling.is_terminal());
        assert!(MonitorStatus::Matched.is_terminal());
        assert!(MonitorStatus::Failed.is_terminal());
        assert!(MonitorStatus::Stopped.is_terminal());
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        let id = Uuid::new_v4();
        bus.publish(MonitorEvent::new("AWP | Asiimov", id, MonitorStatus::Failed).with_reason("gone"));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.monitor_id, id);
        assert_eq!(event.reason.as_deref(), Some("gone"));
        assert!(event.is_terminal());
    }

    #[tokio::test]
    async fn test_drain_handles_backlog_then_ends() {
        let bus = EventBus::new(8);
        let rx = bus.subscribe();
        bus.publish(MonitorEvent::new("a", Uuid::new_v4(), MonitorStatus::Polling));
        bus.publish(MonitorEvent::new("a", Uuid::new_v4(), MonitorStatus::Matched));
        drop(bus);

        let mut seen = Vec::new();
        drain_events(rx, |event| seen.push(event.status)).await;
        assert_eq!(seen, vec![MonitorStatus::Polling, MonitorStatus::Matched]);
    }

    #[test]
    fn test_publish_without_subscribers_is_harmless() {
        let bus = EventBus::new(1);
        bus.publish(MonitorEvent::new("x", Uuid::new_v4(), MonitorStatus::Polling));
    }
}
