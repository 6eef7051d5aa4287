pub mod events;
pub mod metrics;
pub mod monitor;
pub mod predicate;
pub mod supervisor;

pub use events::{drain_events, EventBus, MonitorEvent, MonitorStatus};
pub use metrics::{PollMetrics, PollMetricsSnapshot};
pub use monitor::{Monitor, MonitorOutcome, MonitorSettings, MonitorState};
pub use predicate::{FloatRule, MatchRule, PriceRule};
pub use supervisor::{MonitorSupervisor, StartOutcome};
