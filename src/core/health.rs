use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::monitoring::{MonitorSupervisor, PollMetrics, PollMetricsSnapshot};
use crate::proxy::PoolStats;

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentHealth,
    pub active_monitors: Vec<String>,
    pub proxy_pool: PoolStats,
    pub polls: PollMetricsSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub marketplace_api: bool,
    pub proxy_pool: bool,
    #[serde(flatten)]
    pub extra: HashMap<String, bool>,
}

impl ComponentHealth {
    pub fn get(&self, key: &str) -> Option<bool> {
        match key {
            "marketplace_api" => Some(self.marketplace_api),
            "proxy_pool" => Some(self.proxy_pool),
            _ => self.extra.get(key).copied(),
        }
    }
}

#[derive(Clone)]
pub struct HealthChecker {
    start_time: std::time::Instant,
    status: Arc<RwLock<ComponentHealth>>,
    supervisor: MonitorSupervisor,
    metrics: Arc<PollMetrics>,
}

impl HealthChecker {
    pub fn new(supervisor: MonitorSupervisor, metrics: Arc<PollMetrics>) -> Self {
        Self {
            start_time: std::time::Instant::now(),
            status: Arc::new(RwLock::new(ComponentHealth {
                marketplace_api: true,
                proxy_pool: true,
                extra: HashMap::new(),
            })),
            supervisor,
            metrics,
        }
    }

    /// Re-derive component flags from the latest poll outcome and pool usage.
    pub async fn refresh(&self) {
        let marketplace_ok = self.metrics.last_poll_ok();
        let pool = self.supervisor.pool();
        let pool_ok = pool.is_empty() || pool.available() > 0;

        self.update_component("marketplace_api", marketplace_ok).await;
        self.update_component("proxy_pool", pool_ok).await;
    }

    pub async fn get_status(&self) -> HealthStatus {
        let components = self.status.read().await.clone();

        HealthStatus {
            status: if components.marketplace_api {
                "healthy".to_string()
            } else {
                "degraded".to_string()
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            active_monitors: self.supervisor.active_labels().await,
            proxy_pool: self.supervisor.pool().stats(),
            polls: self.metrics.snapshot(),
            components,
        }
    }

    pub async fn update_component(&self, component: &str, healthy: bool) {
        let mut status = self.status.write().await;
        match component {
            "marketplace_api" => status.marketplace_api = healthy,
            "proxy_pool" => status.proxy_pool = healthy,
            _ => {
                status.extra.insert(component.to_string(), healthy);
            }
        }
    }
}
