use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::error::{WatchError, WatchResult};
use crate::api::SteamClientOptions;
use crate::monitoring::{MatchRule, MonitorSettings};
use crate::proxy::ProxyPool;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub enabled: bool,
    pub addresses: Vec<String>,
}

/// Worker settings file. Read once at start and never written back by the
/// monitors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    pub proxy: ProxySettings,
    pub poll_interval_ms: u64,
    pub fetch_timeout_ms: u64,
    /// 0 disables the bound.
    pub max_consecutive_errors: u32,
    pub listings_per_page: u32,
    pub currency: u32,
    pub match_rule: MatchRule,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            proxy: ProxySettings::default(),
            poll_interval_ms: 5_000,
            fetch_timeout_ms: 10_000,
            max_consecutive_errors: 5,
            listings_per_page: 10,
            currency: 1,
            match_rule: MatchRule::default(),
        }
    }
}

impl WorkerSettings {
    /// Load settings from `path`, writing the defaults there on first start.
    pub async fn load_or_create(path: &Path) -> WatchResult<Self> {
        if !tokio::fs::try_exists(path).await? {
            let settings = Self::default();
            settings.save(path).await?;
            tracing::info!("⚙️  Created default worker settings at {:?}", path);
            return Ok(settings);
        }

        let raw = tokio::fs::read_to_string(path).await?;
        let settings: Self = serde_json::from_str(&raw)?;
        settings.validate()?;
        tracing::info!(
            "⚙️  Worker settings loaded (proxies: {}, {} addresses, poll every {}ms)",
            if settings.proxy.enabled { "on" } else { "off" },
            settings.proxy.addresses.len(),
            settings.poll_interval_ms
        );
        Ok(settings)
    }

    /// Reject values that would make every poll fail or spin.
    pub fn validate(&self) -> WatchResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(WatchError::InvalidInput("poll_interval_ms must be greater than 0".into()));
        }
        if self.fetch_timeout_ms == 0 {
            return Err(WatchError::InvalidInput("fetch_timeout_ms must be greater than 0".into()));
        }
        if !(1..=100).contains(&self.listings_per_page) {
            return Err(WatchError::InvalidInput(format!(
                "listings_per_page must be between 1 and 100, got {}",
                self.listings_per_page
            )));
        }
        if self.proxy.enabled && self.proxy.addresses.iter().all(|a| a.trim().is_empty()) {
            tracing::warn!("⚠️  Proxy mode is on but no proxy addresses are configured");
        }
        Ok(())
    }

    pub async fn save(&self, path: &Path) -> WatchResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, serde_json::to_string_pretty(self)?).await?;
        Ok(())
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            fetch_timeout: Duration::from_millis(self.fetch_timeout_ms),
            max_consecutive_errors: self.max_consecutive_errors,
            match_rule: self.match_rule,
            use_proxies: self.proxy.enabled,
        }
    }

    pub fn client_options(&self) -> SteamClientOptions {
        SteamClientOptions {
            request_timeout: Duration::from_millis(self.fetch_timeout_ms),
            listings_per_page: self.listings_per_page,
            currency: self.currency,
        }
    }

    pub fn proxy_pool(&self) -> ProxyPool {
        if self.proxy.enabled {
            ProxyPool::new(self.proxy.addresses.iter().cloned())
        } else {
            ProxyPool::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::{FloatRule, PriceRule};

    #[tokio::test]
    async fn test_load_or_create_writes_defaults() {
        let path = std::env::temp_dir().join(format!("float-watch-settings-{}.json", uuid::Uuid::new_v4()));

        let created = WorkerSettings::load_or_create(&path).await.unwrap();
        assert_eq!(created, WorkerSettings::default());

        let reloaded = WorkerSettings::load_or_create(&path).await.unwrap();
        assert_eq!(reloaded, created);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings: WorkerSettings = serde_json::from_str(
            r#"{
                "proxy": {"enabled": true, "addresses": ["10.0.0.1:3128", "10.0.0.2:3128"]},
                "match_rule": {"float": {"kind": "within", "tolerance": 0.002}, "price": "at_most"}
            }"#,
        )
        .unwrap();

        assert_eq!(settings.poll_interval_ms, 5_000);
        assert_eq!(settings.proxy_pool().len(), 2);

        let monitor = settings.monitor_settings();
        assert!(monitor.use_proxies);
        assert_eq!(monitor.match_rule.float, FloatRule::Within { tolerance: 0.002 });
        assert_eq!(monitor.match_rule.price, PriceRule::AtMost);
    }

    #[test]
    fn test_zero_timeouts_are_rejected() {
        for patch in [
            r#"{"fetch_timeout_ms": 0}"#,
            r#"{"poll_interval_ms": 0}"#,
            r#"{"listings_per_page": 0}"#,
        ] {
            let settings: WorkerSettings = serde_json::from_str(patch).unwrap();
            assert!(
                matches!(settings.validate(), Err(WatchError::InvalidInput(_))),
                "{} should be rejected",
                patch
            );
        }
        assert!(WorkerSettings::default().validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_rejects_invalid_file() {
        let path = std::env::temp_dir().join(format!("float-watch-settings-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{"fetch_timeout_ms": 0}"#).unwrap();

        let err = WorkerSettings::load_or_create(&path).await.unwrap_err();
        assert!(matches!(err, WatchError::InvalidInput(_)));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_disabled_proxies_give_empty_pool() {
        let mut settings = WorkerSettings::default();
        settings.proxy.addresses = vec!["10.0.0.1:3128".to_string()];
        assert!(settings.proxy_pool().is_empty());
        assert!(!settings.monitor_settings().use_proxies);
    }
}
