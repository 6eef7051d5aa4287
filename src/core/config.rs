use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 6.1) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/41.0.2228.0 Safari/537.36";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub marketplace: MarketplaceConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub watchlist_path: PathBuf,
    pub settings_path: PathBuf,
    pub image_cache_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketplaceConfig {
    pub listings_url: String,
    pub float_api_url: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub health_port: u16,
    pub log_level: String,
    pub event_capacity: usize,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            listings_url: "https://steamcommunity.com/market/listings/730".to_string(),
            float_api_url: "https://api.csgofloat.com".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let marketplace_defaults = MarketplaceConfig::default();

        Ok(Config {
            storage: StorageConfig {
                watchlist_path: env::var("FLOATWATCH_WATCHLIST_PATH")
                    .unwrap_or_else(|_| "weapons.json".to_string())
                    .into(),
                settings_path: env::var("FLOATWATCH_SETTINGS_PATH")
                    .unwrap_or_else(|_| "worker_settings.json".to_string())
                    .into(),
                image_cache_dir: env::var("FLOATWATCH_IMAGE_CACHE_DIR")
                    .unwrap_or_else(|_| "image_cache".to_string())
                    .into(),
            },
            marketplace: MarketplaceConfig {
                listings_url: env::var("FLOATWATCH_LISTINGS_URL")
                    .unwrap_or(marketplace_defaults.listings_url),
                float_api_url: env::var("FLOATWATCH_FLOAT_API_URL")
                    .unwrap_or(marketplace_defaults.float_api_url),
                user_agent: env::var("FLOATWATCH_USER_AGENT")
                    .unwrap_or(marketplace_defaults.user_agent),
            },
            monitoring: MonitoringConfig {
                health_port: parse_var("HEALTH_PORT", 3000)?,
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
                event_capacity: parse_var("EVENT_CAPACITY", 256)?,
            },
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}
