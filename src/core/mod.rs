pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod settings;

pub use config::Config;
pub use error::{WatchError, WatchResult};
pub use health::HealthChecker;
pub use settings::{ProxySettings, WorkerSettings};
