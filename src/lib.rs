//! Float Watch: watches Steam community market listings for CS items and
//! reports when a listing with the wanted float and price appears.
//!
//! Each watched item gets its own monitor task; monitors share a pool of
//! proxies so concurrent polling does not all leave through one address.

pub mod api;
pub mod core;
pub mod monitoring;
pub mod proxy;
pub mod watchlist;

pub use crate::api::{ListingClient, ListingError, ListingSnapshot, SteamMarketClient};
pub use crate::core::{Config, WatchError, WatchResult, WorkerSettings};
pub use crate::monitoring::{MonitorStatus, MonitorSupervisor};
pub use crate::proxy::{ProxyIdentity, ProxyPool};
pub use crate::watchlist::{WatchedItem, WatchlistStore};
