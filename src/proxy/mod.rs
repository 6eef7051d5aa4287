pub mod pool;

pub use pool::{PoolError, PoolStats, ProxyIdentity, ProxyPool};
