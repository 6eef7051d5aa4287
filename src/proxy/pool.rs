use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use thiserror::Error;

/// One outbound network identity and whether a monitor currently holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyIdentity {
    pub address: String,
    pub is_leased: bool,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("no unused proxy available")]
    NotAvailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub total: usize,
    pub leased: usize,
    pub leases_granted: u64,
    pub leases_returned: u64,
}

/// Fixed set of proxies handed out exclusively, one monitor per proxy.
///
/// All operations are short scans under a single lock and never block on
/// I/O, so a plain `std::sync::Mutex` is used; this also lets `Drop` impls
/// return leases.
pub struct ProxyPool {
    proxies: Mutex<Vec<ProxyIdentity>>,
    leases_granted: AtomicU64,
    leases_returned: AtomicU64,
}

impl ProxyPool {
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut proxies = Vec::new();

        for address in addresses {
            let address: String = address.into();
            let address = address.trim().to_string();
            if address.is_empty() {
                continue;
            }
            if !seen.insert(address.clone()) {
                tracing::warn!("Ignoring duplicate proxy address {}", address);
                continue;
            }
            proxies.push(ProxyIdentity {
                address,
                is_leased: false,
            });
        }

        Self {
            proxies: Mutex::new(proxies),
            leases_granted: AtomicU64::new(0),
            leases_returned: AtomicU64::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::<String>::new())
    }

    /// Lease the first free proxy. Never waits: if everything is leased the
    /// caller gets `NotAvailable` straight away.
    pub fn try_lease(&self) -> Result<ProxyIdentity, PoolError> {
        let mut proxies = self.proxies.lock().unwrap_or_else(|e| e.into_inner());

        let proxy = proxies
            .iter_mut()
            .find(|p| !p.is_leased)
            .ok_or(PoolError::NotAvailable)?;
        proxy.is_leased = true;
        self.leases_granted.fetch_add(1, Ordering::Relaxed);

        tracing::debug!("🔐 Leased proxy {}", proxy.address);
        Ok(proxy.clone())
    }

    /// Return a lease. Releasing a proxy that is already free (or unknown)
    /// is a no-op; returns whether anything changed.
    pub fn release(&self, proxy: &ProxyIdentity) -> bool {
        let mut proxies = self.proxies.lock().unwrap_or_else(|e| e.into_inner());

        match proxies
            .iter_mut()
            .find(|p| p.address == proxy.address && p.is_leased)
        {
            Some(entry) => {
                entry.is_leased = false;
                self.leases_returned.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("🔓 Released proxy {}", entry.address);
                true
            }
            None => {
                tracing::debug!("Release of free proxy {} ignored", proxy.address);
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.proxies.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn available(&self) -> usize {
        self.proxies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|p| !p.is_leased)
            .count()
    }

    pub fn stats(&self) -> PoolStats {
        let proxies = self.proxies.lock().unwrap_or_else(|e| e.into_inner());
        PoolStats {
            total: proxies.len(),
            leased: proxies.iter().filter(|p| p.is_leased).count(),
            leases_granted: self.leases_granted.load(Ordering::Relaxed),
            leases_returned: self.leases_returned.load(Ordering::Relaxed),
        }
    }
}
