use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters shared by every monitor task.
#[derive(Debug)]
pub struct PollMetrics {
    polls: AtomicU64,
    upstream_errors: AtomicU64,
    not_found: AtomicU64,
    matches: AtomicU64,
    total_latency_ms: AtomicU64,
    latency_samples: AtomicU64,
    last_poll_ok: AtomicBool,
    start_time: Instant,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollMetricsSnapshot {
    pub polls: u64,
    pub upstream_errors: u64,
    pub not_found: u64,
    pub matches: u64,
    pub average_latency_ms: f64,
    pub error_rate: f64,
    pub uptime_secs: u64,
}

impl PollMetrics {
    pub fn new() -> Self {
        Self {
            polls: AtomicU64::new(0),
            upstream_errors: AtomicU64::new(0),
            not_found: AtomicU64::new(0),
            matches: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            latency_samples: AtomicU64::new(0),
            last_poll_ok: AtomicBool::new(true),
            start_time: Instant::now(),
        }
    }

    pub fn record_poll(&self, latency: Duration) {
        self.polls.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(latency.as_millis() as u64, Ordering::Relaxed);
        self.latency_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.last_poll_ok.store(true, Ordering::Relaxed);
    }

    pub fn record_upstream_error(&self) {
        self.upstream_errors.fetch_add(1, Ordering::Relaxed);
        self.last_poll_ok.store(false, Ordering::Relaxed);
    }

    pub fn record_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_match(&self) {
        self.matches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_polls(&self) -> u64 {
        self.polls.load(Ordering::Relaxed)
    }

    pub fn get_upstream_errors(&self) -> u64 {
        self.upstream_errors.load(Ordering::Relaxed)
    }

    pub fn get_matches(&self) -> u64 {
        self.matches.load(Ordering::Relaxed)
    }

    pub fn last_poll_ok(&self) -> bool {
        self.last_poll_ok.load(Ordering::Relaxed)
    }

    pub fn get_average_latency_ms(&self) -> f64 {
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        let samples = self.latency_samples.load(Ordering::Relaxed);

        if samples == 0 {
            0.0
        } else {
            total as f64 / samples as f64
        }
    }

    pub fn get_error_rate(&self) -> f64 {
        let polls = self.get_polls();
        if polls == 0 {
            0.0
        } else {
            self.get_upstream_errors() as f64 / polls as f64
        }
    }

    pub fn snapshot(&self) -> PollMetricsSnapshot {
        PollMetricsSnapshot {
            polls: self.get_polls(),
            upstream_errors: self.get_upstream_errors(),
            not_found: self.not_found.load(Ordering::Relaxed),
            matches: self.get_matches(),
            average_latency_ms: self.get_average_latency_ms(),
            error_rate: self.get_error_rate(),
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for PollMetrics {
    fn default() -> Self {
        Self::new()
    }
}
