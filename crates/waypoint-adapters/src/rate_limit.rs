//! Per-identifier sliding-window admission control.
//!
//! Each identifier keeps the timestamps of its admitted requests inside the
//! trailing window. The check-and-record step runs under the map's per-shard
//! write lock, so two concurrent callers can never both observe spare
//! capacity for the last slot.

use crate::config::RateLimitConfig;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct RateLimiter {
    entries: Arc<DashMap<String, VecDeque<Instant>>>,
    window: Duration,
    max_requests: usize,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            window,
            max_requests,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(Duration::from_secs(config.window_secs), config.max_requests)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// Admit a request from `identifier` now.
    pub fn admit(&self, identifier: &str) -> bool {
        self.admit_at(identifier, Instant::now())
    }

    /// Admit a request from `identifier` at `now`.
    ///
    /// Rejections are not recorded and do not extend the window.
    pub fn admit_at(&self, identifier: &str, now: Instant) -> bool {
        let mut stamps = self.entries.entry(identifier.to_string()).or_default();
        prune(&mut stamps, now, self.window);
        if stamps.len() >= self.max_requests {
            return false;
        }
        stamps.push_back(now);
        true
    }

    /// Admissions still available to `identifier` at `now`.
    pub fn remaining_at(&self, identifier: &str, now: Instant) -> usize {
        let used = self
            .entries
            .get(identifier)
            .map(|stamps| {
                stamps
                    .iter()
                    .filter(|t| now.saturating_duration_since(**t) < self.window)
                    .count()
            })
            .unwrap_or(0);
        self.max_requests.saturating_sub(used)
    }

    /// Drop identifiers whose newest admission is at least `idle` old.
    /// Returns how many entries were removed.
    pub fn evict_idle(&self, now: Instant, idle: Duration) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, stamps| {
            stamps
                .back()
                .is_some_and(|last| now.saturating_duration_since(*last) < idle)
        });
        before.saturating_sub(self.entries.len())
    }

    /// Number of identifiers currently tracked.
    pub fn tracked(&self) -> usize {
        self.entries.len()
    }
}

fn prune(stamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while stamps
        .front()
        .is_some_and(|t| now.saturating_duration_since(*t) >= window)
    {
        stamps.pop_front();
    }
}
