//! Per-IP request limiter.
//!
//! Counts requests per (client IP, controller:action) against the
//! configured per-minute limits and clears all counters on a fixed
//! interval. Actions without a configured limit are unlimited, and
//! requests without an attributable client address are let through.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use crate::config::RateLimitsConfig;

pub const RESET_PERIOD: Duration = Duration::from_secs(60);

pub struct RateLimiter {
    limits: RateLimitsConfig,
    counters: DashMap<(IpAddr, String), u32>,
}

impl RateLimiter {
    pub fn new(limits: RateLimitsConfig) -> Self {
        Self {
            limits,
            counters: DashMap::new(),
        }
    }

    /// Record one request and report whether it is within the limit.
    pub fn check(&self, ip: Option<IpAddr>, controller: &str, action: &str) -> bool {
        let Some(limit) = self.limits.limit_for(controller, action) else {
            return true;
        };
        let Some(ip) = ip else {
            return true;
        };

        let key = (ip, format!("{controller}:{action}"));
        let mut count = self.counters.entry(key).or_insert(0);
        if *count >= limit {
            return false;
        }
        *count += 1;
        true
    }

    pub fn reset(&self) {
        self.counters.clear();
    }

    /// Background task clearing the counters every [`RESET_PERIOD`].
    pub fn spawn_reset_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(RESET_PERIOD);
            ticker.tick().await; // first tick is immediate
            loop {
                ticker.tick().await;
                limiter.reset();
            }
        })
    }
}
