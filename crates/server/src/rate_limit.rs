//! Fixed-window rate limiting per client
//!
//! Every call counts against the window, including calls that end up
//! rejected. A client that keeps hammering while limited stays limited
//! until its window expires; it does not extend the window itself.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use nepali_tts_config::RateLimitConfig;

/// Per-client window state
#[derive(Debug, Clone, Copy)]
pub struct RateWindow {
    pub window_start: Instant,
    pub count: u32,
}

/// Outcome of [`RateLimiter::admit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// Whole seconds until the window resets (0 when allowed)
    pub retry_after_secs: u64,
}

impl RateDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            retry_after_secs: 0,
        }
    }
}

pub struct RateLimiter {
    enabled: bool,
    max_requests: u32,
    window: Duration,
    windows: DashMap<String, RateWindow>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            enabled: config.enabled,
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_seconds),
            windows: DashMap::new(),
        }
    }

    pub fn admit(&self, client: &str) -> RateDecision {
        self.admit_at(client, Instant::now())
    }

    /// Count one request from `client` at `now`.
    ///
    /// The entry lock is held for the whole read-modify-write, so concurrent
    /// requests from the same client never lose updates.
    pub fn admit_at(&self, client: &str, now: Instant) -> RateDecision {
        if !self.enabled {
            return RateDecision::allow();
        }

        let mut entry = self
            .windows
            .entry(client.to_string())
            .or_insert(RateWindow {
                window_start: now,
                count: 0,
            });
        let window = entry.value_mut();

        if now.saturating_duration_since(window.window_start) >= self.window {
            window.window_start = now;
            window.count = 0;
        }

        window.count = window.count.saturating_add(1);

        if window.count > self.max_requests {
            let elapsed = now.saturating_duration_since(window.window_start);
            let remaining = self.window.saturating_sub(elapsed);
            RateDecision {
                allowed: false,
                retry_after_secs: ceil_secs(remaining),
            }
        } else {
            RateDecision::allow()
        }
    }

    /// Drop windows that have already expired; returns how many were removed
    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(Instant::now())
    }

    pub fn evict_expired_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.window_start) < self.window);
        before.saturating_sub(self.windows.len())
    }

    /// Number of tracked clients
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}
