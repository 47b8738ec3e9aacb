//! Fixed-window rate limiter
//!
//! Each `(key, window_ms, max)` triple owns one bucket: a counter and the
//! instant the window resets. This is a fixed window, not a sliding log, so a
//! caller can get up to `2 * max` requests through across a window boundary.
//! That is accepted: the limiter dampens abuse, it does not enforce quotas.

use crate::clock::{Clock, SystemClock};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;

pub const ANONYMOUS_KEY: &str = "anon";

/// Window and ceiling applied to one group of endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitPolicy {
    pub window_ms: u64,
    pub max: u32,
}

impl RateLimitPolicy {
    /// Side-effecting endpoints.
    pub const STRICT: Self = Self {
        window_ms: 300_000,
        max: 3,
    };
    /// Read-only endpoints.
    pub const READ: Self = Self {
        window_ms: 60_000,
        max: 60,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RateBucket {
    count: u32,
    reset_at_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_in_ms: u64,
}

pub struct RateLimiter {
    buckets: DashMap<String, RateBucket>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: DashMap::new(),
            clock,
        }
    }

    fn bucket_id(key: &str, window_ms: u64, max: u32) -> String {
        format!("{}:{}:{}", key, window_ms, max)
    }

    /// Counts one request against the bucket for `(key, window_ms, max)`.
    pub fn check(&self, key: &str, window_ms: u64, max: u32) -> RateLimitResult {
        let now = self.clock.now_ms();
        let window = i64::try_from(window_ms).unwrap_or(i64::MAX);

        let mut bucket = self
            .buckets
            .entry(Self::bucket_id(key, window_ms, max))
            .or_insert(RateBucket {
                count: 0,
                reset_at_ms: now.saturating_add(window),
            });

        if bucket.reset_at_ms <= now {
            *bucket = RateBucket {
                count: 0,
                reset_at_ms: now.saturating_add(window),
            };
        }

        let reset_in_ms = u64::try_from(bucket.reset_at_ms - now).unwrap_or(0);

        if bucket.count >= max {
            return RateLimitResult {
                allowed: false,
                remaining: 0,
                reset_in_ms,
            };
        }

        bucket.count += 1;
        RateLimitResult {
            allowed: true,
            remaining: max - bucket.count,
            reset_in_ms,
        }
    }

    pub fn check_policy(&self, key: &str, policy: RateLimitPolicy) -> RateLimitResult {
        self.check(key, policy.window_ms, policy.max)
    }

    /// Removes buckets whose window has already elapsed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| bucket.reset_at_ms > now);
        before.saturating_sub(self.buckets.len())
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller key precedence: explicit override, then assigned identity, then
/// network origin, then [`ANONYMOUS_KEY`].
pub struct RateLimitKey;

impl RateLimitKey {
    pub fn derive(
        override_key: Option<&str>,
        identity: Option<&str>,
        origin: Option<&str>,
    ) -> String {
        [override_key, identity, origin]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|k| !k.is_empty())
            .unwrap_or(ANONYMOUS_KEY)
            .to_string()
    }
}
