//! Admission gates: per-subject cooldowns and per-caller rate limits.

pub mod cooldown;
pub mod rate_limit;

pub use cooldown::{CooldownClaim, CooldownGate, DEFAULT_COOLDOWN};
pub use rate_limit::{RateLimitKey, RateLimitPolicy, RateLimitResult, RateLimiter, ANONYMOUS_KEY};
