//! Environment-driven configuration
//!
//! Values are read from the process environment (after `.env` is loaded by the
//! binaries through `dotenvy`). Anything missing or unparsable falls back to
//! its default.

use crate::gates::RateLimitPolicy;
use crate::engines::GridClass;
use std::env;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SCAN_INTERVAL_SECONDS: u64 = 300;
pub const DEFAULT_COOLDOWN_SECONDS: u64 = 60;
pub const DEFAULT_SWEEP_FACTOR: u32 = 10;
pub const DEFAULT_SUBJECT_ID: &str = "grid";

/// Returns the deployment environment name (`APP_ENV`), defaulting to `sandbox`.
pub fn get_environment() -> String {
    env::var("APP_ENV").unwrap_or_else(|_| "sandbox".to_string())
}

/// Delay inserted after each engine run, per grid class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    pub fast: Duration,
    pub control: Duration,
    pub tactical: Duration,
    pub strategic: Duration,
}

impl PacingConfig {
    pub fn delay_for(&self, class: GridClass) -> Duration {
        match class {
            GridClass::Fast => self.fast,
            GridClass::Control => self.control,
            GridClass::Tactical => self.tactical,
            GridClass::Strategic => self.strategic,
        }
    }

    /// No pacing at all. Handy for tests and one-off manual scans.
    pub fn none() -> Self {
        Self {
            fast: Duration::ZERO,
            control: Duration::ZERO,
            tactical: Duration::ZERO,
            strategic: Duration::ZERO,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            fast: GridClass::Fast.default_pacing(),
            control: GridClass::Control.default_pacing(),
            tactical: GridClass::Tactical.default_pacing(),
            strategic: GridClass::Strategic.default_pacing(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GridConfig {
    pub environment: String,
    pub port: u16,
    /// Scheduler tick in seconds; 0 disables the loop.
    pub scan_interval_seconds: u64,
    pub cooldown: Duration,
    pub pacing: PacingConfig,
    pub snapshot_url: Option<String>,
    pub ledger_url: Option<String>,
    pub subject_id: String,
    /// Stale entries older than `sweep_factor` windows are evicted; 0 disables.
    pub sweep_factor: u32,
    pub strict_limit: RateLimitPolicy,
    pub read_limit: RateLimitPolicy,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            environment: "sandbox".to_string(),
            port: DEFAULT_PORT,
            scan_interval_seconds: DEFAULT_SCAN_INTERVAL_SECONDS,
            cooldown: Duration::from_secs(DEFAULT_COOLDOWN_SECONDS),
            pacing: PacingConfig::default(),
            snapshot_url: None,
            ledger_url: None,
            subject_id: DEFAULT_SUBJECT_ID.to_string(),
            sweep_factor: DEFAULT_SWEEP_FACTOR,
            strict_limit: RateLimitPolicy::STRICT,
            read_limit: RateLimitPolicy::READ,
        }
    }
}

impl GridConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let ms = |key: &str, fallback: Duration| {
            Duration::from_millis(parse_or(&lookup, key, fallback.as_millis() as u64))
        };
        let url = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            environment: lookup("APP_ENV").unwrap_or(defaults.environment),
            port: parse_or(&lookup, "PORT", defaults.port),
            scan_interval_seconds: parse_or(
                &lookup,
                "SCAN_INTERVAL_SECONDS",
                defaults.scan_interval_seconds,
            ),
            cooldown: Duration::from_secs(parse_or(
                &lookup,
                "COOLDOWN_SECONDS",
                defaults.cooldown.as_secs(),
            )),
            pacing: PacingConfig {
                fast: ms("PACING_FAST_MS", defaults.pacing.fast),
                control: ms("PACING_CONTROL_MS", defaults.pacing.control),
                tactical: ms("PACING_TACTICAL_MS", defaults.pacing.tactical),
                strategic: ms("PACING_STRATEGIC_MS", defaults.pacing.strategic),
            },
            snapshot_url: url("SNAPSHOT_URL"),
            ledger_url: url("LEDGER_URL"),
            subject_id: lookup("SUBJECT_ID")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.subject_id),
            sweep_factor: parse_or(&lookup, "SWEEP_FACTOR", defaults.sweep_factor),
            strict_limit: RateLimitPolicy {
                window_ms: parse_or(
                    &lookup,
                    "RATE_LIMIT_STRICT_WINDOW_MS",
                    defaults.strict_limit.window_ms,
                ),
                max: parse_or(&lookup, "RATE_LIMIT_STRICT_MAX", defaults.strict_limit.max),
            },
            read_limit: RateLimitPolicy {
                window_ms: parse_or(
                    &lookup,
                    "RATE_LIMIT_READ_WINDOW_MS",
                    defaults.read_limit.window_ms,
                ),
                max: parse_or(&lookup, "RATE_LIMIT_READ_MAX", defaults.read_limit.max),
            },
        }
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_seconds)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, fallback: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key = key, value = %raw, "Invalid value for {}, using default", key);
            fallback
        }),
        None => fallback,
    }
}
