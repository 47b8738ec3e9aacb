//! Process-wide grid state, built once at startup and shared by handle

use crate::clock::{Clock, SystemClock};
use crate::engines::GridClass;
use crate::gates::{CooldownGate, RateLimiter};
use crate::models::summary::GridReport;
use crate::rewards::TierTracker;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

pub struct GridState {
    pub cooldowns: Arc<CooldownGate>,
    pub rate_limiter: Arc<RateLimiter>,
    pub tiers: Arc<TierTracker>,
    /// Most recent report per grid class.
    pub reports: RwLock<HashMap<GridClass, GridReport>>,
    /// Held for the duration of a cycle so cycles never overlap.
    pub cycle_lock: Arc<Mutex<()>>,
}

impl GridState {
    pub fn new(cooldown_window: Duration) -> Self {
        Self::with_clock(cooldown_window, Arc::new(SystemClock))
    }

    pub fn with_clock(cooldown_window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            cooldowns: Arc::new(CooldownGate::with_clock(cooldown_window, clock.clone())),
            rate_limiter: Arc::new(RateLimiter::with_clock(clock)),
            tiers: Arc::new(TierTracker::default()),
            reports: RwLock::new(HashMap::new()),
            cycle_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn record_report(&self, report: GridReport) {
        self.reports.write().await.insert(report.class, report);
    }

    /// Latest reports, ordered by grid class.
    pub async fn latest_reports(&self) -> Vec<GridReport> {
        let reports = self.reports.read().await;
        let mut latest: Vec<GridReport> = reports.values().cloned().collect();
        latest.sort_by_key(|r| r.class as u8);
        latest
    }

    pub fn is_cycle_running(&self) -> bool {
        self.cycle_lock.try_lock().is_err()
    }
}
