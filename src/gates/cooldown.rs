//! Per-subject cooldown gate
//!
//! One record per subject holds the time of the last triggered action. A
//! subject is cooling down while `now - last < window`. Records are only
//! removed by `clear` or by an explicit `sweep`.

use crate::clock::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

pub struct CooldownGate {
    window: Duration,
    records: DashMap<String, DateTime<Utc>>,
    claimed: DashSet<String>,
    clock: Arc<dyn Clock>,
}

impl CooldownGate {
    pub fn new(window: Duration) -> Self {
        Self::with_clock(window, Arc::new(SystemClock))
    }

    pub fn with_clock(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            records: DashMap::new(),
            claimed: DashSet::new(),
            clock,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn elapsed_since(&self, at: DateTime<Utc>) -> Duration {
        (self.clock.now() - at).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn is_on_cooldown(&self, key: &str) -> bool {
        match self.records.get(key) {
            Some(last) => self.elapsed_since(*last) < self.window,
            None => false,
        }
    }

    /// Starts (or restarts) the window for `key`.
    pub fn trigger(&self, key: &str) {
        self.records.insert(key.to_string(), self.clock.now());
    }

    /// Time left in the window; zero when there is no record or it has expired.
    pub fn remaining(&self, key: &str) -> Duration {
        match self.records.get(key) {
            Some(last) => self.window.saturating_sub(self.elapsed_since(*last)),
            None => Duration::ZERO,
        }
    }

    pub fn clear(&self, key: &str) {
        self.records.remove(key);
    }

    /// Atomically reserves `key` for one caller.
    ///
    /// Returns `None` if the subject is cooling down or another caller already
    /// holds a claim. Committing the claim triggers the cooldown; dropping it
    /// uncommitted releases the subject without touching its record.
    pub fn claim(&self, key: &str) -> Option<CooldownClaim<'_>> {
        if !self.claimed.insert(key.to_string()) {
            return None;
        }
        if self.is_on_cooldown(key) {
            self.claimed.remove(key);
            return None;
        }
        Some(CooldownClaim {
            gate: self,
            key: key.to_string(),
        })
    }

    /// Test-and-set in one step: triggers and returns true only if `key` was idle.
    pub fn trigger_if_idle(&self, key: &str) -> bool {
        let now = self.clock.now();
        match self.records.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                let elapsed = (now - *entry.get()).to_std().unwrap_or(Duration::ZERO);
                if elapsed < self.window {
                    false
                } else {
                    entry.insert(now);
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    /// Drops records whose last trigger is older than `max_age`. Returns how many went.
    pub fn sweep(&self, max_age: Duration) -> usize {
        let before = self.records.len();
        let now = self.clock.now();
        self.records.retain(|_, last| {
            (now - *last).to_std().unwrap_or(Duration::ZERO) < max_age
        });
        before.saturating_sub(self.records.len())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for CooldownGate {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

/// Exclusive reservation of one subject, see [`CooldownGate::claim`].
#[must_use = "dropping a claim releases it without starting a cooldown"]
pub struct CooldownClaim<'a> {
    gate: &'a CooldownGate,
    key: String,
}

impl CooldownClaim<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Starts the cooldown window and releases the claim.
    pub fn commit(self) {
        self.gate.trigger(&self.key);
    }
}

impl Drop for CooldownClaim<'_> {
    fn drop(&mut self) {
        self.gate.claimed.remove(&self.key);
    }
}
