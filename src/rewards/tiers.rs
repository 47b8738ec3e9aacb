//! Reward tiers ("crates") over a cumulative XP score

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub name: String,
    pub threshold: u64,
}

impl Tier {
    pub fn new(name: impl Into<String>, threshold: u64) -> Self {
        Self {
            name: name.into(),
            threshold,
        }
    }
}

/// Tiers sorted by ascending threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierTable {
    tiers: Vec<Tier>,
}

impl TierTable {
    /// Sorts the given tiers by threshold.
    pub fn new(mut tiers: Vec<Tier>) -> Self {
        tiers.sort_by_key(|t| t.threshold);
        Self { tiers }
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Highest tier reached (`xp >= threshold`) and the one after it.
    pub fn position(&self, xp: u64) -> TierPosition {
        let reached = self.tiers.partition_point(|t| t.threshold <= xp);
        TierPosition {
            current: reached.checked_sub(1).map(|i| self.tiers[i].clone()),
            next: self.tiers.get(reached).cloned(),
        }
    }
}

impl Default for TierTable {
    fn default() -> Self {
        Self::new(vec![
            Tier::new("Mini", 100),
            Tier::new("Minor", 250),
            Tier::new("Major", 500),
            Tier::new("Max", 1000),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierPosition {
    /// `None` while below the first threshold.
    pub current: Option<Tier>,
    /// `None` at the top tier.
    pub next: Option<Tier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MilestoneCheck {
    pub triggered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierEta {
    pub eta_seconds: u64,
    /// `None` once the top tier is reached.
    pub next_tier: Option<String>,
}

/// Tier lookups plus the "last reported tier" state that makes
/// [`TierTracker::check_milestone`] fire once per crossing.
pub struct TierTracker {
    table: TierTable,
    last_reported: Mutex<Option<String>>,
}

impl TierTracker {
    pub fn new(table: TierTable) -> Self {
        Self {
            table,
            last_reported: Mutex::new(None),
        }
    }

    pub fn table(&self) -> &TierTable {
        &self.table
    }

    pub fn current_tier(&self, xp: u64) -> TierPosition {
        self.table.position(xp)
    }

    /// Reports `triggered` when the tier for `xp` differs from the last one
    /// reported, and remembers it.
    pub fn check_milestone(&self, xp: u64) -> MilestoneCheck {
        let current = self.table.position(xp).current.map(|t| t.name);
        let mut last = self.last_reported.lock().unwrap_or_else(|e| e.into_inner());

        if *last == current {
            return MilestoneCheck {
                triggered: false,
                tier: None,
            };
        }

        *last = current.clone();
        MilestoneCheck {
            triggered: current.is_some(),
            tier: current,
        }
    }

    pub fn last_reported(&self) -> Option<String> {
        self.last_reported
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Forgets the last reported tier so the next check fires again.
    pub fn reset(&self) {
        *self.last_reported.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Advisory ETA to the next tier.
    ///
    /// Precondition: `rate_per_cycle > 0`. It is not checked here; callers that
    /// take the rate from user input validate it first.
    pub fn estimate_time_to_next(&self, xp: u64, rate_per_cycle: f64, cycle_seconds: u64) -> TierEta {
        match self.table.position(xp).next {
            None => TierEta {
                eta_seconds: 0,
                next_tier: None,
            },
            Some(next) => {
                let missing = (next.threshold - xp) as f64;
                let cycles = (missing / rate_per_cycle).ceil() as u64;
                TierEta {
                    eta_seconds: cycles.saturating_mul(cycle_seconds),
                    next_tier: Some(next.name),
                }
            }
        }
    }
}

impl Default for TierTracker {
    fn default() -> Self {
        Self::new(TierTable::default())
    }
}
