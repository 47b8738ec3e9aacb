//! XP reward tiers and milestone detection.

pub mod tiers;

pub use tiers::{MilestoneCheck, Tier, TierEta, TierPosition, TierTable, TierTracker};
