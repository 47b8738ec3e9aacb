//! Signal grid: a periodic multi-engine signal scanner with cooldown gating,
//! reward aggregation, tier milestones and rate-limited HTTP endpoints.

pub mod clock;
pub mod config;
pub mod core;
pub mod engines;
pub mod error;
pub mod gates;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod rewards;
pub mod services;

pub use error::{GridError, Result};
