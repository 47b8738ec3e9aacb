//! Milestone notifications.

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::info;

#[async_trait]
pub trait MilestoneNotifier: Send + Sync {
    async fn tier_reached(&self, subject: &str, tier: &str, xp: u64) -> Result<()>;
}

/// Emits a log event per milestone.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl MilestoneNotifier for LogNotifier {
    async fn tier_reached(&self, subject: &str, tier: &str, xp: u64) -> Result<()> {
        info!(subject = %subject, tier = %tier, xp = xp, "Crate unlocked: {} reached {} at {} XP", subject, tier, xp);
        Ok(())
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<(String, String, u64)>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<(String, String, u64)> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl MilestoneNotifier for RecordingNotifier {
    async fn tier_reached(&self, subject: &str, tier: &str, xp: u64) -> Result<()> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((subject.to_string(), tier.to_string(), xp));
        Ok(())
    }
}
