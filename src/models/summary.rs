//! Per-cycle aggregation output

use crate::engines::{EngineDescriptor, GridClass};
use crate::models::signal::Signal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Decimal places used for `avg_confidence`.
pub const CONFIDENCE_PRECISION: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSummaryRow {
    pub codename: String,
    pub class: GridClass,
    pub strategy: String,
    pub count: usize,
    /// Mean signal confidence, fixed precision; `"0.00"` when there were no signals.
    pub avg_confidence: String,
}

impl GridSummaryRow {
    pub fn from_signals(descriptor: &EngineDescriptor, signals: &[Signal]) -> Self {
        let mean = if signals.is_empty() {
            0.0
        } else {
            signals.iter().map(|s| s.confidence).sum::<f64>() / signals.len() as f64
        };

        Self {
            codename: descriptor.codename.clone(),
            class: descriptor.class,
            strategy: descriptor.strategy.clone(),
            count: signals.len(),
            avg_confidence: format!("{:.*}", CONFIDENCE_PRECISION, mean),
        }
    }

    /// `floor(avg_confidence * count)`, computed from the formatted average.
    pub fn xp_reward(&self) -> u64 {
        let avg: f64 = self.avg_confidence.parse().unwrap_or(0.0);
        (avg * self.count as f64).floor().max(0.0) as u64
    }
}

/// Raw result of one engine in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineOutput {
    pub engine_id: String,
    pub codename: String,
    pub signals: Vec<Signal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything one orchestrator run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridReport {
    pub class: GridClass,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub observations: usize,
    pub rows: Vec<GridSummaryRow>,
    pub outputs: Vec<EngineOutput>,
}

impl GridReport {
    pub fn total_signals(&self) -> usize {
        self.rows.iter().map(|r| r.count).sum()
    }

    pub fn failed_engines(&self) -> usize {
        self.outputs.iter().filter(|o| o.error.is_some()).count()
    }

    pub fn row(&self, codename: &str) -> Option<&GridSummaryRow> {
        self.rows.iter().find(|r| r.codename == codename)
    }
}
