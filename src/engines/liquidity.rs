//! Passive engine watching for volume surges on liquid subjects.

use super::{Engine, EngineDescriptor, GridClass};
use crate::error::Result;
use crate::models::observation::Snapshot;
use crate::models::signal::Signal;
use async_trait::async_trait;

pub struct LiquidityWatch {
    descriptor: EngineDescriptor,
    min_volume_ratio: f64,
}

impl LiquidityWatch {
    pub fn new(min_volume_ratio: f64) -> Self {
        Self {
            descriptor: EngineDescriptor::new(
                "liquidity-watch",
                "Tide",
                GridClass::Control,
                "liquidity",
                "Flags liquid subjects trading well above their usual volume",
            ),
            min_volume_ratio,
        }
    }

    /// Maps a volume ratio onto `[0.5, 1]`, saturating at 3x the minimum.
    fn confidence(&self, ratio: f64) -> f64 {
        let span = self.min_volume_ratio * 2.0;
        0.5 + 0.5 * ((ratio - self.min_volume_ratio) / span).min(1.0)
    }
}

impl Default for LiquidityWatch {
    fn default() -> Self {
        Self::new(1.5)
    }
}

#[async_trait]
impl Engine for LiquidityWatch {
    fn descriptor(&self) -> &EngineDescriptor {
        &self.descriptor
    }

    async fn run(&self, snapshot: &Snapshot) -> Result<Vec<Signal>> {
        Ok(snapshot
            .iter()
            .filter(|obs| obs.flag("liquid").unwrap_or(false))
            .filter_map(|obs| {
                let ticker = obs.ticker()?;
                let ratio = obs.number("volume_ratio")?;
                (ratio >= self.min_volume_ratio).then(|| {
                    Signal::new(
                        ticker,
                        self.confidence(ratio),
                        format!("volume {:.1}x normal", ratio),
                    )
                })
            })
            .collect())
    }
}
