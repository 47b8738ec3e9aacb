//! Passive engine flagging strongly positive sentiment.

use super::{Engine, EngineDescriptor, GridClass};
use crate::error::Result;
use crate::models::observation::Snapshot;
use crate::models::signal::Signal;
use async_trait::async_trait;

pub struct SentimentScout {
    descriptor: EngineDescriptor,
    threshold: f64,
}

impl SentimentScout {
    pub fn new(threshold: f64) -> Self {
        Self {
            descriptor: EngineDescriptor::new(
                "sentiment-scout",
                "Scout",
                GridClass::Fast,
                "sentiment",
                "Flags subjects whose sentiment score clears a threshold",
            ),
            threshold,
        }
    }
}

impl Default for SentimentScout {
    fn default() -> Self {
        Self::new(0.7)
    }
}

#[async_trait]
impl Engine for SentimentScout {
    fn descriptor(&self) -> &EngineDescriptor {
        &self.descriptor
    }

    async fn run(&self, snapshot: &Snapshot) -> Result<Vec<Signal>> {
        Ok(snapshot
            .iter()
            .filter_map(|obs| {
                let ticker = obs.ticker()?;
                let sentiment = obs.number("sentiment")?;
                (sentiment >= self.threshold).then(|| {
                    Signal::new(ticker, sentiment, format!("sentiment {:.2}", sentiment))
                })
            })
            .collect())
    }
}
