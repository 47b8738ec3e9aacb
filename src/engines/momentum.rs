//! Active engine that buys into strong momentum.

use super::{ActionContext, ActiveEngine, Engine, EngineDescriptor, GridClass};
use crate::error::Result;
use crate::models::observation::Snapshot;
use crate::models::order::OrderRequest;
use crate::models::signal::Signal;
use async_trait::async_trait;
use tracing::{debug, info, warn};

pub struct MomentumTrader {
    descriptor: EngineDescriptor,
    threshold: f64,
    quantity: f64,
    reward_xp: u64,
}

impl MomentumTrader {
    pub fn new(threshold: f64, quantity: f64, reward_xp: u64) -> Self {
        Self {
            descriptor: EngineDescriptor::new(
                "momentum-trader",
                "Surge",
                GridClass::Strategic,
                "momentum",
                "Buys subjects with a momentum score above threshold",
            ),
            threshold,
            quantity,
            reward_xp,
        }
    }

    fn qualifying(&self, snapshot: &Snapshot) -> Vec<Signal> {
        snapshot
            .iter()
            .filter_map(|obs| {
                let ticker = obs.ticker()?;
                let momentum = obs.number("momentum")?;
                (momentum >= self.threshold)
                    .then(|| Signal::new(ticker, momentum, format!("momentum {:.2}", momentum)))
            })
            .collect()
    }
}

impl Default for MomentumTrader {
    fn default() -> Self {
        Self::new(0.75, 1.0, 1)
    }
}

#[async_trait]
impl Engine for MomentumTrader {
    fn descriptor(&self) -> &EngineDescriptor {
        &self.descriptor
    }

    async fn run(&self, snapshot: &Snapshot) -> Result<Vec<Signal>> {
        Ok(self.qualifying(snapshot))
    }

    fn as_active(&self) -> Option<&dyn ActiveEngine> {
        Some(self)
    }
}

#[async_trait]
impl ActiveEngine for MomentumTrader {
    async fn run_active(&self, snapshot: &Snapshot, ctx: &ActionContext) -> Result<Vec<Signal>> {
        let signals = self.qualifying(snapshot);
        let codename = &self.descriptor.codename;

        for signal in &signals {
            let Some(claim) = ctx.cooldowns.claim(&signal.ticker) else {
                debug!(
                    engine = %codename,
                    ticker = %signal.ticker,
                    remaining_secs = ctx.cooldowns.remaining(&signal.ticker).as_secs(),
                    "{}: {} still cooling down, skipping action",
                    codename,
                    signal.ticker
                );
                continue;
            };

            let order = OrderRequest::market_buy(&signal.ticker, self.quantity);
            if let Err(e) = ctx.executor.submit(&order).await {
                // claim is dropped uncommitted: no cooldown, eligible next cycle
                warn!(
                    engine = %codename,
                    ticker = %signal.ticker,
                    error = %e,
                    "{}: action failed for {}",
                    codename,
                    signal.ticker
                );
                continue;
            }

            if let Err(e) = ctx.ledger.post(&ctx.subject_id, self.reward_xp, codename).await {
                warn!(
                    engine = %codename,
                    subject = %ctx.subject_id,
                    error = %e,
                    "{}: reward posting failed",
                    codename
                );
            }

            claim.commit();
            info!(
                engine = %codename,
                ticker = %signal.ticker,
                confidence = signal.confidence,
                "{}: acted on {}",
                codename,
                signal.ticker
            );
        }

        Ok(signals)
    }
}
