//! Runs one engine with failure isolation and class pacing

use crate::engines::{ActionContext, Engine};
use crate::error::GridError;
use crate::metrics::Metrics;
use crate::models::observation::Snapshot;
use crate::models::summary::EngineOutput;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error};

pub struct GridRunner {
    pacing: Duration,
    metrics: Option<Arc<Metrics>>,
}

impl GridRunner {
    pub fn new(pacing: Duration) -> Self {
        Self {
            pacing,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn pacing(&self) -> Duration {
        self.pacing
    }

    /// Runs `engine` to completion, then waits the pacing delay.
    ///
    /// Active engines get `ctx` and run through `run_active`; without a context
    /// they fall back to `run`. An error or panic inside the engine is logged
    /// and reported as an empty output carrying the error text.
    pub async fn run_engine(
        &self,
        engine: &dyn Engine,
        snapshot: &Snapshot,
        ctx: Option<&ActionContext>,
    ) -> EngineOutput {
        let descriptor = engine.descriptor();
        let start = Instant::now();

        let call = async {
            match (engine.as_active(), ctx) {
                (Some(active), Some(ctx)) => active.run_active(snapshot, ctx).await,
                _ => engine.run(snapshot).await,
            }
        };

        let result = match AssertUnwindSafe(call).catch_unwind().await {
            Ok(result) => result,
            Err(_) => Err(GridError::EnginePanic(descriptor.codename.clone())),
        };

        let output = match result {
            Ok(signals) => {
                debug!(
                    engine = %descriptor.id,
                    codename = %descriptor.codename,
                    signals = signals.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "{} produced {} signals",
                    descriptor.codename,
                    signals.len()
                );
                if let Some(ref metrics) = self.metrics {
                    metrics.signals_emitted_total.inc_by(signals.len() as u64);
                }
                EngineOutput {
                    engine_id: descriptor.id.clone(),
                    codename: descriptor.codename.clone(),
                    signals,
                    error: None,
                }
            }
            Err(e) => {
                error!(
                    engine = %descriptor.id,
                    codename = %descriptor.codename,
                    error = %e,
                    "{} failed, counting zero signals this cycle",
                    descriptor.codename
                );
                if let Some(ref metrics) = self.metrics {
                    metrics.engine_failures_total.inc();
                }
                EngineOutput {
                    engine_id: descriptor.id.clone(),
                    codename: descriptor.codename.clone(),
                    signals: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        };

        if !self.pacing.is_zero() {
            sleep(self.pacing).await;
        }

        output
    }
}
