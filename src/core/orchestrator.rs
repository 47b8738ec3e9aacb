//! Runs a whole grid against one snapshot and aggregates the results

use crate::core::runner::GridRunner;
use crate::engines::{ActionContext, EngineDescriptor, Grid, GridClass};
use crate::metrics::Metrics;
use crate::models::observation::Snapshot;
use crate::models::summary::{GridReport, GridSummaryRow};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct GridOrchestrator {
    grid: Grid,
    runner: GridRunner,
    action_ctx: Option<ActionContext>,
}

impl GridOrchestrator {
    pub fn new(grid: Grid, pacing: Duration) -> Self {
        Self {
            grid,
            runner: GridRunner::new(pacing),
            action_ctx: None,
        }
    }

    /// Capabilities passed to the grid's active engines. Without them active
    /// engines only scan.
    pub fn with_action_context(mut self, ctx: ActionContext) -> Self {
        self.action_ctx = Some(ctx);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.runner = self.runner.with_metrics(metrics);
        self
    }

    pub fn class(&self) -> GridClass {
        self.grid.class()
    }

    pub fn descriptors(&self) -> Vec<EngineDescriptor> {
        self.grid.descriptors()
    }

    /// Runs every engine in registration order, one at a time.
    ///
    /// Never fails: a failing engine contributes an empty signal list and is
    /// not retried within the cycle.
    pub async fn run_grid(&self, snapshot: &Snapshot) -> GridReport {
        let started_at = Utc::now();
        let mut rows = Vec::with_capacity(self.grid.len());
        let mut outputs = Vec::with_capacity(self.grid.len());

        for engine in self.grid.engines() {
            let output = self
                .runner
                .run_engine(engine.as_ref(), snapshot, self.action_ctx.as_ref())
                .await;
            rows.push(GridSummaryRow::from_signals(engine.descriptor(), &output.signals));
            outputs.push(output);
        }

        let report = GridReport {
            class: self.grid.class(),
            started_at,
            completed_at: Utc::now(),
            observations: snapshot.len(),
            rows,
            outputs,
        };

        info!(
            class = %report.class,
            engines = report.rows.len(),
            signals = report.total_signals(),
            failed = report.failed_engines(),
            "Grid {} finished: {} signals from {} engines ({} failed)",
            report.class,
            report.total_signals(),
            report.rows.len(),
            report.failed_engines()
        );

        report
    }
}
