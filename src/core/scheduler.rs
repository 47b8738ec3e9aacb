//! Fixed-interval scan loop
//!
//! Each tick fetches a snapshot, runs every grid once, posts the XP earned per
//! engine and checks for a tier milestone. Nothing that happens inside a tick
//! stops the loop; the next tick is measured from the end of the previous one.

use crate::core::orchestrator::GridOrchestrator;
use crate::core::state::GridState;
use crate::error::Result;
use crate::metrics::Metrics;
use crate::models::summary::GridReport;
use crate::services::ledger::RewardLedger;
use crate::services::market_data::SnapshotSource;
use crate::services::notifier::MilestoneNotifier;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedMutexGuard, RwLock};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    /// Identity XP is posted for.
    pub subject_id: String,
    /// Evict cooldown records older than this many windows; 0 disables.
    pub sweep_factor: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(crate::config::DEFAULT_SCAN_INTERVAL_SECONDS),
            subject_id: crate::config::DEFAULT_SUBJECT_ID.to_string(),
            sweep_factor: crate::config::DEFAULT_SWEEP_FACTOR,
        }
    }
}

/// What one completed tick did.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub reports: Vec<GridReport>,
    pub xp_posted: u64,
    pub postings_failed: usize,
    pub milestone: Option<String>,
}

pub struct ScanScheduler {
    config: SchedulerConfig,
    orchestrators: Vec<Arc<GridOrchestrator>>,
    source: Arc<dyn SnapshotSource>,
    ledger: Arc<dyn RewardLedger>,
    notifier: Arc<dyn MilestoneNotifier>,
    state: Arc<GridState>,
    metrics: Arc<Metrics>,
    handle: RwLock<Option<tokio::task::JoinHandle<()>>>,
}

impl ScanScheduler {
    pub fn new(
        config: SchedulerConfig,
        orchestrators: Vec<Arc<GridOrchestrator>>,
        source: Arc<dyn SnapshotSource>,
        ledger: Arc<dyn RewardLedger>,
        notifier: Arc<dyn MilestoneNotifier>,
        state: Arc<GridState>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config,
            orchestrators,
            source,
            ledger,
            notifier,
            state,
            metrics,
            handle: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn state(&self) -> &Arc<GridState> {
        &self.state
    }

    pub fn orchestrators(&self) -> &[Arc<GridOrchestrator>] {
        &self.orchestrators
    }

    /// Runs one tick, waiting for any cycle already in progress.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let guard = self.state.cycle_lock.clone().lock_owned().await;
        self.run_cycle_locked(guard).await
    }

    /// Runs one tick while holding the cycle lock obtained by the caller.
    pub async fn run_cycle_locked(&self, _guard: OwnedMutexGuard<()>) -> Result<CycleOutcome> {
        let start = Instant::now();

        let snapshot = self.source.fetch_snapshot().await?;
        debug!(observations = snapshot.len(), "Snapshot fetched");

        let mut reports = Vec::with_capacity(self.orchestrators.len());
        for orchestrator in &self.orchestrators {
            let report = orchestrator.run_grid(&snapshot).await;
            self.state.record_report(report.clone()).await;
            reports.push(report);
        }

        let (xp_posted, postings_failed) = self.post_rewards(&reports).await;
        let milestone = self.check_milestone().await;
        self.sweep();

        self.metrics.grid_cycles_total.inc();
        self.metrics
            .grid_cycle_duration_seconds
            .observe(start.elapsed().as_secs_f64());

        info!(
            grids = reports.len(),
            xp = xp_posted,
            failed_postings = postings_failed,
            duration_ms = start.elapsed().as_millis() as u64,
            "Scan cycle complete: {} XP posted",
            xp_posted
        );

        Ok(CycleOutcome {
            reports,
            xp_posted,
            postings_failed,
            milestone,
        })
    }

    /// Posts `floor(avg_confidence * count)` for every row with signals.
    /// Failed postings are logged and not retried.
    async fn post_rewards(&self, reports: &[GridReport]) -> (u64, usize) {
        let mut posted = 0;
        let mut failed = 0;

        for row in reports.iter().flat_map(|r| r.rows.iter()).filter(|r| r.count > 0) {
            let xp = row.xp_reward();
            match self.ledger.post(&self.config.subject_id, xp, &row.codename).await {
                Ok(()) => {
                    posted += xp;
                    self.metrics.xp_posted_total.inc_by(xp);
                    debug!(
                        codename = %row.codename,
                        xp = xp,
                        count = row.count,
                        avg_confidence = %row.avg_confidence,
                        "Posted {} XP for {}",
                        xp,
                        row.codename
                    );
                }
                Err(e) => {
                    failed += 1;
                    self.metrics.reward_post_failures_total.inc();
                    warn!(
                        codename = %row.codename,
                        xp = xp,
                        error = %e,
                        "Reward posting failed for {}",
                        row.codename
                    );
                }
            }
        }

        (posted, failed)
    }

    async fn check_milestone(&self) -> Option<String> {
        let subject = &self.config.subject_id;
        let total = match self.ledger.total_xp(subject).await {
            Ok(total) => total,
            Err(e) => {
                warn!(subject = %subject, error = %e, "Could not read XP total, skipping milestone check");
                return None;
            }
        };

        let check = self.state.tiers.check_milestone(total);
        let tier = check.tier.filter(|_| check.triggered)?;

        self.metrics.milestones_total.inc();
        if let Err(e) = self.notifier.tier_reached(subject, &tier, total).await {
            warn!(subject = %subject, tier = %tier, error = %e, "Milestone notification failed");
        }
        Some(tier)
    }

    fn sweep(&self) {
        if self.config.sweep_factor == 0 {
            return;
        }
        let Some(max_age) = self
            .state
            .cooldowns
            .window()
            .checked_mul(self.config.sweep_factor)
        else {
            debug!(
                sweep_factor = self.config.sweep_factor,
                "Cooldown sweep age overflows, skipping sweep"
            );
            return;
        };
        let cooldowns = self.state.cooldowns.sweep(max_age);
        let buckets = self.state.rate_limiter.sweep();
        if cooldowns + buckets > 0 {
            debug!(cooldowns = cooldowns, buckets = buckets, "Swept stale gate entries");
        }
    }

    /// Runs one cycle under `guard`. Errors and panics are logged and counted
    /// here; the caller only learns whether the cycle completed.
    pub async fn run_supervised(&self, guard: OwnedMutexGuard<()>) -> Option<CycleOutcome> {
        match AssertUnwindSafe(self.run_cycle_locked(guard)).catch_unwind().await {
            Ok(Ok(outcome)) => Some(outcome),
            Ok(Err(e)) => {
                self.metrics.grid_cycle_failures_total.inc();
                error!(error = %e, "Scan cycle aborted");
                None
            }
            Err(_) => {
                self.metrics.grid_cycle_failures_total.inc();
                error!("Scan cycle panicked");
                None
            }
        }
    }

    /// One tick of the loop.
    async fn tick(&self) {
        let guard = self.state.cycle_lock.clone().lock_owned().await;
        self.run_supervised(guard).await;
    }

    /// Start the loop in the background. The first tick fires one interval from now.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        if self.config.interval.is_zero() {
            return Err(crate::GridError::Config(
                "scan interval must be greater than zero".to_string(),
            ));
        }

        let mut handle = self.handle.write().await;
        if handle.is_some() {
            warn!("ScanScheduler: already running");
            return Ok(());
        }

        let scheduler = Arc::clone(self);
        *handle = Some(tokio::spawn(async move {
            info!(
                interval_secs = scheduler.config.interval.as_secs(),
                grids = scheduler.orchestrators.len(),
                "ScanScheduler: started"
            );
            loop {
                tokio::time::sleep(scheduler.config.interval).await;
                scheduler.tick().await;
            }
        }));

        self.metrics.scheduler_running.set(1.0);
        Ok(())
    }

    pub async fn stop(&self) {
        if let Some(h) = self.handle.write().await.take() {
            h.abort();
            self.metrics.scheduler_running.set(0.0);
            info!("ScanScheduler: stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.handle.read().await.is_some()
    }
}
