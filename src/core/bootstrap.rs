//! Wires config, state, adapters and grids into a runnable application

use crate::config::GridConfig;
use crate::core::http::{AppState, HealthStatus};
use crate::core::orchestrator::GridOrchestrator;
use crate::core::scheduler::{ScanScheduler, SchedulerConfig};
use crate::core::state::GridState;
use crate::engines::{default_grids, ActionContext, EngineDescriptor, Grid};
use crate::metrics::Metrics;
use crate::services::executor::{ActionExecutor, PaperExecutor};
use crate::services::ledger::{HttpRewardLedger, InMemoryLedger, RewardLedger};
use crate::services::market_data::{HttpSnapshotSource, SnapshotSource, StaticSnapshotSource};
use crate::services::notifier::{LogNotifier, MilestoneNotifier};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub struct GridApp {
    pub config: GridConfig,
    pub state: Arc<GridState>,
    pub metrics: Arc<Metrics>,
    pub scheduler: Arc<ScanScheduler>,
    pub engines: Vec<EngineDescriptor>,
}

impl GridApp {
    /// Builds the app with the default grids and the adapters selected by `config`.
    pub fn from_config(config: GridConfig) -> Result<Self, prometheus::Error> {
        let source: Arc<dyn SnapshotSource> = match config.snapshot_url {
            Some(ref url) => {
                info!(url = %url, "Using HTTP snapshot source");
                Arc::new(HttpSnapshotSource::new(url.clone()))
            }
            None => {
                warn!("SNAPSHOT_URL not set, scanning an empty static snapshot");
                Arc::new(StaticSnapshotSource::default())
            }
        };
        let ledger: Arc<dyn RewardLedger> = match config.ledger_url {
            Some(ref url) => {
                info!(url = %url, "Using HTTP reward ledger");
                Arc::new(HttpRewardLedger::new(url.clone()))
            }
            None => {
                info!("LEDGER_URL not set, keeping XP in memory");
                Arc::new(InMemoryLedger::new())
            }
        };

        Self::assemble(
            config,
            default_grids(),
            source,
            ledger,
            Arc::new(PaperExecutor::new()),
            Arc::new(LogNotifier),
        )
    }

    pub fn assemble(
        config: GridConfig,
        grids: Vec<Grid>,
        source: Arc<dyn SnapshotSource>,
        ledger: Arc<dyn RewardLedger>,
        executor: Arc<dyn ActionExecutor>,
        notifier: Arc<dyn MilestoneNotifier>,
    ) -> Result<Self, prometheus::Error> {
        let metrics = Arc::new(Metrics::new()?);
        let state = Arc::new(GridState::new(config.cooldown));

        let action_ctx = ActionContext {
            executor,
            ledger: ledger.clone(),
            cooldowns: state.cooldowns.clone(),
            subject_id: config.subject_id.clone(),
        };

        let engines: Vec<EngineDescriptor> = grids.iter().flat_map(Grid::descriptors).collect();
        let orchestrators = grids
            .into_iter()
            .map(|grid| {
                let pacing = config.pacing.delay_for(grid.class());
                Arc::new(
                    GridOrchestrator::new(grid, pacing)
                        .with_action_context(action_ctx.clone())
                        .with_metrics(metrics.clone()),
                )
            })
            .collect();

        let scheduler = Arc::new(ScanScheduler::new(
            SchedulerConfig {
                interval: config.scan_interval(),
                subject_id: config.subject_id.clone(),
                sweep_factor: config.sweep_factor,
            },
            orchestrators,
            source,
            ledger,
            notifier,
            state.clone(),
            metrics.clone(),
        ));

        Ok(Self {
            config,
            state,
            metrics,
            scheduler,
            engines,
        })
    }

    /// HTTP state sharing this app's grid state and metrics.
    pub fn http_state(&self, with_scheduler: bool) -> AppState {
        AppState {
            health: Arc::new(RwLock::new(HealthStatus::default())),
            metrics: self.metrics.clone(),
            start_time: Arc::new(Instant::now()),
            grid: self.state.clone(),
            engines: Arc::new(self.engines.clone()),
            scheduler: with_scheduler.then(|| self.scheduler.clone()),
            scan_interval_seconds: self.config.scan_interval_seconds,
            strict_limit: self.config.strict_limit,
            read_limit: self.config.read_limit,
        }
    }
}
