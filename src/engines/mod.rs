//! Engine contract and the registered grids
//!
//! Every engine implements [`Engine::run`]. Engines that also perform
//! side-effecting actions implement [`ActiveEngine`] and expose themselves
//! through [`Engine::as_active`]; the runner then calls `run_active` with an
//! [`ActionContext`] instead of `run`.

pub mod liquidity;
pub mod momentum;
pub mod sentiment;

use crate::error::Result;
use crate::gates::CooldownGate;
use crate::models::observation::Snapshot;
use crate::models::signal::Signal;
use crate::services::executor::ActionExecutor;
use crate::services::ledger::RewardLedger;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub use liquidity::LiquidityWatch;
pub use momentum::MomentumTrader;
pub use sentiment::SentimentScout;

/// Grid class. Pacing between engine runs is a property of the class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridClass {
    Fast,
    Control,
    Tactical,
    Strategic,
}

impl GridClass {
    pub fn default_pacing(self) -> Duration {
        match self {
            GridClass::Fast => Duration::from_secs(6),
            GridClass::Control => Duration::from_secs(10),
            GridClass::Tactical => Duration::from_secs(12),
            GridClass::Strategic => Duration::from_secs(15),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GridClass::Fast => "fast",
            GridClass::Control => "control",
            GridClass::Tactical => "tactical",
            GridClass::Strategic => "strategic",
        }
    }
}

impl std::fmt::Display for GridClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static identity of an engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineDescriptor {
    pub id: String,
    pub codename: String,
    pub class: GridClass,
    pub strategy: String,
    pub description: String,
}

impl EngineDescriptor {
    pub fn new(
        id: impl Into<String>,
        codename: impl Into<String>,
        class: GridClass,
        strategy: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            codename: codename.into(),
            class,
            strategy: strategy.into(),
            description: description.into(),
        }
    }
}

/// Capabilities handed to active engines.
#[derive(Clone)]
pub struct ActionContext {
    pub executor: Arc<dyn ActionExecutor>,
    pub ledger: Arc<dyn RewardLedger>,
    pub cooldowns: Arc<CooldownGate>,
    /// Identity rewards are credited to.
    pub subject_id: String,
}

#[async_trait]
pub trait Engine: Send + Sync {
    fn descriptor(&self) -> &EngineDescriptor;

    async fn run(&self, snapshot: &Snapshot) -> Result<Vec<Signal>>;

    fn as_active(&self) -> Option<&dyn ActiveEngine> {
        None
    }
}

/// An engine that may act on its signals.
///
/// For each qualifying observation whose subject is not cooling down, the
/// engine executes the action, posts the reward, then starts the cooldown, in
/// that order. A failed action skips both the reward and the cooldown.
#[async_trait]
pub trait ActiveEngine: Engine {
    async fn run_active(&self, snapshot: &Snapshot, ctx: &ActionContext) -> Result<Vec<Signal>>;
}

/// A fixed, ordered set of engines sharing one class.
#[derive(Clone)]
pub struct Grid {
    class: GridClass,
    engines: Vec<Arc<dyn Engine>>,
}

impl Grid {
    pub fn new(class: GridClass, engines: Vec<Arc<dyn Engine>>) -> Self {
        Self { class, engines }
    }

    pub fn class(&self) -> GridClass {
        self.class
    }

    pub fn engines(&self) -> &[Arc<dyn Engine>] {
        &self.engines
    }

    pub fn descriptors(&self) -> Vec<EngineDescriptor> {
        self.engines.iter().map(|e| e.descriptor().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

/// The grids registered at process start, in run order.
pub fn default_grids() -> Vec<Grid> {
    vec![
        Grid::new(GridClass::Fast, vec![Arc::new(SentimentScout::default())]),
        Grid::new(GridClass::Control, vec![Arc::new(LiquidityWatch::default())]),
        Grid::new(GridClass::Strategic, vec![Arc::new(MomentumTrader::default())]),
    ]
}
