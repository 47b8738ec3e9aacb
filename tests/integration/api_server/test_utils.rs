//! Test utilities for API server integration tests

use axum_test::TestServer;
use signalgrid::config::{GridConfig, PacingConfig};
use signalgrid::core::http::create_router;
use signalgrid::core::GridApp;
use signalgrid::engines::default_grids;
use signalgrid::gates::RateLimitPolicy;
use signalgrid::models::Observation;
use async_trait::async_trait;
use signalgrid::error::{GridError, Result};
use signalgrid::models::Snapshot;
use signalgrid::services::{
    InMemoryLedger, PaperExecutor, RecordingNotifier, SnapshotSource, StaticSnapshotSource,
};
use std::sync::Arc;

/// Snapshot source whose upstream is always down.
pub struct DownSource;

#[async_trait]
impl SnapshotSource for DownSource {
    async fn fetch_snapshot(&self) -> Result<Snapshot> {
        Err(GridError::DataSource("feed unreachable".to_string()))
    }
}

/// Test helper for API server integration tests
#[allow(dead_code)]
pub struct TestApiServer {
    pub server: TestServer,
    pub app: GridApp,
    pub ledger: Arc<InMemoryLedger>,
    pub executor: Arc<PaperExecutor>,
}

pub fn test_config() -> GridConfig {
    GridConfig {
        pacing: PacingConfig::none(),
        subject_id: "desk-1".to_string(),
        ..GridConfig::default()
    }
}

pub fn sample_observations() -> Vec<Observation> {
    vec![
        Observation::new("ACME")
            .with_number("sentiment", 0.92)
            .with_number("momentum", 0.9),
        Observation::new("BOLT")
            .with_flag("liquid", true)
            .with_number("volume_ratio", 3.0),
        Observation::new("DULL").with_number("sentiment", 0.1),
    ]
}

impl TestApiServer {
    pub async fn new() -> Self {
        Self::with_config(test_config(), true).await
    }

    pub async fn with_read_limit(max: u32) -> Self {
        let config = GridConfig {
            read_limit: RateLimitPolicy {
                window_ms: 60_000,
                max,
            },
            ..test_config()
        };
        Self::with_config(config, true).await
    }

    pub async fn without_scheduler() -> Self {
        Self::with_config(test_config(), false).await
    }

    pub async fn with_failing_source() -> Self {
        Self::build(test_config(), true, Arc::new(DownSource)).await
    }

    pub async fn with_config(config: GridConfig, with_scheduler: bool) -> Self {
        let source = Arc::new(StaticSnapshotSource::new(sample_observations()));
        Self::build(config, with_scheduler, source).await
    }

    async fn build(
        config: GridConfig,
        with_scheduler: bool,
        source: Arc<dyn SnapshotSource>,
    ) -> Self {
        let ledger = Arc::new(InMemoryLedger::new());
        let executor = Arc::new(PaperExecutor::new());
        let app = GridApp::assemble(
            config,
            default_grids(),
            source,
            ledger.clone(),
            executor.clone(),
            Arc::new(RecordingNotifier::default()),
        )
        .expect("metrics initialization");

        let router = create_router(app.http_state(with_scheduler));
        let server = TestServer::new(router).expect("start test server");

        Self {
            server,
            app,
            ledger,
            executor,
        }
    }
}
