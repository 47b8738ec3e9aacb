//! Unit tests for the scan scheduler

use crate::test_utils::{FailingEngine, FixedEngine, RejectingLedger};
use async_trait::async_trait;
use signalgrid::core::orchestrator::GridOrchestrator;
use signalgrid::core::scheduler::{ScanScheduler, SchedulerConfig};
use signalgrid::core::state::GridState;
use signalgrid::engines::{Engine, Grid, GridClass};
use signalgrid::error::{GridError, Result};
use signalgrid::metrics::Metrics;
use signalgrid::models::{Observation, Snapshot};
use signalgrid::services::ledger::{InMemoryLedger, RewardLedger};
use signalgrid::services::market_data::{SnapshotSource, StaticSnapshotSource};
use signalgrid::services::notifier::{MilestoneNotifier, RecordingNotifier};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::assert_ok;

struct DownSource {
    calls: AtomicUsize,
}

#[async_trait]
impl SnapshotSource for DownSource {
    async fn fetch_snapshot(&self) -> Result<Snapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(GridError::DataSource("feed unreachable".to_string()))
    }
}

struct BrokenSource;

#[async_trait]
impl SnapshotSource for BrokenSource {
    async fn fetch_snapshot(&self) -> Result<Snapshot> {
        panic!("decoder bug");
    }
}

struct Fixture {
    scheduler: Arc<ScanScheduler>,
    metrics: Arc<Metrics>,
    notifier: Arc<RecordingNotifier>,
}

fn config(interval: Duration) -> SchedulerConfig {
    SchedulerConfig {
        interval,
        subject_id: "desk-1".to_string(),
        sweep_factor: 2,
    }
}

fn fixture(
    interval: Duration,
    engines: Vec<Arc<dyn Engine>>,
    source: Arc<dyn SnapshotSource>,
    ledger: Arc<dyn RewardLedger>,
) -> Fixture {
    fixture_with(
        config(interval),
        GridState::new(Duration::from_secs(60)),
        engines,
        source,
        ledger,
    )
}

fn fixture_with(
    config: SchedulerConfig,
    state: GridState,
    engines: Vec<Arc<dyn Engine>>,
    source: Arc<dyn SnapshotSource>,
    ledger: Arc<dyn RewardLedger>,
) -> Fixture {
    let metrics = Arc::new(Metrics::new().unwrap());
    let notifier = Arc::new(RecordingNotifier::default());
    let orchestrator = Arc::new(
        GridOrchestrator::new(Grid::new(GridClass::Fast, engines), Duration::ZERO)
            .with_metrics(metrics.clone()),
    );
    let scheduler = Arc::new(ScanScheduler::new(
        config,
        vec![orchestrator],
        source,
        ledger,
        notifier.clone() as Arc<dyn MilestoneNotifier>,
        Arc::new(state),
        metrics.clone(),
    ));
    Fixture {
        scheduler,
        metrics,
        notifier,
    }
}

fn static_source() -> Arc<dyn SnapshotSource> {
    Arc::new(StaticSnapshotSource::new(vec![
        Observation::new("ACME").with_number("sentiment", 0.9),
    ]))
}

#[tokio::test]
async fn cycle_posts_floor_of_formatted_average() {
    let ledger = Arc::new(InMemoryLedger::new());
    let f = fixture(
        Duration::from_secs(300),
        vec![
            Arc::new(FixedEngine::new("Alpha", &[0.8755; 4])),
            Arc::new(FixedEngine::new("Quiet", &[])),
        ],
        static_source(),
        ledger.clone(),
    );

    let outcome = f.scheduler.run_cycle().await.unwrap();

    assert_eq!(outcome.xp_posted, 3);
    assert_eq!(outcome.postings_failed, 0);
    let postings = ledger.postings();
    assert_eq!(postings.len(), 1, "rows with no signals post nothing");
    assert_eq!(postings[0].source, "Alpha");
    assert_eq!(postings[0].subject, "desk-1");
    assert_eq!(postings[0].xp, 3);
    assert_eq!(f.metrics.grid_cycles_total.get(), 1);
    assert_eq!(f.metrics.xp_posted_total.get(), 3);

    let latest = f.scheduler.state().latest_reports().await;
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].observations, 1);
}

#[tokio::test]
async fn snapshot_failure_aborts_the_cycle() {
    let ledger = Arc::new(InMemoryLedger::new());
    let engine = Arc::new(FixedEngine::new("Alpha", &[0.9]));
    let f = fixture(
        Duration::from_secs(300),
        vec![engine.clone() as Arc<dyn Engine>],
        Arc::new(DownSource {
            calls: AtomicUsize::new(0),
        }),
        ledger.clone(),
    );

    let err = f.scheduler.run_cycle().await.unwrap_err();

    assert!(matches!(err, GridError::DataSource(_)));
    assert_eq!(engine.runs.load(Ordering::SeqCst), 0);
    assert!(ledger.postings().is_empty());
}

#[tokio::test]
async fn ledger_failures_are_counted_not_raised() {
    let f = fixture(
        Duration::from_secs(300),
        vec![
            Arc::new(FixedEngine::new("Alpha", &[0.9, 0.9])),
            Arc::new(FailingEngine::new("Broken")),
        ],
        static_source(),
        Arc::new(RejectingLedger),
    );

    let outcome = f.scheduler.run_cycle().await.unwrap();

    assert_eq!(outcome.xp_posted, 0);
    assert_eq!(outcome.postings_failed, 1);
    assert!(outcome.milestone.is_none());
    assert_eq!(f.metrics.reward_post_failures_total.get(), 1);
    assert!(f.notifier.events().is_empty());
}

#[tokio::test]
async fn crossing_a_tier_notifies_once() {
    let ledger = Arc::new(InMemoryLedger::new());
    ledger.post("desk-1", 98, "seed").await.unwrap();
    let f = fixture(
        Duration::from_secs(300),
        vec![Arc::new(FixedEngine::new("Alpha", &[0.8755; 4]))],
        static_source(),
        ledger.clone(),
    );

    let first = f.scheduler.run_cycle().await.unwrap();
    assert_eq!(first.milestone.as_deref(), Some("Mini"));

    let second = f.scheduler.run_cycle().await.unwrap();
    assert!(second.milestone.is_none());

    assert_eq!(
        f.notifier.events(),
        vec![("desk-1".to_string(), "Mini".to_string(), 101)]
    );
    assert_eq!(f.metrics.milestones_total.get(), 1);
}

#[tokio::test]
async fn zero_interval_cannot_start() {
    let f = fixture(
        Duration::ZERO,
        vec![],
        static_source(),
        Arc::new(InMemoryLedger::new()),
    );
    assert!(matches!(
        f.scheduler.start().await,
        Err(GridError::Config(_))
    ));
    assert!(!f.scheduler.is_running().await);
}

#[tokio::test(start_paused = true)]
async fn first_tick_fires_after_one_interval() {
    let f = fixture(
        Duration::from_secs(300),
        vec![Arc::new(FixedEngine::new("Alpha", &[0.9]))],
        static_source(),
        Arc::new(InMemoryLedger::new()),
    );

    assert_ok!(f.scheduler.start().await);
    assert!(f.scheduler.is_running().await);

    tokio::time::sleep(Duration::from_secs(299)).await;
    assert_eq!(f.metrics.grid_cycles_total.get(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(f.metrics.grid_cycles_total.get(), 1);

    f.scheduler.stop().await;
    assert!(!f.scheduler.is_running().await);
    assert_eq!(f.metrics.scheduler_running.get(), 0.0);

    tokio::time::sleep(Duration::from_secs(900)).await;
    assert_eq!(f.metrics.grid_cycles_total.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn loop_survives_failing_cycles() {
    let source = Arc::new(DownSource {
        calls: AtomicUsize::new(0),
    });
    let f = fixture(
        Duration::from_secs(60),
        vec![Arc::new(FixedEngine::new("Alpha", &[0.9]))],
        source.clone(),
        Arc::new(InMemoryLedger::new()),
    );

    assert_ok!(f.scheduler.start().await);
    tokio::time::sleep(Duration::from_secs(150)).await;

    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    assert_eq!(f.metrics.grid_cycle_failures_total.get(), 2);
    assert!(f.scheduler.is_running().await);
    f.scheduler.stop().await;
}

#[tokio::test]
async fn concurrent_cycles_do_not_overlap() {
    let f = fixture(
        Duration::from_secs(300),
        vec![Arc::new(FixedEngine::new("Alpha", &[0.9]))],
        static_source(),
        Arc::new(InMemoryLedger::new()),
    );

    let guard = f.scheduler.state().cycle_lock.clone().try_lock_owned().unwrap();
    assert!(f.scheduler.state().is_cycle_running());

    let scheduler = f.scheduler.clone();
    let waiting = tokio::spawn(async move { scheduler.run_cycle().await });
    tokio::task::yield_now().await;
    assert_eq!(f.metrics.grid_cycles_total.get(), 0);

    drop(guard);
    waiting.await.unwrap().unwrap();
    assert_eq!(f.metrics.grid_cycles_total.get(), 1);
}

#[tokio::test]
async fn huge_cooldown_window_skips_sweep_instead_of_panicking() {
    let ledger = Arc::new(InMemoryLedger::new());
    let f = fixture_with(
        SchedulerConfig {
            interval: Duration::from_secs(300),
            subject_id: "desk-1".to_string(),
            sweep_factor: 10,
        },
        GridState::new(Duration::from_secs(u64::MAX / 5)),
        vec![Arc::new(FixedEngine::new("Alpha", &[0.9, 0.9]))],
        static_source(),
        ledger.clone(),
    );
    f.scheduler.state().cooldowns.trigger("ACME");

    let outcome = f.scheduler.run_cycle().await.unwrap();

    assert_eq!(outcome.xp_posted, 1);
    assert!(f.scheduler.state().cooldowns.is_on_cooldown("ACME"));
    assert_eq!(f.metrics.grid_cycle_failures_total.get(), 0);
}

#[tokio::test]
async fn supervised_cycle_counts_errors_and_panics() {
    let failing = fixture(
        Duration::from_secs(300),
        vec![],
        Arc::new(DownSource {
            calls: AtomicUsize::new(0),
        }),
        Arc::new(InMemoryLedger::new()),
    );
    let guard = failing.scheduler.state().cycle_lock.clone().lock_owned().await;
    assert!(failing.scheduler.run_supervised(guard).await.is_none());
    assert_eq!(failing.metrics.grid_cycle_failures_total.get(), 1);

    let panicking = fixture(
        Duration::from_secs(300),
        vec![],
        Arc::new(BrokenSource),
        Arc::new(InMemoryLedger::new()),
    );
    let guard = panicking.scheduler.state().cycle_lock.clone().lock_owned().await;
    assert!(panicking.scheduler.run_supervised(guard).await.is_none());
    assert_eq!(panicking.metrics.grid_cycle_failures_total.get(), 1);
    assert!(!panicking.scheduler.state().is_cycle_running());
}
