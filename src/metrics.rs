//! Prometheus metrics for the HTTP surface and the grid loop

use prometheus::{Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,

    pub http_requests_total: IntCounter,
    pub http_request_duration_seconds: Histogram,
    pub http_requests_in_flight: IntGauge,
    pub rate_limit_rejections_total: IntCounter,

    pub grid_cycles_total: IntCounter,
    pub grid_cycle_failures_total: IntCounter,
    pub grid_cycle_duration_seconds: Histogram,
    pub engine_failures_total: IntCounter,
    pub signals_emitted_total: IntCounter,
    pub xp_posted_total: IntCounter,
    pub reward_post_failures_total: IntCounter,
    pub milestones_total: IntCounter,
    pub scheduler_running: Gauge,
}

impl Metrics {
    /// Every instance owns its own registry so tests can create as many as they like.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total =
            IntCounter::new("http_requests_total", "Total number of HTTP requests")?;
        let http_request_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        ))?;
        let http_requests_in_flight =
            IntGauge::new("http_requests_in_flight", "HTTP requests currently being served")?;
        let rate_limit_rejections_total = IntCounter::new(
            "rate_limit_rejections_total",
            "Requests rejected by the rate limiter",
        )?;

        let grid_cycles_total = IntCounter::new("grid_cycles_total", "Completed grid cycles")?;
        let grid_cycle_failures_total = IntCounter::new(
            "grid_cycle_failures_total",
            "Grid cycles aborted by a snapshot or orchestration failure",
        )?;
        let grid_cycle_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("grid_cycle_duration_seconds", "Grid cycle duration in seconds")
                .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        )?;
        let engine_failures_total =
            IntCounter::new("engine_failures_total", "Engine runs that failed or panicked")?;
        let signals_emitted_total =
            IntCounter::new("signals_emitted_total", "Signals emitted by all engines")?;
        let xp_posted_total = IntCounter::new("xp_posted_total", "XP posted to the reward ledger")?;
        let reward_post_failures_total = IntCounter::new(
            "reward_post_failures_total",
            "Reward postings rejected by the ledger",
        )?;
        let milestones_total = IntCounter::new("milestones_total", "Tier milestones reached")?;
        let scheduler_running = Gauge::new("scheduler_running", "1 while the scan loop is active")?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_requests_in_flight.clone()))?;
        registry.register(Box::new(rate_limit_rejections_total.clone()))?;
        registry.register(Box::new(grid_cycles_total.clone()))?;
        registry.register(Box::new(grid_cycle_failures_total.clone()))?;
        registry.register(Box::new(grid_cycle_duration_seconds.clone()))?;
        registry.register(Box::new(engine_failures_total.clone()))?;
        registry.register(Box::new(signals_emitted_total.clone()))?;
        registry.register(Box::new(xp_posted_total.clone()))?;
        registry.register(Box::new(reward_post_failures_total.clone()))?;
        registry.register(Box::new(milestones_total.clone()))?;
        registry.register(Box::new(scheduler_running.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            http_requests_in_flight,
            rate_limit_rejections_total,
            grid_cycles_total,
            grid_cycle_failures_total,
            grid_cycle_duration_seconds,
            engine_failures_total,
            signals_emitted_total,
            xp_posted_total,
            reward_post_failures_total,
            milestones_total,
            scheduler_running,
        })
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
