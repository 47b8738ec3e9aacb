//! Test utilities for worker integration tests

use serde_json::{json, Value};
use signalgrid::config::{GridConfig, PacingConfig};
use signalgrid::services::XpPosting;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn snapshot_body() -> Value {
    json!([
        { "ticker": "ACME", "sentiment": 0.95, "momentum": 0.9 },
        { "ticker": "ZETA", "sentiment": 0.95 },
        { "ticker": "BOLT", "liquid": true, "volume_ratio": 3.0 },
        { "ticker": "DULL", "sentiment": 0.1, "momentum": 0.2 }
    ])
}

pub async fn mock_snapshot(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/snapshot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot_body()))
        .mount(server)
        .await;
}

pub async fn mock_ledger(server: &MockServer, total_xp: u64) {
    Mock::given(method("POST"))
        .and(path("/xp"))
        .respond_with(ResponseTemplate::new(201))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/xp/[^/]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "xp": total_xp })))
        .mount(server)
        .await;
}

/// Worker config pointing both upstreams at `server`, with no pacing.
pub fn worker_config(server: &MockServer) -> GridConfig {
    GridConfig {
        pacing: PacingConfig::none(),
        snapshot_url: Some(format!("{}/snapshot", server.uri())),
        ledger_url: Some(server.uri()),
        subject_id: "desk-1".to_string(),
        ..GridConfig::default()
    }
}

/// XP postings the mock ledger received, in arrival order.
pub async fn received_postings(server: &MockServer) -> Vec<XpPosting> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path() == "/xp")
        .map(|r| serde_json::from_slice(&r.body).expect("posting body"))
        .collect()
}
