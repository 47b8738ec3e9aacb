//! HTTP endpoint server using Axum

use axum::{
    extract::{ConnectInfo, Path, Query, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{debug, error, info, Level};

use crate::core::scheduler::ScanScheduler;
use crate::core::state::GridState;
use crate::engines::EngineDescriptor;
use crate::gates::{RateLimitKey, RateLimitPolicy, RateLimiter};
use crate::metrics::Metrics;

pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

#[derive(Clone)]
pub struct AppState {
    pub health: Arc<RwLock<HealthStatus>>,
    pub metrics: Arc<Metrics>,
    pub start_time: Arc<Instant>,
    pub grid: Arc<GridState>,
    pub engines: Arc<Vec<EngineDescriptor>>,
    /// Present when this process also runs the scan loop.
    pub scheduler: Option<Arc<ScanScheduler>>,
    pub scan_interval_seconds: u64,
    pub strict_limit: RateLimitPolicy,
    pub read_limit: RateLimitPolicy,
}

#[derive(Clone, Debug)]
pub struct HealthStatus {
    pub status: String,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

pub async fn health_check(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let health = state.health.read().await;
    let uptime_seconds = state.start_time.elapsed().as_secs();
    Ok(Json(json!({
        "status": health.status,
        "uptime_seconds": uptime_seconds,
        "service": "signalgrid"
    })))
}

pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .export()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Middleware to track HTTP request metrics
async fn metrics_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    state.metrics.http_requests_in_flight.inc();
    let response = next.run(request).await;
    let status = response.status();
    let duration = start.elapsed();
    state.metrics.http_requests_in_flight.dec();

    state.metrics.http_requests_total.inc();
    state
        .metrics
        .http_request_duration_seconds
        .observe(duration.as_secs_f64());

    if status.is_server_error() {
        error!(
            method = %method,
            path = %path,
            status = %status,
            duration_ms = duration.as_millis(),
            "HTTP request error"
        );
    }

    response
}

/// State for one rate-limited route group.
#[derive(Clone)]
pub struct RateLimitGuard {
    pub limiter: Arc<RateLimiter>,
    pub policy: RateLimitPolicy,
    pub metrics: Arc<Metrics>,
}

/// Authenticated caller, inserted as a request extension by an auth layer in
/// front of the router. Request headers are never trusted as identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(pub String);

fn caller_key(request: &Request) -> String {
    let headers = request.headers();
    let identity = request
        .extensions()
        .get::<CallerIdentity>()
        .map(|CallerIdentity(id)| id.as_str());
    let origin = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .or_else(|| forwarded_for(headers));
    RateLimitKey::derive(None, identity, origin.as_deref())
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(|ip| ip.trim().to_string())
}

/// Rejects with 429 once the caller exhausts the group's window.
pub async fn enforce_rate_limit(
    State(guard): State<RateLimitGuard>,
    request: Request,
    next: Next,
) -> Response {
    let key = caller_key(&request);
    let decision = guard.limiter.check_policy(&key, guard.policy);

    if !decision.allowed {
        guard.metrics.rate_limit_rejections_total.inc();
        debug!(
            key = %key,
            path = %request.uri().path(),
            reset_in_ms = decision.reset_in_ms,
            "Rate limit reached"
        );
        let retry_after = decision.reset_in_ms.div_ceil(1000);
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "too many requests",
                "reset_in_ms": decision.reset_in_ms,
            })),
        )
            .into_response();
        response
            .headers_mut()
            .insert("retry-after", HeaderValue::from(retry_after));
        response
            .headers_mut()
            .insert(REMAINING_HEADER, HeaderValue::from(0u32));
        return response;
    }

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
    response
}

async fn list_engines(State(state): State<AppState>) -> Json<Vec<EngineDescriptor>> {
    Json(state.engines.as_ref().clone())
}

async fn grid_summary(State(state): State<AppState>) -> Json<Value> {
    let reports = state.grid.latest_reports().await;
    Json(json!({
        "cycle_running": state.grid.is_cycle_running(),
        "grids": reports,
    }))
}

#[derive(Debug, Serialize)]
struct CooldownResponse {
    subject: String,
    on_cooldown: bool,
    remaining_ms: u64,
}

async fn cooldown_status(
    State(state): State<AppState>,
    Path(subject): Path<String>,
) -> Json<CooldownResponse> {
    let cooldowns = &state.grid.cooldowns;
    Json(CooldownResponse {
        on_cooldown: cooldowns.is_on_cooldown(&subject),
        remaining_ms: cooldowns.remaining(&subject).as_millis() as u64,
        subject,
    })
}

#[derive(Debug, Deserialize)]
struct TierProgressQuery {
    xp: u64,
    rate: Option<f64>,
}

async fn tier_progress(
    State(state): State<AppState>,
    Query(params): Query<TierProgressQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let tiers = &state.grid.tiers;
    let position = tiers.current_tier(params.xp);

    let eta = match params.rate {
        Some(rate) if rate.is_finite() && rate > 0.0 => Some(tiers.estimate_time_to_next(
            params.xp,
            rate,
            state.scan_interval_seconds,
        )),
        Some(_) => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "rate must be greater than zero" })),
            ))
        }
        None => None,
    };

    Ok(Json(json!({
        "xp": params.xp,
        "current": position.current,
        "next": position.next,
        "eta": eta,
    })))
}

/// Starts one cycle in the background. 409 if a cycle is already running.
async fn trigger_scan(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let Some(scheduler) = state.scheduler.clone() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "scan loop is not configured in this process" })),
        );
    };

    let guard = match state.grid.cycle_lock.clone().try_lock_owned() {
        Ok(guard) => guard,
        Err(_) => {
            return (
                StatusCode::CONFLICT,
                Json(json!({ "error": "a scan cycle is already running" })),
            )
        }
    };

    tokio::spawn(async move {
        if let Some(outcome) = scheduler.run_supervised(guard).await {
            info!(xp = outcome.xp_posted, "Manual scan finished");
        }
    });

    (StatusCode::ACCEPTED, Json(json!({ "status": "scan started" })))
}

pub fn create_router(state: AppState) -> Router {
    let read_guard = RateLimitGuard {
        limiter: state.grid.rate_limiter.clone(),
        policy: state.read_limit,
        metrics: state.metrics.clone(),
    };
    let strict_guard = RateLimitGuard {
        policy: state.strict_limit,
        ..read_guard.clone()
    };

    let read_routes = Router::new()
        .route("/api/grid/engines", get(list_engines))
        .route("/api/grid/summary", get(grid_summary))
        .route("/api/cooldowns/{subject}", get(cooldown_status))
        .route("/api/tiers/progress", get(tier_progress))
        .route_layer(axum::middleware::from_fn_with_state(
            read_guard,
            enforce_rate_limit,
        ));

    let strict_routes = Router::new()
        .route("/api/grid/scan", post(trigger_scan))
        .route_layer(axum::middleware::from_fn_with_state(
            strict_guard,
            enforce_rate_limit,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .merge(read_routes)
        .merge(strict_routes)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
                )
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    metrics_middleware,
                ))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn start_server(state: AppState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!(port = port, "HTTP server listening on port {}", port);
    info!(
        "Metrics endpoint available at http://0.0.0.0:{}/metrics",
        port
    );
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
