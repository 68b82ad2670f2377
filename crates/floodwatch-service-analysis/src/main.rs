//! Floodwatch flood analysis HTTP microservice.
//!
//! # Endpoints
//!
//! - `POST /flood-analysis` - risk assessment for a location from stored alerts
//! - `POST /ai-assistant` - emergency guidance with nearby alerts and shelters
//! - `GET /metrics` - Prometheus metrics endpoint
//! - `GET /health/live` - liveness probe
//! - `GET /health/ready` - readiness probe
//!
//! Both endpoints answer 200 with `fallback: true` when text generation is
//! unavailable.
//!
//! # Configuration
//!
//! - `FLOODWATCH_*` - see `FloodwatchConfig::from_env`
//! - `RUST_LOG` - Log level (default: info)
//! - `LOG_FORMAT` - Log format: json (default) or text
//! - `SERVICE_PORT` - HTTP port (default: 8080)

use std::env;
use std::net::SocketAddr;

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use tracing::{error, info};

use floodwatch_lib::api::{AssistantRequest, LocationRequest};
use floodwatch_lib::{AssistantReply, FloodAnalysis, FloodwatchConfig};
use floodwatch_service_shared::{
    cors_layer, health_live, health_ready, init_logging, init_metrics, metrics_handler,
    record_analysis, record_assistant_reply, AppState, LoggingConfig, MetricsConfig,
    MetricsLayer, RequestId, ServiceResponse, Validated,
};

const SERVICE: &str = "analysis";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(&LoggingConfig::from_env().with_service(SERVICE));

    let metrics_config = MetricsConfig::from_env();
    if let Err(e) = init_metrics(&metrics_config) {
        tracing::warn!(error = %e, "failed to initialize metrics, continuing without metrics");
    }

    let port: u16 = env::var("SERVICE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let config = FloodwatchConfig::from_env();
    if !config.textgen_enabled() {
        tracing::warn!("no text generation key configured, answers will use fallbacks");
    }
    info!(port, config = ?config, "starting analysis service");

    let state = AppState::load(SERVICE, config).map_err(|e| {
        error!(error = %e, "failed to load application state");
        e
    })?;

    let app = app(state, &metrics_config.path);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(addr = %addr, "listening on");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn app(state: AppState, metrics_path: &str) -> Router {
    Router::new()
        .route("/flood-analysis", post(flood_analysis_handler))
        .route("/ai-assistant", post(assistant_handler))
        .route(metrics_path, get(metrics_handler))
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready))
        .layer(cors_layer())
        .layer(MetricsLayer)
        .with_state(state)
}

/// Handle POST /flood-analysis.
async fn flood_analysis_handler(
    State(state): State<AppState>,
    request_id: RequestId,
    Validated(location): Validated<LocationRequest>,
) -> ServiceResponse<FloodAnalysis> {
    info!(
        request_id = %request_id,
        latitude = location.latitude,
        longitude = location.longitude,
        "handling flood analysis request"
    );

    let analysis = state.floodwatch().flood_analysis(location).await;
    record_analysis(&analysis);

    info!(
        request_id = %request_id,
        risk_level = %analysis.risk_level,
        confidence = analysis.confidence,
        alerts = analysis.flood_alerts.len(),
        fallback = analysis.fallback,
        "flood analysis complete"
    );

    let degraded = analysis.fallback;
    ServiceResponse::degraded(analysis, degraded)
}

/// Handle POST /ai-assistant.
async fn assistant_handler(
    State(state): State<AppState>,
    request_id: RequestId,
    Validated(query): Validated<AssistantRequest>,
) -> ServiceResponse<AssistantReply> {
    info!(
        request_id = %request_id,
        has_location = query.location.is_some(),
        message_len = query.message.len(),
        "handling assistant request"
    );

    let reply = state.floodwatch().ai_assistant(query).await;
    record_assistant_reply(&reply);

    let degraded = reply.fallback;
    ServiceResponse::degraded(reply, degraded)
}
