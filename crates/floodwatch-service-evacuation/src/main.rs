//! Floodwatch evacuation HTTP microservice.
//!
//! # Endpoints
//!
//! - `POST /nearest-evacuation-point` - closest mapped shelter, or a known fallback
//! - `POST /optimize-route` - driving route with a flood risk label
//! - `GET /metrics` - Prometheus metrics endpoint
//! - `GET /health/live` - liveness probe
//! - `GET /health/ready` - readiness probe
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

use floodwatch_lib::api::{NearestShelterRequest, RouteRequest};
use floodwatch_lib::{Annotation, FloodwatchConfig, Route, RouteSource, ShelterLookup};
use floodwatch_service_shared::{
    cors_layer, health_live, health_ready, init_logging, init_metrics, metrics_handler,
    record_route_plan, record_shelter_lookup, AppState, LoggingConfig, MetricsConfig,
    MetricsLayer, RequestId, ServiceResponse, Validated,
};

const SERVICE: &str = "evacuation";

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
    info!(port, config = ?config, "starting evacuation service");

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
        .route("/nearest-evacuation-point", post(nearest_shelter_handler))
        .route("/optimize-route", post(optimize_route_handler))
        .route(metrics_path, get(metrics_handler))
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready))
        .layer(cors_layer())
        .layer(MetricsLayer)
        .with_state(state)
}

/// Handle POST /nearest-evacuation-point.
async fn nearest_shelter_handler(
    State(state): State<AppState>,
    request_id: RequestId,
    Validated(query): Validated<NearestShelterRequest>,
) -> ServiceResponse<ShelterLookup> {
    info!(
        request_id = %request_id,
        latitude = query.location.latitude,
        longitude = query.location.longitude,
        radius_m = ?query.radius_m,
        "handling nearest shelter request"
    );

    let lookup = state.floodwatch().nearest_shelter(query).await;
    record_shelter_lookup(&lookup);

    info!(
        request_id = %request_id,
        shelter = lookup.point.name().unwrap_or("unnamed"),
        distance_m = lookup.point.dist,
        fallback = lookup.fallback,
        "nearest shelter resolved"
    );

    let degraded = lookup.fallback;
    ServiceResponse::degraded(lookup, degraded)
}

/// Handle POST /optimize-route.
async fn optimize_route_handler(
    State(state): State<AppState>,
    request_id: RequestId,
    Validated((start, end)): Validated<RouteRequest>,
) -> ServiceResponse<Route> {
    info!(
        request_id = %request_id,
        start = ?start,
        end = ?end,
        "handling route request"
    );

    let planned = state.floodwatch().optimize_route(start, end).await;
    record_route_plan(&planned);

    info!(
        request_id = %request_id,
        risk_level = %planned.route.risk_level,
        source = ?planned.source,
        annotation = ?planned.annotation,
        distance_m = planned.route.distance_m,
        "route planned"
    );

    let degraded =
        planned.source == RouteSource::Direct || planned.annotation == Annotation::Unavailable;
    ServiceResponse::degraded(planned.route, degraded)
}
