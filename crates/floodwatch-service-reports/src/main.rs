//! Floodwatch reports HTTP microservice.
//!
//! Serves the stored flood data: distress calls, active alerts and
//! evacuation points. Every endpoint needs the flood store, so a store outage
//! is a 503 rather than a fallback.
//!
//! # Endpoints
//!
//! - `GET /distress-calls` - ten most recent distress calls
//! - `POST /distress-calls` - record a distress call as `PENDING`
//! - `GET /flood-alerts` - ten most recent active alerts
//! - `POST /evacuation-points` - five nearest stored evacuation points
//! - `GET /metrics` - Prometheus metrics endpoint
//! - `GET /health/live` - liveness probe
//! - `GET /health/ready` - readiness probe
//!
//! # Configuration
//!
//! - `FLOODWATCH_DB_PATH` - SQLite database, created when missing
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

use floodwatch_lib::api::{
    DistressCallCreated, DistressCallList, DistressCallRequest, EvacuationPointList,
    FloodAlertList, LocationRequest,
};
use floodwatch_lib::FloodwatchConfig;
use floodwatch_service_shared::{
    cors_layer, from_lib_error, health_live, health_ready, init_logging, init_metrics,
    metrics_handler, ApiError, AppState, LoggingConfig, MetricsConfig, MetricsLayer, RequestId,
    ServiceResponse, Validated,
};

const SERVICE: &str = "reports";

type HandlerResult<T> = Result<ServiceResponse<T>, ApiError>;

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
    info!(port, db_path = %config.db_path.display(), "starting reports service");

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
        .route(
            "/distress-calls",
            get(list_distress_calls).post(create_distress_call),
        )
        .route("/flood-alerts", get(list_flood_alerts))
        .route("/evacuation-points", post(nearest_evacuation_points))
        .route(metrics_path, get(metrics_handler))
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready))
        .layer(cors_layer())
        .layer(MetricsLayer)
        .with_state(state)
}

/// Handle GET /distress-calls.
async fn list_distress_calls(
    State(state): State<AppState>,
    request_id: RequestId,
) -> HandlerResult<DistressCallList> {
    let calls = state
        .floodwatch()
        .recent_distress_calls()
        .await
        .map_err(|e| from_lib_error(&e, request_id.as_str()))?;
    info!(request_id = %request_id, count = calls.calls.len(), "listed distress calls");
    Ok(calls.into())
}

/// Handle POST /distress-calls.
async fn create_distress_call(
    State(state): State<AppState>,
    request_id: RequestId,
    Validated(call): Validated<DistressCallRequest>,
) -> HandlerResult<DistressCallCreated> {
    info!(
        request_id = %request_id,
        latitude = call.coordinate.latitude,
        longitude = call.coordinate.longitude,
        has_message = call.message.is_some(),
        "recording distress call"
    );
    let created = state
        .floodwatch()
        .record_distress_call(call)
        .await
        .map_err(|e| from_lib_error(&e, request_id.as_str()))?;
    Ok(created.into())
}

/// Handle GET /flood-alerts.
async fn list_flood_alerts(
    State(state): State<AppState>,
    request_id: RequestId,
) -> HandlerResult<FloodAlertList> {
    let alerts = state
        .floodwatch()
        .recent_flood_alerts()
        .await
        .map_err(|e| from_lib_error(&e, request_id.as_str()))?;
    info!(request_id = %request_id, count = alerts.alerts.len(), "listed flood alerts");
    Ok(alerts.into())
}

/// Handle POST /evacuation-points.
async fn nearest_evacuation_points(
    State(state): State<AppState>,
    request_id: RequestId,
    Validated(location): Validated<LocationRequest>,
) -> HandlerResult<EvacuationPointList> {
    let points = state
        .floodwatch()
        .nearest_evacuation_points(location)
        .await
        .map_err(|e| from_lib_error(&e, request_id.as_str()))?;
    info!(
        request_id = %request_id,
        latitude = location.latitude,
        longitude = location.longitude,
        count = points.points.len(),
        "listed evacuation points"
    );
    Ok(points.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::{Method, StatusCode};
    use axum_test::TestServer;
    use serde_json::{json, Value};

    use floodwatch_service_shared::test_utils::{test_state, unavailable_store_state};

    fn server(state: AppState) -> TestServer {
        TestServer::new(app(state, "/metrics")).unwrap()
    }

    #[tokio::test]
    async fn distress_call_is_recorded_and_listed() {
        let server = server(test_state());

        let created = server
            .post("/distress-calls")
            .json(&json!({
                "latitude": 5.9804,
                "longitude": 116.0735,
                "message": "Water rising, two children with me"
            }))
            .await;
        assert_eq!(created.status_code(), StatusCode::OK);
        let created: Value = created.json();
        assert_eq!(created["success"], true);
        let call_id = created["callId"].as_i64().unwrap();
        assert!(call_id > 0);

        let listed: Value = server.get("/distress-calls").await.json();
        let calls = listed["calls"].as_array().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0]["call_id"], call_id);
        assert_eq!(calls[0]["rescue_status"], "PENDING");
        assert_eq!(calls[0]["user_message"], "Water rising, two children with me");
    }

    #[tokio::test]
    async fn distress_call_message_is_optional() {
        let response = server(test_state())
            .post("/distress-calls")
            .json(&json!({"latitude": 5.9804, "longitude": 116.0735}))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn distress_call_requires_a_location() {
        let response = server(test_state())
            .post("/distress-calls")
            .json(&json!({"message": "help"}))
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "Latitude and longitude are required");
    }

    #[tokio::test]
    async fn flood_alerts_lists_active_alerts() {
        let response = server(test_state()).get("/flood-alerts").await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        let alerts = body["alerts"].as_array().unwrap();
        assert_eq!(alerts.len(), 3);
        assert!(alerts.iter().all(|a| a["active"] == true));
    }

    #[tokio::test]
    async fn evacuation_points_are_nearest_first() {
        let response = server(test_state())
            .post("/evacuation-points")
            .json(&json!({"latitude": 5.9804, "longitude": 116.0735}))
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        let points = body["points"].as_array().unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0]["name"], "SK Kota Kinabalu");
        assert_eq!(points[2]["name"], "Stadium Likas");
        assert!(points[0]["distance"].as_f64().unwrap() < points[1]["distance"].as_f64().unwrap());
    }

    #[tokio::test]
    async fn store_outage_is_503_with_details() {
        let server = server(unavailable_store_state());

        for response in [
            server.get("/distress-calls").await,
            server.get("/flood-alerts").await,
            server
                .post("/evacuation-points")
                .json(&json!({"latitude": 5.9804, "longitude": 116.0735}))
                .await,
        ] {
            assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
            let body: Value = response.json();
            assert!(body["error"].is_string());
            assert!(body["details"].as_str().unwrap().contains("unavailable"));
        }

        server
            .get("/health/ready")
            .await
            .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn validation_runs_before_the_store() {
        let response = server(unavailable_store_state())
            .post("/distress-calls")
            .text("not json at all")
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn options_on_listing_is_200() {
        let response = server(test_state())
            .method(Method::OPTIONS, "/distress-calls")
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }
}
