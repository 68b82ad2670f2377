//! Liveness and readiness probes.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// `ok`, or `not_ready: <reason>`.
    pub status: String,
    pub service: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_ready: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_generation: Option<bool>,
}

impl HealthStatus {
    pub fn alive(service: &str, version: &str) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.to_string(),
            version: version.to_string(),
            store_ready: None,
            text_generation: None,
        }
    }

    pub fn ready(service: &str, version: &str, text_generation: bool) -> Self {
        Self {
            store_ready: Some(true),
            text_generation: Some(text_generation),
            ..Self::alive(service, version)
        }
    }

    pub fn not_ready(service: &str, version: &str, reason: &str) -> Self {
        Self {
            status: format!("not_ready: {reason}"),
            store_ready: Some(false),
            ..Self::alive(service, version)
        }
    }
}

/// `GET /health/live`: 200 whenever the process is serving.
pub async fn health_live(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthStatus::alive(state.service(), env!("CARGO_PKG_VERSION")))
}

/// `GET /health/ready`: 200 when the flood store answers, 503 otherwise.
///
/// A missing text generation key does not fail readiness; handlers degrade.
pub async fn health_ready(State(state): State<AppState>) -> Response {
    let version = env!("CARGO_PKG_VERSION");
    match state.floodwatch().store_ready().await {
        Ok(()) => {
            let text_generation = state.floodwatch().config().textgen_enabled();
            Json(HealthStatus::ready(state.service(), version, text_generation)).into_response()
        }
        Err(err) => {
            tracing::warn!(error = %err, "readiness check failed");
            let status = HealthStatus::not_ready(state.service(), version, "flood store unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, Json(status)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_state, unavailable_store_state};

    #[test]
    fn alive_omits_probe_fields() {
        let json = serde_json::to_string(&HealthStatus::alive("reports", "0.1.0")).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(!json.contains("store_ready"));
    }

    #[test]
    fn not_ready_carries_the_reason() {
        let status = HealthStatus::not_ready("reports", "0.1.0", "no store");
        assert_eq!(status.status, "not_ready: no store");
        assert_eq!(status.store_ready, Some(false));
    }

    #[tokio::test]
    async fn ready_when_store_answers() {
        let response = health_ready(State(test_state())).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn not_ready_when_store_fails() {
        let response = health_ready(State(unavailable_store_state())).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
