//! Prometheus metrics for the Floodwatch services.
//!
//! HTTP request metrics are recorded by [`crate::MetricsLayer`]. The helpers
//! below record what the handlers learned about the downstream collaborators:
//!
//! - `floodwatch_shelter_lookups_total{source}`: `live` or `fallback`
//! - `floodwatch_fallbacks_total{component}`: degraded answers per component
//! - `floodwatch_routes_annotated_total{risk_level}`: planned routes by level
//! - `floodwatch_upstream_failures_total{service}`: degraded upstream answers

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use floodwatch_lib::{
    Annotation, AssistantReply, FloodAnalysis, PlannedRoute, RouteSource, ShelterLookup,
};

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Route serving the exposition text.
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

impl MetricsConfig {
    /// `METRICS_ENABLED` (anything but `false` enables) and `METRICS_PATH`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = lookup("METRICS_ENABLED")
            .map(|v| !v.trim().eq_ignore_ascii_case("false"))
            .unwrap_or(true);
        let path = lookup("METRICS_PATH")
            .filter(|p| p.starts_with('/'))
            .unwrap_or_else(|| "/metrics".to_string());
        Self { enabled, path }
    }
}

/// Install the Prometheus recorder. Only the first call can succeed.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Err(MetricsError::Disabled);
    }
    if PROMETHEUS_HANDLE.get().is_some() {
        return Err(MetricsError::AlreadyInitialized);
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MetricsError::InstallFailed(e.to_string()))?;

    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| MetricsError::AlreadyInitialized)
}

/// Axum handler rendering the exposition format.
pub async fn metrics_handler() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|h| h.render())
        .unwrap_or_else(|| "# Metrics not initialized\n".to_string())
}

#[derive(Debug, Clone)]
pub enum MetricsError {
    Disabled,
    AlreadyInitialized,
    InstallFailed(String),
}

impl std::fmt::Display for MetricsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricsError::Disabled => write!(f, "metrics are disabled"),
            MetricsError::AlreadyInitialized => write!(f, "metrics recorder already initialized"),
            MetricsError::InstallFailed(e) => write!(f, "failed to install metrics recorder: {e}"),
        }
    }
}

impl std::error::Error for MetricsError {}

// =============================================================================
// Business Metrics Helpers
// =============================================================================

fn record_fallback(component: &'static str) {
    metrics::counter!("floodwatch_fallbacks_total", "component" => component).increment(1);
}

fn record_upstream_failure(service: &'static str) {
    metrics::counter!("floodwatch_upstream_failures_total", "service" => service).increment(1);
}

/// Count a nearest-shelter answer by where it came from.
pub fn record_shelter_lookup(lookup: &ShelterLookup) {
    let source = if lookup.fallback { "fallback" } else { "live" };
    metrics::counter!("floodwatch_shelter_lookups_total", "source" => source).increment(1);
    if lookup.fallback {
        record_fallback("shelter");
        record_upstream_failure("overpass");
    }
}

/// Count a planned route by risk level, plus any degraded step.
pub fn record_route_plan(planned: &PlannedRoute) {
    metrics::counter!(
        "floodwatch_routes_annotated_total",
        "risk_level" => planned.route.risk_level.as_str()
    )
    .increment(1);

    if planned.source == RouteSource::Direct {
        record_fallback("route");
        record_upstream_failure("osrm");
    }
    if planned.annotation == Annotation::Unavailable {
        record_fallback("annotation");
        record_upstream_failure("textgen");
    }
}

pub fn record_analysis(analysis: &FloodAnalysis) {
    if analysis.fallback {
        record_fallback("analysis");
        record_upstream_failure("textgen");
    }
}

pub fn record_assistant_reply(reply: &AssistantReply) {
    if reply.fallback {
        record_fallback("assistant");
        record_upstream_failure("textgen");
    }
}
