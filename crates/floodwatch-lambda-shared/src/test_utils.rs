//! Engines over stub collaborators for Lambda handler tests.
//!
//! `lambda_runtime::Context` cannot be built field by field, so handler tests
//! call the dispatcher directly with a request id.

use std::sync::Arc;

use floodwatch_lib::test_helpers::{
    seeded_store, shelter_candidate, StubPoiSource, StubRouteProvider, StubTextGenerator,
};
use floodwatch_lib::{Floodwatch, FloodwatchConfig, PoiSource, RouteProvider, TextGenerator};

use crate::event::ProxyRequest;

pub fn test_config() -> FloodwatchConfig {
    FloodwatchConfig {
        http_timeout_ms: 200,
        status_timeout_ms: 500,
        ..FloodwatchConfig::default()
    }
}

/// Seeded store with the given collaborators.
pub fn engine_with(
    poi: impl PoiSource + 'static,
    routes: impl RouteProvider + 'static,
    text: impl TextGenerator + 'static,
) -> Floodwatch {
    let store = seeded_store().unwrap_or_else(|e| panic!("failed to seed test store: {e}"));
    Floodwatch::with_parts(
        test_config(),
        Arc::new(store),
        Arc::new(poi),
        Arc::new(routes),
        Arc::new(text),
    )
}

/// One live shelter, working routing and a fixed model answer.
pub fn test_engine() -> Floodwatch {
    engine_with(
        StubPoiSource::returning(vec![shelter_candidate("201", "Dewan Near", 5.981, 116.074)]),
        StubRouteProvider::returning(vec![[116.0735, 5.9804], [116.0678, 5.9731]]),
        StubTextGenerator::returning("LOW risk. Roads are clear."),
    )
}

/// Every collaborator failing.
pub fn offline_engine() -> Floodwatch {
    engine_with(
        StubPoiSource::failing("connection refused"),
        StubRouteProvider::failing("HTTP 502"),
        StubTextGenerator::failing("throttled"),
    )
}

pub fn post(path: &str, body: &str) -> ProxyRequest {
    ProxyRequest::new("POST", path, Some(body))
}

pub fn get(path: &str) -> ProxyRequest {
    ProxyRequest::new("GET", path, None)
}

pub fn mock_request_id(suffix: &str) -> String {
    format!("test-request-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_request_id_formats_correctly() {
        assert_eq!(mock_request_id("7"), "test-request-7");
    }

    #[test]
    fn request_builders_set_method_and_body() {
        let request = post("/ai-assistant", "{}");
        assert_eq!(request.http_method, "POST");
        assert_eq!(request.body.as_deref(), Some("{}"));
        assert!(get("/flood-alerts").body.is_none());
    }
}
