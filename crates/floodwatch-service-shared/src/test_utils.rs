//! Application states over stub collaborators for handler tests.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use floodwatch_lib::store::{DistressCall, EvacuationPoint, FloodAlert, NewDistressCall};
use floodwatch_lib::test_helpers::{
    seeded_store, shelter_candidate, StubPoiSource, StubRouteProvider, StubTextGenerator,
};
use floodwatch_lib::{
    Error, FloodStore, Floodwatch, FloodwatchConfig, PoiSource, Result, RouteProvider,
    TextGenerator,
};

use crate::state::AppState;

pub const TEST_SERVICE: &str = "floodwatch-test";

/// Short deadlines so hanging stubs resolve quickly.
pub fn test_config() -> FloodwatchConfig {
    FloodwatchConfig {
        http_timeout_ms: 200,
        status_timeout_ms: 500,
        ..FloodwatchConfig::default()
    }
}

/// Geometry from Public Hall to School Shelter, `[lon, lat]`.
pub fn test_geometry() -> Vec<[f64; 2]> {
    vec![[116.0735, 5.9804], [116.071, 5.977], [116.0678, 5.9731]]
}

fn seeded() -> Arc<dyn FloodStore> {
    Arc::new(seeded_store().unwrap_or_else(|e| panic!("failed to seed test store: {e}")))
}

/// Seeded store, one live shelter, working routing and a fixed model answer.
pub fn test_state() -> AppState {
    state_with(
        StubPoiSource::returning(vec![shelter_candidate("101", "Dewan Near", 5.981, 116.074)]),
        StubRouteProvider::returning(test_geometry()),
        StubTextGenerator::returning("MEDIUM risk. Avoid the river road."),
    )
}

/// Seeded store with the given collaborators.
pub fn state_with(
    poi: impl PoiSource + 'static,
    routes: impl RouteProvider + 'static,
    text: impl TextGenerator + 'static,
) -> AppState {
    state_from_parts(seeded(), Arc::new(poi), Arc::new(routes), Arc::new(text))
}

pub fn state_from_parts(
    store: Arc<dyn FloodStore>,
    poi: Arc<dyn PoiSource>,
    routes: Arc<dyn RouteProvider>,
    text: Arc<dyn TextGenerator>,
) -> AppState {
    let floodwatch = Floodwatch::with_parts(test_config(), store, poi, routes, text);
    AppState::from_engine(TEST_SERVICE, floodwatch)
}

/// Every collaborator failing, over a seeded store.
pub fn offline_state() -> AppState {
    state_with(
        StubPoiSource::failing("connection refused"),
        StubRouteProvider::failing("HTTP 502"),
        StubTextGenerator::failing("throttled"),
    )
}

/// Working collaborators over a store that refuses every query.
pub fn unavailable_store_state() -> AppState {
    state_from_parts(
        Arc::new(UnavailableStore),
        Arc::new(StubPoiSource::returning(Vec::new())),
        Arc::new(StubRouteProvider::returning(test_geometry())),
        Arc::new(StubTextGenerator::returning("LOW risk.")),
    )
}

pub fn state_with_config(config: FloodwatchConfig) -> AppState {
    let floodwatch = Floodwatch::with_parts(
        config,
        seeded(),
        Arc::new(StubPoiSource::returning(Vec::new())),
        Arc::new(StubRouteProvider::returning(test_geometry())),
        Arc::new(StubTextGenerator::returning("LOW risk.")),
    );
    AppState::from_engine(TEST_SERVICE, floodwatch)
}

pub fn test_request_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("test-{nanos}")
}

/// A store whose every query fails as unavailable.
pub struct UnavailableStore;

fn down<T>() -> Result<T> {
    Err(Error::StoreUnavailable {
        message: "connection refused".to_string(),
    })
}

impl FloodStore for UnavailableStore {
    fn active_alerts(&self) -> Result<Vec<FloodAlert>> {
        down()
    }

    fn recent_active_alerts(&self, _limit: usize) -> Result<Vec<FloodAlert>> {
        down()
    }

    fn evacuation_points(&self) -> Result<Vec<EvacuationPoint>> {
        down()
    }

    fn insert_distress_call(&self, _call: &NewDistressCall) -> Result<i64> {
        down()
    }

    fn recent_distress_calls(&self, _limit: usize) -> Result<Vec<DistressCall>> {
        down()
    }

    fn pending_distress_calls(&self) -> Result<Vec<DistressCall>> {
        down()
    }

    fn ping(&self) -> Result<()> {
        down()
    }
}
