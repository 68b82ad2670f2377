// Stub collaborators for tests in this crate and in the HTTP crates.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::geo::Coordinate;
use crate::osrm::RouteProvider;
use crate::overpass::{PoiCandidate, PoiSource};
use crate::risk::Severity;
use crate::route::{LineString, Route};
use crate::store::{NewEvacuationPoint, NewFloodAlert, SqliteStore};
use crate::textgen::{GenerationParams, TextGenerator};

/// How a stub answers.
#[derive(Debug, Clone)]
pub enum StubBehaviour<T> {
    Respond(T),
    Fail(String),
    /// Sleep before answering, to exercise deadlines.
    Hang(Duration),
}

impl<T: Clone> StubBehaviour<T> {
    async fn run(&self, service: &str) -> Result<T> {
        match self {
            StubBehaviour::Respond(value) => Ok(value.clone()),
            StubBehaviour::Fail(message) => Err(Error::Upstream {
                service: service.to_string(),
                message: message.clone(),
            }),
            StubBehaviour::Hang(delay) => {
                tokio::time::sleep(*delay).await;
                Err(Error::Upstream {
                    service: service.to_string(),
                    message: "stub hung".to_string(),
                })
            }
        }
    }
}

pub struct StubPoiSource {
    behaviour: StubBehaviour<Vec<PoiCandidate>>,
    calls: AtomicUsize,
}

impl StubPoiSource {
    pub fn returning(candidates: Vec<PoiCandidate>) -> Self {
        Self::with(StubBehaviour::Respond(candidates))
    }

    pub fn failing(message: &str) -> Self {
        Self::with(StubBehaviour::Fail(message.to_string()))
    }

    pub fn hanging(delay: Duration) -> Self {
        Self::with(StubBehaviour::Hang(delay))
    }

    fn with(behaviour: StubBehaviour<Vec<PoiCandidate>>) -> Self {
        Self {
            behaviour,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PoiSource for StubPoiSource {
    async fn search_shelters(&self, _center: Coordinate, _radius_m: f64) -> Result<Vec<PoiCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.behaviour.run("overpass").await
    }
}

pub struct StubRouteProvider {
    behaviour: StubBehaviour<Vec<[f64; 2]>>,
}

impl StubRouteProvider {
    /// Answers with the given `[lon, lat]` geometry, 1.2 km and 180 s.
    pub fn returning(coordinates: Vec<[f64; 2]>) -> Self {
        Self {
            behaviour: StubBehaviour::Respond(coordinates),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            behaviour: StubBehaviour::Fail(message.to_string()),
        }
    }

    pub fn hanging(delay: Duration) -> Self {
        Self {
            behaviour: StubBehaviour::Hang(delay),
        }
    }
}

#[async_trait]
impl RouteProvider for StubRouteProvider {
    async fn driving_route(&self, start: Coordinate, end: Coordinate) -> Result<Route> {
        let coordinates = self.behaviour.run("osrm").await?;
        Ok(Route::routed(
            start,
            end,
            LineString::new(coordinates),
            1200.0,
            180.0,
        ))
    }
}

pub struct StubTextGenerator {
    behaviour: StubBehaviour<String>,
    prompts: Mutex<Vec<String>>,
}

impl StubTextGenerator {
    pub fn returning(text: &str) -> Self {
        Self::with(StubBehaviour::Respond(text.to_string()))
    }

    pub fn failing(message: &str) -> Self {
        Self::with(StubBehaviour::Fail(message.to_string()))
    }

    pub fn hanging(delay: Duration) -> Self {
        Self::with(StubBehaviour::Hang(delay))
    }

    fn with(behaviour: StubBehaviour<String>) -> Self {
        Self {
            behaviour,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for StubTextGenerator {
    async fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.behaviour.run("textgen").await
    }
}

/// Shelter candidate with a name tag.
pub fn shelter_candidate(id: &str, name: &str, latitude: f64, longitude: f64) -> PoiCandidate {
    let mut tags = std::collections::BTreeMap::new();
    tags.insert("name".to_string(), name.to_string());
    tags.insert("amenity".to_string(), "shelter".to_string());
    PoiCandidate {
        id: id.to_string(),
        element_type: "node".to_string(),
        coordinate: Coordinate::new(latitude, longitude),
        tags,
    }
}

/// In-memory store seeded with alerts and evacuation points around Kota
/// Kinabalu, plus one alert in Sandakan.
pub fn seeded_store() -> Result<SqliteStore> {
    let store = SqliteStore::in_memory()?;
    let alerts = [
        ("Likas", 5.99, 116.09, Severity::High, "River overflow near Likas Bay"),
        ("Penampang", 5.92, 116.11, Severity::Medium, "Low-lying roads flooded"),
        ("Sandakan", 5.84, 118.12, Severity::Low, "Heavy rain expected"),
    ];
    for (name, lat, lon, severity, description) in alerts {
        store.insert_alert(&NewFloodAlert {
            location_name: name.to_string(),
            coordinate: Coordinate::new(lat, lon),
            severity,
            alert_type: "FLOOD".to_string(),
            description: Some(description.to_string()),
        })?;
    }
    let points = [
        ("Dewan Masyarakat Likas", "hall", 5.985, 116.085, 300),
        ("SK Kota Kinabalu", "school", 5.975, 116.07, 500),
        ("Stadium Likas", "stadium", 6.005, 116.11, 2000),
    ];
    for (name, point_type, lat, lon, capacity) in points {
        store.insert_evacuation_point(&NewEvacuationPoint {
            name: name.to_string(),
            point_type: point_type.to_string(),
            coordinate: Coordinate::new(lat, lon),
            capacity,
        })?;
    }
    Ok(store)
}
