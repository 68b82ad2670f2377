//! Floodwatch library entry points.
//!
//! This crate holds everything the HTTP surfaces need: great-circle distance,
//! nearest shelter resolution with its hardcoded fallback set, flood risk
//! classification, route planning with risk annotation, and the flood store.
//! Service and Lambda crates should call [`Floodwatch`] instead of wiring the
//! collaborators themselves.

#![deny(warnings)]

pub mod analysis;
pub mod annotate;
pub mod api;
pub mod assistant;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod geo;
pub mod osrm;
pub mod overpass;
pub mod risk;
pub mod route;
pub mod shelter;
pub mod store;
pub mod textgen;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use analysis::{FloodAnalysis, FloodAnalyzer, FloodContext};
pub use annotate::{Annotation, PlannedRoute, RouteAnnotator, RouteContext, RouteSource};
pub use api::{parse_request, ErrorBody, Validate};
pub use assistant::{Assistant, AssistantReply};
pub use config::FloodwatchConfig;
pub use engine::Floodwatch;
pub use error::{Error, Result};
pub use geo::{haversine_km, haversine_m, spherical_cosines_km, Coordinate};
pub use osrm::{OsrmClient, RouteProvider};
pub use overpass::{OverpassClient, PoiCandidate, PoiSource};
pub use risk::{classify_alerts, confidence_score, RiskAssessment, RiskEvidence, RiskLevel, Severity};
pub use route::Route;
pub use shelter::{fallback_point, nearest_of, NearestShelterResolver, PointOfInterest, ShelterLookup};
pub use store::{FloodStore, SqliteStore};
pub use textgen::{BedrockTextClient, GenerationParams, TextGenerator};
