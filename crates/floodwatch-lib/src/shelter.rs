//! Nearest evacuation point resolution.
//!
//! [`NearestShelterResolver`] asks a [`PoiSource`] for shelters around the
//! user and picks the closest one. When the source fails, times out or
//! returns nothing usable, the closest of a small hardcoded set of known
//! shelters in Kota Kinabalu is returned instead. Resolution never fails.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;
use crate::fetch::or_fallback;
use crate::geo::{haversine_m, Coordinate};
use crate::overpass::{PoiCandidate, PoiSource};

/// Default search radius in meters.
pub const DEFAULT_SEARCH_RADIUS_M: f64 = 8000.0;

/// Element id reported for hardcoded shelters.
pub const FALLBACK_ID: &str = "fallback";

/// A named, hardcoded shelter location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnownShelter {
    pub name: &'static str,
    pub coordinate: Coordinate,
}

/// Shelters used when the point-of-interest index cannot answer.
pub const FALLBACK_POINTS: [KnownShelter; 3] = [
    KnownShelter {
        name: "Community Center",
        coordinate: Coordinate::new(5.9680215, 116.0928631),
    },
    KnownShelter {
        name: "School Shelter",
        coordinate: Coordinate::new(5.9731, 116.0678),
    },
    KnownShelter {
        name: "Public Hall",
        coordinate: Coordinate::new(5.9804, 116.0735),
    },
];

/// Shelter selected for a query, with its distance in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub lat: f64,
    pub lon: f64,
    pub dist: f64,
    pub tags: BTreeMap<String, String>,
    pub id: String,
    #[serde(rename = "type")]
    pub element_type: String,
}

impl PointOfInterest {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }

    pub fn name(&self) -> Option<&str> {
        self.tags.get("name").map(String::as_str)
    }

    fn from_candidate(candidate: &PoiCandidate, dist: f64) -> Self {
        Self {
            lat: candidate.coordinate.latitude,
            lon: candidate.coordinate.longitude,
            dist,
            tags: candidate.tags.clone(),
            id: candidate.id.clone(),
            element_type: candidate.element_type.clone(),
        }
    }
}

/// Closest candidate to `query`.
///
/// Ties keep the first candidate seen. Candidates with non-finite coordinates
/// are skipped; `None` means nothing usable was supplied.
pub fn nearest_of(query: Coordinate, candidates: &[PoiCandidate]) -> Option<PointOfInterest> {
    let mut best: Option<(&PoiCandidate, f64)> = None;
    for candidate in candidates {
        if !candidate.coordinate.is_finite() {
            continue;
        }
        let dist = haversine_m(query, candidate.coordinate);
        if !dist.is_finite() {
            continue;
        }
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((candidate, dist)),
        }
    }
    best.map(|(candidate, dist)| PointOfInterest::from_candidate(candidate, dist))
}

fn known_shelter_candidates() -> Vec<PoiCandidate> {
    FALLBACK_POINTS
        .iter()
        .map(|shelter| {
            let mut tags = BTreeMap::new();
            tags.insert("name".to_string(), shelter.name.to_string());
            tags.insert("emergency".to_string(), "shelter".to_string());
            PoiCandidate {
                id: FALLBACK_ID.to_string(),
                element_type: "node".to_string(),
                coordinate: shelter.coordinate,
                tags,
            }
        })
        .collect()
}

/// Closest hardcoded shelter to `query`.
///
/// A non-finite query still yields the first hardcoded shelter, with its
/// distance reported as `0.0`.
pub fn fallback_point(query: Coordinate) -> PointOfInterest {
    let candidates = known_shelter_candidates();
    match nearest_of(query, &candidates) {
        Some(point) => point,
        None => PointOfInterest::from_candidate(&candidates[0], 0.0),
    }
}

/// Outcome of a shelter lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelterLookup {
    #[serde(flatten)]
    pub point: PointOfInterest,
    /// `true` when the point came from the hardcoded set.
    pub fallback: bool,
}

/// Resolves the nearest shelter from a point-of-interest source.
#[derive(Clone)]
pub struct NearestShelterResolver {
    source: Arc<dyn PoiSource>,
    timeout: Duration,
}

impl NearestShelterResolver {
    pub fn new(source: Arc<dyn PoiSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    pub async fn resolve(&self, query: Coordinate, radius_m: f64) -> ShelterLookup {
        or_fallback(
            "overpass",
            self.timeout,
            async {
                let candidates = self.source.search_shelters(query, radius_m).await?;
                debug!(count = candidates.len(), "shelter candidates received");
                let point = nearest_of(query, &candidates).ok_or_else(|| Error::EmptyResult {
                    service: "overpass".to_string(),
                })?;
                Ok::<_, Error>(ShelterLookup {
                    point,
                    fallback: false,
                })
            },
            |_| ShelterLookup {
                point: fallback_point(query),
                fallback: true,
            },
        )
        .await
    }
}

impl std::fmt::Debug for NearestShelterResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NearestShelterResolver")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, lat: f64, lon: f64) -> PoiCandidate {
        PoiCandidate {
            id: id.to_string(),
            element_type: "node".to_string(),
            coordinate: Coordinate::new(lat, lon),
            tags: BTreeMap::new(),
        }
    }

    #[test]
    fn picks_the_minimum_distance() {
        let query = Coordinate::new(5.98, 116.07);
        let candidates = vec![
            candidate("far", 6.10, 116.20),
            candidate("near", 5.981, 116.071),
            candidate("mid", 6.00, 116.10),
        ];
        let nearest = nearest_of(query, &candidates).unwrap();
        assert_eq!(nearest.id, "near");
        for c in &candidates {
            assert!(nearest.dist <= haversine_m(query, c.coordinate));
        }
    }

    #[test]
    fn ties_keep_the_first_seen() {
        let query = Coordinate::new(0.0, 0.0);
        let candidates = vec![candidate("east", 0.0, 1.0), candidate("west", 0.0, -1.0)];
        assert_eq!(nearest_of(query, &candidates).unwrap().id, "east");
    }

    #[test]
    fn skips_non_finite_candidates() {
        let query = Coordinate::new(5.98, 116.07);
        let candidates = vec![
            candidate("nan", f64::NAN, 116.07),
            candidate("ok", 6.0, 116.1),
        ];
        assert_eq!(nearest_of(query, &candidates).unwrap().id, "ok");
        assert!(nearest_of(query, &candidates[..1]).is_none());
        assert!(nearest_of(query, &[]).is_none());
    }

    #[test]
    fn fallback_at_public_hall_is_public_hall() {
        let point = fallback_point(Coordinate::new(5.9804, 116.0735));
        assert_eq!(point.name(), Some("Public Hall"));
        assert_eq!(point.id, FALLBACK_ID);
        assert_eq!(point.element_type, "node");
        assert_eq!(point.dist, 0.0);
        assert_eq!(
            point.tags.get("emergency").map(String::as_str),
            Some("shelter")
        );
    }

    #[test]
    fn fallback_tolerates_non_finite_queries() {
        let point = fallback_point(Coordinate::new(f64::NAN, f64::INFINITY));
        assert_eq!(point.name(), Some("Community Center"));
        assert_eq!(point.dist, 0.0);
    }

    #[test]
    fn lookup_serializes_flat() {
        let lookup = ShelterLookup {
            point: fallback_point(Coordinate::new(5.9731, 116.0678)),
            fallback: true,
        };
        let json = serde_json::to_value(&lookup).unwrap();
        assert_eq!(json["tags"]["name"], "School Shelter");
        assert_eq!(json["type"], "node");
        assert_eq!(json["fallback"], true);
        assert!(json["dist"].is_number());
    }
}
