//! Shelter search against the Overpass (OpenStreetMap) API.
//!
//! The response is decoded into transport DTOs first and mapped into
//! [`PoiCandidate`] records in one pass. Way and relation elements carry
//! their coordinates in `center`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::geo::Coordinate;

const SERVICE: &str = "overpass";

/// Server-side query timeout requested from Overpass, in seconds.
pub const OVERPASS_QUERY_TIMEOUT_S: u32 = 25;

/// A shelter element returned by a point-of-interest index.
#[derive(Debug, Clone, PartialEq)]
pub struct PoiCandidate {
    pub id: String,
    pub element_type: String,
    pub coordinate: Coordinate,
    pub tags: BTreeMap<String, String>,
}

/// Source of candidate shelters around a location.
#[async_trait]
pub trait PoiSource: Send + Sync {
    /// Fetch shelter candidates within `radius_m` meters of `center`.
    async fn search_shelters(&self, center: Coordinate, radius_m: f64)
        -> Result<Vec<PoiCandidate>>;
}

/// Overpass interpreter client.
#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: Client,
    url: String,
}

impl OverpassClient {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Overpass QL for `amenity=shelter` nodes, ways and relations around a point.
pub fn shelter_query(center: Coordinate, radius_m: f64) -> String {
    let around = format!(
        "around:{},{},{}",
        radius_m.round(),
        center.latitude,
        center.longitude
    );
    format!(
        "[out:json][timeout:{OVERPASS_QUERY_TIMEOUT_S}];\n(\n  node[\"amenity\"=\"shelter\"]({around});\n  way[\"amenity\"=\"shelter\"]({around});\n  relation[\"amenity\"=\"shelter\"]({around});\n);\nout center;"
    )
}

#[async_trait]
impl PoiSource for OverpassClient {
    async fn search_shelters(
        &self,
        center: Coordinate,
        radius_m: f64,
    ) -> Result<Vec<PoiCandidate>> {
        let query = shelter_query(center, radius_m);
        debug!(url = %self.url, radius_m, "querying overpass for shelters");

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "text/plain")
            .body(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::upstream(SERVICE, format!("HTTP {}", status)));
        }

        let body: OverpassResponseDto = response
            .json()
            .await
            .map_err(|e| Error::malformed(SERVICE, e.to_string()))?;

        Ok(body.into_candidates())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OverpassResponseDto {
    #[serde(default)]
    elements: Vec<OverpassElementDto>,
}

#[derive(Debug, Deserialize)]
struct OverpassElementDto {
    #[serde(rename = "type")]
    element_type: String,
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<OverpassCenterDto>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OverpassCenterDto {
    lat: f64,
    lon: f64,
}

impl OverpassResponseDto {
    /// Elements without usable coordinates are dropped.
    pub(crate) fn into_candidates(self) -> Vec<PoiCandidate> {
        self.elements
            .into_iter()
            .filter_map(OverpassElementDto::into_candidate)
            .collect()
    }
}

impl OverpassElementDto {
    fn into_candidate(self) -> Option<PoiCandidate> {
        let coordinate = match (self.lat, self.lon, &self.center) {
            (Some(lat), Some(lon), _) => Coordinate::new(lat, lon),
            (_, _, Some(center)) => Coordinate::new(center.lat, center.lon),
            _ => return None,
        };
        if !coordinate.is_finite() {
            return None;
        }
        Some(PoiCandidate {
            id: self.id.to_string(),
            element_type: self.element_type,
            coordinate,
            tags: self.tags,
        })
    }
}
