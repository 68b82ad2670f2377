//! Driving routes from an OSRM server.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::geo::Coordinate;
use crate::route::{LineString, Route};

const SERVICE: &str = "osrm";

/// Source of driving routes between two points.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn driving_route(&self, start: Coordinate, end: Coordinate) -> Result<Route>;
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    client: Client,
    base_url: String,
}

impl OsrmClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Route URL for `start` to `end`. OSRM takes positions as `lon,lat`.
    pub fn route_url(&self, start: Coordinate, end: Coordinate) -> String {
        format!(
            "{}/route/v1/driving/{},{};{},{}?overview=full&geometries=geojson",
            self.base_url, start.longitude, start.latitude, end.longitude, end.latitude
        )
    }
}

#[async_trait]
impl RouteProvider for OsrmClient {
    async fn driving_route(&self, start: Coordinate, end: Coordinate) -> Result<Route> {
        let url = self.route_url(start, end);
        debug!(%url, "requesting driving route");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::upstream(SERVICE, format!("HTTP {}", status)));
        }

        let body: OsrmResponseDto = response
            .json()
            .await
            .map_err(|e| Error::malformed(SERVICE, e.to_string()))?;
        body.into_route(start, end)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OsrmResponseDto {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRouteDto>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OsrmRouteDto {
    geometry: LineString,
    distance: f64,
    duration: f64,
}

impl OsrmResponseDto {
    pub(crate) fn into_route(self, start: Coordinate, end: Coordinate) -> Result<Route> {
        if self.code != "Ok" {
            let message = self.message.unwrap_or_else(|| self.code.clone());
            return Err(Error::upstream(SERVICE, message));
        }
        let best = self.routes.into_iter().next().ok_or_else(|| Error::EmptyResult {
            service: SERVICE.to_string(),
        })?;
        if best.geometry.coordinates.is_empty() {
            return Err(Error::malformed(SERVICE, "route geometry is empty"));
        }
        Ok(Route::routed(
            start,
            end,
            best.geometry,
            best.distance,
            best.duration,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: Coordinate = Coordinate::new(5.9804, 116.0735);
    const END: Coordinate = Coordinate::new(5.9731, 116.0678);

    #[test]
    fn url_uses_lon_lat_order() {
        let client = OsrmClient::new(Client::new(), "https://router.example.org/");
        assert_eq!(
            client.route_url(START, END),
            "https://router.example.org/route/v1/driving/116.0735,5.9804;116.0678,5.9731?overview=full&geometries=geojson"
        );
    }

    #[test]
    fn decodes_first_route() {
        let json = r#"{
            "code": "Ok",
            "routes": [
                {"geometry": {"type": "LineString", "coordinates": [[116.0735, 5.9804], [116.07, 5.976], [116.0678, 5.9731]]},
                 "distance": 1432.5, "duration": 211.0},
                {"geometry": {"type": "LineString", "coordinates": [[116.0735, 5.9804]]},
                 "distance": 9999.0, "duration": 999.0}
            ]
        }"#;
        let dto: OsrmResponseDto = serde_json::from_str(json).unwrap();
        let route = dto.into_route(START, END).unwrap();
        assert_eq!(route.geometry.coordinates.len(), 3);
        assert_eq!(route.distance_m, 1432.5);
        assert_eq!(route.duration_s, 211.0);
        assert!(route.warnings.is_empty());
    }

    #[test]
    fn no_route_is_an_empty_result() {
        let dto: OsrmResponseDto = serde_json::from_str(r#"{"code": "Ok", "routes": []}"#).unwrap();
        assert!(matches!(
            dto.into_route(START, END),
            Err(Error::EmptyResult { .. })
        ));
    }

    #[test]
    fn non_ok_code_is_upstream_error() {
        let dto: OsrmResponseDto =
            serde_json::from_str(r#"{"code": "NoRoute", "message": "Impossible route"}"#).unwrap();
        let err = dto.into_route(START, END).unwrap_err();
        assert_eq!(err.to_string(), "osrm request failed: Impossible route");
    }
}
