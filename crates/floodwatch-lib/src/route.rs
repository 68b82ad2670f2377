//! Evacuation route representation.

use serde::{Deserialize, Serialize};

use crate::geo::{haversine_m, Coordinate};
use crate::risk::RiskLevel;

/// Duration assumed for a direct line when no routing service answered.
pub const DIRECT_ROUTE_DURATION_S: f64 = 300.0;

/// Warning attached to direct-line routes.
pub const DIRECT_ROUTE_WARNING: &str =
    "Direct route - routing service unavailable, avoid if possible";

/// GeoJSON `LineString` with `[lon, lat]` positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineString {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<[f64; 2]>,
}

impl LineString {
    pub fn new(coordinates: Vec<[f64; 2]>) -> Self {
        Self {
            kind: "LineString".to_string(),
            coordinates,
        }
    }

    /// Straight segment between two points.
    pub fn segment(start: Coordinate, end: Coordinate) -> Self {
        Self::new(vec![start.to_lon_lat(), end.to_lon_lat()])
    }

    /// Positions converted back to latitude/longitude order.
    pub fn points(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.coordinates
            .iter()
            .map(|[lon, lat]| Coordinate::new(*lat, *lon))
    }
}

/// Map marker in the front end's `{lat, lng}` shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub lat: f64,
    pub lng: f64,
}

impl From<Coordinate> for Waypoint {
    fn from(c: Coordinate) -> Self {
        Self {
            lat: c.latitude,
            lng: c.longitude,
        }
    }
}

/// A driving route between two points, labelled with a risk level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    #[serde(rename = "osrmGeometry")]
    pub geometry: LineString,
    pub waypoints: Vec<Waypoint>,
    /// Total distance in meters.
    #[serde(rename = "routeDistance")]
    pub distance_m: f64,
    /// Total duration in seconds.
    #[serde(rename = "routeDuration")]
    pub duration_s: f64,
    pub risk_level: RiskLevel,
    pub warnings: Vec<String>,
}

impl Route {
    /// Route returned by a routing service, not yet risk-labelled.
    pub fn routed(
        start: Coordinate,
        end: Coordinate,
        geometry: LineString,
        distance_m: f64,
        duration_s: f64,
    ) -> Self {
        Self {
            geometry,
            waypoints: vec![start.into(), end.into()],
            distance_m,
            duration_s,
            risk_level: RiskLevel::Low,
            warnings: Vec::new(),
        }
    }

    /// Straight line used when no routing service is reachable.
    pub fn direct(start: Coordinate, end: Coordinate) -> Self {
        Self {
            geometry: LineString::segment(start, end),
            waypoints: vec![start.into(), end.into()],
            distance_m: haversine_m(start, end),
            duration_s: DIRECT_ROUTE_DURATION_S,
            risk_level: RiskLevel::High,
            warnings: vec![DIRECT_ROUTE_WARNING.to_string()],
        }
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_m / 1000.0
    }

    pub fn duration_minutes(&self) -> f64 {
        self.duration_s / 60.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_route_is_high_risk_straight_line() {
        let start = Coordinate::new(5.9804, 116.0735);
        let end = Coordinate::new(5.9731, 116.0678);
        let route = Route::direct(start, end);

        assert_eq!(route.geometry.coordinates.len(), 2);
        assert_eq!(route.geometry.coordinates[0], [116.0735, 5.9804]);
        assert_eq!(route.risk_level, RiskLevel::High);
        assert!(route.distance_m > 900.0 && route.distance_m < 1100.0);
        assert_eq!(route.duration_s, DIRECT_ROUTE_DURATION_S);
    }

    #[test]
    fn serializes_with_front_end_field_names() {
        let route = Route::direct(Coordinate::new(1.0, 2.0), Coordinate::new(1.5, 2.5));
        let json = serde_json::to_value(&route).unwrap();

        assert_eq!(json["osrmGeometry"]["type"], "LineString");
        assert!(json["routeDistance"].is_number());
        assert!(json["routeDuration"].is_number());
        assert_eq!(json["riskLevel"], "HIGH");
        assert_eq!(json["waypoints"][0]["lng"], 2.0);
    }

    #[test]
    fn points_flip_back_to_lat_lon() {
        let line = LineString::new(vec![[116.0, 5.0], [117.0, 6.0]]);
        let points: Vec<_> = line.points().collect();
        assert_eq!(points[1], Coordinate::new(6.0, 117.0));
    }
}
