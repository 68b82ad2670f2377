//! Great-circle distance on a spherical earth.
//!
//! Two formulas are provided: haversine (used for user-facing distances in
//! meters) and the spherical law of cosines (used when ranking stored alerts
//! and shelters in kilometers). Both are pure and total: identical points
//! yield `0.0` and antipodal points stay finite.

use serde::{Deserialize, Serialize};

/// Mean earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Mean earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6371e3;

/// WGS84 latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build from a `[lat, lon]` pair as sent by the front end.
    pub const fn from_lat_lon(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }

    /// GeoJSON position order (`[lon, lat]`).
    pub fn to_lon_lat(self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

fn central_angle(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push h marginally past 1 for antipodal points.
    let h = h.clamp(0.0, 1.0);
    2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Haversine distance in meters.
pub fn haversine_m(a: Coordinate, b: Coordinate) -> f64 {
    EARTH_RADIUS_M * central_angle(a, b)
}

/// Haversine distance in kilometers.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    EARTH_RADIUS_KM * central_angle(a, b)
}

/// Spherical law of cosines distance in kilometers.
///
/// The arccosine argument is clamped to `[-1, 1]` so identical and antipodal
/// points never produce `NaN`.
pub fn spherical_cosines_km(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let cos_angle = phi1.sin() * phi2.sin() + phi1.cos() * phi2.cos() * d_lambda.cos();
    EARTH_RADIUS_KM * cos_angle.clamp(-1.0, 1.0).acos()
}
