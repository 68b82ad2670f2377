//! Wire types shared by the HTTP surfaces.
//!
//! Request fields are optional at the serde level so that a missing field
//! reaches [`Validate`] and yields the endpoint's own message instead of a
//! decoder error. Bodies that fail to decode at all get the same message.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geo::Coordinate;
use crate::store::{DistressCall, EvacuationPoint, FloodAlert, Nearby, NewDistressCall};

pub const LOCATION_REQUIRED: &str = "Latitude and longitude are required";
pub const ROUTE_ENDPOINTS_REQUIRED: &str = "Start and end coordinates are required";
pub const MESSAGE_REQUIRED: &str = "Message is required";
pub const RADIUS_INVALID: &str = "Radius must be a positive number";

/// Decode a JSON request body.
///
/// An empty body decodes as `{}`. Undecodable bodies map to
/// [`Error::InvalidRequest`] carrying `message`.
pub fn parse_body<T: DeserializeOwned>(body: &[u8], message: &str) -> Result<T> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        body
    };
    serde_json::from_slice(body).map_err(|_| invalid(message))
}

fn invalid(message: &str) -> Error {
    Error::InvalidRequest {
        message: message.to_string(),
    }
}

/// Request validation into a domain value.
pub trait Validate {
    type Output;

    /// Message used when the body cannot be decoded.
    const DECODE_MESSAGE: &'static str;

    fn validate(&self) -> Result<Self::Output>;
}

fn finite_pair(latitude: Option<f64>, longitude: Option<f64>) -> Result<Coordinate> {
    match (latitude, longitude) {
        (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Ok(Coordinate::new(lat, lon)),
        _ => Err(invalid(LOCATION_REQUIRED)),
    }
}

/// `{latitude, longitude}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Validate for LocationRequest {
    type Output = Coordinate;
    const DECODE_MESSAGE: &'static str = LOCATION_REQUIRED;

    fn validate(&self) -> Result<Coordinate> {
        finite_pair(self.latitude, self.longitude)
    }
}

/// `{latitude, longitude, radius?}` with the radius in meters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NearestShelterRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius: Option<f64>,
}

/// Validated shelter query. `radius_m` is `None` when the caller left it to
/// the configured default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShelterQuery {
    pub location: Coordinate,
    pub radius_m: Option<f64>,
}

impl Validate for NearestShelterRequest {
    type Output = ShelterQuery;
    const DECODE_MESSAGE: &'static str = LOCATION_REQUIRED;

    fn validate(&self) -> Result<ShelterQuery> {
        let location = finite_pair(self.latitude, self.longitude)?;
        if let Some(radius) = self.radius {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(invalid(RADIUS_INVALID));
            }
        }
        Ok(ShelterQuery {
            location,
            radius_m: self.radius,
        })
    }
}

/// `{start: [lat, lon], end: [lat, lon]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub start: Option<[f64; 2]>,
    pub end: Option<[f64; 2]>,
}

impl Validate for RouteRequest {
    type Output = (Coordinate, Coordinate);
    const DECODE_MESSAGE: &'static str = ROUTE_ENDPOINTS_REQUIRED;

    fn validate(&self) -> Result<(Coordinate, Coordinate)> {
        let (Some(start), Some(end)) = (self.start, self.end) else {
            return Err(invalid(ROUTE_ENDPOINTS_REQUIRED));
        };
        let start = Coordinate::from_lat_lon(start);
        let end = Coordinate::from_lat_lon(end);
        if !start.is_finite() || !end.is_finite() {
            return Err(invalid(ROUTE_ENDPOINTS_REQUIRED));
        }
        Ok((start, end))
    }
}

/// `{message, userLocation?}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRequest {
    pub message: Option<String>,
    pub user_location: Option<LocationRequest>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssistantQuery {
    pub message: String,
    pub location: Option<Coordinate>,
}

impl Validate for AssistantRequest {
    type Output = AssistantQuery;
    const DECODE_MESSAGE: &'static str = MESSAGE_REQUIRED;

    fn validate(&self) -> Result<AssistantQuery> {
        let message = self
            .message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .ok_or_else(|| invalid(MESSAGE_REQUIRED))?;
        let location = self
            .user_location
            .as_ref()
            .map(LocationRequest::validate)
            .transpose()?;
        Ok(AssistantQuery {
            message: message.to_string(),
            location,
        })
    }
}

/// `{latitude, longitude, message?}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistressCallRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub message: Option<String>,
}

impl Validate for DistressCallRequest {
    type Output = NewDistressCall;
    const DECODE_MESSAGE: &'static str = LOCATION_REQUIRED;

    fn validate(&self) -> Result<NewDistressCall> {
        Ok(NewDistressCall {
            coordinate: finite_pair(self.latitude, self.longitude)?,
            message: self
                .message
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string),
        })
    }
}

/// Decode and validate in one step.
pub fn parse_request<T>(body: &[u8]) -> Result<T::Output>
where
    T: Validate + DeserializeOwned,
{
    parse_body::<T>(body, T::DECODE_MESSAGE)?.validate()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistressCallCreated {
    pub success: bool,
    pub call_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistressCallList {
    pub calls: Vec<DistressCall>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloodAlertList {
    pub alerts: Vec<FloodAlert>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvacuationPointList {
    pub points: Vec<Nearby<EvacuationPoint>>,
}

/// Error body: `{error, details?, instance?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Request id of the failing call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            instance: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }
}
