//! Successful responses.

use axum::{
    http::HeaderValue,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Set to `true` on 200 responses built from a fallback.
pub const DEGRADED_HEADER: &str = "x-floodwatch-degraded";

/// A JSON payload, optionally marked as degraded.
///
/// The body is the payload itself; degradation shows only in
/// [`DEGRADED_HEADER`] so the wire shape stays the same.
#[derive(Debug, Clone)]
pub struct ServiceResponse<T> {
    pub data: T,
    pub degraded: bool,
}

impl<T> ServiceResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            degraded: false,
        }
    }

    pub fn degraded(data: T, degraded: bool) -> Self {
        Self { data, degraded }
    }
}

impl<T> From<T> for ServiceResponse<T> {
    fn from(data: T) -> Self {
        Self::new(data)
    }
}

impl<T: Serialize> IntoResponse for ServiceResponse<T> {
    fn into_response(self) -> Response {
        let mut response = Json(self.data).into_response();
        if self.degraded {
            response
                .headers_mut()
                .insert(DEGRADED_HEADER, HeaderValue::from_static("true"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[derive(Serialize)]
    struct Payload {
        value: i32,
    }

    #[test]
    fn plain_response_has_no_degraded_header() {
        let response = ServiceResponse::new(Payload { value: 1 }).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(DEGRADED_HEADER).is_none());
    }

    #[test]
    fn degraded_response_is_still_200() {
        let response = ServiceResponse::degraded(Payload { value: 2 }, true).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[DEGRADED_HEADER], "true");
    }
}
