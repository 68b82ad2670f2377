//! Error responses for the Floodwatch services.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use floodwatch_lib::{Error as LibError, ErrorBody};

/// An error status with its `{error, details?, instance?}` body.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, body: ErrorBody) -> Self {
        Self { status, body }
    }

    /// 400 with the validation message as `error`.
    pub fn bad_request(message: impl Into<String>, request_id: &str) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ErrorBody::new(message).with_instance(request_id),
        )
    }

    pub fn service_unavailable(details: impl Into<String>, request_id: &str) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorBody::new("Service temporarily unavailable")
                .with_details(details)
                .with_instance(request_id),
        )
    }

    pub fn internal(details: impl Into<String>, request_id: &str) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::new("Internal server error")
                .with_details(details)
                .with_instance(request_id),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Map a library error onto the service error policy.
///
/// Validation failures are 400, an unreachable store is 503, and anything
/// else is 500.
pub fn from_lib_error(err: &LibError, request_id: &str) -> ApiError {
    match err {
        LibError::InvalidRequest { message } => ApiError::bad_request(message.clone(), request_id),
        LibError::StoreUnavailable { .. } => {
            tracing::warn!(request_id, error = %err, "flood store unavailable");
            ApiError::service_unavailable(err.to_string(), request_id)
        }
        other => {
            tracing::error!(request_id, error = %other, "unexpected failure");
            ApiError::internal(other.to_string(), request_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_request_is_400_with_message() {
        let err = LibError::InvalidRequest {
            message: "Latitude and longitude are required".to_string(),
        };
        let api = from_lib_error(&err, "req-1");
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.body.error, "Latitude and longitude are required");
        assert!(api.body.details.is_none());
        assert_eq!(api.body.instance.as_deref(), Some("req-1"));
    }

    #[test]
    fn store_outage_is_503_with_details() {
        let err = LibError::StoreUnavailable {
            message: "database is locked".to_string(),
        };
        let api = from_lib_error(&err, "req-2");
        assert_eq!(api.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(api.body.details.unwrap_or_default().contains("database is locked"));
    }

    #[test]
    fn other_errors_are_500() {
        let err = LibError::EmptyResult {
            service: "osrm".to_string(),
        };
        let api = from_lib_error(&err, "req-3");
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.body.error, "Internal server error");
    }

    #[test]
    fn body_serializes_without_empty_fields() {
        let json = serde_json::to_value(ErrorBody::new("Message is required")).unwrap();
        assert_eq!(json, serde_json::json!({"error": "Message is required"}));
    }
}
