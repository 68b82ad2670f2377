use http::StatusCode;

use floodwatch_lib::{Error as LibError, ErrorBody};

use crate::response::ProxyResponse;

/// Library error as a proxy response: 400 for validation, 503 for the store,
/// 500 otherwise.
pub fn from_lib_error(err: &LibError, request_id: &str) -> ProxyResponse {
    let (status, body) = match err {
        LibError::InvalidRequest { message } => {
            (StatusCode::BAD_REQUEST, ErrorBody::new(message.clone()))
        }
        LibError::StoreUnavailable { .. } => {
            tracing::warn!(request_id, error = %err, "flood store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorBody::new("Service temporarily unavailable").with_details(err.to_string()),
            )
        }
        other => {
            tracing::error!(request_id, error = %other, "unexpected failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("Internal server error").with_details(other.to_string()),
            )
        }
    };
    ProxyResponse::error(status, body.with_instance(request_id))
}
