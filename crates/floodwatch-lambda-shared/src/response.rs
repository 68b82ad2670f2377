//! API Gateway proxy responses.

use std::collections::BTreeMap;

use http::StatusCode;
use serde::{Deserialize, Serialize};

use floodwatch_lib::ErrorBody;

pub const CORS_ALLOW_METHODS: &str = "GET, POST, OPTIONS";
pub const CORS_ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Response in the shape API Gateway expects from a proxy integration.
///
/// Every response carries the CORS headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl ProxyResponse {
    fn with_body(status: StatusCode, body: String) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Access-Control-Allow-Origin".to_string(), "*".to_string());
        headers.insert(
            "Access-Control-Allow-Methods".to_string(),
            CORS_ALLOW_METHODS.to_string(),
        );
        headers.insert(
            "Access-Control-Allow-Headers".to_string(),
            CORS_ALLOW_HEADERS.to_string(),
        );
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            status_code: status.as_u16(),
            headers,
            body,
        }
    }

    /// 200 with `data` as the JSON body.
    pub fn ok<T: Serialize>(data: &T) -> Self {
        match serde_json::to_string(data) {
            Ok(body) => Self::with_body(StatusCode::OK, body),
            Err(err) => Self::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("Internal server error").with_details(err.to_string()),
            ),
        }
    }

    pub fn error(status: StatusCode, body: ErrorBody) -> Self {
        // ErrorBody holds only strings.
        let body = serde_json::to_string(&body).unwrap_or_else(|_| "{}".to_string());
        Self::with_body(status, body)
    }

    /// Empty 200 answering a CORS preflight.
    pub fn preflight() -> Self {
        Self::with_body(StatusCode::OK, String::new())
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}
