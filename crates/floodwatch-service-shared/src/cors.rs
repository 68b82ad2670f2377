use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

/// Any origin may call the JSON endpoints.
///
/// `OPTIONS` requests are answered by the layer itself with an empty 200
/// carrying the allowed methods and headers.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([
            header::HeaderName::from_static(crate::REQUEST_ID_HEADER),
            header::HeaderName::from_static(crate::DEGRADED_HEADER),
        ])
}
