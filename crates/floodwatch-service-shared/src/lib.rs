//! Shared infrastructure for the Floodwatch HTTP microservices.
//!
//! Handlers stay thin: decode with [`Validated`], call one
//! [`floodwatch_lib::Floodwatch`] method, and answer with
//! [`ServiceResponse`] or [`ApiError`]. Everything else lives here:
//!
//! - [`AppState`]: the configured engine shared by all handlers
//! - [`health`]: liveness and readiness probes
//! - [`metrics`]: Prometheus recorder and business counters
//! - [`logging`]: JSON or text `tracing` output
//! - [`middleware`]: request ids and HTTP metrics
//! - [`cors_layer`]: permissive CORS for the browser client
//!
//! # Testing Support
//!
//! Enable the `test-utils` feature to build states over stub collaborators
//! from dependent crates.

#![deny(warnings)]

mod cors;
mod error;
mod extract;
mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;
mod response;
mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cors::cors_layer;
pub use error::{from_lib_error, ApiError};
pub use extract::Validated;
pub use health::{health_live, health_ready, HealthStatus};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{
    init_metrics, metrics_handler, record_analysis, record_assistant_reply, record_route_plan,
    record_shelter_lookup, MetricsConfig, MetricsError,
};
pub use middleware::{extract_or_generate_request_id, MetricsLayer, RequestId, REQUEST_ID_HEADER};
pub use response::{ServiceResponse, DEGRADED_HEADER};
pub use state::{AppState, AppStateError};
