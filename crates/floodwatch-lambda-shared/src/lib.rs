//! Shared infrastructure for the Floodwatch AWS Lambda function.
//!
//! - [`ProxyRequest`] / [`ProxyResponse`]: API Gateway proxy integration shapes
//! - [`from_lib_error`]: library errors as error responses
//! - [`init_runtime`]: the engine, built once per container
//! - [`init_tracing`]: JSON-formatted tracing for CloudWatch Logs
//!
//! # Testing Support
//!
//! Enable the `test-utils` feature for engines over stub collaborators.

#![deny(warnings)]

mod error;
mod event;
mod response;
mod runtime;
mod tracing_init;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::from_lib_error;
pub use event::ProxyRequest;
pub use response::{ProxyResponse, CORS_ALLOW_HEADERS, CORS_ALLOW_METHODS};
pub use runtime::{init_runtime, InitError, LambdaRuntime};
pub use tracing_init::init_tracing;
