//! Request body extraction with endpoint validation.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use floodwatch_lib::{parse_request, Validate};

use crate::error::{from_lib_error, ApiError};
use crate::middleware::{extract_or_generate_request_id, RequestId};

/// Extractor yielding the validated domain value of a request body.
///
/// The body is read as raw bytes, so a missing or wrong `Content-Type` is not
/// an error. Empty, malformed or incomplete bodies become a 400 carrying the
/// endpoint's message.
pub struct Validated<T: Validate>(pub T::Output);

impl<S, T> FromRequest<S> for Validated<T>
where
    S: Send + Sync,
    T: Validate + DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let request_id = req
            .extensions()
            .get::<RequestId>()
            .cloned()
            .unwrap_or_else(|| extract_or_generate_request_id(req.headers()));

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|_| ApiError::bad_request(T::DECODE_MESSAGE, request_id.as_str()))?;

        parse_request::<T>(&body)
            .map(Validated)
            .map_err(|err| from_lib_error(&err, request_id.as_str()))
    }
}
