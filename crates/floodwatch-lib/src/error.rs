use thiserror::Error;

/// Convenient result alias for the floodwatch library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// A downstream collaborator answered, but not with something usable.
    #[error("{service} request failed: {message}")]
    Upstream { service: String, message: String },

    /// A downstream call did not complete within its deadline.
    #[error("{service} did not respond within {after_ms} ms")]
    Timeout { service: String, after_ms: u64 },

    /// The downstream body could not be decoded into the expected shape.
    #[error("malformed {service} response: {message}")]
    MalformedResponse { service: String, message: String },

    /// The downstream call succeeded but carried no results.
    #[error("{service} returned no results")]
    EmptyResult { service: String },

    /// Raised when request parameters fail validation.
    #[error("{message}")]
    InvalidRequest { message: String },

    /// Raised when the relational store cannot serve a query.
    #[error("flood store unavailable: {message}")]
    StoreUnavailable { message: String },

    /// Wrapper for SQLite errors.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Wrapper for HTTP client errors.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Wrapper for JSON encoding errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn upstream(service: &str, message: impl Into<String>) -> Self {
        Error::Upstream {
            service: service.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn malformed(service: &str, message: impl Into<String>) -> Self {
        Error::MalformedResponse {
            service: service.to_string(),
            message: message.into(),
        }
    }

    /// Whether the error came from a downstream collaborator rather than
    /// from the request or the store.
    pub fn is_downstream(&self) -> bool {
        matches!(
            self,
            Error::Upstream { .. }
                | Error::Timeout { .. }
                | Error::MalformedResponse { .. }
                | Error::EmptyResult { .. }
                | Error::Http(_)
        )
    }
}
