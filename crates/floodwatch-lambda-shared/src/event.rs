use std::borrow::Cow;
use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// The fields of an API Gateway REST proxy event the handler reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    #[serde(default)]
    pub http_method: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
    /// Set by API Gateway for binary media types.
    #[serde(default)]
    pub is_base64_encoded: bool,
}

impl ProxyRequest {
    pub fn new(method: &str, path: &str, body: Option<&str>) -> Self {
        Self {
            http_method: method.to_string(),
            path: path.to_string(),
            headers: None,
            body: body.map(str::to_string),
            is_base64_encoded: false,
        }
    }

    /// Body bytes, base64-decoded when API Gateway flagged the body as
    /// binary. An absent or undecodable body reads as empty.
    pub fn body_bytes(&self) -> Cow<'_, [u8]> {
        let body = self.body.as_deref().unwrap_or_default();
        if !self.is_base64_encoded {
            return Cow::Borrowed(body.as_bytes());
        }
        match STANDARD.decode(body) {
            Ok(bytes) => Cow::Owned(bytes),
            Err(err) => {
                warn!(error = %err, "request body is not valid base64");
                Cow::Borrowed(&[])
            }
        }
    }

    /// Path without trailing slashes, `/` for the root.
    pub fn route_path(&self) -> &str {
        match self.path.trim_end_matches('/') {
            "" => "/",
            path => path,
        }
    }

    /// `X-Request-ID` from the caller, matched case-insensitively.
    pub fn request_id_header(&self) -> Option<&str> {
        self.headers.as_ref()?.iter().find_map(|(name, value)| {
            name.eq_ignore_ascii_case("x-request-id")
                .then_some(value.as_str())
                .filter(|v| !v.trim().is_empty())
        })
    }
}
