//! Generative text model client.
//!
//! Requests use the Titan text body shape:
//! `{"inputText", "textGenerationConfig": {"maxTokenCount", "temperature", "topP"}}`
//! and the first `results[].outputText` is returned.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

const SERVICE: &str = "textgen";

/// Sampling parameters for one generation request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    pub max_token_count: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl GenerationParams {
    /// Route risk annotation.
    pub const ROUTE: Self = Self {
        max_token_count: 200,
        temperature: 0.1,
        top_p: 1.0,
    };

    /// Flood analysis for a location.
    pub const ANALYSIS: Self = Self {
        max_token_count: 300,
        temperature: 0.3,
        top_p: 0.9,
    };

    /// Emergency assistant replies.
    pub const ASSISTANT: Self = Self {
        max_token_count: 500,
        temperature: 0.1,
        top_p: 0.9,
    };
}

/// A model that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String>;
}

/// HTTP client for a Bedrock-style `invoke` endpoint.
#[derive(Clone)]
pub struct BedrockTextClient {
    client: Client,
    base_url: String,
    model_id: String,
    api_key: Option<String>,
}

impl BedrockTextClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        model_id: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model_id: model_id.into(),
            api_key,
        }
    }

    pub fn invoke_url(&self) -> String {
        format!("{}/model/{}/invoke", self.base_url, self.model_id)
    }
}

impl std::fmt::Debug for BedrockTextClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BedrockTextClient")
            .field("base_url", &self.base_url)
            .field("model_id", &self.model_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InvokeRequest<'a> {
    input_text: &'a str,
    text_generation_config: GenerationParams,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InvokeResponse {
    #[serde(default)]
    results: Vec<InvokeResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvokeResult {
    output_text: String,
}

impl InvokeResponse {
    pub(crate) fn into_text(self) -> Result<String> {
        self.results
            .into_iter()
            .next()
            .map(|r| r.output_text)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| Error::EmptyResult {
                service: SERVICE.to_string(),
            })
    }
}

#[async_trait]
impl TextGenerator for BedrockTextClient {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::upstream(SERVICE, "no API key configured"))?;

        let body = InvokeRequest {
            input_text: prompt,
            text_generation_config: *params,
        };
        debug!(model = %self.model_id, max_tokens = params.max_token_count, "invoking text model");

        let response = self
            .client
            .post(self.invoke_url())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::upstream(SERVICE, format!("HTTP {}", status)));
        }

        let decoded: InvokeResponse = response
            .json()
            .await
            .map_err(|e| Error::malformed(SERVICE, e.to_string()))?;
        decoded.into_text()
    }
}
