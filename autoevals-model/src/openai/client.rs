//! OpenAI-compatible HTTP client.

use super::config::OpenAIConfig;
use crate::http::send_json;
use async_trait::async_trait;
use autoevals_core::{
    CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse, EvalError,
    LlmClient, ModerationRequest, ModerationResponse, Result,
};
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Client for the OpenAI REST API or any endpoint that speaks it.
///
/// # Example
///
/// ```rust,ignore
/// use autoevals_model::openai::{OpenAIClient, OpenAIConfig};
///
/// let client = OpenAIClient::new(OpenAIConfig::from_env())?;
/// ```
pub struct OpenAIClient {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIClient {
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| EvalError::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Client configured from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIConfig::from_env())
    }

    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.url(path);
        let mut request = self.client.post(&url).json(body);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }
        if let Some(org) = &self.config.organization_id {
            request = request.header("OpenAI-Organization", org);
        }
        send_json(request, "OpenAI", url).await
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.post("chat/completions", &request).await
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        self.post("embeddings", &request).await
    }

    async fn moderate(&self, request: ModerationRequest) -> Result<ModerationResponse> {
        self.post("moderations", &request).await
    }
}
