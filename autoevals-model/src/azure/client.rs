//! Azure OpenAI client.

use super::config::AzureConfig;
use crate::http::send_json;
use async_trait::async_trait;
use autoevals_core::{
    CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse, EvalError,
    LlmClient, ModerationRequest, ModerationResponse, Result,
};
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Azure OpenAI client. Uses `api-key` header authentication and
/// deployment-scoped URLs.
pub struct AzureOpenAIClient {
    client: Client,
    config: AzureConfig,
}

impl AzureOpenAIClient {
    pub fn new(config: AzureConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| EvalError::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &AzureConfig {
        &self.config
    }

    fn deployment_url(&self, model: &str, operation: &str) -> String {
        let deployment = self.config.deployment_id.as_deref().unwrap_or(model);
        format!(
            "{}/openai/deployments/{}/{}?api-version={}",
            self.config.api_base.trim_end_matches('/'),
            deployment,
            operation,
            self.config.api_version
        )
    }

    async fn post<B, R>(&self, url: String, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let request = self
            .client
            .post(&url)
            .header("api-key", &self.config.api_key)
            .header("Content-Type", "application/json")
            .json(body);
        send_json(request, "Azure OpenAI", url).await
    }
}

#[async_trait]
impl LlmClient for AzureOpenAIClient {
    fn name(&self) -> &str {
        "azure-openai"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let url = self.deployment_url(&request.model, "chat/completions");
        self.post(url, &request).await
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let url = self.deployment_url(&request.model, "embeddings");
        self.post(url, &request).await
    }

    async fn moderate(&self, _request: ModerationRequest) -> Result<ModerationResponse> {
        Err(EvalError::Unsupported("Azure OpenAI does not expose a moderation endpoint".into()))
    }
}
