//! Tracing instrumentation for model clients.

use async_trait::async_trait;
use autoevals_core::{
    CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse, Instrumentation,
    LlmClient, ModerationRequest, ModerationResponse, Result,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Wraps clients in [`TracedClient`], tagging every call with
/// `purpose = "scorer"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingInstrumentation;

impl Instrumentation for TracingInstrumentation {
    fn wrap(&self, client: Arc<dyn LlmClient>) -> Arc<dyn LlmClient> {
        Arc::new(TracedClient::new(client))
    }
}

/// A client that records an `llm_call` span around every request.
pub struct TracedClient {
    inner: Arc<dyn LlmClient>,
}

impl TracedClient {
    pub fn new(inner: Arc<dyn LlmClient>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl LlmClient for TracedClient {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let span = tracing::info_span!(
            "llm_call",
            purpose = "scorer",
            provider = %self.inner.name(),
            model = %request.model,
            request_type = "complete",
        );
        async {
            let start = Instant::now();
            let result = self.inner.complete(request).await;
            match &result {
                Ok(response) => {
                    let usage = response.usage.unwrap_or_default();
                    tracing::debug!(
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        prompt_tokens = usage.prompt_tokens,
                        completion_tokens = usage.completion_tokens,
                        "completion finished"
                    );
                }
                Err(error) => tracing::warn!(error = %error, "completion failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let span = tracing::info_span!(
            "llm_call",
            purpose = "scorer",
            provider = %self.inner.name(),
            model = %request.model,
            request_type = "embed",
        );
        async {
            let result = self.inner.embed(request).await;
            if let Err(error) = &result {
                tracing::warn!(error = %error, "embedding failed");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn moderate(&self, request: ModerationRequest) -> Result<ModerationResponse> {
        let span = tracing::info_span!(
            "llm_call",
            purpose = "scorer",
            provider = %self.inner.name(),
            request_type = "moderate",
        );
        self.inner.moderate(request).instrument(span).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockClient;
    use autoevals_core::{ChatMessage, ClientHandle};
    use serde_json::json;

    #[tokio::test]
    async fn test_traced_client_delegates() {
        let mock = Arc::new(MockClient::new("mock").with_tool_call("f", json!({})));
        let handle = ClientHandle::new(mock.clone()).instrument_with(&TracingInstrumentation);
        assert!(handle.is_instrumented());
        assert_eq!(handle.client().name(), "mock");

        let request = CompletionRequest::new("gpt-4o", vec![ChatMessage::user("x")]);
        handle.client().complete(request).await.unwrap();
        assert_eq!(mock.completion_requests().len(), 1);
    }
}
