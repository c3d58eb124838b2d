//! Client resolution and cached model requests.

use crate::config::EvalConfig;
use autoevals_core::{
    ClientHandle, CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse,
    ModerationRequest, ModerationResponse, ResponseCache, Result,
};
use autoevals_model::{AzureOpenAIClient, OpenAIClient};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;

/// Pick the client for one call.
///
/// Precedence: `explicit`, then the config's client, then the Azure gateway
/// (when configured), then an OpenAI-compatible client for the configured base
/// URL (the relay by default). The result is wrapped by the config's
/// instrumentation unless it is already marked as instrumented.
pub fn resolve_client(explicit: Option<&ClientHandle>, config: &EvalConfig) -> Result<ClientHandle> {
    let handle = match explicit.or(config.client()) {
        Some(handle) => handle.clone(),
        None => fallback_client(config)?,
    };
    Ok(match config.instrumentation() {
        Some(instrumentation) => handle.instrument_with(instrumentation.as_ref()),
        None => handle,
    })
}

fn fallback_client(config: &EvalConfig) -> Result<ClientHandle> {
    let slot = config.fallback_slot();
    if let Some(handle) = slot.get() {
        return Ok(handle.clone());
    }
    let handle = match config.gateway() {
        Some(gateway) => {
            tracing::debug!(endpoint = %gateway.api_base, "using Azure OpenAI gateway client");
            ClientHandle::new(Arc::new(AzureOpenAIClient::new(gateway.clone())?))
        }
        None => {
            tracing::debug!(base_url = %config.settings().base_url, "using OpenAI-compatible client");
            ClientHandle::new(Arc::new(OpenAIClient::new(config.settings().clone())?))
        }
    };
    Ok(slot.get_or_init(|| handle).clone())
}

async fn cached<Req, Resp, F, Fut>(
    cache: Option<&Arc<dyn ResponseCache>>,
    request: Req,
    call: F,
) -> Result<Resp>
where
    Req: Serialize,
    Resp: Serialize + DeserializeOwned,
    F: FnOnce(Req) -> Fut,
    Fut: Future<Output = Result<Resp>>,
{
    let Some(cache) = cache else {
        return call(request).await;
    };

    let key = serde_json::to_string(&request)?;
    if let Some(hit) = cache.get(&key).await? {
        match serde_json::from_value(hit) {
            Ok(response) => {
                tracing::debug!(cache_hit = true, "serving model response from cache");
                return Ok(response);
            }
            Err(e) => tracing::warn!(error = %e, "ignoring unreadable cached response"),
        }
    }

    let response = call(request).await?;
    cache.set(&key, serde_json::to_value(&response)?).await?;
    Ok(response)
}

/// Issue one completion, consulting `cache` first when present.
pub async fn run_completion(
    client: &ClientHandle,
    cache: Option<&Arc<dyn ResponseCache>>,
    request: CompletionRequest,
) -> Result<CompletionResponse> {
    cached(cache, request, |request| client.client().complete(request)).await
}

/// Issue one embedding request, consulting `cache` first when present.
pub async fn run_embedding(
    client: &ClientHandle,
    cache: Option<&Arc<dyn ResponseCache>>,
    request: EmbeddingRequest,
) -> Result<EmbeddingResponse> {
    cached(cache, request, |request| client.client().embed(request)).await
}

/// Issue one moderation request, consulting `cache` first when present.
pub async fn run_moderation(
    client: &ClientHandle,
    cache: Option<&Arc<dyn ResponseCache>>,
    request: ModerationRequest,
) -> Result<ModerationResponse> {
    cached(cache, request, |request| client.client().moderate(request)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoevals_core::{ChatMessage, InMemoryCache, Instrumentation, LlmClient};
    use autoevals_model::{MockClient, OpenAIConfig, TracingInstrumentation};
    use serde_json::json;

    fn mock(name: &str) -> Arc<MockClient> {
        Arc::new(MockClient::new(name).with_tool_call("select_choice", json!({"choice": "Y"})))
    }

    #[test]
    fn test_explicit_client_beats_config_client() {
        let config = EvalConfig::builder().client(ClientHandle::new(mock("config"))).build();
        let explicit = ClientHandle::new(mock("explicit"));

        assert_eq!(resolve_client(Some(&explicit), &config).unwrap().client().name(), "explicit");
        assert_eq!(resolve_client(None, &config).unwrap().client().name(), "config");
    }

    #[test]
    fn test_gateway_beats_relay() {
        let config = EvalConfig::builder()
            .gateway(autoevals_model::AzureConfig::new("k", "https://res.openai.azure.com"))
            .build();
        assert_eq!(resolve_client(None, &config).unwrap().client().name(), "azure-openai");

        let config = EvalConfig::builder().settings(OpenAIConfig::default()).build();
        let first = resolve_client(None, &config).unwrap();
        let second = resolve_client(None, &config).unwrap();
        assert_eq!(first.client().name(), "openai");
        assert!(Arc::ptr_eq(first.client(), second.client()));
    }

    #[test]
    fn test_instrumentation_skips_marked_clients() {
        let wraps = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = wraps.clone();
        let hook: Arc<dyn Instrumentation> = Arc::new(move |client: Arc<dyn LlmClient>| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            TracingInstrumentation.wrap(client)
        });
        let config = EvalConfig::builder().instrumentation(hook).build();

        let plain = ClientHandle::new(mock("plain"));
        assert!(resolve_client(Some(&plain), &config).unwrap().is_instrumented());

        let wrapped = ClientHandle::instrumented(mock("wrapped"));
        resolve_client(Some(&wrapped), &config).unwrap();
        assert_eq!(wraps.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_client() {
        let client = mock("m");
        let handle = ClientHandle::new(client.clone());
        let cache: Arc<dyn ResponseCache> = Arc::new(InMemoryCache::new());
        let request = CompletionRequest::new("gpt-4o", vec![ChatMessage::user("q")]);

        let first = run_completion(&handle, Some(&cache), request.clone()).await.unwrap();
        let second = run_completion(&handle, Some(&cache), request).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(client.completion_requests().len(), 1);
    }
}
