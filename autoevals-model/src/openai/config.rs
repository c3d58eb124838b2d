//! Configuration types for OpenAI-compatible endpoints.

use serde::{Deserialize, Serialize};

/// Default relay used when no base URL is configured.
pub const PROXY_URL: &str = "https://api.braintrust.dev/v1/proxy";

/// Configuration for an OpenAI-compatible API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// Bearer token. Requests are sent unauthenticated when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self { api_key: None, base_url: PROXY_URL.to_string(), organization_id: None }
    }
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: Some(api_key.into()), ..Default::default() }
    }

    /// Config for an OpenAI-compatible API at `base_url`.
    pub fn compatible(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self { api_key: Some(api_key.into()), base_url: base_url.into(), organization_id: None }
    }

    /// Read `OPENAI_API_KEY` (falling back to `BRAINTRUST_API_KEY`),
    /// `OPENAI_BASE_URL` (falling back to [`PROXY_URL`]) and `OPENAI_ORG_ID`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`OpenAIConfig::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());
        Self {
            api_key: non_empty("OPENAI_API_KEY").or_else(|| non_empty("BRAINTRUST_API_KEY")),
            base_url: non_empty("OPENAI_BASE_URL").unwrap_or_else(|| PROXY_URL.to_string()),
            organization_id: non_empty("OPENAI_ORG_ID"),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_organization(mut self, org_id: impl Into<String>) -> Self {
        self.organization_id = Some(org_id.into());
        self
    }
}
