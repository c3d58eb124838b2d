//! Configuration types for Azure OpenAI deployments.

use serde::{Deserialize, Serialize};

pub const DEFAULT_API_VERSION: &str = "2024-02-15-preview";

/// Configuration for Azure OpenAI Service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AzureConfig {
    pub api_key: String,
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`.
    pub api_base: String,
    pub api_version: String,
    /// Deployment to route every request to. When unset the request's model
    /// name is used as the deployment name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
}

impl AzureConfig {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: api_base.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            deployment_id: None,
        }
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_deployment(mut self, deployment_id: impl Into<String>) -> Self {
        self.deployment_id = Some(deployment_id.into());
        self
    }

    /// Read `AZURE_OPENAI_API_KEY` and `AZURE_OPENAI_ENDPOINT` (both required),
    /// plus optional `AZURE_OPENAI_API_VERSION` and `AZURE_OPENAI_DEPLOYMENT`.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let mut config =
            Self::new(non_empty("AZURE_OPENAI_API_KEY")?, non_empty("AZURE_OPENAI_ENDPOINT")?);
        if let Some(version) = non_empty("AZURE_OPENAI_API_VERSION") {
            config.api_version = version;
        }
        config.deployment_id = non_empty("AZURE_OPENAI_DEPLOYMENT");
        Some(config)
    }
}
