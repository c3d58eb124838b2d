//! Process-wide evaluation configuration.
//!
//! An [`EvalConfig`] is immutable once built. Scorers read the process-wide
//! snapshot through [`current_config`] unless they were given their own
//! config, which always takes precedence. [`init`] swaps the snapshot; the
//! last call wins and no further coordination is provided.

use autoevals_core::{ClientHandle, Instrumentation, ResponseCache};
use autoevals_model::{AzureConfig, OpenAIConfig};
use std::fmt;
use std::sync::{Arc, LazyLock, OnceLock, PoisonError, RwLock};

pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-4o";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// The completion and embedding models used when a scorer names none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultModels {
    pub completion: String,
    pub embedding: String,
}

impl Default for DefaultModels {
    fn default() -> Self {
        Self {
            completion: DEFAULT_COMPLETION_MODEL.to_string(),
            embedding: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }
}

impl DefaultModels {
    /// Apply an update. `Legacy` sets the completion model and resets the
    /// embedding model; `Models` only touches the fields it names.
    pub fn apply(&self, update: &DefaultModel) -> Self {
        match update {
            DefaultModel::Legacy(completion) => {
                Self { completion: completion.clone(), ..Self::default() }
            }
            DefaultModel::Models { completion, embedding } => Self {
                completion: completion.clone().unwrap_or_else(|| self.completion.clone()),
                embedding: embedding.clone().unwrap_or_else(|| self.embedding.clone()),
            },
        }
    }
}

/// Default-model argument accepted by [`init`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultModel {
    /// A single completion model name.
    Legacy(String),
    Models { completion: Option<String>, embedding: Option<String> },
}

impl DefaultModel {
    pub fn completion(model: impl Into<String>) -> Self {
        DefaultModel::Models { completion: Some(model.into()), embedding: None }
    }

    pub fn embedding(model: impl Into<String>) -> Self {
        DefaultModel::Models { completion: None, embedding: Some(model.into()) }
    }
}

impl From<&str> for DefaultModel {
    fn from(model: &str) -> Self {
        DefaultModel::Legacy(model.to_string())
    }
}

impl From<String> for DefaultModel {
    fn from(model: String) -> Self {
        DefaultModel::Legacy(model)
    }
}

/// Client, defaults, instrumentation and cache shared by model-backed scorers.
#[derive(Clone, Default)]
pub struct EvalConfig {
    client: Option<ClientHandle>,
    default_models: DefaultModels,
    settings: OpenAIConfig,
    gateway: Option<AzureConfig>,
    instrumentation: Option<Arc<dyn Instrumentation>>,
    cache: Option<Arc<dyn ResponseCache>>,
    fallback: OnceLock<ClientHandle>,
}

impl EvalConfig {
    pub fn builder() -> EvalConfigBuilder {
        EvalConfigBuilder::default()
    }

    /// Connection settings and the Azure gateway read from the environment.
    pub fn from_env() -> Self {
        Self::builder()
            .settings(OpenAIConfig::from_env())
            .gateway(AzureConfig::from_env())
            .build()
    }

    /// Builder seeded with every field of this config.
    pub fn to_builder(&self) -> EvalConfigBuilder {
        EvalConfigBuilder {
            client: self.client.clone(),
            default_models: self.default_models.clone(),
            settings: self.settings.clone(),
            gateway: self.gateway.clone(),
            instrumentation: self.instrumentation.clone(),
            cache: self.cache.clone(),
        }
    }

    pub fn client(&self) -> Option<&ClientHandle> {
        self.client.as_ref()
    }

    pub fn default_models(&self) -> &DefaultModels {
        &self.default_models
    }

    pub fn default_completion_model(&self) -> &str {
        &self.default_models.completion
    }

    pub fn default_embedding_model(&self) -> &str {
        &self.default_models.embedding
    }

    pub fn settings(&self) -> &OpenAIConfig {
        &self.settings
    }

    pub fn gateway(&self) -> Option<&AzureConfig> {
        self.gateway.as_ref()
    }

    pub fn instrumentation(&self) -> Option<&Arc<dyn Instrumentation>> {
        self.instrumentation.as_ref()
    }

    pub fn cache(&self) -> Option<&Arc<dyn ResponseCache>> {
        self.cache.as_ref()
    }

    /// Lazily built gateway or relay client, shared by every resolution
    /// against this config.
    pub(crate) fn fallback_slot(&self) -> &OnceLock<ClientHandle> {
        &self.fallback
    }
}

impl fmt::Debug for EvalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalConfig")
            .field("client", &self.client)
            .field("default_models", &self.default_models)
            .field("base_url", &self.settings.base_url)
            .field("gateway", &self.gateway.as_ref().map(|g| &g.api_base))
            .field("instrumented", &self.instrumentation.is_some())
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

#[derive(Default)]
pub struct EvalConfigBuilder {
    client: Option<ClientHandle>,
    default_models: DefaultModels,
    settings: OpenAIConfig,
    gateway: Option<AzureConfig>,
    instrumentation: Option<Arc<dyn Instrumentation>>,
    cache: Option<Arc<dyn ResponseCache>>,
}

impl EvalConfigBuilder {
    pub fn client(mut self, client: impl Into<Option<ClientHandle>>) -> Self {
        self.client = client.into();
        self
    }

    pub fn default_models(mut self, default_models: DefaultModels) -> Self {
        self.default_models = default_models;
        self
    }

    pub fn default_model(mut self, update: impl Into<DefaultModel>) -> Self {
        self.default_models = self.default_models.apply(&update.into());
        self
    }

    pub fn settings(mut self, settings: OpenAIConfig) -> Self {
        self.settings = settings;
        self
    }

    pub fn gateway(mut self, gateway: impl Into<Option<AzureConfig>>) -> Self {
        self.gateway = gateway.into();
        self
    }

    pub fn instrumentation(mut self, instrumentation: Arc<dyn Instrumentation>) -> Self {
        self.instrumentation = Some(instrumentation);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> EvalConfig {
        EvalConfig {
            client: self.client,
            default_models: self.default_models,
            settings: self.settings,
            gateway: self.gateway,
            instrumentation: self.instrumentation,
            cache: self.cache,
            fallback: OnceLock::new(),
        }
    }
}

/// Arguments to [`init`].
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub client: Option<ClientHandle>,
    pub default_model: Option<DefaultModel>,
}

impl InitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(mut self, client: ClientHandle) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_default_model(mut self, default_model: impl Into<DefaultModel>) -> Self {
        self.default_model = Some(default_model.into());
        self
    }
}

static GLOBAL: LazyLock<RwLock<Arc<EvalConfig>>> =
    LazyLock::new(|| RwLock::new(Arc::new(EvalConfig::from_env())));

/// Set the process-wide client and default models.
///
/// The client is always replaced (`None` clears it). Without a default model
/// both defaults return to their built-ins; otherwise the update follows
/// [`DefaultModels::apply`]. Settings, gateway, instrumentation and cache are
/// carried over from the current config.
pub fn init(options: InitOptions) {
    let mut slot = GLOBAL.write().unwrap_or_else(PoisonError::into_inner);
    let default_models = match &options.default_model {
        Some(update) => slot.default_models.apply(update),
        None => DefaultModels::default(),
    };
    let next = slot.to_builder().client(options.client).default_models(default_models).build();
    tracing::debug!(
        completion = %next.default_models.completion,
        embedding = %next.default_models.embedding,
        has_client = next.client.is_some(),
        "evaluation config initialized"
    );
    *slot = Arc::new(next);
}

/// Replace the whole process-wide config.
pub fn set_config(config: EvalConfig) {
    *GLOBAL.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
}

/// Snapshot of the process-wide config.
pub fn current_config() -> Arc<EvalConfig> {
    GLOBAL.read().unwrap_or_else(PoisonError::into_inner).clone()
}
