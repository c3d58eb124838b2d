//! Retrieval-augmented generation metrics.
//!
//! Each metric asks the model to fill in one forced tool call (entities,
//! statements, verdicts) and turns the structured arguments into a score.
//! Metrics that also compare text semantically use [`EmbeddingSimilarity`]
//! with the same client and config as their completion calls.
//!
//! [`EmbeddingSimilarity`]: crate::string::EmbeddingSimilarity

mod answer;
mod context;
mod entities;

pub use answer::{
    AnswerCorrectness, AnswerRelevancy, AnswerSimilarity, Faithfulness, compute_f1_score,
};
pub use context::{ContextPrecision, ContextRecall, ContextRelevancy};
pub use entities::{ContextEntityRecall, EXTRACT_ENTITIES_TOOL, entity_schema, extract_entities};

use crate::client::{resolve_client, run_completion};
use crate::config::{EvalConfig, current_config};
use crate::llm::render::render_template;
use crate::util::value_as_text;
use autoevals_core::{
    ChatMessage, ClientHandle, CompletionRequest, EvalError, Result, ToolDefinition,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Completion model, client and config used by a metric's tool calls.
#[derive(Clone, Default)]
pub(crate) struct ToolModel {
    model: Option<String>,
    client: Option<ClientHandle>,
    config: Option<Arc<EvalConfig>>,
}

impl ToolModel {
    pub(crate) fn set_model(&mut self, model: String) {
        self.model = Some(model);
    }

    pub(crate) fn set_client(&mut self, client: ClientHandle) {
        self.client = Some(client);
    }

    pub(crate) fn set_config(&mut self, config: Arc<EvalConfig>) {
        self.config = Some(config);
    }

    /// Resolve the client and model for one scoring call.
    pub(crate) fn resolve(&self) -> Result<ResolvedModel> {
        let config = self.config.clone().unwrap_or_else(current_config);
        let client = resolve_client(self.client.as_ref(), &config)?;
        let model =
            self.model.clone().unwrap_or_else(|| config.default_completion_model().to_string());
        Ok(ResolvedModel { config, client, model })
    }
}

/// A forced function the model must call.
pub(crate) struct ForcedTool {
    pub name: &'static str,
    pub description: &'static str,
    pub schema: fn() -> Value,
}

pub(crate) struct ResolvedModel {
    pub config: Arc<EvalConfig>,
    pub client: ClientHandle,
    pub model: String,
}

impl ResolvedModel {
    /// Render `prompt` with `vars`, force a call to `tool` and decode its
    /// arguments. A missing call or undecodable arguments is a
    /// classification error carrying the raw response.
    pub(crate) async fn call_tool<T: DeserializeOwned>(
        &self,
        tool: &ForcedTool,
        prompt: &str,
        vars: &Map<String, Value>,
        temperature: f32,
    ) -> Result<T> {
        let content = render_template(prompt, vars)?;
        let definition = ToolDefinition::function(tool.name, tool.description, (tool.schema)());
        let request = CompletionRequest::new(self.model.clone(), vec![ChatMessage::user(content)])
            .with_forced_tool(vec![definition], tool.name)
            .with_temperature(temperature);
        let response = run_completion(&self.client, self.config.cache(), request).await?;

        let raw = || serde_json::to_value(&response).unwrap_or(Value::Null);
        let call = response
            .first_message()
            .and_then(|message| message.tool_calls().iter().find(|c| c.function.name == tool.name))
            .ok_or_else(|| {
                EvalError::classification(format!("No {} call found in response", tool.name), raw())
            })?;
        serde_json::from_str(&call.function.arguments).map_err(|e| {
            EvalError::classification(format!("Invalid {} arguments: {e}", tool.name), raw())
        })
    }
}

/// Text of a `context` argument: a string, or a list of strings joined by
/// newlines.
pub(crate) fn context_text(context: &Value) -> String {
    match context {
        Value::Array(items) => items.iter().map(value_as_text).collect::<Vec<_>>().join("\n"),
        other => value_as_text(other),
    }
}

/// Template variables from `(name, value)` pairs.
pub(crate) fn prompt_vars<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs.into_iter().map(|(key, value)| (key.to_string(), value)).collect()
}
