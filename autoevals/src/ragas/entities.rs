use super::{ForcedTool, ResolvedModel, ToolModel, context_text, prompt_vars};
use crate::config::EvalConfig;
use crate::list::ListContains;
use crate::string::EmbeddingSimilarity;
use async_trait::async_trait;
use autoevals_core::{ClientHandle, Result, Score, Scorer, ScorerArgs};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

pub const EXTRACT_ENTITIES_TOOL: &str = "extract_entities";

const ENTITY_PROMPT: &str = r#"Given a text, extract unique entities without repetition. Treat different forms or mentions of the same entity as a single entity.

Example:

text: "The Eiffel Tower, located in Paris, France, was completed in 1889 for the World's Fair."
entities: ["Eiffel Tower", "Paris", "France", "1889", "World's Fair"]

Your actual task:

text: {{text}}"#;

pub fn entity_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "entities": {"title": "Entities", "type": "array", "items": {"type": "string"}}
        },
        "required": ["entities"]
    })
}

const ENTITIES: ForcedTool = ForcedTool {
    name: EXTRACT_ENTITIES_TOOL,
    description: "Extract unique entities from a given text",
    schema: entity_schema,
};

#[derive(Debug, Deserialize)]
struct Entities {
    entities: Vec<String>,
}

async fn entities_of(text: &str, resolved: &ResolvedModel) -> Result<Vec<String>> {
    let vars = prompt_vars([("text", Value::String(text.to_string()))]);
    let parsed: Entities = resolved.call_tool(&ENTITIES, ENTITY_PROMPT, &vars, 0.0).await?;
    Ok(parsed.entities)
}

/// Ask the model for the distinct entities mentioned in `text`.
pub async fn extract_entities(
    text: &str,
    model: &str,
    client: &ClientHandle,
    config: &Arc<EvalConfig>,
) -> Result<Vec<String>> {
    let resolved =
        ResolvedModel { config: config.clone(), client: client.clone(), model: model.to_string() };
    entities_of(text, &resolved).await
}

/// Share of the entities in `expected` that also appear in `context`.
///
/// Entities are extracted from both texts concurrently and matched with
/// [`ListContains`] allowing extra context entities. Without an explicit
/// pairwise scorer, entities are compared by [`EmbeddingSimilarity`] through
/// the same client and config as the extraction calls.
#[derive(Clone, Default)]
pub struct ContextEntityRecall {
    llm: ToolModel,
    embedding: EmbeddingSimilarity,
    pairwise: Option<Arc<dyn Scorer>>,
}

impl ContextEntityRecall {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pairwise_scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.pairwise = Some(scorer);
        self
    }

    /// Completion model used for entity extraction.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.llm.set_model(model.into());
        self
    }

    pub fn with_client(mut self, client: ClientHandle) -> Self {
        self.llm.set_client(client.clone());
        self.embedding = self.embedding.with_client(client);
        self
    }

    pub fn with_config(mut self, config: Arc<EvalConfig>) -> Self {
        self.llm.set_config(config.clone());
        self.embedding = self.embedding.with_config(config);
        self
    }

    fn contains(&self) -> ListContains {
        let pairwise =
            self.pairwise.clone().unwrap_or_else(|| Arc::new(self.embedding.clone()) as Arc<dyn Scorer>);
        ListContains::new().with_pairwise_scorer(pairwise).with_allow_extra_entities(true)
    }
}

#[async_trait]
impl Scorer for ContextEntityRecall {
    fn name(&self) -> &str {
        "ContextEntityRecall"
    }

    async fn score(&self, args: ScorerArgs) -> Result<Score> {
        let expected = context_text(args.require_expected(self.name())?);
        let context = context_text(args.require(self.name(), "context")?);

        let resolved = self.llm.resolve()?;
        let (expected_entities, context_entities) = futures::try_join!(
            entities_of(&expected, &resolved),
            entities_of(&context, &resolved),
        )?;
        tracing::debug!(
            expected = expected_entities.len(),
            context = context_entities.len(),
            "extracted entities"
        );

        let as_values = |entities: &[String]| entities.iter().cloned().map(Value::String).collect::<Vec<_>>();
        let recall = self
            .contains()
            .compare(&as_values(&context_entities), &as_values(&expected_entities), true)
            .await?;

        Ok(Score { name: self.name().to_string(), ..recall }
            .with_metadata("context_entities", json!(context_entities))
            .with_metadata("expected_entities", json!(expected_entities)))
    }
}
