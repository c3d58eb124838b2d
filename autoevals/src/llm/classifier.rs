//! Model-graded classification: render, force `select_choice`, parse, score.

use super::render::render_template;
use super::tools::{SELECT_CHOICE_TOOL, build_classification_tools, suffix};
use crate::client::{resolve_client, run_completion};
use crate::config::{EvalConfig, current_config};
use async_trait::async_trait;
use autoevals_core::{
    ChatMessage, ClientHandle, CompletionRequest, CompletionResponse, EvalError, ResponseCache,
    Result, Score, Scorer, ScorerArgs, ToolDefinition,
};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Label → grade mapping. Order is preserved and shown to the model.
pub type ChoiceScores = IndexMap<String, f64>;

const MIN_MAX_TOKENS: u32 = 5;

/// Low-level classifier over an explicit message list and tool set.
///
/// Message contents are templates rendered against the call arguments plus
/// `render_args` (which win on collisions). The model is forced to call
/// `select_choice`; the chosen label is mapped through `choice_scores`.
#[derive(Clone)]
pub struct OpenAiClassifier {
    name: String,
    messages: Vec<ChatMessage>,
    choice_scores: ChoiceScores,
    tools: Vec<ToolDefinition>,
    render_args: Map<String, Value>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: f32,
    reasoning_effort: Option<String>,
    client: Option<ClientHandle>,
    config: Option<Arc<EvalConfig>>,
    cache: Option<Arc<dyn ResponseCache>>,
}

impl OpenAiClassifier {
    pub fn new(
        name: impl Into<String>,
        messages: Vec<ChatMessage>,
        choice_scores: ChoiceScores,
        tools: Vec<ToolDefinition>,
    ) -> Result<Self> {
        let name = name.into();
        if choice_scores.is_empty() {
            return Err(EvalError::InvalidArgument(format!("{name}: choice_scores must not be empty")));
        }
        if let Some((label, grade)) = choice_scores.iter().find(|(_, grade)| !grade.is_finite()) {
            return Err(EvalError::InvalidArgument(format!(
                "{name}: choice {label:?} has non-finite score {grade}"
            )));
        }
        Ok(Self {
            name,
            messages,
            choice_scores,
            tools,
            render_args: Map::new(),
            model: None,
            max_tokens: None,
            temperature: 0.0,
            reasoning_effort: None,
            client: None,
            config: None,
            cache: None,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_reasoning_effort(mut self, effort: impl Into<String>) -> Self {
        self.reasoning_effort = Some(effort.into());
        self
    }

    pub fn with_render_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.render_args.insert(key.into(), value.into());
        self
    }

    pub fn with_client(mut self, client: ClientHandle) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_config(mut self, config: Arc<EvalConfig>) -> Self {
        self.config = Some(config);
        self
    }

    /// Cache consulted before the config's cache.
    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn choice_scores(&self) -> &ChoiceScores {
        &self.choice_scores
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The completion request this classifier would send for `args`.
    pub fn build_request(&self, args: &ScorerArgs, config: &EvalConfig) -> Result<CompletionRequest> {
        let mut vars = args.to_map();
        vars.extend(self.render_args.iter().map(|(k, v)| (k.clone(), v.clone())));

        let messages = self
            .messages
            .iter()
            .map(|message| {
                Ok(ChatMessage::new(message.role.clone(), render_template(&message.content, &vars)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let model = self.model.as_deref().unwrap_or(config.default_completion_model());
        let mut request = CompletionRequest::new(model, messages)
            .with_forced_tool(self.tools.clone(), SELECT_CHOICE_TOOL)
            .with_temperature(self.temperature);
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens.max(MIN_MAX_TOKENS));
        }
        request.reasoning_effort = self.reasoning_effort.clone();
        Ok(request)
    }

    /// Validate the single forced tool call and map it to a score.
    pub fn parse_response(&self, response: &CompletionResponse) -> Result<Score> {
        let fail = |message: String| {
            let raw = serde_json::to_value(response).unwrap_or(Value::Null);
            EvalError::classification(message, raw)
        };

        let message = response.first_message().ok_or_else(|| fail("Empty response".into()))?;
        let call = match message.tool_calls() {
            [] => return Err(fail("No tool call found in response".into())),
            [call] => call,
            calls => return Err(fail(format!("Expected exactly one tool call, found {}", calls.len()))),
        };
        if call.function.name != SELECT_CHOICE_TOOL {
            return Err(fail(format!("Unexpected tool call ({}) found in response", call.function.name)));
        }

        let arguments: Value = serde_json::from_str(&call.function.arguments).map_err(|e| {
            tracing::warn!(scorer = %self.name, error = %e, "unparsable select_choice arguments");
            fail(format!("Invalid select_choice arguments: {e}"))
        })?;
        let choice = arguments
            .get("choice")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|choice| !choice.is_empty())
            .ok_or_else(|| fail("select_choice call is missing a choice".into()))?;
        let grade = self.choice_scores.get(choice).copied().ok_or_else(|| {
            let known: Vec<&str> = self.choice_scores.keys().map(String::as_str).collect();
            fail(format!("Unknown choice {choice:?}; expected one of {known:?}"))
        })?;

        let mut score = Score::new(self.name.clone(), grade).with_metadata("choice", choice);
        if let Some(rationale) = rationale(&arguments) {
            score = score.with_metadata("rationale", rationale);
        }
        Ok(score)
    }
}

fn rationale(arguments: &Value) -> Option<String> {
    match arguments.get("reasons")? {
        Value::String(reasons) => Some(reasons.clone()),
        Value::Array(reasons) => Some(
            reasons
                .iter()
                .map(|r| r.as_str().map_or_else(|| r.to_string(), str::to_string))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        _ => None,
    }
}

#[async_trait]
impl Scorer for OpenAiClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, args: ScorerArgs) -> Result<Score> {
        let config = self.config.clone().unwrap_or_else(current_config);
        let request = self.build_request(&args, &config)?;
        let client = resolve_client(self.client.as_ref(), &config)?;
        tracing::debug!(scorer = %self.name, model = %request.model, "requesting classification");

        let cache = self.cache.as_ref().or(config.cache());
        let response = run_completion(&client, cache, request).await?;
        self.parse_response(&response)
    }
}

/// Classifier built from a single user prompt template.
///
/// The prompt is followed by an instruction to call `select_choice` with one
/// of the `choice_scores` labels, with step-by-step reasoning when
/// chain-of-thought is on.
#[derive(Clone)]
pub struct LlmClassifier {
    inner: OpenAiClassifier,
}

impl LlmClassifier {
    pub fn builder(
        name: impl Into<String>,
        prompt_template: impl Into<String>,
        choice_scores: ChoiceScores,
    ) -> LlmClassifierBuilder {
        LlmClassifierBuilder {
            name: name.into(),
            prompt_template: prompt_template.into(),
            choice_scores,
            use_cot: true,
            model: None,
            max_tokens: 512,
            temperature: 0.0,
            reasoning_effort: None,
            render_args: Map::new(),
            client: None,
            config: None,
            cache: None,
        }
    }

    pub fn classifier(&self) -> &OpenAiClassifier {
        &self.inner
    }
}

#[async_trait]
impl Scorer for LlmClassifier {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn score(&self, args: ScorerArgs) -> Result<Score> {
        self.inner.score(args).await
    }
}

pub struct LlmClassifierBuilder {
    name: String,
    prompt_template: String,
    choice_scores: ChoiceScores,
    use_cot: bool,
    model: Option<String>,
    max_tokens: u32,
    temperature: f32,
    reasoning_effort: Option<String>,
    render_args: Map<String, Value>,
    client: Option<ClientHandle>,
    config: Option<Arc<EvalConfig>>,
    cache: Option<Arc<dyn ResponseCache>>,
}

impl LlmClassifierBuilder {
    pub fn use_cot(mut self, use_cot: bool) -> Self {
        self.use_cot = use_cot;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn reasoning_effort(mut self, effort: impl Into<String>) -> Self {
        self.reasoning_effort = Some(effort.into());
        self
    }

    pub fn render_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.render_args.insert(key.into(), value.into());
        self
    }

    pub fn client(mut self, client: ClientHandle) -> Self {
        self.client = Some(client);
        self
    }

    pub fn config(mut self, config: Arc<EvalConfig>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> Result<LlmClassifier> {
        let choices: Vec<String> = self.choice_scores.keys().cloned().collect();
        let prompt = format!("{}\n{}", self.prompt_template, suffix(self.use_cot));
        let tools = build_classification_tools(self.use_cot, &choices);

        let mut inner = OpenAiClassifier::new(
            self.name,
            vec![ChatMessage::user(prompt)],
            self.choice_scores,
            tools,
        )?
        .with_max_tokens(self.max_tokens)
        .with_temperature(self.temperature);
        inner.render_args = self.render_args;
        inner.render_args.insert("__choices".into(), Value::from(choices));
        inner.model = self.model;
        inner.reasoning_effort = self.reasoning_effort;
        inner.client = self.client;
        inner.config = self.config;
        inner.cache = self.cache;
        Ok(LlmClassifier { inner })
    }
}
