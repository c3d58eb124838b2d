use async_trait::async_trait;
use autoevals_core::{
    CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse, EvalError,
    FunctionCall, LlmClient, ModerationRequest, ModerationResponse, Result, ToolCall,
};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Scripted client for tests.
///
/// Completions are served in the order they were added; the last one is
/// repeated once the script runs out. Embeddings are looked up by input text.
/// Every request is recorded.
#[derive(Default)]
pub struct MockClient {
    name: String,
    completions: Mutex<VecDeque<CompletionResponse>>,
    embeddings: HashMap<String, Vec<f64>>,
    moderation: Option<ModerationResponse>,
    fail_with: Option<String>,
    completion_log: Mutex<Vec<CompletionRequest>>,
    embedding_log: Mutex<Vec<EmbeddingRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockClient {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn with_completion(self, response: CompletionResponse) -> Self {
        lock(&self.completions).push_back(response);
        self
    }

    /// Script a completion that calls `name` with JSON `arguments`.
    pub fn with_tool_call(self, name: &str, arguments: Value) -> Self {
        self.with_completion(CompletionResponse::with_tool_calls(vec![tool_call(name, arguments)]))
    }

    pub fn with_embedding(mut self, input: impl Into<String>, vector: Vec<f64>) -> Self {
        self.embeddings.insert(input.into(), vector);
        self
    }

    pub fn with_moderation(mut self, response: ModerationResponse) -> Self {
        self.moderation = Some(response);
        self
    }

    /// Make every call fail with an upstream error carrying `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    pub fn completion_requests(&self) -> Vec<CompletionRequest> {
        lock(&self.completion_log).clone()
    }

    pub fn embedding_requests(&self) -> Vec<EmbeddingRequest> {
        lock(&self.embedding_log).clone()
    }

    fn check_failure(&self) -> Result<()> {
        match &self.fail_with {
            Some(message) => Err(EvalError::Upstream(message.clone())),
            None => Ok(()),
        }
    }
}

/// Build a function tool call with JSON-encoded arguments.
pub fn tool_call(name: &str, arguments: Value) -> ToolCall {
    ToolCall {
        id: Some(format!("call_{name}")),
        kind: "function".to_string(),
        function: FunctionCall { name: name.to_string(), arguments: arguments.to_string() },
    }
}

#[async_trait]
impl LlmClient for MockClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        lock(&self.completion_log).push(request);
        self.check_failure()?;
        let mut script = lock(&self.completions);
        let response = if script.len() > 1 { script.pop_front() } else { script.front().cloned() };
        response.ok_or_else(|| EvalError::Upstream(format!("{} has no scripted completion", self.name)))
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        lock(&self.embedding_log).push(request.clone());
        self.check_failure()?;
        self.embeddings
            .get(&request.input)
            .map(|vector| EmbeddingResponse::from_vector(vector.clone()))
            .ok_or_else(|| {
                EvalError::Upstream(format!("{} has no embedding for {:?}", self.name, request.input))
            })
    }

    async fn moderate(&self, _request: ModerationRequest) -> Result<ModerationResponse> {
        self.check_failure()?;
        self.moderation
            .clone()
            .ok_or_else(|| EvalError::Unsupported(format!("{} has no scripted moderation", self.name)))
    }
}
