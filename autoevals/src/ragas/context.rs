//! Metrics grading the retrieved context against a question and answer.

use super::{ForcedTool, ToolModel, context_text, prompt_vars};
use crate::config::EvalConfig;
use crate::util::value_as_text;
use async_trait::async_trait;
use autoevals_core::{ClientHandle, Result, Score, Scorer, ScorerArgs};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

const SENTENCE_PROMPT: &str = r#"Extract the sentences from the context that are needed to answer the question. Copy each sentence exactly as written. If no sentence is relevant, or the question cannot be answered from the context, return an empty list.

question: {{question}}
context: {{context}}"#;

fn sentence_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "sentences": {
                "description": "List of referenced sentences",
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "sentence": {"description": "The selected sentence", "type": "string"},
                        "reasons": {
                            "description": "Reasons why the sentence is relevant. Explain your thinking step by step.",
                            "type": "array",
                            "items": {"type": "string"}
                        }
                    },
                    "required": ["sentence", "reasons"]
                }
            }
        },
        "required": ["sentences"]
    })
}

const EXTRACT_SENTENCES: ForcedTool = ForcedTool {
    name: "extract_sentences",
    description: "Extract relevant sentences from a given context",
    schema: sentence_schema,
};

#[derive(Debug, Serialize, Deserialize)]
struct RelevantSentence {
    sentence: String,
    #[serde(default)]
    reasons: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RelevantSentences {
    sentences: Vec<RelevantSentence>,
}

/// Share of the context that is relevant to the question.
///
/// The model extracts the relevant sentences; the score is their combined
/// length over the context length, in characters, capped at 1. Requires
/// `input` and `context`.
#[derive(Clone, Default)]
pub struct ContextRelevancy {
    llm: ToolModel,
}

impl ContextRelevancy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.llm.set_model(model.into());
        self
    }

    pub fn with_client(mut self, client: ClientHandle) -> Self {
        self.llm.set_client(client);
        self
    }

    pub fn with_config(mut self, config: Arc<EvalConfig>) -> Self {
        self.llm.set_config(config);
        self
    }
}

#[async_trait]
impl Scorer for ContextRelevancy {
    fn name(&self) -> &str {
        "ContextRelevancy"
    }

    async fn score(&self, args: ScorerArgs) -> Result<Score> {
        let question = value_as_text(args.require(self.name(), "input")?);
        let context = context_text(args.require(self.name(), "context")?);

        let resolved = self.llm.resolve()?;
        let vars = prompt_vars([
            ("question", Value::String(question)),
            ("context", Value::String(context.clone())),
        ]);
        let extracted: RelevantSentences =
            resolved.call_tool(&EXTRACT_SENTENCES, SENTENCE_PROMPT, &vars, 0.0).await?;

        let relevant: usize = extracted.sentences.iter().map(|s| s.sentence.chars().count()).sum();
        let total = context.chars().count();
        let value = if total == 0 { 0.0 } else { (relevant as f64 / total as f64).min(1.0) };
        Ok(Score::new(self.name(), value).with_metadata("relevant_sentences", json!(extracted.sentences)))
    }
}

const CONTEXT_RECALL_PROMPT: &str = r#"Given a context and an answer, split the answer into statements and decide for each statement whether it can be attributed to the context. Use 1 when it can and 0 when it cannot, and give a short reason.

question: {{question}}
context: {{context}}
answer: {{answer}}"#;

fn context_recall_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "statements": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "statement": {"type": "string"},
                        "attributed": {"type": "integer"},
                        "reason": {"type": "string"}
                    },
                    "required": ["statement", "attributed", "reason"]
                }
            }
        },
        "required": ["statements"]
    })
}

const ATTRIBUTE_STATEMENTS: ForcedTool = ForcedTool {
    name: "extract_statements",
    description: "Classify whether each answer statement is attributable to the context",
    schema: context_recall_schema,
};

#[derive(Debug, Serialize, Deserialize)]
struct AttributedStatement {
    statement: String,
    attributed: i64,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
struct AttributedStatements {
    statements: Vec<AttributedStatement>,
}

/// Share of the reference answer's statements that the context supports.
///
/// Requires `input`, `expected` and `context`. An answer with no statements
/// yields a skipped score.
#[derive(Clone, Default)]
pub struct ContextRecall {
    llm: ToolModel,
}

impl ContextRecall {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.llm.set_model(model.into());
        self
    }

    pub fn with_client(mut self, client: ClientHandle) -> Self {
        self.llm.set_client(client);
        self
    }

    pub fn with_config(mut self, config: Arc<EvalConfig>) -> Self {
        self.llm.set_config(config);
        self
    }
}

#[async_trait]
impl Scorer for ContextRecall {
    fn name(&self) -> &str {
        "ContextRecall"
    }

    async fn score(&self, args: ScorerArgs) -> Result<Score> {
        let question = value_as_text(args.require(self.name(), "input")?);
        let answer = value_as_text(args.require_expected(self.name())?);
        let context = context_text(args.require(self.name(), "context")?);

        let resolved = self.llm.resolve()?;
        let vars = prompt_vars([
            ("question", Value::String(question)),
            ("context", Value::String(context)),
            ("answer", Value::String(answer)),
        ]);
        let classified: AttributedStatements =
            resolved.call_tool(&ATTRIBUTE_STATEMENTS, CONTEXT_RECALL_PROMPT, &vars, 0.0).await?;

        let statements = &classified.statements;
        let score = if statements.is_empty() {
            Score::skipped(self.name())
        } else {
            let attributed: i64 = statements.iter().map(|s| s.attributed).sum();
            Score::try_new(self.name(), attributed as f64 / statements.len() as f64)?
        };
        Ok(score.with_metadata("statements", json!(statements)))
    }
}

const CONTEXT_PRECISION_PROMPT: &str = r#"Given a question, an answer and a context, verify whether the context was useful in arriving at the answer. Give the verdict 1 if it was useful and 0 if it was not, with a reason.

question: {{question}}
context: {{context}}
answer: {{answer}}"#;

fn context_precision_schema() -> Value {
    json!({
        "type": "object",
        "description": "Answer for the verification task whether the context was useful.",
        "properties": {
            "reason": {"description": "Reason for verification", "type": "string"},
            "verdict": {"description": "Binary (0/1) verdict of verification", "type": "integer"}
        },
        "required": ["reason", "verdict"]
    })
}

const VERIFY: ForcedTool = ForcedTool {
    name: "verify",
    description: "Verify whether the context was useful for the answer",
    schema: context_precision_schema,
};

#[derive(Debug, Serialize, Deserialize)]
struct Verification {
    #[serde(default)]
    reason: String,
    verdict: i64,
}

/// Whether the context was useful for reaching the reference answer: 1 or 0.
///
/// Requires `input`, `expected` and `context`. A verdict outside `{0, 1}` is
/// reported as an out-of-range score error.
#[derive(Clone, Default)]
pub struct ContextPrecision {
    llm: ToolModel,
}

impl ContextPrecision {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.llm.set_model(model.into());
        self
    }

    pub fn with_client(mut self, client: ClientHandle) -> Self {
        self.llm.set_client(client);
        self
    }

    pub fn with_config(mut self, config: Arc<EvalConfig>) -> Self {
        self.llm.set_config(config);
        self
    }
}

#[async_trait]
impl Scorer for ContextPrecision {
    fn name(&self) -> &str {
        "ContextPrecision"
    }

    async fn score(&self, args: ScorerArgs) -> Result<Score> {
        let question = value_as_text(args.require(self.name(), "input")?);
        let answer = value_as_text(args.require_expected(self.name())?);
        let context = context_text(args.require(self.name(), "context")?);

        let resolved = self.llm.resolve()?;
        let vars = prompt_vars([
            ("question", Value::String(question)),
            ("context", Value::String(context)),
            ("answer", Value::String(answer)),
        ]);
        let verification: Verification =
            resolved.call_tool(&VERIFY, CONTEXT_PRECISION_PROMPT, &vars, 0.0).await?;

        Ok(Score::try_new(self.name(), verification.verdict as f64)?
            .with_metadata("precision", json!(verification)))
    }
}
