//! Metrics grading a generated answer.

use super::{ForcedTool, ToolModel, context_text, prompt_vars};
use crate::composite::Weighted;
use crate::config::EvalConfig;
use crate::string::EmbeddingSimilarity;
use crate::util::value_as_text;
use async_trait::async_trait;
use autoevals_core::{ClientHandle, Result, Score, Scorer, ScorerArgs};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

const STATEMENTS_PROMPT: &str = r#"Break the answer to the question into short, self-contained statements. Create one or more statements from each sentence.

question: {{question}}
answer: {{answer}}"#;

fn statements_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "statements": {
                "description": "List of extracted statements",
                "type": "array",
                "items": {"type": "string"}
            }
        },
        "required": ["statements"]
    })
}

const EXTRACT_STATEMENTS: ForcedTool = ForcedTool {
    name: "extract_statements",
    description: "Extract statements from an answer given a question",
    schema: statements_schema,
};

const FAITHFULNESS_PROMPT: &str = r#"Judge the faithfulness of each statement to the context. For each statement return the verdict 1 if it can be verified from the context and 0 if it cannot, with a reason. Repeat each statement word for word.

context: {{context}}
statements: {{statements}}"#;

fn faithfulness_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "faithfulness": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "statement": {"description": "The original statement, word-for-word", "type": "string"},
                        "verdict": {"description": "The verdict (0/1) of the faithfulness.", "type": "integer"},
                        "reason": {"description": "The reason for the verdict", "type": "string"}
                    },
                    "required": ["statement", "verdict", "reason"]
                }
            }
        },
        "required": ["faithfulness"]
    })
}

const JUDGE_STATEMENTS: ForcedTool = ForcedTool {
    name: "judge_statements",
    description: "Judge whether the statements are faithful to the context",
    schema: faithfulness_schema,
};

#[derive(Debug, Deserialize)]
struct Statements {
    statements: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StatementVerdict {
    statement: String,
    verdict: i64,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
struct Verdicts {
    faithfulness: Vec<StatementVerdict>,
}

/// Factual consistency of the answer with the context.
///
/// The answer is split into statements, then each statement is judged
/// against the context; the score is the share judged faithful. Requires
/// `input`, `output` and `context`. An answer without statements yields a
/// skipped score and no second call.
#[derive(Clone, Default)]
pub struct Faithfulness {
    llm: ToolModel,
}

impl Faithfulness {
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
impl Scorer for Faithfulness {
    fn name(&self) -> &str {
        "Faithfulness"
    }

    async fn score(&self, args: ScorerArgs) -> Result<Score> {
        let question = value_as_text(args.require(self.name(), "input")?);
        let answer = value_as_text(args.require(self.name(), "output")?);
        let context = context_text(args.require(self.name(), "context")?);

        let resolved = self.llm.resolve()?;
        let vars = prompt_vars([("question", Value::String(question)), ("answer", Value::String(answer))]);
        let extracted: Statements =
            resolved.call_tool(&EXTRACT_STATEMENTS, STATEMENTS_PROMPT, &vars, 0.0).await?;
        if extracted.statements.is_empty() {
            return Ok(Score::skipped(self.name()).with_metadata("statements", json!([])));
        }

        let vars = prompt_vars([
            ("context", Value::String(context)),
            ("statements", json!(extracted.statements)),
        ]);
        let judged: Verdicts = resolved.call_tool(&JUDGE_STATEMENTS, FAITHFULNESS_PROMPT, &vars, 0.0).await?;

        let verdicts = &judged.faithfulness;
        let score = if verdicts.is_empty() {
            Score::skipped(self.name())
        } else {
            let faithful: i64 = verdicts.iter().map(|v| v.verdict).sum();
            Score::try_new(self.name(), faithful as f64 / verdicts.len() as f64)?
        };
        Ok(score
            .with_metadata("statements", json!(extracted.statements))
            .with_metadata("faithfulness", json!(verdicts)))
    }
}

const QUESTION_GEN_PROMPT: &str = r#"Generate a question that the given answer responds to, and decide whether the answer is noncommittal. Give noncommittal as 1 if the answer is evasive, vague or ambiguous (for example "I don't know" or "I'm not sure") and 0 otherwise.

answer: {{answer}}
context: {{context}}"#;

fn question_gen_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "question": {"type": "string"},
            "noncommittal": {"type": "integer"}
        },
        "required": ["question", "noncommittal"]
    })
}

const GENERATE_QUESTION: ForcedTool = ForcedTool {
    name: "generate_question",
    description: "Generate a question for the given answer and identify if the answer is noncommittal",
    schema: question_gen_schema,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeneratedQuestion {
    question: String,
    noncommittal: i64,
}

/// How well the answer addresses the question.
///
/// The model generates `strictness` questions the answer could be
/// responding to (concurrently, at `temperature`); the score is the mean
/// embedding similarity between those questions and the real one, or 0 when
/// any generation flags the answer as noncommittal. Requires `input`,
/// `output` and `context`.
#[derive(Clone)]
pub struct AnswerRelevancy {
    llm: ToolModel,
    embedding: EmbeddingSimilarity,
    strictness: usize,
    temperature: f32,
}

impl Default for AnswerRelevancy {
    fn default() -> Self {
        Self {
            llm: ToolModel::default(),
            embedding: EmbeddingSimilarity::new(),
            strictness: 3,
            temperature: 0.5,
        }
    }
}

impl AnswerRelevancy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of questions generated per call; at least 1.
    pub fn with_strictness(mut self, strictness: usize) -> Self {
        self.strictness = strictness.max(1);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Completion model used for question generation.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.llm.set_model(model.into());
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding = self.embedding.with_model(model);
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
}

#[async_trait]
impl Scorer for AnswerRelevancy {
    fn name(&self) -> &str {
        "AnswerRelevancy"
    }

    async fn score(&self, args: ScorerArgs) -> Result<Score> {
        let question = args.require(self.name(), "input")?.clone();
        let answer = value_as_text(args.require(self.name(), "output")?);
        let context = context_text(args.require(self.name(), "context")?);

        let resolved = self.llm.resolve()?;
        let vars = prompt_vars([("answer", Value::String(answer)), ("context", Value::String(context))]);
        let generated: Vec<GeneratedQuestion> = try_join_all((0..self.strictness).map(|_| {
            resolved.call_tool(&GENERATE_QUESTION, QUESTION_GEN_PROMPT, &vars, self.temperature)
        }))
        .await?;

        let similarity: Vec<f64> = if generated.iter().any(|q| q.noncommittal != 0) {
            Vec::new()
        } else {
            let questions: Vec<Value> = generated.iter().map(|q| Value::String(q.question.clone())).collect();
            try_join_all(questions.iter().map(|q| self.embedding.similarity(q, &question))).await?
        };
        let value = if similarity.is_empty() {
            0.0
        } else {
            similarity.iter().sum::<f64>() / generated.len() as f64
        };

        Ok(Score::new(self.name(), value)
            .with_metadata("questions", json!(generated))
            .with_metadata("similarity", json!(similarity))
            .with_metadata("temperature", json!(self.temperature)))
    }
}

/// Embedding similarity between an answer and the reference answer, without
/// a similarity floor.
#[derive(Clone)]
pub struct AnswerSimilarity {
    inner: EmbeddingSimilarity,
}

impl Default for AnswerSimilarity {
    fn default() -> Self {
        Self { inner: EmbeddingSimilarity::new().with_expected_min(0.0) }
    }
}

impl AnswerSimilarity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.inner = self.inner.with_model(model);
        self
    }

    pub fn with_client(mut self, client: ClientHandle) -> Self {
        self.inner = self.inner.with_client(client);
        self
    }

    pub fn with_config(mut self, config: Arc<EvalConfig>) -> Self {
        self.inner = self.inner.with_config(config);
        self
    }
}

#[async_trait]
impl Scorer for AnswerSimilarity {
    fn name(&self) -> &str {
        "AnswerSimilarity"
    }

    async fn score(&self, args: ScorerArgs) -> Result<Score> {
        let expected = args.require_expected(self.name())?;
        let value = self.inner.similarity(&args.output, expected).await?;
        Ok(Score::new(self.name(), value))
    }
}

const CORRECTNESS_PROMPT: &str = r#"Given a ground truth and an answer, classify each statement into exactly one category:

- TP (true positive): statements present in both the answer and the ground truth,
- FP (false positive): statements present in the answer but not in the ground truth,
- FN (false negative): relevant statements in the ground truth that the answer omits.

Compare only the presence of statements; do not interpret them.

question: {{question}}
answer: {{answer}}
ground_truth: {{ground_truth}}"#;

fn correctness_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "TP": {"type": "array", "items": {"type": "string"}},
            "FP": {"type": "array", "items": {"type": "string"}},
            "FN": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["TP", "FP", "FN"]
    })
}

const CLASSIFY_STATEMENTS: ForcedTool = ForcedTool {
    name: "classify_statements",
    description: "Classify statements as TP, FP, or FN",
    schema: correctness_schema,
};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
struct StatementClasses {
    tp: Vec<String>,
    fp: Vec<String>,
    #[serde(rename = "FN")]
    fn_: Vec<String>,
}

/// F1 over classified statements: `tp / (tp + (fp + fn) / 2)`, and 0 when
/// there are no true positives.
pub fn compute_f1_score(tp: usize, fp: usize, fn_: usize) -> f64 {
    if tp == 0 {
        return 0.0;
    }
    tp as f64 / (tp as f64 + 0.5 * (fp + fn_) as f64)
}

const FACTUALITY_PART: &str = "AnswerFactuality";

/// The statement-level F1 half of [`AnswerCorrectness`].
#[derive(Clone, Default)]
struct AnswerFactuality {
    llm: ToolModel,
}

#[async_trait]
impl Scorer for AnswerFactuality {
    fn name(&self) -> &str {
        FACTUALITY_PART
    }

    async fn score(&self, args: ScorerArgs) -> Result<Score> {
        let vars = prompt_vars([
            ("question", Value::String(value_as_text(args.require(self.name(), "input")?))),
            ("answer", Value::String(value_as_text(&args.output))),
            ("ground_truth", Value::String(value_as_text(args.require_expected(self.name())?))),
        ]);
        let resolved = self.llm.resolve()?;
        let classes: StatementClasses =
            resolved.call_tool(&CLASSIFY_STATEMENTS, CORRECTNESS_PROMPT, &vars, 0.0).await?;
        let f1 = compute_f1_score(classes.tp.len(), classes.fp.len(), classes.fn_.len());
        Ok(Score::new(self.name(), f1).with_metadata("factuality", json!(classes)))
    }
}

/// Weighted blend of statement-level F1 against the reference answer and
/// answer similarity.
///
/// Weights default to 0.75 (factuality) and 0.25 (similarity); both must be
/// non-negative and at least one positive. A zero-weight part is not run.
/// Requires `input`, `output` and `expected`.
#[derive(Clone)]
pub struct AnswerCorrectness {
    factuality: AnswerFactuality,
    similarity: AnswerSimilarity,
    custom_similarity: Option<Arc<dyn Scorer>>,
    factuality_weight: f64,
    answer_similarity_weight: f64,
}

impl Default for AnswerCorrectness {
    fn default() -> Self {
        Self {
            factuality: AnswerFactuality::default(),
            similarity: AnswerSimilarity::new(),
            custom_similarity: None,
            factuality_weight: 0.75,
            answer_similarity_weight: 0.25,
        }
    }
}

impl AnswerCorrectness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set both weights, rejecting negative, non-finite or all-zero weights.
    pub fn with_weights(mut self, factuality: f64, answer_similarity: f64) -> Result<Self> {
        self.factuality_weight = factuality;
        self.answer_similarity_weight = answer_similarity;
        self.weighted()?;
        Ok(self)
    }

    /// Replace the default [`AnswerSimilarity`] part.
    pub fn with_answer_similarity(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.custom_similarity = Some(scorer);
        self
    }

    /// Completion model used for statement classification.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.factuality.llm.set_model(model.into());
        self
    }

    pub fn with_client(mut self, client: ClientHandle) -> Self {
        self.factuality.llm.set_client(client.clone());
        self.similarity = self.similarity.with_client(client);
        self
    }

    pub fn with_config(mut self, config: Arc<EvalConfig>) -> Self {
        self.factuality.llm.set_config(config.clone());
        self.similarity = self.similarity.with_config(config);
        self
    }

    fn weighted(&self) -> Result<Weighted> {
        let similarity = self
            .custom_similarity
            .clone()
            .unwrap_or_else(|| Arc::new(self.similarity.clone()) as Arc<dyn Scorer>);
        Weighted::new(
            "AnswerCorrectness",
            vec![
                (Arc::new(self.factuality.clone()) as Arc<dyn Scorer>, self.factuality_weight),
                (similarity, self.answer_similarity_weight),
            ],
        )
    }
}

#[async_trait]
impl Scorer for AnswerCorrectness {
    fn name(&self) -> &str {
        "AnswerCorrectness"
    }

    async fn score(&self, args: ScorerArgs) -> Result<Score> {
        args.require(self.name(), "input")?;
        args.require(self.name(), "output")?;
        args.require_expected(self.name())?;

        let weighted = self.weighted()?;
        let parts = weighted.score_parts(&args).await?;
        let mut score = weighted.combine(&parts);

        let (factuality, similarity): (Vec<_>, Vec<_>) =
            parts.iter().map(|(part, _)| part).partition(|part| part.name == FACTUALITY_PART);
        if let Some(part) = factuality.first() {
            score = score
                .with_metadata("factuality", part.metadata.get("factuality").cloned().unwrap_or(Value::Null))
                .with_metadata("factuality_score", json!(part.score));
        }
        let similarity_score = similarity.first().and_then(|part| part.score);
        Ok(score.with_metadata("answer_similarity_score", json!(similarity_score)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoevals_core::EvalError;
    use autoevals_model::MockClient;

    fn config() -> Arc<EvalConfig> {
        Arc::new(EvalConfig::default())
    }

    fn answer_args() -> ScorerArgs {
        ScorerArgs::new("Paris is the capital of France and has the Louvre.")
            .with_expected("Paris is the capital of France.")
            .with_arg("input", "What is the capital of France?")
            .with_arg("context", "Paris is the capital and largest city of France.")
    }

    #[test]
    fn test_f1_score() {
        assert_eq!(compute_f1_score(0, 0, 0), 0.0);
        assert_eq!(compute_f1_score(2, 0, 0), 1.0);
        assert!((compute_f1_score(1, 1, 1) - 0.5).abs() < 1e-12);
        assert!((compute_f1_score(1, 2, 5) - 0.2).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_faithfulness_judges_extracted_statements() {
        let mock = Arc::new(
            MockClient::new("mock")
                .with_tool_call(
                    "extract_statements",
                    json!({"statements": ["Paris is the capital of France.", "Paris has the Louvre."]}),
                )
                .with_tool_call(
                    "judge_statements",
                    json!({"faithfulness": [
                        {"statement": "Paris is the capital of France.", "verdict": 1, "reason": "stated"},
                        {"statement": "Paris has the Louvre.", "verdict": 0, "reason": "not mentioned"}
                    ]}),
                ),
        );
        let scorer = Faithfulness::new().with_client(ClientHandle::new(mock.clone())).with_config(config());
        let score = scorer.score(answer_args()).await.unwrap();

        assert_eq!(score.score, Some(0.5));
        assert_eq!(score.metadata["faithfulness"][1]["reason"], json!("not mentioned"));

        let requests = mock.completion_requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].messages[0].content.contains("answer: Paris is the capital of France and has the Louvre."));
        assert!(requests[1].messages[0].content.contains("Paris has the Louvre."));
        assert_eq!(requests[1].tool_choice.as_ref().and_then(|c| c.forced_function()), Some("judge_statements"));
    }

    #[tokio::test]
    async fn test_faithfulness_without_statements_skips_judging() {
        let mock = Arc::new(MockClient::new("mock").with_tool_call("extract_statements", json!({"statements": []})));
        let scorer = Faithfulness::new().with_client(ClientHandle::new(mock.clone())).with_config(config());
        let score = scorer.score(answer_args()).await.unwrap();
        assert!(score.is_skipped());
        assert_eq!(mock.completion_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_answer_relevancy_averages_generated_questions() {
        let mock = Arc::new(
            MockClient::new("mock")
                .with_tool_call("generate_question", json!({"question": "Capital of France?", "noncommittal": 0}))
                .with_embedding("Capital of France?", vec![1.0, 0.0])
                .with_embedding("What is the capital of France?", vec![1.0, 0.0]),
        );
        let scorer = AnswerRelevancy::new()
            .with_strictness(2)
            .with_client(ClientHandle::new(mock.clone()))
            .with_config(config());
        let score = scorer.score(answer_args()).await.unwrap();

        assert_eq!(score.score, Some(1.0));
        assert_eq!(score.metadata["questions"].as_array().map(Vec::len), Some(2));
        let requests = mock.completion_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].temperature, Some(0.5));
    }

    #[tokio::test]
    async fn test_noncommittal_answer_scores_zero() {
        let mock = Arc::new(
            MockClient::new("mock")
                .with_tool_call("generate_question", json!({"question": "Capital?", "noncommittal": 0}))
                .with_tool_call("generate_question", json!({"question": "No idea?", "noncommittal": 1})),
        );
        let scorer = AnswerRelevancy::new()
            .with_strictness(2)
            .with_client(ClientHandle::new(mock.clone()))
            .with_config(config());
        let score = scorer.score(answer_args()).await.unwrap();

        assert_eq!(score.score, Some(0.0));
        assert!(mock.embedding_requests().is_empty());
    }

    #[tokio::test]
    async fn test_answer_similarity_has_no_floor() {
        let mock = Arc::new(
            MockClient::new("mock")
                .with_embedding("a", vec![1.0, 0.0])
                .with_embedding("b", vec![1.0, 1.0]),
        );
        let scorer = AnswerSimilarity::new().with_client(ClientHandle::new(mock)).with_config(config());
        let score = scorer.eval(json!("a"), json!("b")).await.unwrap();
        assert_eq!(score.name, "AnswerSimilarity");
        assert!((score.score.unwrap() - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-9);
    }

    fn correctness_mock() -> Arc<MockClient> {
        Arc::new(
            MockClient::new("mock")
                .with_tool_call(
                    "classify_statements",
                    json!({"TP": ["Paris is the capital of France"], "FP": ["Paris has the Louvre"], "FN": []}),
                )
                .with_embedding("Paris is the capital of France and has the Louvre.", vec![1.0, 0.0])
                .with_embedding("Paris is the capital of France.", vec![1.0, 0.0]),
        )
    }

    #[tokio::test]
    async fn test_answer_correctness_blends_f1_and_similarity() {
        let mock = correctness_mock();
        let scorer = AnswerCorrectness::new().with_client(ClientHandle::new(mock.clone())).with_config(config());
        let score = scorer.score(answer_args()).await.unwrap();

        // F1 = 1 / (1 + 0.5) and similarity 1, weighted 0.75 / 0.25.
        let f1 = 2.0 / 3.0;
        assert!((score.score.unwrap() - (0.75 * f1 + 0.25)).abs() < 1e-9);
        assert!((score.metadata["factuality_score"].as_f64().unwrap() - f1).abs() < 1e-9);
        assert_eq!(score.metadata["answer_similarity_score"], json!(1.0));
        assert_eq!(score.metadata["factuality"]["FP"], json!(["Paris has the Louvre"]));
        assert_eq!(mock.embedding_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_similarity_weight_skips_embeddings() {
        let mock = correctness_mock();
        let scorer = AnswerCorrectness::new()
            .with_weights(1.0, 0.0)
            .unwrap()
            .with_client(ClientHandle::new(mock.clone()))
            .with_config(config());
        let score = scorer.score(answer_args()).await.unwrap();

        assert!((score.score.unwrap() - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(score.metadata["answer_similarity_score"], Value::Null);
        assert!(mock.embedding_requests().is_empty());
    }

    #[test]
    fn test_answer_correctness_weights_validated() {
        let default = AnswerCorrectness::new();
        assert_eq!((default.factuality_weight, default.answer_similarity_weight), (0.75, 0.25));
        assert!(AnswerCorrectness::new().with_weights(0.0, 0.0).is_err());
        assert!(AnswerCorrectness::new().with_weights(-0.5, 1.0).is_err());
        assert!(AnswerCorrectness::new().with_weights(0.0, 1.0).is_ok());
    }

    #[tokio::test]
    async fn test_answer_correctness_requires_input_before_calls() {
        let mock = correctness_mock();
        let scorer = AnswerCorrectness::new().with_client(ClientHandle::new(mock.clone())).with_config(config());
        let err = scorer.score(ScorerArgs::new("a").with_expected("b")).await.unwrap_err();
        assert!(matches!(err, EvalError::MissingArgument { .. }));
        assert!(mock.completion_requests().is_empty());
        assert!(mock.embedding_requests().is_empty());
    }
}
