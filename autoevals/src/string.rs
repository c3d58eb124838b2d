//! String scorers: edit distance and embedding similarity.

use crate::client::{resolve_client, run_embedding};
use crate::config::{EvalConfig, current_config};
use crate::util::{normalize_value, value_as_text};
use async_trait::async_trait;
use autoevals_core::{
    ClientHandle, EmbeddingRequest, EvalError, Result, Score, Scorer, ScorerArgs,
};
use moka::sync::Cache;
use serde_json::Value;
use std::sync::Arc;

/// Normalized edit distance: `1 - distance / max(len)` over Unicode scalar
/// values. Two empty strings score 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct Levenshtein;

impl Levenshtein {
    pub fn new() -> Self {
        Self
    }

    pub fn similarity(a: &str, b: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let max_len = a.len().max(b.len());
        if max_len == 0 {
            return 1.0;
        }
        1.0 - levenshtein_distance(&a, &b) as f64 / max_len as f64
    }
}

/// Edit distance with a single rolling row.
pub(crate) fn levenshtein_distance(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            let next = (row[j + 1] + 1).min(row[j] + 1).min(diagonal + cost);
            diagonal = row[j + 1];
            row[j + 1] = next;
        }
    }
    row[b.len()]
}

#[async_trait]
impl Scorer for Levenshtein {
    fn name(&self) -> &str {
        "Levenshtein"
    }

    async fn score(&self, args: ScorerArgs) -> Result<Score> {
        let expected = args.require_expected(self.name())?;
        let value = Self::similarity(&value_as_text(&args.output), &value_as_text(expected));
        Ok(Score::new(self.name(), value))
    }
}

/// Cosine similarity, capped at 1 to absorb rounding. Zero-magnitude vectors
/// score 0.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let magnitude_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let magnitude_b = b.iter().map(|y| y * y).sum::<f64>().sqrt();
    let denominator = magnitude_a * magnitude_b;
    if denominator == 0.0 {
        return 0.0;
    }
    (dot / denominator).min(1.0)
}

/// Rescale a similarity so that `expected_min` maps to 0 and 1 stays 1.
pub fn scale_score(score: f64, expected_min: f64) -> f64 {
    if expected_min >= 1.0 {
        return if score >= 1.0 { 1.0 } else { 0.0 };
    }
    ((score - expected_min) / (1.0 - expected_min)).clamp(0.0, 1.0)
}

/// Embeddings kept per [`EmbeddingSimilarity`] instance unless configured
/// otherwise.
pub const DEFAULT_MEMO_CAPACITY: u64 = 1024;

/// Semantic similarity of two strings via an embedding model.
///
/// Both sides are embedded as `prefix + value` concurrently; the cosine
/// similarity is rescaled by [`scale_score`]. Embeddings are memoized per
/// instance in a bounded cache keyed by model and input text (clones share
/// the memo), so a change of default embedding model misses the memo.
#[derive(Clone)]
pub struct EmbeddingSimilarity {
    prefix: String,
    model: Option<String>,
    expected_min: f64,
    client: Option<ClientHandle>,
    config: Option<Arc<EvalConfig>>,
    memo: Cache<(String, String), Arc<Vec<f64>>>,
}

impl Default for EmbeddingSimilarity {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            model: None,
            expected_min: 0.7,
            client: None,
            config: None,
            memo: Cache::new(DEFAULT_MEMO_CAPACITY),
        }
    }
}

impl EmbeddingSimilarity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_expected_min(mut self, expected_min: f64) -> Self {
        self.expected_min = expected_min;
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

    /// Bound the memo to `capacity` embeddings. Replaces any memo shared
    /// with clones.
    pub fn with_memo_capacity(mut self, capacity: u64) -> Self {
        self.memo = Cache::new(capacity);
        self
    }

    pub fn expected_min(&self) -> f64 {
        self.expected_min
    }

    async fn embed(&self, value: &Value, client: &ClientHandle, config: &EvalConfig) -> Result<Arc<Vec<f64>>> {
        let model = self.model.as_deref().unwrap_or(config.default_embedding_model());
        let input = format!("{}{}", self.prefix, normalize_value(value, false));
        let key = (model.to_string(), input);
        if let Some(hit) = self.memo.get(&key) {
            return Ok(hit);
        }

        let request = EmbeddingRequest::new(model, key.1.clone());
        let response = run_embedding(client, config.cache(), request).await?;
        let vector = response
            .first_vector()
            .ok_or_else(|| EvalError::Upstream("embedding response contained no vectors".into()))?
            .to_vec();

        let vector = Arc::new(vector);
        self.memo.insert(key, vector.clone());
        Ok(vector)
    }

    /// Similarity between two values, without building a [`Score`].
    pub async fn similarity(&self, output: &Value, expected: &Value) -> Result<f64> {
        let config = self.config.clone().unwrap_or_else(current_config);
        let client = resolve_client(self.client.as_ref(), &config)?;
        let (a, b) = futures::try_join!(
            self.embed(output, &client, &config),
            self.embed(expected, &client, &config)
        )?;
        Ok(scale_score(cosine_similarity(&a, &b), self.expected_min))
    }
}

#[async_trait]
impl Scorer for EmbeddingSimilarity {
    fn name(&self) -> &str {
        "EmbeddingSimilarity"
    }

    async fn score(&self, args: ScorerArgs) -> Result<Score> {
        let expected = args.require_expected(self.name())?;
        let value = self.similarity(&args.output, expected).await?;
        Ok(Score::new(self.name(), value))
    }
}
