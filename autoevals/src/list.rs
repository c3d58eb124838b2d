//! Semantic list containment via optimal pairwise matching.

use crate::assignment::maximize_assignment;
use crate::string::Levenshtein;
use async_trait::async_trait;
use autoevals_core::{EvalError, Result, Score, Scorer, ScorerArgs};
use futures::future::try_join_all;
use serde_json::{Value, json};
use std::sync::Arc;

/// How well the items of `output` cover the items of `expected`.
///
/// Every output item is compared with every expected item by the pairwise
/// scorer; the best one-to-one matching is summed and divided by
/// `len(expected)` when extra output items are allowed, or by the longer
/// length otherwise. Duplicate items are ordinary items: each copy can be
/// matched at most once.
#[derive(Clone)]
pub struct ListContains {
    pairwise_scorer: Arc<dyn Scorer>,
    allow_extra_entities: bool,
}

impl Default for ListContains {
    fn default() -> Self {
        Self { pairwise_scorer: Arc::new(Levenshtein), allow_extra_entities: false }
    }
}

impl ListContains {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pairwise_scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.pairwise_scorer = scorer;
        self
    }

    /// Do not penalize output items that match nothing in `expected`.
    pub fn with_allow_extra_entities(mut self, allow: bool) -> Self {
        self.allow_extra_entities = allow;
        self
    }

    fn items<'a>(&self, value: &'a Value, argument: &str) -> Result<&'a [Value]> {
        value.as_array().map(Vec::as_slice).ok_or_else(|| {
            EvalError::InvalidArgument(format!(
                "{} expects {argument} to be a list, got {value}",
                self.name()
            ))
        })
    }

    /// Similarity of every `(output, expected)` pair, row-major by output.
    async fn similarity_matrix(&self, output: &[Value], expected: &[Value]) -> Result<Vec<Vec<f64>>> {
        let cells = output.iter().flat_map(|o| {
            expected.iter().map(move |e| self.pairwise_scorer.eval(o.clone(), e.clone()))
        });
        let scores = try_join_all(cells).await?;
        let values: Vec<f64> = scores.iter().map(Score::value_or_zero).collect();
        Ok(values.chunks(expected.len()).map(<[f64]>::to_vec).collect())
    }

    /// Score two lists with an explicit extra-entity policy.
    pub async fn compare(
        &self,
        output: &[Value],
        expected: &[Value],
        allow_extra_entities: bool,
    ) -> Result<Score> {
        match (output.is_empty(), expected.is_empty()) {
            (true, true) => return Ok(Score::new(self.name(), 1.0)),
            (true, false) | (false, true) => return Ok(Score::new(self.name(), 0.0)),
            (false, false) => {}
        }

        let matrix = self.similarity_matrix(output, expected).await?;
        let pairs = if output.len() == 1 && expected.len() == 1 {
            vec![(0, 0)]
        } else {
            maximize_assignment(&matrix)
        };

        let total: f64 = pairs.iter().map(|&(r, c)| matrix[r][c]).sum();
        let denominator =
            if allow_extra_entities { expected.len() } else { output.len().max(expected.len()) };
        let value = (total / denominator as f64).clamp(0.0, 1.0);

        let matched: Vec<Value> = pairs
            .iter()
            .map(|&(r, c)| json!([output[r].clone(), expected[c].clone(), matrix[r][c]]))
            .collect();
        Ok(Score::new(self.name(), value).with_metadata("pairs", matched))
    }
}

#[async_trait]
impl Scorer for ListContains {
    fn name(&self) -> &str {
        "ListContains"
    }

    async fn score(&self, args: ScorerArgs) -> Result<Score> {
        let output = self.items(&args.output, "output")?;
        let expected = self.items(args.require_expected(self.name())?, "expected")?;
        let allow_extra = args
            .get("allow_extra_entities")
            .and_then(Value::as_bool)
            .unwrap_or(self.allow_extra_entities);
        self.compare(output, expected, allow_extra).await
    }
}
