//! Weighted combination of scorers.

use async_trait::async_trait;
use autoevals_core::{EvalError, Result, Score, Scorer, ScorerArgs};
use futures::future::try_join_all;
use serde_json::json;
use std::sync::Arc;

/// Weighted mean of several scorers run on the same arguments.
///
/// Sub-scorers with a positive weight run concurrently; zero-weight parts are
/// never called. The first failure is returned as-is; a skipped sub-score
/// makes the whole result skipped. Sub-scores are kept in the `scores`
/// metadata either way.
#[derive(Clone)]
pub struct Weighted {
    name: String,
    parts: Vec<(Arc<dyn Scorer>, f64)>,
}

impl Weighted {
    /// Weights must be finite and non-negative with at least one above zero.
    pub fn new(name: impl Into<String>, parts: Vec<(Arc<dyn Scorer>, f64)>) -> Result<Self> {
        let name = name.into();
        if let Some((scorer, weight)) = parts.iter().find(|(_, w)| !w.is_finite() || *w < 0.0) {
            return Err(EvalError::InvalidArgument(format!(
                "{name}: weight {weight} for {} must be a non-negative number",
                scorer.name()
            )));
        }
        if !parts.iter().any(|(_, w)| *w > 0.0) {
            return Err(EvalError::InvalidArgument(format!("{name}: at least one weight must be positive")));
        }
        Ok(Self { name, parts })
    }
}

impl Weighted {
    /// Run every positive-weight part, returning each score with its weight.
    pub async fn score_parts(&self, args: &ScorerArgs) -> Result<Vec<(Score, f64)>> {
        let active: Vec<_> = self.parts.iter().filter(|(_, weight)| *weight > 0.0).collect();
        let scores = try_join_all(active.iter().map(|(scorer, _)| scorer.score(args.clone()))).await?;
        Ok(scores.into_iter().zip(active).map(|(score, (_, weight))| (score, *weight)).collect())
    }

    /// Weighted mean of already computed parts.
    pub fn combine(&self, parts: &[(Score, f64)]) -> Score {
        let details: Vec<_> = parts
            .iter()
            .map(|(score, weight)| json!({"name": score.name, "score": score.score, "weight": weight}))
            .collect();

        let mut total = 0.0;
        let mut weights = 0.0;
        for (score, weight) in parts {
            let Some(value) = score.score else {
                tracing::debug!(scorer = %self.name, part = %score.name, "sub-score skipped");
                return Score::skipped(self.name.clone()).with_metadata("scores", details);
            };
            total += value * weight;
            weights += weight;
        }
        Score::new(self.name.clone(), total / weights).with_metadata("scores", details)
    }
}

#[async_trait]
impl Scorer for Weighted {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, args: ScorerArgs) -> Result<Score> {
        let parts = self.score_parts(&args).await?;
        Ok(self.combine(&parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::number::NumericDiff;
    use crate::string::Levenshtein;
    use crate::value::ExactMatch;
    use serde_json::{Value, json};

    fn part(scorer: impl Scorer + 'static, weight: f64) -> (Arc<dyn Scorer>, f64) {
        (Arc::new(scorer), weight)
    }

    struct Skips;

    #[async_trait]
    impl Scorer for Skips {
        fn name(&self) -> &str {
            "Skips"
        }

        async fn score(&self, _args: ScorerArgs) -> Result<Score> {
            Ok(Score::skipped(self.name()))
        }
    }

    #[tokio::test]
    async fn test_weighted_mean() {
        let scorer = Weighted::new("Combined", vec![part(ExactMatch, 3.0), part(Levenshtein, 1.0)]).unwrap();
        let score = scorer.eval(json!("abcd"), json!("abce")).await.unwrap();
        assert!((score.score.unwrap() - 0.75 / 4.0).abs() < 1e-9);
        assert_eq!(score.metadata["scores"][0]["name"], json!("ExactMatch"));
    }

    #[tokio::test]
    async fn test_sub_failure_propagates() {
        let scorer = Weighted::new("Combined", vec![part(NumericDiff, 1.0), part(ExactMatch, 1.0)]).unwrap();
        let err = scorer.eval(json!("not a number"), json!(1)).await.unwrap_err();
        assert!(matches!(err, EvalError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_skipped_part_skips_aggregate() {
        let scorer = Weighted::new("Combined", vec![part(ExactMatch, 1.0), part(Skips, 1.0)]).unwrap();
        let score = scorer.eval(json!("a"), json!("a")).await.unwrap();
        assert!(score.is_skipped());
        assert_eq!(score.metadata["scores"][1]["score"], Value::Null);
    }

    #[tokio::test]
    async fn test_zero_weight_part_is_not_run() {
        let scorer = Weighted::new("Combined", vec![part(ExactMatch, 1.0), part(NumericDiff, 0.0)]).unwrap();
        let score = scorer.eval(json!("not a number"), json!("not a number")).await.unwrap();
        assert_eq!(score.score, Some(1.0));
        assert_eq!(score.metadata["scores"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_weights_validated() {
        assert!(Weighted::new("w", vec![part(ExactMatch, 0.0)]).is_err());
        assert!(Weighted::new("w", vec![part(ExactMatch, -1.0), part(Levenshtein, 1.0)]).is_err());
        assert!(Weighted::new("w", vec![]).is_err());
    }
}
