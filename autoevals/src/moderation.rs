use crate::client::{resolve_client, run_moderation};
use crate::config::{EvalConfig, current_config};
use crate::util::value_as_text;
use async_trait::async_trait;
use autoevals_core::{
    ClientHandle, EvalError, ModerationRequest, ModerationResult, Result, Score, Scorer, ScorerArgs,
};
use serde_json::{Value, json};
use std::sync::Arc;

/// Content moderation check on `output`; `expected` is ignored.
///
/// Without a threshold the provider's `flagged` verdict decides (flagged
/// scores 0). With a threshold, any category score above it scores 0.
#[derive(Clone, Default)]
pub struct Moderation {
    threshold: Option<f64>,
    client: Option<ClientHandle>,
    config: Option<Arc<EvalConfig>>,
}

impl Moderation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
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

    pub fn compute_score(result: &ModerationResult, threshold: Option<f64>) -> f64 {
        let exceeded = match threshold {
            None => result.flagged,
            Some(threshold) => result.category_scores.values().any(|score| *score > threshold),
        };
        if exceeded { 0.0 } else { 1.0 }
    }
}

#[async_trait]
impl Scorer for Moderation {
    fn name(&self) -> &str {
        "Moderation"
    }

    async fn score(&self, args: ScorerArgs) -> Result<Score> {
        let config = self.config.clone().unwrap_or_else(current_config);
        let client = resolve_client(self.client.as_ref(), &config)?;
        let request = ModerationRequest { input: value_as_text(&args.output), model: None };
        let response = run_moderation(&client, config.cache(), request).await?;
        let result = response
            .results
            .first()
            .ok_or_else(|| EvalError::Upstream("moderation response contained no results".into()))?;

        Ok(Score::new(self.name(), Self::compute_score(result, self.threshold))
            .with_metadata("threshold", self.threshold.map_or(Value::Null, Value::from))
            .with_metadata("category_scores", json!(result.category_scores)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoevals_core::ModerationResponse;
    use autoevals_model::MockClient;
    use std::collections::BTreeMap;

    fn result(flagged: bool, violence: f64) -> ModerationResult {
        ModerationResult {
            flagged,
            categories: BTreeMap::new(),
            category_scores: BTreeMap::from([("violence".to_string(), violence)]),
        }
    }

    #[test]
    fn test_compute_score() {
        assert_eq!(Moderation::compute_score(&result(true, 0.2), None), 0.0);
        assert_eq!(Moderation::compute_score(&result(false, 0.2), None), 1.0);
        assert_eq!(Moderation::compute_score(&result(false, 0.6), Some(0.5)), 0.0);
        assert_eq!(Moderation::compute_score(&result(true, 0.4), Some(0.5)), 1.0);
    }

    #[tokio::test]
    async fn test_moderation_scorer_metadata() {
        let mock = MockClient::new("mock")
            .with_moderation(ModerationResponse { results: vec![result(true, 0.9)] });
        let scorer = Moderation::new()
            .with_client(ClientHandle::new(Arc::new(mock)))
            .with_config(Arc::new(EvalConfig::default()));

        let score = scorer.score(ScorerArgs::new("some text")).await.unwrap();
        assert_eq!(score.score, Some(0.0));
        assert_eq!(score.metadata["threshold"], Value::Null);
        assert_eq!(score.metadata["category_scores"]["violence"], json!(0.9));
    }
}
