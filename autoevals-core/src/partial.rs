//! Partial application for scorers.

use crate::{Result, Score, Scorer, ScorerArgs};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A scorer with some of its arguments fixed.
///
/// `Partial::new(s, fixed).score(rest)` is exactly `s.score(rest ∪ fixed)`,
/// with `fixed` taking precedence on key collisions. The wrapped scorer is
/// not modified and the partial reports the same [`Scorer::name`].
#[derive(Debug, Clone)]
pub struct Partial<S> {
    inner: S,
    fixed: Map<String, Value>,
}

impl<S: Scorer> Partial<S> {
    pub fn new(inner: S, fixed: Map<String, Value>) -> Self {
        Self { inner, fixed }
    }

    /// Fix one more argument.
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fixed.insert(key.into(), value.into());
        self
    }
}

/// Fix `fixed` on `scorer`.
pub fn partial<S: Scorer>(scorer: S, fixed: Map<String, Value>) -> Partial<S> {
    Partial::new(scorer, fixed)
}

#[async_trait]
impl<S: Scorer> Scorer for Partial<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn score(&self, args: ScorerArgs) -> Result<Score> {
        self.inner.score(args.merged(&self.fixed)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Scorer for Echo {
        fn name(&self) -> &str {
            "Echo"
        }

        async fn score(&self, args: ScorerArgs) -> Result<Score> {
            Ok(Score::new(self.name(), 1.0).with_metadata("args", Value::Object(args.to_map())))
        }
    }

    #[tokio::test]
    async fn test_partial_keeps_name() {
        let scorer = partial(Echo, Map::new());
        assert_eq!(scorer.name(), "Echo");
    }

    #[tokio::test]
    async fn test_partial_equals_merged_call() {
        let fixed = json!({"expected": "abcd", "criteria": "exact"});
        let fixed = fixed.as_object().cloned().unwrap();
        let rest = ScorerArgs::new("abc").with_arg("input", "q");

        let via_partial = Echo.partial(fixed.clone()).score(rest.clone()).await.unwrap();
        let direct = Echo.score(rest.merged(&fixed)).await.unwrap();
        assert_eq!(via_partial, direct);
    }

    #[tokio::test]
    async fn test_fixed_args_override_call_args() {
        let scorer = Partial::new(Echo, Map::new()).with_arg("expected", "fixed");
        let score = scorer.score(ScorerArgs::new("o").with_expected("caller")).await.unwrap();
        assert_eq!(score.metadata["args"]["expected"], json!("fixed"));
    }
}
