use crate::util::{needs_json, normalize_value};
use async_trait::async_trait;
use autoevals_core::{EvalError, Result, Score, Scorer, ScorerArgs};
use serde_json::Value;

/// Exact equality after normalization.
///
/// When either side is an object or array, both sides are compared as
/// canonical JSON (strings holding JSON are parsed first), so key order and
/// whitespace do not matter. Otherwise values are compared as text.
/// `expected` must be supplied; an explicit null is compared like any value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatch;

impl ExactMatch {
    pub fn new() -> Self {
        Self
    }

    pub fn matches(output: &Value, expected: &Value) -> bool {
        let maybe_object = needs_json(output) || needs_json(expected);
        normalize_value(output, maybe_object) == normalize_value(expected, maybe_object)
    }
}

#[async_trait]
impl Scorer for ExactMatch {
    fn name(&self) -> &str {
        "ExactMatch"
    }

    async fn score(&self, args: ScorerArgs) -> Result<Score> {
        let expected =
            args.expected.as_ref().ok_or_else(|| EvalError::missing(self.name(), "expected"))?;
        let value = if Self::matches(&args.output, expected) { 1.0 } else { 0.0 };
        Ok(Score::new(self.name(), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_exact_match_normalizes_json() {
        assert!(ExactMatch::matches(&json!({"name": "John", "age": 30}), &json!("{\"age\": 30, \"name\": \"John\"}")));
        assert!(ExactMatch::matches(&json!([1, 2, 3]), &json!("[1, 2, 3]")));
        assert!(!ExactMatch::matches(&json!([1, 2]), &json!("[2, 1]")));
    }

    #[test]
    fn test_exact_match_plain_values() {
        assert!(ExactMatch::matches(&json!("hello"), &json!("hello")));
        assert!(!ExactMatch::matches(&json!("hello"), &json!("Hello")));
        assert!(ExactMatch::matches(&json!(1), &json!("1")));
        // Without an object on either side JSON strings are compared verbatim.
        assert!(!ExactMatch::matches(&json!("\"a\""), &json!("a")));
    }

    #[tokio::test]
    async fn test_exact_match_scorer() {
        let score = ExactMatch.eval(json!("x"), json!("x")).await.unwrap();
        assert_eq!(score.score, Some(1.0));
        let score = ExactMatch.score(ScorerArgs::new("x").with_expected(Value::Null)).await.unwrap();
        assert_eq!(score.score, Some(0.0));
        let score = ExactMatch.score(ScorerArgs::new(Value::Null).with_expected(Value::Null)).await.unwrap();
        assert_eq!(score.score, Some(1.0));
    }

    #[tokio::test]
    async fn test_exact_match_requires_expected() {
        let err = ExactMatch.score(ScorerArgs::new("x")).await.unwrap_err();
        assert!(matches!(err, EvalError::MissingArgument { .. }));
    }
}
