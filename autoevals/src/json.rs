//! Structural JSON comparison and validation.

use crate::number::NumericDiff;
use crate::string::Levenshtein;
use crate::util::{canonical_json, parse_json_str};
use async_trait::async_trait;
use autoevals_core::{EvalError, Result, Score, Scorer, ScorerArgs};
use futures::future::{BoxFuture, FutureExt, try_join_all};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Recursive tree comparison with pluggable leaf scorers.
///
/// Objects score the mean over the union of their keys (a missing key
/// compares as null), arrays score the sum over zipped elements divided by
/// the longer length, strings and numbers go to the leaf scorers, and any
/// other pairing compares canonical JSON text with the string scorer.
#[derive(Clone)]
pub struct JsonDiff {
    string_scorer: Arc<dyn Scorer>,
    number_scorer: Arc<dyn Scorer>,
    preserve_strings: bool,
}

impl Default for JsonDiff {
    fn default() -> Self {
        Self {
            string_scorer: Arc::new(Levenshtein),
            number_scorer: Arc::new(NumericDiff),
            preserve_strings: false,
        }
    }
}

impl JsonDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_string_scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.string_scorer = scorer;
        self
    }

    pub fn with_number_scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.number_scorer = scorer;
        self
    }

    /// Never parse string operands as JSON.
    pub fn with_preserve_strings(mut self, preserve_strings: bool) -> Self {
        self.preserve_strings = preserve_strings;
        self
    }

    /// Strings holding a JSON object or array are replaced by the parsed value.
    fn maybe_parse(&self, value: Value) -> Value {
        if self.preserve_strings {
            return value;
        }
        match parse_json_str(&value) {
            Some(parsed @ (Value::Object(_) | Value::Array(_))) => parsed,
            _ => value,
        }
    }

    async fn leaf(scorer: &dyn Scorer, output: Value, expected: Value) -> Result<Option<f64>> {
        Ok(scorer.eval(output, expected).await?.score)
    }

    /// Similarity of two values, or `None` when no leaf produced a score.
    pub fn diff(&self, output: Value, expected: Value) -> BoxFuture<'_, Result<Option<f64>>> {
        async move {
            let output = self.maybe_parse(output);
            let expected = self.maybe_parse(expected);

            match (output, expected) {
                (Value::Object(a), Value::Object(b)) => self.diff_objects(a, b).await,
                (Value::Array(a), Value::Array(b)) => self.diff_arrays(a, b).await,
                (a @ Value::String(_), b @ Value::String(_)) => {
                    Self::leaf(self.string_scorer.as_ref(), a, b).await
                }
                (a @ Value::Number(_), b @ Value::Number(_)) => {
                    Self::leaf(self.number_scorer.as_ref(), a, b).await
                }
                (Value::Null, Value::Null) => Ok(Some(1.0)),
                (Value::Null, _) | (_, Value::Null) => Ok(Some(0.0)),
                (a, b) => {
                    let a = Value::String(canonical_json(&a));
                    let b = Value::String(canonical_json(&b));
                    Self::leaf(self.string_scorer.as_ref(), a, b).await
                }
            }
        }
        .boxed()
    }

    async fn diff_objects(
        &self,
        mut a: Map<String, Value>,
        mut b: Map<String, Value>,
    ) -> Result<Option<f64>> {
        if a.is_empty() && b.is_empty() {
            return Ok(Some(1.0));
        }
        let keys: BTreeSet<String> = a.keys().chain(b.keys()).cloned().collect();
        let children = keys.iter().map(|key| {
            let left = a.remove(key).unwrap_or(Value::Null);
            let right = b.remove(key).unwrap_or(Value::Null);
            self.diff(left, right)
        });
        let scores: Vec<f64> = try_join_all(children).await?.into_iter().flatten().collect();
        if scores.is_empty() {
            return Ok(None);
        }
        Ok(Some(scores.iter().sum::<f64>() / scores.len() as f64))
    }

    async fn diff_arrays(&self, a: Vec<Value>, b: Vec<Value>) -> Result<Option<f64>> {
        if a.is_empty() && b.is_empty() {
            return Ok(Some(1.0));
        }
        let longest = a.len().max(b.len());
        let children = a.into_iter().zip(b).map(|(left, right)| self.diff(left, right));
        let total: f64 = try_join_all(children).await?.into_iter().flatten().sum();
        Ok(Some(total / longest as f64))
    }
}

#[async_trait]
impl Scorer for JsonDiff {
    fn name(&self) -> &str {
        "JSONDiff"
    }

    /// `expected` must be supplied, but an explicit null is a valid value.
    async fn score(&self, args: ScorerArgs) -> Result<Score> {
        let expected = args.expected.ok_or_else(|| EvalError::missing("JSONDiff", "expected"))?;
        Ok(match self.diff(args.output, expected).await? {
            Some(value) => Score::new(self.name(), value),
            None => Score::skipped(self.name()),
        })
    }
}

/// Scores 1 when the output is a JSON object or array (strings are parsed
/// first), or, with a schema, when it validates against that schema.
///
/// A `schema` argument passed at call time overrides the configured one.
#[derive(Debug, Clone, Default)]
pub struct ValidJson {
    schema: Option<Value>,
}

impl ValidJson {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Validate `output`, returning the validation errors (empty when valid).
    pub fn check(output: &Value, schema: Option<&Value>) -> Result<Vec<String>> {
        let parsed = match output {
            Value::String(text) => match serde_json::from_str::<Value>(text) {
                Ok(parsed) => parsed,
                Err(e) => return Ok(vec![format!("invalid JSON: {e}")]),
            },
            other => other.clone(),
        };

        match schema {
            Some(schema) => {
                let validator = jsonschema::Validator::new(schema)
                    .map_err(|e| EvalError::InvalidArgument(format!("invalid JSON schema: {e}")))?;
                Ok(validator.iter_errors(&parsed).map(|e| e.to_string()).collect())
            }
            None if matches!(parsed, Value::Object(_) | Value::Array(_)) => Ok(Vec::new()),
            None => Ok(vec!["value is neither an object nor an array".to_string()]),
        }
    }
}

#[async_trait]
impl Scorer for ValidJson {
    fn name(&self) -> &str {
        "ValidJSON"
    }

    async fn score(&self, args: ScorerArgs) -> Result<Score> {
        let schema = args.get("schema").filter(|s| !s.is_null()).or(self.schema.as_ref());
        let errors = Self::check(&args.output, schema)?;
        let score = Score::new(self.name(), if errors.is_empty() { 1.0 } else { 0.0 });
        Ok(if errors.is_empty() { score } else { score.with_metadata("errors", errors) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn diff(output: Value, expected: Value) -> f64 {
        JsonDiff::new().eval(output, expected).await.unwrap().score.unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-4
    }

    #[tokio::test]
    async fn test_json_diff_basics() {
        assert_eq!(diff(json!({"a": 1}), json!({"a": 1})).await, 1.0);
        assert!(approx(diff(json!({"a": 1}), json!({"a": 2})).await, 0.6667));
        assert_eq!(diff(json!([]), json!([])).await, 1.0);
        assert_eq!(diff(json!({}), json!({})).await, 1.0);
        assert_eq!(diff(json!([]), json!({})).await, 0.0);
        assert_eq!(diff(Value::Null, Value::Null).await, 1.0);
        assert_eq!(diff(json!("a"), Value::Null).await, 0.0);
    }

    #[tokio::test]
    async fn test_json_diff_structural_cases() {
        assert!(approx(diff(json!({"a": 1}), json!(["a", 1])).await, 0.5714));
        assert_eq!(diff(json!({"a": 1}), json!({"b": {"a": 1}})).await, 0.0);
        assert!(approx(diff(json!("xabxcdxxefxgx"), json!("1ab2cd34ef5g6")).await, 0.53846));
        assert!(approx(
            diff(
                json!({"mapping": {"a": "foo", "b": "bar"}}),
                json!({"mapping": {"a": "Foo", "b": "Bar"}, "Extra": 5}),
            )
            .await,
            0.3333
        ));
    }

    #[tokio::test]
    async fn test_json_diff_arrays_penalize_length() {
        assert!(approx(diff(json!([1, 2]), json!([1, 2, 3, 4])).await, 0.5));
    }

    #[tokio::test]
    async fn test_json_diff_parses_json_strings() {
        assert_eq!(diff(json!("{\"a\": [1, 2]}"), json!({"a": [1, 2]})).await, 1.0);

        let preserved = JsonDiff::new().with_preserve_strings(true);
        let score = preserved.eval(json!("{\"a\":1}"), json!({"a": 1})).await.unwrap();
        assert!(score.score.unwrap() < 1.0);
    }

    #[tokio::test]
    async fn test_json_diff_requires_expected_key() {
        let err = JsonDiff::new().score(ScorerArgs::new(json!({}))).await.unwrap_err();
        assert!(matches!(err, EvalError::MissingArgument { .. }));

        let score =
            JsonDiff::new().score(ScorerArgs::new(json!(1)).with_expected(Value::Null)).await.unwrap();
        assert_eq!(score.score, Some(0.0));
    }

    #[tokio::test]
    async fn test_valid_json() {
        let scorer = ValidJson::new();
        assert_eq!(scorer.score(ScorerArgs::new("{\"a\": 1}")).await.unwrap().score, Some(1.0));
        assert_eq!(scorer.score(ScorerArgs::new("[1, 2]")).await.unwrap().score, Some(1.0));
        assert_eq!(scorer.score(ScorerArgs::new("12")).await.unwrap().score, Some(0.0));
        assert_eq!(scorer.score(ScorerArgs::new("{oops")).await.unwrap().score, Some(0.0));
    }

    #[tokio::test]
    async fn test_valid_json_with_schema() {
        let schema = json!({
            "type": "object",
            "properties": {"name": {"type": "string"}, "age": {"type": "number"}},
            "required": ["name", "age"]
        });
        let scorer = ValidJson::new().with_schema(schema);

        let ok = scorer.score(ScorerArgs::new("{\"name\": \"John\", \"age\": 30}")).await.unwrap();
        assert_eq!(ok.score, Some(1.0));

        let bad = scorer.score(ScorerArgs::new(json!({"name": "John"}))).await.unwrap();
        assert_eq!(bad.score, Some(0.0));
        assert!(bad.metadata["errors"].as_array().is_some_and(|e| !e.is_empty()));
    }
}
