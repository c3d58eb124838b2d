use crate::{EvalError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result of a single scorer invocation.
///
/// `score` is `None` only when the scorer decided the input should be skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub name: String,
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    /// Legacy degraded-path error text. Current scorers return `Err` instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Score {
    pub fn new(name: impl Into<String>, score: f64) -> Self {
        Self { name: name.into(), score: Some(score), metadata: Map::new(), error: None }
    }

    /// Create a score, rejecting values outside `[0, 1]`.
    pub fn try_new(name: impl Into<String>, score: f64) -> Result<Self> {
        let name = name.into();
        if !(0.0..=1.0).contains(&score) {
            return Err(EvalError::ScoreOutOfRange { name, score });
        }
        Ok(Self::new(name, score))
    }

    /// A score that carries no value.
    pub fn skipped(name: impl Into<String>) -> Self {
        Self { name: name.into(), score: None, metadata: Map::new(), error: None }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_skipped(&self) -> bool {
        self.score.is_none()
    }

    /// Numeric value, treating a skipped score as `0.0`.
    ///
    /// Use only where the caller has explicitly decided that skipped means bad.
    pub fn value_or_zero(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_try_new_rejects_out_of_range() {
        assert!(Score::try_new("x", 0.5).is_ok());
        assert!(matches!(Score::try_new("x", 1.5), Err(EvalError::ScoreOutOfRange { .. })));
        assert!(Score::try_new("x", -0.1).is_err());
    }

    #[test]
    fn test_serialize_skips_empty_fields() {
        let score = Score::new("Levenshtein", 1.0);
        let encoded = serde_json::to_value(&score).unwrap();
        assert_eq!(encoded, json!({"name": "Levenshtein", "score": 1.0}));
    }

    #[test]
    fn test_metadata_builder() {
        let score = Score::new("Factuality", 0.6).with_metadata("choice", "B");
        assert_eq!(score.metadata.get("choice"), Some(&json!("B")));
        assert!(!score.is_skipped());
        assert!(Score::skipped("x").is_skipped());
    }
}
