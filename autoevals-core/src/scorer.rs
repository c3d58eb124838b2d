use crate::partial::Partial;
use crate::{EvalError, Result, Score};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Arguments passed to a [`Scorer`].
///
/// `expected` distinguishes "not supplied" (`None`) from an explicit JSON
/// `null` (`Some(Value::Null)`); scorers that treat null as a real value
/// (structural diff) rely on that distinction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScorerArgs {
    pub output: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScorerArgs {
    pub fn new(output: impl Into<Value>) -> Self {
        Self { output: output.into(), expected: None, extra: Map::new() }
    }

    pub fn with_expected(mut self, expected: impl Into<Value>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    /// Set a named argument. `output` and `expected` route to their fields.
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: String, value: Value) {
        match key.as_str() {
            "output" => self.output = value,
            "expected" => self.expected = Some(value),
            _ => {
                self.extra.insert(key, value);
            }
        }
    }

    /// Look up any argument by name, including `output` and `expected`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match key {
            "output" => Some(&self.output),
            "expected" => self.expected.as_ref(),
            _ => self.extra.get(key),
        }
    }

    /// Non-null `expected`, or a contract violation naming the scorer.
    pub fn require_expected(&self, scorer: &str) -> Result<&Value> {
        self.require(scorer, "expected")
    }

    /// Non-null argument `key`, or a contract violation naming the scorer.
    pub fn require(&self, scorer: &str, key: &str) -> Result<&Value> {
        match self.get(key) {
            Some(Value::Null) | None => Err(EvalError::missing(scorer, key)),
            Some(value) => Ok(value),
        }
    }

    /// Overlay `fixed` on top of these arguments. Entries in `fixed` win.
    pub fn merged(mut self, fixed: &Map<String, Value>) -> Self {
        for (key, value) in fixed {
            self.set(key.clone(), value.clone());
        }
        self
    }

    /// Flatten into a single map (`output`, `expected` and extras).
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = self.extra.clone();
        map.insert("output".to_string(), self.output.clone());
        if let Some(expected) = &self.expected {
            map.insert("expected".to_string(), expected.clone());
        }
        map
    }
}

/// Uniform `(output, expected, extra) -> Score` contract.
///
/// Scorers are stateless with respect to individual calls and are shared
/// freely across tasks.
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Externally visible name, used for dispatch and reporting.
    fn name(&self) -> &str;

    async fn score(&self, args: ScorerArgs) -> Result<Score>;

    /// Shorthand for scoring an `(output, expected)` pair.
    async fn eval(&self, output: Value, expected: Value) -> Result<Score> {
        self.score(ScorerArgs::new(output).with_expected(expected)).await
    }

    /// Fix a subset of this scorer's arguments. See [`Partial`].
    fn partial(self, fixed: Map<String, Value>) -> Partial<Self>
    where
        Self: Sized,
    {
        Partial::new(self, fixed)
    }
}

#[async_trait]
impl<S: Scorer + ?Sized> Scorer for Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn score(&self, args: ScorerArgs) -> Result<Score> {
        (**self).score(args).await
    }
}

#[async_trait]
impl<S: Scorer + ?Sized> Scorer for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn score(&self, args: ScorerArgs) -> Result<Score> {
        (**self).score(args).await
    }
}
