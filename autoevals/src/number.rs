use async_trait::async_trait;
use autoevals_core::{EvalError, Result, Score, Scorer, ScorerArgs};
use serde_json::Value;

/// Normalized numeric difference: `1 - |e - o| / (|e| + |o|)`, with two zeros
/// scoring 1.
///
/// Operands are divided by the larger magnitude first, so values near
/// `f64::MAX` do not overflow to infinity.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericDiff;

impl NumericDiff {
    pub fn new() -> Self {
        Self
    }

    pub fn similarity(output: f64, expected: f64) -> f64 {
        if output == expected {
            return 1.0;
        }
        if !output.is_finite() || !expected.is_finite() {
            return 0.0;
        }
        let scale = output.abs().max(expected.abs());
        let (o, e) = (output / scale, expected / scale);
        (1.0 - (e - o).abs() / (e.abs() + o.abs())).clamp(0.0, 1.0)
    }
}

fn as_number(value: &Value, scorer: &str, argument: &str) -> Result<f64> {
    value.as_f64().ok_or_else(|| {
        EvalError::InvalidArgument(format!("{scorer} expects a numeric {argument}, got {value}"))
    })
}

#[async_trait]
impl Scorer for NumericDiff {
    fn name(&self) -> &str {
        "NumericDiff"
    }

    async fn score(&self, args: ScorerArgs) -> Result<Score> {
        let expected = as_number(args.require_expected(self.name())?, self.name(), "expected")?;
        let output = as_number(&args.output, self.name(), "output")?;
        Ok(Score::new(self.name(), Self::similarity(output, expected)))
    }
}
