/// Errors surfaced by scorers and model clients.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// A required argument was not supplied. Raised before any network call.
    #[error("{scorer} requires an {argument} value")]
    MissingArgument { scorer: String, argument: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The model response violated the forced single-choice contract.
    ///
    /// The raw response is kept so callers can diagnose what the model did.
    #[error("Classification error: {message}")]
    Classification { message: String, raw_response: serde_json::Value },

    /// Network, auth or status failure from a model or embedding API.
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Score {score} for {name} is outside [0, 1]")]
    ScoreOutOfRange { name: String, score: f64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl EvalError {
    pub fn missing(scorer: impl Into<String>, argument: impl Into<String>) -> Self {
        EvalError::MissingArgument { scorer: scorer.into(), argument: argument.into() }
    }

    pub fn classification(message: impl Into<String>, raw_response: serde_json::Value) -> Self {
        EvalError::Classification { message: message.into(), raw_response }
    }

    /// Raw model response attached to a classification failure, if any.
    pub fn raw_response(&self) -> Option<&serde_json::Value> {
        match self {
            EvalError::Classification { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;
