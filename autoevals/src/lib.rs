//! # autoevals
//!
//! Scorers for grading the output of language-model applications.
//!
//! Every scorer implements [`Scorer`]: it takes an `output`, an optional
//! `expected` value and named extras, and returns a [`Score`] in `[0, 1]`.
//!
//! ## Features
//!
//! - **Heuristic scorers**: [`Levenshtein`], [`ExactMatch`], [`NumericDiff`]
//! - **Structural scorers**: [`JsonDiff`], [`ValidJson`], [`ListContains`]
//! - **Embedding scorers**: [`EmbeddingSimilarity`], [`AnswerSimilarity`]
//! - **Model-graded scorers**: [`LlmClassifier`] and [`OpenAiClassifier`],
//!   with prompt templates loaded through a [`TemplateRegistry`]
//! - **Retrieval metrics**: [`ContextEntityRecall`], [`ContextRelevancy`],
//!   [`ContextRecall`], [`ContextPrecision`], [`Faithfulness`],
//!   [`AnswerRelevancy`], [`AnswerCorrectness`]
//! - **Composites**: [`Weighted`]
//! - **Configuration**: [`EvalConfig`] passed explicitly, or the process-wide
//!   default set with [`init`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use autoevals::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let score = JsonDiff::new()
//!         .eval(json!({"name": "Ada", "age": 36}), json!({"name": "Ada", "age": 37}))
//!         .await?;
//!     println!("{:?}", score.score);
//!
//!     let factual = LlmClassifier::builder(
//!         "Correct",
//!         "Question: {{input}}\nAnswer: {{output}}\nIs the answer correct?",
//!         ChoiceScores::from([("Y".to_string(), 1.0), ("N".to_string(), 0.0)]),
//!     )
//!     .build()?;
//!     let graded = factual.score(ScorerArgs::new("Paris").with_arg("input", "Capital of France?")).await?;
//!     println!("{:?}", graded.metadata.get("choice"));
//!     Ok(())
//! }
//! ```

pub mod assignment;
pub mod client;
pub mod composite;
pub mod config;
pub mod json;
pub mod list;
pub mod llm;
pub mod moderation;
pub mod number;
pub mod ragas;
pub mod string;
pub mod util;
pub mod value;

pub use autoevals_core::{
    ClientHandle, EvalError, InMemoryCache, Instrumentation, LlmClient, Partial, ResponseCache,
    Result, Score, Scorer, ScorerArgs, partial,
};
pub use client::resolve_client;
pub use composite::Weighted;
pub use config::{
    DEFAULT_COMPLETION_MODEL, DEFAULT_EMBEDDING_MODEL, DefaultModel, DefaultModels, EvalConfig,
    EvalConfigBuilder, InitOptions, current_config, init, set_config,
};
pub use json::{JsonDiff, ValidJson};
pub use list::ListContains;
pub use llm::{
    ChoiceScores, ClassifierOverrides, LlmClassifier, LlmClassifierBuilder, ModelGradedSpec,
    OpenAiClassifier, TemplateRegistry,
};
pub use moderation::Moderation;
pub use number::NumericDiff;
pub use ragas::{
    AnswerCorrectness, AnswerRelevancy, AnswerSimilarity, ContextEntityRecall, ContextPrecision,
    ContextRecall, ContextRelevancy, Faithfulness,
};
pub use string::{EmbeddingSimilarity, Levenshtein};
pub use value::ExactMatch;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::composite::Weighted;
    pub use crate::config::{DefaultModel, EvalConfig, InitOptions, init};
    pub use crate::json::{JsonDiff, ValidJson};
    pub use crate::list::ListContains;
    pub use crate::llm::{ChoiceScores, LlmClassifier, OpenAiClassifier, TemplateRegistry};
    pub use crate::moderation::Moderation;
    pub use crate::number::NumericDiff;
    pub use crate::ragas::{
        AnswerCorrectness, AnswerRelevancy, AnswerSimilarity, ContextEntityRecall, ContextPrecision,
        ContextRecall, ContextRelevancy, Faithfulness,
    };
    pub use crate::string::{EmbeddingSimilarity, Levenshtein};
    pub use crate::value::ExactMatch;
    pub use autoevals_core::{ClientHandle, EvalError, Result, Score, Scorer, ScorerArgs};
}
