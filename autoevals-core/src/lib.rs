//! # autoevals-core
//!
//! Core traits and types shared by every autoevals scorer and model client.
//!
//! ## Overview
//!
//! - [`Score`] - The value every scorer returns
//! - [`Scorer`] / [`ScorerArgs`] - The uniform `(output, expected, extra) -> Score` contract
//! - [`Partial`] - Fix a subset of a scorer's arguments ahead of time
//! - [`LlmClient`] - Chat completion, embedding and moderation APIs
//! - [`ClientHandle`] / [`Instrumentation`] - Clients with an explicit instrumentation marker
//! - [`ResponseCache`] - Pluggable response caching keyed by the serialized request
//! - [`EvalError`] / [`Result`] - Unified error handling
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use autoevals_core::{Score, Scorer, ScorerArgs, Result};
//! use async_trait::async_trait;
//!
//! struct Exact;
//!
//! #[async_trait]
//! impl Scorer for Exact {
//!     fn name(&self) -> &str {
//!         "Exact"
//!     }
//!
//!     async fn score(&self, args: ScorerArgs) -> Result<Score> {
//!         let expected = args.require_expected(self.name())?;
//!         Ok(Score::new(self.name(), if &args.output == expected { 1.0 } else { 0.0 }))
//!     }
//! }
//! ```

pub mod cache;
pub mod client;
pub mod error;
pub mod model;
pub mod partial;
pub mod score;
pub mod scorer;

pub use cache::{InMemoryCache, ResponseCache};
pub use client::{ClientHandle, Instrumentation};
pub use error::{EvalError, Result};
pub use model::{
    AssistantMessage, ChatMessage, CompletionChoice, CompletionRequest, CompletionResponse,
    Embedding, EmbeddingRequest, EmbeddingResponse, FunctionCall, FunctionDefinition, LlmClient,
    ModerationRequest, ModerationResponse, ModerationResult, ToolCall, ToolChoice, ToolDefinition,
    Usage,
};
pub use partial::{Partial, partial};
pub use score::Score;
pub use scorer::{Scorer, ScorerArgs};
