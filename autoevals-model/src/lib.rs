//! # autoevals-model
//!
//! Model client implementations for autoevals scorers.
//!
//! ## Overview
//!
//! - [`OpenAIClient`] - OpenAI or any compatible endpoint (default: the Braintrust relay)
//! - [`AzureOpenAIClient`] - Azure OpenAI deployments
//! - [`MockClient`] - Scripted client for tests
//! - [`TracingInstrumentation`] - Wraps clients in `llm_call` tracing spans
//!
//! Every client implements [`autoevals_core::LlmClient`] and sends each request
//! exactly once. Rate limits and other non-success statuses surface as
//! [`autoevals_core::EvalError::Upstream`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use autoevals_model::{OpenAIClient, OpenAIConfig};
//!
//! let client = OpenAIClient::new(OpenAIConfig::from_env()).unwrap();
//! ```

pub mod azure;
mod http;
pub mod instrument;
pub mod mock;
pub mod openai;

pub use azure::{AzureConfig, AzureOpenAIClient};
pub use instrument::{TracedClient, TracingInstrumentation};
pub use mock::MockClient;
pub use openai::{OpenAIClient, OpenAIConfig, PROXY_URL};
