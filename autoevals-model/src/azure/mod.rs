//! Azure OpenAI provider.

mod client;
mod config;

pub use client::AzureOpenAIClient;
pub use config::{AzureConfig, DEFAULT_API_VERSION};
