//! OpenAI provider and compatible endpoints (including the default relay).

mod client;
mod config;

pub use client::OpenAIClient;
pub use config::{OpenAIConfig, PROXY_URL};
