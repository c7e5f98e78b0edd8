use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::errors::MatchError;
use crate::llm_client::{GatewayConfig, DEFAULT_API_URL, DEFAULT_MODEL};
use crate::retrieval::embeddings::DEFAULT_EMBEDDING_MODEL;
use crate::retrieval::{Embedder, HashEmbedder, HttpEmbedder, HttpEmbedderConfig};

/// Application configuration loaded from environment variables.
/// Fails at startup if the model credential is missing.
#[derive(Clone)]
pub struct Config {
    pub groq_api_token: String,
    pub groq_api_url: String,
    pub model: String,
    pub llm_timeout_secs: u64,
    pub llm_max_retries: u32,
    /// Remote embedding endpoint; `None` selects the built-in hashing embedder.
    pub embedding: Option<HttpEmbedderConfig>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup (the process environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let llm_timeout_secs = parse_or(&lookup, "MATCHER_LLM_TIMEOUT_SECS", 60)?;
        let embedding = lookup("EMBEDDING_API_URL")
            .filter(|url| !url.trim().is_empty())
            .map(|api_url| HttpEmbedderConfig {
                api_url,
                api_key: lookup("EMBEDDING_API_KEY").filter(|k| !k.is_empty()),
                model: lookup("EMBEDDING_MODEL")
                    .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
                timeout: Duration::from_secs(llm_timeout_secs),
            });

        Ok(Config {
            groq_api_token: lookup("GROQ_API_TOKEN")
                .filter(|t| !t.trim().is_empty())
                .context("Required environment variable 'GROQ_API_TOKEN' is not set")?,
            groq_api_url: lookup("GROQ_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            model: lookup("MATCHER_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            llm_timeout_secs,
            llm_max_retries: parse_or(&lookup, "MATCHER_LLM_MAX_RETRIES", 0)?,
            embedding,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    /// Gateway settings with the credential passed in explicitly.
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            api_key: self.groq_api_token.clone(),
            api_url: self.groq_api_url.clone(),
            model: self.model.clone(),
            timeout: self.llm_timeout(),
            max_retries: self.llm_max_retries,
        }
    }

    pub fn embedder(&self) -> Result<Arc<dyn Embedder>, MatchError> {
        let embedder: Arc<dyn Embedder> = match &self.embedding {
            Some(remote) => Arc::new(HttpEmbedder::new(remote.clone())?),
            None => Arc::new(HashEmbedder::default()),
        };
        Ok(embedder)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
