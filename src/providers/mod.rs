//! AI provider abstraction.
//!
//! Every provider takes a fully-built prompt and returns the model's text.
//! Prompt construction lives in [`crate::prompt`], session bookkeeping in
//! [`crate::assistant`].

pub mod anthropic;
pub mod gemini;
pub mod openai;

use anyhow::{bail, Result};
use async_trait::async_trait;
use clap::ValueEnum;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::config::AiConfig;

/// Available AI providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// Google Gemini API
    #[default]
    Gemini,
    /// OpenAI API
    #[value(name = "openai")]
    OpenAI,
    /// Anthropic Claude API
    Anthropic,
}

impl ProviderType {
    /// Model used when the config does not name one for this provider
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderType::Gemini => "gemini-2.0-flash",
            ProviderType::OpenAI => "gpt-4o-mini",
            ProviderType::Anthropic => "claude-sonnet-4-20250514",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderType::Gemini => write!(f, "gemini"),
            ProviderType::OpenAI => write!(f, "openai"),
            ProviderType::Anthropic => write!(f, "anthropic"),
        }
    }
}

impl std::str::FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(ProviderType::Gemini),
            "openai" => Ok(ProviderType::OpenAI),
            "anthropic" => Ok(ProviderType::Anthropic),
            _ => Err(format!(
                "Unknown provider: {}. Valid options: gemini, openai, anthropic",
                s
            )),
        }
    }
}

/// Provider trait for text generation
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get the provider type
    fn provider_type(&self) -> ProviderType;

    /// Get the provider name for display
    fn name(&self) -> &'static str;

    /// Get the current model name/identifier
    fn model_name(&self) -> &str;

    /// Send a prompt and return the generated text
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Error types for provider operations
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("API key not configured for {provider}. Set {env_var} environment variable.")]
    MissingApiKey { provider: String, env_var: String },

    #[error("API error from {provider} (HTTP {status}): {message}")]
    ApiError {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Rate limited by {provider}. Please wait and try again.")]
    RateLimited { provider: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse { provider: String, message: String },

    #[error("{provider} returned no content")]
    EmptyResponse { provider: String },
}

impl ProviderError {
    /// Whether a fresh attempt could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::NetworkError(_) | ProviderError::RateLimited { .. } => true,
            ProviderError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Get the appropriate environment variable name for a provider's API key
pub fn get_api_key_env_var(provider: ProviderType) -> &'static str {
    match provider {
        ProviderType::Gemini => "GEMINI_API_KEY",
        ProviderType::OpenAI => "OPENAI_API_KEY",
        ProviderType::Anthropic => "ANTHROPIC_API_KEY",
    }
}

/// Get API key from environment for a provider
pub fn get_api_key(provider: ProviderType) -> Option<String> {
    std::env::var(get_api_key_env_var(provider))
        .ok()
        .filter(|s| !s.is_empty())
}

fn require_api_key(provider: ProviderType, display_name: &str) -> Result<String, ProviderError> {
    get_api_key(provider).ok_or_else(|| ProviderError::MissingApiKey {
        provider: display_name.to_string(),
        env_var: get_api_key_env_var(provider).to_string(),
    })
}

/// HTTP client with the configured request timeout
pub fn build_http_client(timeout_secs: u64) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Map a non-success response to a provider error
pub(crate) async fn check_status(provider: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_body = response.text().await.unwrap_or_default();
    if status.as_u16() == 429 {
        bail!(ProviderError::RateLimited {
            provider: provider.to_string()
        });
    }
    bail!(ProviderError::ApiError {
        provider: provider.to_string(),
        status: status.as_u16(),
        message: error_body,
    })
}

pub(crate) fn network_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::NetworkError(format!("request timed out: {e}"))
    } else {
        ProviderError::NetworkError(e.to_string())
    }
}

/// Construct the provider named in the config
pub fn create_provider(config: &AiConfig) -> Result<Box<dyn Provider>> {
    let client = build_http_client(config.timeout_secs)?;
    let base_url = config.base_url.clone();

    let provider: Box<dyn Provider> = match config.provider {
        ProviderType::Gemini => Box::new(gemini::GeminiProvider::new(
            client,
            require_api_key(ProviderType::Gemini, "Gemini")?,
            config.model.clone(),
            config.max_tokens,
            base_url,
        )),
        ProviderType::OpenAI => Box::new(openai::OpenAIProvider::new(
            client,
            require_api_key(ProviderType::OpenAI, "OpenAI")?,
            config.model.clone(),
            config.max_tokens,
            base_url,
        )),
        ProviderType::Anthropic => Box::new(anthropic::AnthropicProvider::new(
            client,
            require_api_key(ProviderType::Anthropic, "Anthropic")?,
            config.model.clone(),
            config.max_tokens,
            base_url,
        )),
    };

    Ok(provider)
}
