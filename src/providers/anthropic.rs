//! Anthropic Claude API provider.
//!
//! This provider uses the Anthropic Messages API.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{check_status, network_error, Provider, ProviderError, ProviderType};

/// Anthropic API endpoint
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Anthropic API version
const ANTHROPIC_VERSION: &str = "2023-06-01";

const SYSTEM_PROMPT: &str = "You are an experienced software engineer helping with git commit \
messages and code reviews. Answer with plain text and follow the requested format exactly.";

/// Anthropic provider
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: Option<String>,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider
    pub fn new(
        client: Client,
        api_key: String,
        model: String,
        max_tokens: u32,
        base_url: Option<String>,
    ) -> Self {
        Self {
            client,
            api_key,
            model,
            max_tokens,
            base_url,
        }
    }

    fn endpoint(&self) -> &str {
        self.base_url.as_deref().unwrap_or(ANTHROPIC_API_URL)
    }

    /// Build the request body
    fn build_request(&self, content: &str) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: Some(SYSTEM_PROMPT.to_string()),
            messages: vec![Message {
                role: "user".to_string(),
                content: content.to_string(),
            }],
        }
    }
}

/// Concatenate the text blocks of a response
fn extract_text(response: MessagesResponse) -> String {
    response
        .content
        .into_iter()
        .filter(|block| block.content_type == "text")
        .map(|block| block.text)
        .collect::<Vec<_>>()
        .join("")
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Anthropic
    }

    fn name(&self) -> &'static str {
        "Anthropic Claude"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = self.build_request(prompt);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(network_error)?;

        let response = check_status("Anthropic", response).await?;

        let response_body: MessagesResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic response")?;

        let content = extract_text(response_body);
        if content.trim().is_empty() {
            bail!(ProviderError::EmptyResponse {
                provider: "Anthropic".to_string()
            });
        }
        Ok(content)
    }
}

// API types

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> AnthropicProvider {
        AnthropicProvider::new(
            Client::new(),
            "test-key".to_string(),
            "claude-sonnet-4-20250514".to_string(),
            1024,
            None,
        )
    }

    #[test]
    fn test_anthropic_provider_creation() {
        let provider = provider();
        assert_eq!(provider.provider_type(), ProviderType::Anthropic);
        assert_eq!(provider.name(), "Anthropic Claude");
        assert_eq!(provider.endpoint(), ANTHROPIC_API_URL);
    }

    #[test]
    fn test_request_has_system_prompt() {
        let json = serde_json::to_value(provider().build_request("diff")).unwrap();
        assert!(json["system"].as_str().unwrap().contains("code reviews"));
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 1024);
    }

    #[test]
    fn test_extract_text_skips_non_text_blocks() {
        let body: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"thinking"},{"type":"text","text":"Summary: ok"}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(body), "Summary: ok");
    }
}
