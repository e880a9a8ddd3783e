//! OpenAI API provider.
//!
//! This provider uses the OpenAI Chat Completions API.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{check_status, network_error, Provider, ProviderError, ProviderType};

/// OpenAI API endpoint
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// System prompt shared by commit and review requests
const SYSTEM_PROMPT: &str = "You are an experienced software engineer helping with git commit \
messages and code reviews. Answer with plain text and follow the requested format exactly.";

/// OpenAI provider
pub struct OpenAIProvider {
    /// HTTP client
    client: Client,
    /// API key
    api_key: String,
    /// Model to use
    model: String,
    /// Maximum tokens to generate
    max_tokens: u32,
    /// Endpoint override
    base_url: Option<String>,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider
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
        self.base_url.as_deref().unwrap_or(OPENAI_API_URL)
    }

    /// Build the request body
    fn build_request(&self, content: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            max_tokens: Some(self.max_tokens),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: content.to_string(),
                },
            ],
        }
    }
}

/// Concatenate message contents from all choices
fn extract_text(response: ChatCompletionResponse) -> String {
    response
        .choices
        .into_iter()
        .filter_map(|choice| choice.message.map(|m| m.content))
        .collect::<Vec<_>>()
        .join("")
}

#[async_trait]
impl Provider for OpenAIProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAI
    }

    fn name(&self) -> &'static str {
        "OpenAI"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = self.build_request(prompt);

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(network_error)?;

        let response = check_status("OpenAI", response).await?;

        let response_body: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;

        let content = extract_text(response_body);
        if content.trim().is_empty() {
            bail!(ProviderError::EmptyResponse {
                provider: "OpenAI".to_string()
            });
        }
        Ok(content)
    }
}

// API types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChatMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(base_url: Option<String>) -> OpenAIProvider {
        OpenAIProvider::new(
            Client::new(),
            "test-key".to_string(),
            "gpt-4o-mini".to_string(),
            1024,
            base_url,
        )
    }

    #[test]
    fn test_openai_provider_creation() {
        let provider = provider(None);
        assert_eq!(provider.provider_type(), ProviderType::OpenAI);
        assert_eq!(provider.name(), "OpenAI");
        assert_eq!(provider.model_name(), "gpt-4o-mini");
        assert_eq!(provider.endpoint(), OPENAI_API_URL);
    }

    #[test]
    fn test_base_url_override() {
        let provider = provider(Some("http://localhost:8080/v1/chat".to_string()));
        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/chat");
    }

    #[test]
    fn test_request_serialization() {
        let request = provider(None).build_request("review this");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["max_tokens"], 1024);
        assert_eq!(json["messages"][1]["content"], "review this");
    }

    #[test]
    fn test_extract_text_joins_choices() {
        let body: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"feat: "}},{"message":{"role":"assistant","content":"add x"}},{}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(body), "feat: add x");
    }
}
