//! OpenAI Client - Chat completion transport for SPL generation

use crate::config::LlmConfig;
use crate::error::{EngineError, EngineResult};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One completion call: instructions, user text and sampling limits
#[derive(Clone, Debug)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Text-completion capability used by the translator
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Return the raw completion text
    async fn complete(&self, request: CompletionRequest) -> EngineResult<String>;

    /// Whether an API credential is configured
    fn has_credentials(&self) -> bool;
}

/// OpenAI chat-completions client
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    /// Create a new client from configuration
    pub fn new(config: &LlmConfig) -> EngineResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build OpenAI HTTP client")?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> EngineResult<String> {
        if self.api_key.is_empty() {
            return Err(EngineError::translation("OpenAI API key is not configured"));
        }

        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::translation(format!("Failed to send request to OpenAI: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(EngineError::translation(format!(
                "OpenAI returned {}: {}",
                status,
                text.chars().take(500).collect::<String>()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| EngineError::translation(format!("Failed to parse OpenAI response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| EngineError::translation("OpenAI response contained no message content"))?;

        debug!("Completion returned {} chars", content.len());
        Ok(content)
    }

    fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Strip markdown code fences wrapped around a JSON payload
pub fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some(rest) = trimmed.strip_prefix("```json") {
        if let Some(end) = rest.find("```") {
            return rest[..end].trim();
        }
    } else if trimmed.starts_with("```") {
        if let Some(start) = trimmed.find('\n') {
            if let Some(end) = trimmed[start + 1..].find("```") {
                return trimmed[start + 1..start + 1 + end].trim();
            }
        }
    }

    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"query\": \"search x\"}\n```"), "{\"query\": \"search x\"}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  search index=main  "), "search index=main");
        assert_eq!(strip_code_fences("```json unterminated"), "```json unterminated");
    }

    #[test]
    fn test_credentials() {
        let client = OpenAiClient::new(&LlmConfig::default()).unwrap();
        assert!(!client.has_credentials());
        assert_eq!(client.model(), "gpt-4");

        let config = LlmConfig {
            api_key: "sk-test".to_string(),
            ..LlmConfig::default()
        };
        assert!(OpenAiClient::new(&config).unwrap().has_credentials());
    }

    #[tokio::test]
    async fn test_complete_without_key_fails_fast() {
        let client = OpenAiClient::new(&LlmConfig::default()).unwrap();
        let err = client
            .complete(CompletionRequest {
                system: String::new(),
                user: "hello".to_string(),
                temperature: 0.1,
                max_tokens: 10,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Translation { .. }));
    }
}
