//! OpenRouter provider.
//!
//! Calls `POST /api/v1/chat/completions` with an OpenAI-compatible
//! request format.
//!
//! Key differences from Anthropic:
//! - System prompt is sent as a `role: "system"` message (not a top-level field).
//! - Bearer token auth plus `HTTP-Referer` / `X-Title` attribution headers.
//! - Token usage: `prompt_tokens` / `completion_tokens` (may be absent).
//! - Must set `stream: false` for synchronous responses.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::client::{clean_code, CodeGenerator};
use super::prompt;

/// OpenRouter chat completions endpoint.
const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Attribution headers OpenRouter uses for rankings.
const REFERER: &str = "https://github.com/brickforge/brickforge";
const TITLE: &str = "brickforge";

/// Sampling temperature for code generation.
const TEMPERATURE: f32 = 0.7;

// ── OpenRouter API request types ─────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

// ── OpenRouter API response types ────────────────────────

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

// ── OpenRouterClient ────────────────────────────────────

/// Client for the OpenRouter API.
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    max_tokens: u32,
    default_model: String,
}

impl OpenRouterClient {
    pub fn new(api_key: impl Into<String>, max_tokens: u32, default_model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            max_tokens,
            default_model: default_model.into(),
        }
    }

    async fn complete(&self, system: &str, user: &str, model: &str) -> Result<String> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: self.max_tokens,
            stream: false,
        };

        debug!("Calling OpenRouter API ({model})");

        let response = self
            .client
            .post(OPENROUTER_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", REFERER)
            .header("X-Title", TITLE)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            anyhow::bail!("OpenRouter API error ({status}): {body}");
        }

        let resp: ChatResponse = response.json().await?;

        let text = resp
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| anyhow::anyhow!("OpenRouter response contained no choices"))?;

        if let Some(usage) = resp.usage {
            info!(
                "LLM response: {} in / {} out tokens",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        Ok(text)
    }
}

#[async_trait]
impl CodeGenerator for OpenRouterClient {
    async fn generate(
        &self,
        prompt: &str,
        parts_excerpt: &str,
        builder_api: &str,
        model: &str,
    ) -> Result<String> {
        let system = prompt::system_prompt(builder_api, parts_excerpt);
        let user = prompt::user_prompt(prompt);
        let raw = self.complete(&system, &user, model).await?;
        Ok(clean_code(&raw))
    }

    fn description(&self) -> String {
        format!("openrouter ({})", self.default_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description() {
        let client = OpenRouterClient::new("key", 2000, "openai/gpt-4o-mini");
        assert_eq!(client.description(), "openrouter (openai/gpt-4o-mini)");
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{
            "id": "gen-1",
            "choices": [
                {"message": {"role": "assistant", "content": "const builder = 1;"},
                 "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 5, "completion_tokens": 7, "total_tokens": 12}
        }"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.choices[0].message.content, "const builder = 1;");
        assert_eq!(resp.usage.unwrap().completion_tokens, 7);
    }

    #[test]
    fn test_response_parsing_without_usage() {
        let json = r#"{"choices": [{"message": {"content": "x"}}]}"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(resp.usage.is_none());
        assert_eq!(resp.choices.len(), 1);
    }

    #[test]
    fn test_request_serialization_pins_stream_off() {
        let request = ChatRequest {
            model: "openai/gpt-4o-mini".to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "sys".to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: "Build: a car".to_string(),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: 2000,
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
    }
}
