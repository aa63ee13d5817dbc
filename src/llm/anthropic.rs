//! Anthropic Messages API provider.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::LlmConfig;

use super::client::{clean_code, CodeGenerator};
use super::prompt;

/// Sampling temperature for code generation.
const TEMPERATURE: f32 = 0.7;

/// Client for the Anthropic Messages API.
pub struct AnthropicClient {
    client: Client,
    config: LlmConfig,
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl AnthropicClient {
    pub fn new(config: LlmConfig) -> Self {
        let client = Client::new();
        Self { client, config }
    }

    async fn complete(&self, system: &str, user: &str, model: &str) -> Result<String> {
        let request = MessagesRequest {
            model: model.to_string(),
            max_tokens: self.config.max_tokens_per_request,
            temperature: TEMPERATURE,
            system: system.to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: user.to_string(),
            }],
        };

        debug!("Calling Claude API ({model})");

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            anyhow::bail!("Claude API error ({status}): {body}");
        }

        let resp: MessagesResponse = response.json().await?;

        let text = resp
            .content
            .iter()
            .filter_map(|block| {
                if block.block_type == "text" {
                    block.text.clone()
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("\n");

        let (input_tokens, output_tokens) = resp
            .usage
            .map(|u| (u.input_tokens, u.output_tokens))
            .unwrap_or((0, 0));

        info!("LLM response: {input_tokens} in / {output_tokens} out tokens");

        Ok(text)
    }
}

#[async_trait]
impl CodeGenerator for AnthropicClient {
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
        format!("anthropic ({})", self.config.model)
    }
}
