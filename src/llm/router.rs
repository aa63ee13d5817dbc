//! Model routing — resolves shorthand model names and picks a provider.
//!
//! Users can ask for `sonnet` or `gpt-4o-mini` instead of a full provider
//! model id. Resolution is a fixed alias table; anything already carrying
//! a `provider/` prefix passes through untouched. Claude ids go to the
//! Anthropic API directly; everything else goes through OpenRouter, which
//! is only available when its API key is configured.

use anyhow::{bail, Result};
use tracing::info;

use crate::config::LlmConfig;

use super::anthropic::AnthropicClient;
use super::client::CodeGenerator;
use super::openrouter::OpenRouterClient;

/// Which backend serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenRouter,
}

impl std::str::FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "anthropic" => Ok(Provider::Anthropic),
            "openrouter" => Ok(Provider::OpenRouter),
            other => bail!("unknown provider '{other}' (expected anthropic or openrouter)"),
        }
    }
}

/// Shorthand → full model id. Names without an entry here and without a
/// `provider/` prefix are passed through unchanged.
const ALIASES: &[(&str, &str)] = &[
    ("claude", "claude-sonnet-4-5"),
    ("sonnet", "claude-sonnet-4-5"),
    ("haiku", "claude-haiku-4-5"),
    ("opus", "claude-opus-4-1"),
    ("gpt-4o-mini", "openai/gpt-4o-mini"),
    ("gpt4o-mini", "openai/gpt-4o-mini"),
    ("gpt5", "openai/gpt-5"),
    ("gpt-5", "openai/gpt-5"),
    ("gemini", "google/gemini-2.5-flash"),
    ("llama", "meta-llama/llama-3.3-70b-instruct"),
    ("mistral", "mistralai/mistral-nemo"),
    ("deepseek", "deepseek/deepseek-chat-v3-0324"),
    ("grok", "x-ai/grok-code-fast-1"),
    ("qwen3", "qwen/qwen3-coder"),
    ("kimi-k2", "moonshotai/kimi-k2"),
];

/// Routes generation requests to the right provider client.
pub struct ModelRouter {
    anthropic: AnthropicClient,
    openrouter: Option<OpenRouterClient>,
    default_model: String,
}

impl ModelRouter {
    pub fn new(config: &LlmConfig) -> Self {
        let anthropic = AnthropicClient::new(config.clone());
        let openrouter = config.openrouter_api_key.as_deref().map(|key| {
            OpenRouterClient::new(key, config.max_tokens_per_request, config.model.clone())
        });
        Self {
            anthropic,
            openrouter,
            default_model: config.model.clone(),
        }
    }

    pub fn openrouter_configured(&self) -> bool {
        self.openrouter.is_some()
    }

    /// Resolves a shorthand model name to its full id.
    pub fn resolve_model(&self, name: &str) -> String {
        if name.contains('/') {
            return name.to_string();
        }
        let lower = name.to_lowercase();
        for (alias, full) in ALIASES {
            if *alias == lower {
                return full.to_string();
            }
        }
        name.to_string()
    }

    /// Picks the provider for a resolved model id.
    ///
    /// Explicit requests win; otherwise Claude ids without a provider
    /// prefix go to Anthropic and prefixed ids go to OpenRouter.
    pub fn provider_for(&self, model: &str, requested: Option<Provider>) -> Provider {
        if let Some(provider) = requested {
            return provider;
        }
        if !model.contains('/') && model.starts_with("claude") {
            Provider::Anthropic
        } else if model.contains('/') {
            Provider::OpenRouter
        } else {
            Provider::Anthropic
        }
    }

    /// Generates builder code for `prompt`, routing to the right backend.
    pub async fn generate_building_code(
        &self,
        prompt: &str,
        parts_excerpt: &str,
        builder_api: &str,
        model: Option<&str>,
        provider: Option<Provider>,
    ) -> Result<String> {
        let resolved = self.resolve_model(model.unwrap_or(&self.default_model));

        match self.provider_for(&resolved, provider) {
            Provider::Anthropic => {
                // The direct API takes the bare model id.
                let model = resolved.strip_prefix("anthropic/").unwrap_or(&resolved);
                info!("Using Anthropic for model: {model}");
                self.anthropic
                    .generate(prompt, parts_excerpt, builder_api, model)
                    .await
            }
            Provider::OpenRouter => match &self.openrouter {
                Some(client) => {
                    info!("Using OpenRouter for model: {resolved}");
                    client
                        .generate(prompt, parts_excerpt, builder_api, &resolved)
                        .await
                }
                None => bail!(
                    "Model \"{resolved}\" requires OpenRouter. Configure it by setting \
                     the openrouter_api_key config field (OPEN_ROUTER_KEY)."
                ),
            },
        }
    }

    pub fn description(&self) -> String {
        match &self.openrouter {
            Some(or) => format!("{} + {}", self.anthropic.description(), or.description()),
            None => self.anthropic.description(),
        }
    }
}
