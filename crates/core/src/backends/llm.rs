use async_trait::async_trait;

use crate::backends::TextOptimizer;
use crate::catalog::PLACEHOLDER;
use crate::error::{Result, ScribeError};

#[derive(Clone, Debug, Default)]
pub enum Provider {
    #[default]
    Grok,
    Openai,
    Gemini,
}

pub struct ProviderConfig {
    pub api_url: &'static str,
    pub model: &'static str,
    pub env_var: &'static str,
}

impl Provider {
    pub fn config(&self) -> ProviderConfig {
        match self {
            Provider::Grok => ProviderConfig {
                api_url: "https://api.x.ai/v1/chat/completions",
                model: "grok-4-fast",
                env_var: "XAI_API_KEY",
            },
            Provider::Openai => ProviderConfig {
                api_url: "https://api.openai.com/v1/chat/completions",
                model: "gpt-5.1",
                env_var: "OPENAI_API_KEY",
            },
            Provider::Gemini => ProviderConfig {
                api_url: "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
                model: "gemini-3-pro",
                env_var: "GEMINI_API_KEY",
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Grok => "Grok",
            Provider::Openai => "OpenAI",
            Provider::Gemini => "Gemini",
        }
    }

    /// Validate that the API key is set for this provider
    pub fn validate_api_key(&self) -> Result<String> {
        let config = self.config();
        std::env::var(config.env_var).map_err(|_| ScribeError::MissingApiKey {
            env_var: config.env_var.to_string(),
        })
    }
}

/// Text optimization through an OpenAI-compatible chat-completions endpoint.
pub struct ChatOptimizer {
    client: reqwest::Client,
    provider: Provider,
    api_key: String,
}

impl ChatOptimizer {
    /// Fails up front when the provider's API key is not set, so a batch
    /// never starts against an unusable optimizer.
    pub fn new(provider: Provider) -> Result<Self> {
        let api_key = provider.validate_api_key()?;
        Ok(Self {
            client: reqwest::Client::new(),
            provider,
            api_key,
        })
    }
}

#[async_trait]
impl TextOptimizer for ChatOptimizer {
    async fn optimize(&self, template: &str, input: &str) -> Result<String> {
        let prompt = template.replace(PLACEHOLDER, input);
        let config = self.provider.config();

        let response = self
            .client
            .post(config.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "model": config.model,
                "messages": [
                    {
                        "role": "user",
                        "content": prompt,
                    },
                ],
                "temperature": 0.3,
            }))
            .send()
            .await
            .map_err(|e| ScribeError::Optimization {
                transient: e.is_timeout() || e.is_connect(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScribeError::Optimization {
                transient: status.is_server_error()
                    || status == reqwest::StatusCode::TOO_MANY_REQUESTS,
                reason: format!("{} returned {status}: {body}", self.provider.name()),
            });
        }

        let body: serde_json::Value =
            response.json().await.map_err(|e| ScribeError::Optimization {
                transient: false,
                reason: format!("unreadable response body: {e}"),
            })?;
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ScribeError::Optimization {
                transient: false,
                reason: format!("invalid API response structure: {body}"),
            })?;

        Ok(content.trim().to_string())
    }
}
