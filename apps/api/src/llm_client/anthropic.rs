use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{base_url, http_client, send_with_retry, ChatProvider, ProviderError, RetryPolicy};
use super::MAX_OUTPUT_TOKENS;
use crate::chat::models::{ChatMessage, Completion, ModelSelector, Role};
use crate::config::{validate_credential, ConfigError, ProviderSettings};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-3-opus-20240229";
const CONTEXT_WINDOW: u32 = 200_000;

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    system: String,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
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

impl AnthropicResponse {
    /// Concatenates every text block.
    fn text(&self) -> String {
        self.content
            .iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Anthropic Messages API adapter.
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    model_id: String,
    endpoint: String,
    retry: RetryPolicy,
}

impl AnthropicProvider {
    pub fn new(settings: &ProviderSettings, timeout: Duration) -> Result<Self, ConfigError> {
        validate_credential("ANTHROPIC_API_KEY", &settings.api_key)?;
        Ok(Self {
            client: http_client(timeout)?,
            api_key: settings.api_key.clone(),
            model_id: settings
                .model_id
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            endpoint: format!(
                "{}/v1/messages",
                base_url(settings.base_url.as_deref(), ANTHROPIC_API_URL)
            ),
            retry: RetryPolicy::default(),
        })
    }

    /// System messages go to the top-level `system` field; the Messages API
    /// only accepts user and assistant turns.
    fn request_body<'a>(&'a self, conversation: &'a [ChatMessage]) -> AnthropicRequest<'a> {
        let system = conversation
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        AnthropicRequest {
            model: &self.model_id,
            max_tokens: MAX_OUTPUT_TOKENS,
            system,
            messages: conversation
                .iter()
                .filter_map(|m| match m.role {
                    Role::System => None,
                    Role::User => Some(AnthropicMessage {
                        role: "user",
                        content: &m.content,
                    }),
                    Role::Assistant => Some(AnthropicMessage {
                        role: "assistant",
                        content: &m.content,
                    }),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    fn model(&self) -> ModelSelector {
        ModelSelector::Claude
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn context_window(&self) -> u32 {
        CONTEXT_WINDOW
    }

    async fn invoke(&self, conversation: &[ChatMessage]) -> Result<Completion, ProviderError> {
        let body = self.request_body(conversation);

        let response: AnthropicResponse = send_with_retry("Anthropic", self.retry, || {
            self.client
                .post(&self.endpoint)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body)
        })
        .await
        .map_err(|e| e.redact(&self.api_key))?;

        if let Some(usage) = &response.usage {
            debug!(
                "Anthropic call succeeded: input_tokens={}, output_tokens={}",
                usage.input_tokens, usage.output_tokens
            );
        }

        let text = response.text();
        if text.trim().is_empty() {
            return Err(ProviderError::EmptyContent);
        }

        Ok(Completion {
            text,
            finish_reason: response.stop_reason,
        })
    }
}
