use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{base_url, http_client, send_with_retry, ChatProvider, ProviderError, RetryPolicy};
use super::MAX_OUTPUT_TOKENS;
use crate::chat::models::{ChatMessage, Completion, ModelSelector, Role};
use crate::config::{validate_credential, ConfigError, ProviderSettings};

const OPENAI_API_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";
const CONTEXT_WINDOW: u32 = 128_000;

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<OpenAiMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// OpenAI Chat Completions adapter.
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    model_id: String,
    endpoint: String,
    retry: RetryPolicy,
}

impl OpenAiProvider {
    pub fn new(settings: &ProviderSettings, timeout: Duration) -> Result<Self, ConfigError> {
        validate_credential("OPENAI_API_KEY", &settings.api_key)?;
        Ok(Self {
            client: http_client(timeout)?,
            api_key: settings.api_key.clone(),
            model_id: settings
                .model_id
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            endpoint: format!(
                "{}/v1/chat/completions",
                base_url(settings.base_url.as_deref(), OPENAI_API_URL)
            ),
            retry: RetryPolicy::default(),
        })
    }

    fn request_body<'a>(&'a self, conversation: &'a [ChatMessage]) -> OpenAiRequest<'a> {
        OpenAiRequest {
            model: &self.model_id,
            max_tokens: MAX_OUTPUT_TOKENS,
            messages: conversation
                .iter()
                .map(|m| OpenAiMessage {
                    role: match m.role {
                        Role::System => "system",
                        Role::User => "user",
                        Role::Assistant => "assistant",
                    },
                    content: &m.content,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn model(&self) -> ModelSelector {
        ModelSelector::OpenAi
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn context_window(&self) -> u32 {
        CONTEXT_WINDOW
    }

    async fn invoke(&self, conversation: &[ChatMessage]) -> Result<Completion, ProviderError> {
        let body = self.request_body(conversation);

        let response: OpenAiResponse = send_with_retry("OpenAI", self.retry, || {
            self.client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
        })
        .await
        .map_err(|e| e.redact(&self.api_key))?;

        if let Some(usage) = &response.usage {
            debug!(
                "OpenAI call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyContent)?;
        let text = choice
            .message
            .content
            .filter(|t| !t.trim().is_empty())
            .ok_or(ProviderError::EmptyContent)?;

        Ok(Completion {
            text,
            finish_reason: choice.finish_reason,
        })
    }
}
