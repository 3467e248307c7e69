use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{base_url, http_client, send_with_retry, ChatProvider, ProviderError, RetryPolicy};
use super::MAX_OUTPUT_TOKENS;
use crate::chat::models::{ChatMessage, Completion, ModelSelector, Role};
use crate::config::{validate_credential, ConfigError, ProviderSettings};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";
const TEMPERATURE: f32 = 0.4;
const CONTEXT_WINDOW: u32 = 128_000;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

/// Google Gemini `generateContent` adapter.
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model_id: String,
    endpoint: String,
    retry: RetryPolicy,
}

impl GeminiProvider {
    pub fn new(settings: &ProviderSettings, timeout: Duration) -> Result<Self, ConfigError> {
        validate_credential("GOOGLE_GEMINI_API_KEY", &settings.api_key)?;
        let model_id = settings
            .model_id
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Ok(Self {
            client: http_client(timeout)?,
            api_key: settings.api_key.clone(),
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                base_url(settings.base_url.as_deref(), GEMINI_API_URL),
                model_id
            ),
            model_id,
            retry: RetryPolicy::default(),
        })
    }

    /// System messages become `systemInstruction`; assistant turns use the
    /// "model" role.
    fn request_body<'a>(&self, conversation: &'a [ChatMessage]) -> GenerateContentRequest<'a> {
        let system_parts: Vec<Part<'a>> = conversation
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| Part { text: &m.content })
            .collect();

        GenerateContentRequest {
            system_instruction: (!system_parts.is_empty()).then(|| Content {
                role: None,
                parts: system_parts,
            }),
            contents: conversation
                .iter()
                .filter_map(|m| {
                    let role = match m.role {
                        Role::System => return None,
                        Role::User => "user",
                        Role::Assistant => "model",
                    };
                    Some(Content {
                        role: Some(role),
                        parts: vec![Part { text: &m.content }],
                    })
                })
                .collect(),
            generation_config: GenerationConfig {
                max_output_tokens: MAX_OUTPUT_TOKENS,
                temperature: TEMPERATURE,
            },
        }
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn model(&self) -> ModelSelector {
        ModelSelector::Gemini
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn context_window(&self) -> u32 {
        CONTEXT_WINDOW
    }

    fn temperature(&self) -> Option<f32> {
        Some(TEMPERATURE)
    }

    async fn invoke(&self, conversation: &[ChatMessage]) -> Result<Completion, ProviderError> {
        let body = self.request_body(conversation);

        let response: GenerateContentResponse = send_with_retry("Gemini", self.retry, || {
            self.client
                .post(&self.endpoint)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
        })
        .await
        .map_err(|e| e.redact(&self.api_key))?;

        if let Some(usage) = &response.usage_metadata {
            debug!(
                "Gemini call succeeded: prompt_tokens={}, candidate_tokens={}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyContent)?;
        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(ProviderError::EmptyContent);
        }

        Ok(Completion {
            text,
            finish_reason: candidate.finish_reason,
        })
    }
}
