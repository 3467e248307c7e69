//! Chat Request Orchestrator: turns one client conversation into one
//! provider call.
//!
//! Flow: validate request → strip client system messages → build system
//! prompt → estimate input tokens → invoke provider (timed, bounded) →
//! estimate output tokens → validate response (Gemini, or all providers
//! when configured) → reply with content and debug envelope.
//!
//! Stateless: everything here is request-scoped except the shared CV and
//! adapters. The debug envelope goes back to the caller only; relaying it to
//! the debug window is the browser's job.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::chat::models::{
    ChatMessage, ChatRequest, ChatResponse, DebugEnvelope, DebugRequestData, DebugResponseData,
    InvocationResult, ModelSelector, Role,
};
use crate::chat::prompts::{build_system_prompt, PromptVariant};
use crate::chat::tokens::{conversation_chars, estimate_conversation_tokens, estimate_tokens};
use crate::chat::validation::ResponseValidator;
use crate::errors::AppError;
use crate::llm_client::prompts::REFUSAL_MESSAGE;
use crate::llm_client::{ChatProvider, ProviderError, ProviderSet};
use crate::models::cv::CvRecord;

const MISSING_FIELDS: &str = "Messages and model are required";
const UNSUPPORTED_MODEL: &str = "Unsupported model";
const NO_CONVERSATION: &str = "Messages must include at least one user or assistant message";

/// Which providers have their answers checked by the response validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationScope {
    /// Gemini only. The other providers are trusted as-is.
    GeminiOnly,
    AllProviders,
}

impl ValidationScope {
    pub fn applies_to(&self, model: ModelSelector) -> bool {
        match self {
            ValidationScope::GeminiOnly => model == ModelSelector::Gemini,
            ValidationScope::AllProviders => true,
        }
    }
}

pub struct ChatOrchestrator {
    cv: Arc<CvRecord>,
    providers: ProviderSet,
    validator: ResponseValidator,
    validation_scope: ValidationScope,
    provider_timeout: Duration,
}

impl ChatOrchestrator {
    pub fn new(
        cv: Arc<CvRecord>,
        providers: ProviderSet,
        validator: ResponseValidator,
        validation_scope: ValidationScope,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            cv,
            providers,
            validator,
            validation_scope,
            provider_timeout,
        }
    }

    pub async fn handle(&self, request: ChatRequest) -> Result<ChatResponse, AppError> {
        let (model, messages) = parse_request(request)?;

        let span = tracing::info_span!("chat", request_id = %Uuid::new_v4(), model = %model);
        self.run(model, messages).instrument(span).await
    }

    async fn run(
        &self,
        model: ModelSelector,
        client_messages: Vec<ChatMessage>,
    ) -> Result<ChatResponse, AppError> {
        let provider = self.providers.get(model).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("No provider configured for {model}"))
        })?;

        let system_prompt = build_system_prompt(&self.cv, PromptVariant::for_model(model));
        let mut conversation = Vec::with_capacity(client_messages.len() + 1);
        conversation.push(ChatMessage::system(system_prompt));
        conversation.extend(client_messages.iter().cloned());

        let result = self.invoke(provider.as_ref(), &conversation).await?;

        info!(
            "{} answered: input_tokens~{}, output_tokens~{}, latency={}ms",
            provider.model_id(),
            result.input_token_estimate,
            result.output_token_estimate,
            result.latency_millis
        );

        if self.validation_scope.applies_to(model) {
            let outcome = self.validator.validate(&result.text);
            if !outcome.passed {
                warn!(
                    unknown_companies = ?outcome.unknown_companies,
                    out_of_range_years = ?outcome.out_of_range_years,
                    "Response failed CV validation; substituting refusal"
                );
                return Ok(ChatResponse {
                    content: REFUSAL_MESSAGE.to_string(),
                    model,
                    debug: None,
                });
            }
        }

        let envelope = debug_envelope(provider.as_ref(), client_messages, &result);

        Ok(ChatResponse {
            content: result.text,
            model,
            debug: Some(envelope),
        })
    }

    /// Calls the provider under the configured timeout and measures it.
    async fn invoke(
        &self,
        provider: &dyn ChatProvider,
        conversation: &[ChatMessage],
    ) -> Result<InvocationResult, AppError> {
        let model = provider.model();
        let input_chars = conversation_chars(conversation);

        let started = Instant::now();
        let completion = tokio::time::timeout(self.provider_timeout, provider.invoke(conversation))
            .await
            .unwrap_or(Err(ProviderError::Timeout {
                after_secs: self.provider_timeout.as_secs(),
            }))
            .map_err(|source| AppError::Provider { model, source })?;
        let latency_millis = started.elapsed().as_millis() as u64;

        let output_chars = completion.text.chars().count();

        Ok(InvocationResult {
            input_token_estimate: estimate_conversation_tokens(conversation),
            output_token_estimate: estimate_tokens(output_chars),
            total_token_estimate: estimate_tokens(input_chars + output_chars),
            latency_millis,
            finish_reason: completion.finish_reason,
            text: completion.text,
        })
    }
}

/// Checks required fields and the model tag, then drops client system
/// messages. No provider is touched on any failure here.
pub fn parse_request(
    request: ChatRequest,
) -> Result<(ModelSelector, Vec<ChatMessage>), AppError> {
    let messages = request.messages.filter(|m| !m.is_empty());
    let model = request.model.filter(|m| !m.trim().is_empty());

    let (Some(messages), Some(model)) = (messages, model) else {
        return Err(AppError::Validation(MISSING_FIELDS.to_string()));
    };

    let model = model
        .parse::<ModelSelector>()
        .map_err(|_| AppError::Validation(UNSUPPORTED_MODEL.to_string()))?;

    let messages = strip_system_messages(messages);
    if messages.is_empty() {
        return Err(AppError::Validation(NO_CONVERSATION.to_string()));
    }

    Ok((model, messages))
}

/// The orchestrator is the only author of the system prompt; client
/// system messages are discarded, never merged.
pub fn strip_system_messages(messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    messages
        .into_iter()
        .filter(|m| m.role != Role::System)
        .collect()
}

fn debug_envelope(
    provider: &dyn ChatProvider,
    messages: Vec<ChatMessage>,
    result: &InvocationResult,
) -> DebugEnvelope {
    DebugEnvelope {
        model: provider.model(),
        timestamp: Utc::now(),
        request_data: DebugRequestData {
            input_tokens: result.input_token_estimate,
            context_window: provider.context_window(),
            messages,
            model: provider.model(),
            temperature: provider.temperature(),
            max_tokens: Some(provider.max_output_tokens()),
        },
        response_data: DebugResponseData {
            output_tokens: result.output_token_estimate,
            total_tokens: result.total_token_estimate,
            latency: result.latency_millis,
            content: result.text.clone(),
            finish_reason: result.finish_reason.clone(),
        },
    }
}
