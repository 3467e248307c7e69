//! LLM provider adapters. The single point of entry for all vendor API calls.
//!
//! ARCHITECTURAL RULE: No other module may call a vendor API directly.
//! Each vendor sits behind `ChatProvider`; the orchestrator only sees
//! `Completion` values and `ProviderError`s.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::warn;

use crate::chat::models::{ChatMessage, Completion, ModelSelector};
use crate::config::{Config, ConfigError};

pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod prompts;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// Output cap applied to every provider.
pub const MAX_OUTPUT_TOKENS: u32 = 300;
/// Context window reported by a provider with no published figure.
pub const DEFAULT_CONTEXT_WINDOW: u32 = 32_000;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("Provider returned empty content")]
    EmptyContent,

    #[error("Provider did not respond within {after_secs}s")]
    Timeout { after_secs: u64 },
}

impl ProviderError {
    /// Stable name reported in `technicalDetails`.
    pub fn name(&self) -> &'static str {
        match self {
            ProviderError::Http(_) => "HttpError",
            ProviderError::Api { .. } => "ApiError",
            ProviderError::Parse(_) => "ParseError",
            ProviderError::RateLimited { .. } => "RateLimitedError",
            ProviderError::EmptyContent => "EmptyContentError",
            ProviderError::Timeout { .. } => "TimeoutError",
        }
    }

    /// Scrubs `secret` from any vendor-supplied message.
    pub fn redact(self, secret: &str) -> Self {
        match self {
            ProviderError::Api { status, message } if !secret.is_empty() => ProviderError::Api {
                status,
                message: message.replace(secret, "[REDACTED]"),
            },
            other => other,
        }
    }
}

/// Uniform contract over every vendor SDK.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn model(&self) -> ModelSelector;

    /// Vendor model identifier, e.g. "gpt-4-turbo-preview".
    fn model_id(&self) -> &str;

    /// Fixed per provider, whatever model id is configured. Reported for
    /// telemetry only; never enforced.
    fn context_window(&self) -> u32 {
        DEFAULT_CONTEXT_WINDOW
    }

    fn max_output_tokens(&self) -> u32 {
        MAX_OUTPUT_TOKENS
    }

    fn temperature(&self) -> Option<f32> {
        None
    }

    /// Sends the full conversation (system prompt first) and returns the reply.
    async fn invoke(&self, conversation: &[ChatMessage]) -> Result<Completion, ProviderError>;
}

/// The configured adapter for each model tag. Read-only after startup.
#[derive(Clone, Default)]
pub struct ProviderSet {
    providers: HashMap<ModelSelector, Arc<dyn ChatProvider>>,
}

impl ProviderSet {
    /// Builds all three adapters. Fails if any credential is unusable.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::default()
            .with(Arc::new(OpenAiProvider::new(
                &config.openai,
                config.provider_timeout,
            )?))
            .with(Arc::new(AnthropicProvider::new(
                &config.anthropic,
                config.provider_timeout,
            )?))
            .with(Arc::new(GeminiProvider::new(
                &config.gemini,
                config.provider_timeout,
            )?)))
    }

    pub fn with(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        self.providers.insert(provider.model(), provider);
        self
    }

    pub fn get(&self, model: ModelSelector) -> Option<Arc<dyn ChatProvider>> {
        self.providers.get(&model).cloned()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }
}

/// Shared HTTP client with a request timeout.
pub(crate) fn http_client(timeout: Duration) -> Result<Client, ConfigError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

pub(crate) fn base_url(configured: Option<&str>, default: &str) -> String {
    configured.unwrap_or(default).trim_end_matches('/').to_string()
}

/// Attempt budget for one vendor call. Only 429, 5xx and transport errors
/// are retried.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each further failure.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    fn delay_before(&self, attempt: u32) -> Duration {
        self.base_delay * (1 << (attempt - 1))
    }
}

/// The `{"error": {"message": ...}}` shape shared by all three vendors.
#[derive(Debug, Deserialize)]
struct VendorError {
    error: VendorErrorBody,
}

#[derive(Debug, Deserialize)]
struct VendorErrorBody {
    message: String,
}

/// Sends a request built by `build` and decodes the JSON reply.
/// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
pub(crate) async fn send_with_retry<T: DeserializeOwned>(
    vendor: &str,
    policy: RetryPolicy,
    build: impl Fn() -> RequestBuilder,
) -> Result<T, ProviderError> {
    let mut last_error: Option<ProviderError> = None;

    for attempt in 0..policy.max_attempts {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s with the default policy
            let delay = policy.delay_before(attempt);
            warn!(
                "{vendor} call attempt {} failed, retrying after {}ms...",
                attempt,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }

        let response = match build().send().await {
            Ok(r) => r,
            Err(e) => {
                last_error = Some(ProviderError::Http(e));
                continue;
            }
        };

        let status = response.status();

        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("{vendor} API returned {status}: {body}");
            last_error = Some(ProviderError::Api {
                status: status.as_u16(),
                message: vendor_message(body),
            });
            continue;
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: vendor_message(body),
            });
        }

        let body = response.text().await?;
        return Ok(serde_json::from_str(&body)?);
    }

    Err(last_error.unwrap_or(ProviderError::RateLimited {
        retries: policy.max_attempts,
    }))
}

/// Extracts the vendor's error message, falling back to the raw body.
fn vendor_message(body: String) -> String {
    serde_json::from_str::<VendorError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

/// A local stand-in for a vendor API: answers every POST with the next
/// scripted reply and counts the hits.
#[cfg(test)]
pub(crate) mod stub_vendor {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::State,
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
        Json, Router,
    };
    use serde_json::Value;

    use super::RetryPolicy;

    /// Fast policy for tests: same attempt budget, millisecond backoff.
    pub const QUICK_RETRY: RetryPolicy = RetryPolicy {
        max_attempts: 3,
        base_delay: std::time::Duration::from_millis(5),
    };

    #[derive(Clone, Default)]
    struct Script {
        replies: Arc<Vec<(u16, Value)>>,
        hits: Arc<AtomicUsize>,
        headers: Arc<Mutex<Vec<HeaderMap>>>,
        bodies: Arc<Mutex<Vec<Value>>>,
    }

    pub struct StubVendor {
        pub base_url: String,
        script: Script,
    }

    impl StubVendor {
        pub fn hits(&self) -> usize {
            self.script.hits.load(Ordering::SeqCst)
        }

        pub fn last_headers(&self) -> HeaderMap {
            self.script.headers.lock().unwrap().last().cloned().unwrap_or_default()
        }

        pub fn last_body(&self) -> Value {
            self.script.bodies.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    /// Serves `replies` in order; the last one repeats once the script runs out.
    pub async fn spawn(replies: Vec<(u16, Value)>) -> StubVendor {
        let script = Script {
            replies: Arc::new(replies),
            ..Script::default()
        };
        let app = Router::new().fallback(reply).with_state(script.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        StubVendor {
            base_url: format!("http://{addr}"),
            script,
        }
    }

    async fn reply(State(script): State<Script>, headers: HeaderMap, body: String) -> Response {
        let n = script.hits.fetch_add(1, Ordering::SeqCst);
        script.headers.lock().unwrap().push(headers);
        script
            .bodies
            .lock()
            .unwrap()
            .push(serde_json::from_str(&body).unwrap_or(Value::Null));

        let (status, json) = &script.replies[n.min(script.replies.len() - 1)];
        (StatusCode::from_u16(*status).unwrap(), Json(json.clone())).into_response()
    }
}
