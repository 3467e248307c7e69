use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[cfg(test)]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[cfg(test)]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Which provider answers a request. The set is closed: adding a tag means
/// adding an adapter in `llm_client`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelSelector {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "claude")]
    Claude,
    #[serde(rename = "gemini")]
    Gemini,
}

impl ModelSelector {
    pub const ALL: [ModelSelector; 3] = [
        ModelSelector::OpenAi,
        ModelSelector::Claude,
        ModelSelector::Gemini,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSelector::OpenAi => "openai",
            ModelSelector::Claude => "claude",
            ModelSelector::Gemini => "gemini",
        }
    }

    /// Operator-facing hint returned with provider failures.
    pub fn failure_hint(&self) -> &'static str {
        match self {
            ModelSelector::OpenAi => "Error with OpenAI API. Check API key and configuration.",
            ModelSelector::Claude => {
                "Error with Anthropic Claude API. Check API key and configuration."
            }
            ModelSelector::Gemini => {
                "Error with Google Gemini API. Check API key and configuration."
            }
        }
    }
}

impl fmt::Display for ModelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownModel(pub String);

impl FromStr for ModelSelector {
    type Err = UnknownModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelSelector::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownModel(s.to_string()))
    }
}

/// Body of `POST /api/chat`. Both fields are optional at the wire level so
/// that absence is reported as a 400 by the orchestrator, not by serde.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    pub messages: Option<Vec<ChatMessage>>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub content: String,
    pub model: ModelSelector,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugEnvelope>,
}

/// What an adapter hands back before the orchestrator adds measurements.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub finish_reason: Option<String>,
}

/// Usage figures for one provider call. Token counts are chars/4 estimates.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationResult {
    pub text: String,
    pub input_token_estimate: u32,
    pub output_token_estimate: u32,
    pub total_token_estimate: u32,
    pub latency_millis: u64,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugRequestData {
    pub input_tokens: u32,
    pub context_window: u32,
    pub messages: Vec<ChatMessage>,
    pub model: ModelSelector,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugResponseData {
    pub output_tokens: u32,
    pub total_tokens: u32,
    pub latency: u64,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Per-call telemetry for the debug window. Observational only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugEnvelope {
    pub model: ModelSelector,
    pub timestamp: DateTime<Utc>,
    pub request_data: DebugRequestData,
    pub response_data: DebugResponseData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_selector_parses_known_tags() {
        assert_eq!("openai".parse::<ModelSelector>(), Ok(ModelSelector::OpenAi));
        assert_eq!("claude".parse::<ModelSelector>(), Ok(ModelSelector::Claude));
        assert_eq!("gemini".parse::<ModelSelector>(), Ok(ModelSelector::Gemini));
    }

    #[test]
    fn test_model_selector_rejects_unknown_and_case_variants() {
        assert!("unknown".parse::<ModelSelector>().is_err());
        assert!("OpenAI".parse::<ModelSelector>().is_err());
        assert!("".parse::<ModelSelector>().is_err());
    }

    #[test]
    fn test_failure_hints_are_distinct() {
        let hints: std::collections::HashSet<_> =
            ModelSelector::ALL.iter().map(|m| m.failure_hint()).collect();
        assert_eq!(hints.len(), 3);
    }

    #[test]
    fn test_chat_request_tolerates_missing_fields() {
        let req: ChatRequest = serde_json::from_str("{}").unwrap();
        assert!(req.messages.is_none());
        assert!(req.model.is_none());
    }

    #[test]
    fn test_debug_envelope_uses_camel_case() {
        let envelope = DebugEnvelope {
            model: ModelSelector::Claude,
            timestamp: Utc::now(),
            request_data: DebugRequestData {
                input_tokens: 10,
                context_window: 200_000,
                messages: vec![ChatMessage::user("hi")],
                model: ModelSelector::Claude,
                temperature: None,
                max_tokens: Some(300),
            },
            response_data: DebugResponseData {
                output_tokens: 2,
                total_tokens: 12,
                latency: 40,
                content: "hello".to_string(),
                finish_reason: Some("stop".to_string()),
            },
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["model"], "claude");
        assert_eq!(value["requestData"]["contextWindow"], 200_000);
        assert_eq!(value["requestData"]["maxTokens"], 300);
        assert!(value["requestData"].get("temperature").is_none());
        assert_eq!(value["responseData"]["finishReason"], "stop");
    }
}
