use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::chat::models::ModelSelector;
use crate::llm_client::ProviderError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{model} provider error: {source}")]
    Provider {
        model: ModelSelector,
        #[source]
        source: ProviderError,
    },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Provider { model, source } => {
                tracing::error!(
                    model = %model,
                    error_name = source.name(),
                    "Provider error: {source}"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": format!("Failed to process request with {model}"),
                        "details": model.failure_hint(),
                        "technicalDetails": {
                            "name": source.name(),
                            "message": source.to_string(),
                        }
                    }),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "An error occurred while processing the request" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::Value;

    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_maps_to_400_with_error_string() {
        let response = AppError::Validation("Unsupported model".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({ "error": "Unsupported model" }));
    }

    #[tokio::test]
    async fn test_provider_error_carries_hint_and_details() {
        let response = AppError::Provider {
            model: ModelSelector::Claude,
            source: ProviderError::Api {
                status: 401,
                message: "invalid x-api-key".to_string(),
            },
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Failed to process request with claude");
        assert_eq!(body["details"], ModelSelector::Claude.failure_hint());
        assert_eq!(body["technicalDetails"]["name"], "ApiError");
        assert_eq!(
            body["technicalDetails"]["message"],
            "API error (status 401): invalid x-api-key"
        );
    }

    #[tokio::test]
    async fn test_internal_error_hides_cause() {
        let response = AppError::Internal(anyhow::anyhow!("secret detail")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(!body.to_string().contains("secret detail"));
    }
}
