//! Axum route handlers for the Chat API.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use tracing::debug;

use crate::chat::models::{ChatRequest, ChatResponse};
use crate::errors::AppError;
use crate::state::AppState;

/// POST /api/chat
///
/// Answers one conversation turn with the selected model.
/// Malformed JSON is reported as 400 like any other invalid request.
pub async fn handle_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        debug!("Rejected chat body: {rejection}");
        AppError::Validation("Messages and model are required".to_string())
    })?;

    let response = state.orchestrator.handle(request).await?;
    Ok(Json(response))
}
