//! Shared-secret site gate.
//!
//! A single equality check against `SECRET_CODE`. This keeps casual visitors
//! out of the site; it is not authentication.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyCodeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

pub fn verify_code(submitted: Option<&str>, secret: &str) -> bool {
    submitted.is_some_and(|code| code == secret)
}

/// POST /api/verify-code
pub async fn handle_verify_code(
    State(state): State<AppState>,
    payload: Result<Json<VerifyCodeRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Rejected verify-code body: {rejection}");
            return (
                StatusCode::BAD_REQUEST,
                Json(VerifyCodeResponse {
                    success: false,
                    error: Some("Invalid request"),
                }),
            )
                .into_response();
        }
    };

    let success = verify_code(request.code.as_deref(), &state.config.secret_code);
    info!(success, "Secret code check");

    Json(VerifyCodeResponse {
        success,
        error: None,
    })
    .into_response()
}
