use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Service version plus a summary of the loaded CV.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "cv-api",
        "cvOwner": state.cv.personal_info.name,
        "cvRoles": state.cv.work_experience.len(),
    }))
}
