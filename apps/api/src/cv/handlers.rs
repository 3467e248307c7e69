use axum::{extract::State, Json};

use crate::cv::PublicCv;
use crate::state::AppState;

/// GET /api/cv
pub async fn handle_get_cv(State(state): State<AppState>) -> Json<PublicCv> {
    Json(PublicCv::from_record(&state.cv))
}
