use std::sync::Arc;

use crate::chat::orchestrator::ChatOrchestrator;
use crate::config::Config;
use crate::models::cv::CvRecord;

/// Shared application state injected into all route handlers via Axum extractors.
/// Everything here is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub cv: Arc<CvRecord>,
    pub orchestrator: Arc<ChatOrchestrator>,
    pub config: Config,
}
