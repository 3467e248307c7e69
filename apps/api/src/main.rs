mod access;
mod chat;
mod config;
mod cv;
mod errors;
mod llm_client;
mod models;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::chat::orchestrator::{ChatOrchestrator, ValidationScope};
use crate::chat::validation::ResponseValidator;
use crate::config::Config;
use crate::llm_client::ProviderSet;
use crate::models::cv::CvRecord;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing or placeholder credentials)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CV API v{}", env!("CARGO_PKG_VERSION"));

    // Load CV data
    let cv = Arc::new(CvRecord::load(config.cv_path.as_deref())?);
    info!(
        "CV loaded for {} ({} roles, {} skills)",
        cv.personal_info.name,
        cv.work_experience.len(),
        cv.skills.len()
    );

    // Initialize provider adapters
    let providers = ProviderSet::from_config(&config)?;
    info!(
        "{} chat providers configured (timeout: {}s)",
        providers.len(),
        config.provider_timeout.as_secs()
    );

    // Response validator: Gemini only unless VALIDATE_ALL_PROVIDERS is set
    let validator = ResponseValidator::with_watchlist(&cv, &config.validator_watchlist);
    let validation_scope = if config.validate_all_providers {
        ValidationScope::AllProviders
    } else {
        ValidationScope::GeminiOnly
    };
    info!("Response validation scope: {validation_scope:?}");

    let orchestrator = ChatOrchestrator::new(
        cv.clone(),
        providers,
        validator,
        validation_scope,
        config.provider_timeout,
    );

    // Build app state
    let state = AppState {
        cv,
        orchestrator: Arc::new(orchestrator),
        config: config.clone(),
    };

    if let Some(dir) = &config.site_dir {
        info!("Serving static site from {}", dir.display());
    }

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
