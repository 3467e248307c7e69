// Chat API: prompt construction, provider orchestration, response validation.
// All vendor calls go through llm_client; no direct HTTP calls here.

pub mod handlers;
pub mod models;
pub mod orchestrator;
pub mod prompts;
pub mod tokens;
pub mod validation;
