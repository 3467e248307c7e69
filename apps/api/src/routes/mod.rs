pub mod health;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;

use crate::state::AppState;
use crate::{access, chat, cv};

pub fn build_router(state: AppState) -> Router {
    let site_dir = state.config.site_dir.clone();

    let router = Router::new()
        .route("/health", get(health::health_handler))
        // Chat API
        .route("/api/chat", post(chat::handlers::handle_chat))
        // Site gate and page data
        .route("/api/verify-code", post(access::handle_verify_code))
        .route("/api/cv", get(cv::handlers::handle_get_cv))
        .with_state(state);

    match site_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true)),
        None => router,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::chat::models::ModelSelector;
    use crate::chat::orchestrator::test_support::{orchestrator_with, FakeProvider, Reply};
    use crate::chat::orchestrator::ValidationScope;
    use crate::config::test_config;
    use crate::llm_client::prompts::REFUSAL_MESSAGE;
    use crate::models::cv::{CvRecord, EMBEDDED_CV};

    struct Harness {
        router: Router,
        openai: Arc<FakeProvider>,
        claude: Arc<FakeProvider>,
        gemini: Arc<FakeProvider>,
    }

    fn harness(gemini_reply: Reply) -> Harness {
        let cv = CvRecord::from_json(EMBEDDED_CV).unwrap();
        let openai = FakeProvider::new(
            ModelSelector::OpenAi,
            Reply::Text("At HSBC I lead the automated multi-vendor WAF programme."),
        );
        let claude = FakeProvider::new(ModelSelector::Claude, Reply::Fail);
        let gemini = FakeProvider::new(ModelSelector::Gemini, gemini_reply);
        let orchestrator = orchestrator_with(
            cv.clone(),
            &[openai.clone(), claude.clone(), gemini.clone()],
            ValidationScope::GeminiOnly,
        );
        let state = AppState {
            cv: Arc::new(cv),
            orchestrator: Arc::new(orchestrator),
            config: test_config(),
        };
        Harness {
            router: build_router(state),
            openai,
            claude,
            gemini,
        }
    }

    impl Harness {
        fn total_calls(&self) -> usize {
            self.openai.call_count() + self.claude.call_count() + self.gemini.call_count()
        }
    }

    async fn post(router: &Router, uri: &str, body: String) -> (StatusCode, Value) {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_openai_question_about_hsbc() {
        let h = harness(Reply::Text("unused"));
        let body = json!({
            "messages": [{"role": "user", "content": "What did you do at HSBC?"}],
            "model": "openai"
        });
        let (status, json) = post(&h.router, "/api/chat", body.to_string()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["model"], "openai");
        assert!(!json["content"].as_str().unwrap().is_empty());
        assert_eq!(json["debug"]["requestData"]["contextWindow"], 1_000);
        assert_eq!(h.openai.call_count(), 1);

        let sent = h.openai.last_conversation.lock().unwrap().clone();
        assert!(sent[0].content.contains("at HSBC"));
    }

    #[tokio::test]
    async fn test_unknown_model_is_400_without_provider_calls() {
        let h = harness(Reply::Text("unused"));
        let body = json!({
            "messages": [{"role": "user", "content": "Hello"}],
            "model": "unknown"
        });
        let (status, json) = post(&h.router, "/api/chat", body.to_string()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Unsupported model");
        assert_eq!(h.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_fields_are_400_without_provider_calls() {
        let h = harness(Reply::Text("unused"));
        for body in [
            json!({"model": "openai"}).to_string(),
            json!({"messages": [{"role": "user", "content": "Hi"}]}).to_string(),
            json!({"messages": [], "model": "openai"}).to_string(),
            "not json".to_string(),
        ] {
            let (status, json) = post(&h.router, "/api/chat", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["error"], "Messages and model are required");
        }
        assert_eq!(h.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_gemini_fictitious_company_gets_refusal() {
        let h = harness(Reply::Text(
            "Paul spent 2010 to 2012 as CTO of Globex before joining HSBC.",
        ));
        let body = json!({
            "messages": [{"role": "user", "content": "Tell me about your career"}],
            "model": "gemini"
        });
        let (status, json) = post(&h.router, "/api/chat", body.to_string()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["content"], REFUSAL_MESSAGE);
        assert_eq!(json["model"], "gemini");
        assert!(json.get("debug").is_none());
    }

    #[tokio::test]
    async fn test_gemini_grounded_answer_passes() {
        let h = harness(Reply::Text("Since July 2023 Paul has worked at HSBC."));
        let body = json!({
            "messages": [{"role": "user", "content": "Where do you work?"}],
            "model": "gemini"
        });
        let (status, json) = post(&h.router, "/api/chat", body.to_string()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["content"], "Since July 2023 Paul has worked at HSBC.");
        assert_eq!(json["debug"]["model"], "gemini");
    }

    #[tokio::test]
    async fn test_provider_failure_is_500_with_hint() {
        let h = harness(Reply::Text("unused"));
        let body = json!({
            "messages": [{"role": "user", "content": "Hi"}],
            "model": "claude"
        });
        let (status, json) = post(&h.router, "/api/chat", body.to_string()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Failed to process request with claude");
        assert_eq!(json["details"], ModelSelector::Claude.failure_hint());
        assert_eq!(json["technicalDetails"]["name"], "ApiError");
    }

    #[tokio::test]
    async fn test_verify_code() {
        let h = harness(Reply::Text("unused"));

        let (status, json) =
            post(&h.router, "/api/verify-code", json!({"code": "open-sesame"}).to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"success": true}));

        let (status, json) =
            post(&h.router, "/api/verify-code", json!({"code": "guess"}).to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"success": false}));

        let (status, json) = post(&h.router, "/api/verify-code", "{".to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({"success": false, "error": "Invalid request"}));
    }

    #[tokio::test]
    async fn test_public_cv_and_health() {
        let h = harness(Reply::Text("unused"));

        let response = h
            .router
            .clone()
            .oneshot(Request::builder().uri("/api/cv").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["workExperience"][0]["company"], "HSBC");
        assert!(json["personalInfo"].get("email").is_none());

        let response = h
            .router
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["cvRoles"], 14);
    }

    #[tokio::test]
    async fn test_debug_envelope_stays_with_its_own_request() {
        let h = harness(Reply::Text("unused"));

        let first = json!({
            "messages": [{"role": "user", "content": "my private question about salary"}],
            "model": "openai"
        });
        let (status, first) = post(&h.router, "/api/chat", first.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            first["debug"]["requestData"]["messages"][0]["content"],
            "my private question about salary"
        );

        let second = json!({
            "messages": [{"role": "user", "content": "What did you do at HSBC?"}],
            "model": "openai"
        });
        let (status, second) = post(&h.router, "/api/chat", second.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        let messages = second["debug"]["requestData"]["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(!second.to_string().contains("salary"));

        // Envelopes are never relayed server-side.
        let response = h
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/debug/stream")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
