pub mod health;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;

use crate::pipeline::handlers::{self, OUTPUT_ROUTE};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let output = ServeDir::new(&state.config.output_dir);

    Router::new()
        .route("/health", get(health::health_handler))
        // Story API
        .route("/api/v1/stories/generate", post(handlers::handle_generate))
        .route("/api/v1/stories/status", get(handlers::handle_status))
        .route("/api/v1/stories/current", get(handlers::handle_current))
        .route(
            "/api/v1/stories/current/accept",
            post(handlers::handle_accept),
        )
        // Generated images, cards and the PDF
        .nest_service(OUTPUT_ROUTE, output)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::assets::ArtifactLayout;
    use crate::config::Config;
    use crate::layout::{CardCompositor, CardFont};
    use crate::pipeline::guard::RunSlot;
    use crate::pipeline::status::StatusChannel;
    use crate::story::models::fixtures::sample_concept;
    use crate::story::ConceptGenerator;
    use crate::test_support::{FakeImages, MemoryHistory, PanickingConcepts, ScriptedConcepts, ScriptedGate};

    fn test_config(output_dir: PathBuf) -> Config {
        Config {
            google_api_key: "test-key".to_string(),
            text_model: "gemini-2.0-flash".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            history_path: output_dir.with_file_name("history.json"),
            output_dir,
            max_attempts: 3,
            page_count: 2,
            history_limit: 5,
            page_delay: Duration::ZERO,
            retry_delay: Duration::ZERO,
            font_paths: Vec::new(),
            port: 0,
            rust_log: "info".to_string(),
        }
    }

    fn test_state(dir: &tempfile::TempDir) -> (AppState, Arc<MemoryHistory>) {
        let concepts = ScriptedConcepts::new(vec![Ok(sample_concept(2, &["Sofia"]))]);
        test_state_with(dir, Arc::new(concepts))
    }

    fn test_state_with(
        dir: &tempfile::TempDir,
        concepts: Arc<dyn ConceptGenerator>,
    ) -> (AppState, Arc<MemoryHistory>) {
        let history = Arc::new(MemoryHistory::default());
        let state = AppState {
            config: test_config(dir.path().join("output")),
            concepts,
            gate: Arc::new(ScriptedGate::new(vec![])),
            images: Arc::new(FakeImages::default()),
            history: history.clone(),
            compositor: Arc::new(CardCompositor::new(CardFont::Builtin)),
            status: StatusChannel::new(),
            run_slot: RunSlot::new(),
        };
        (state, history)
    }

    async fn send(state: &AppState, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = build_router(state.clone())
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    /// Polls until the background run has published its terminal status and
    /// released the run slot.
    async fn wait_until_idle(state: &AppState) {
        tokio::time::timeout(Duration::from_secs(30), async {
            while state.status.snapshot().is_generating || state.run_slot.is_busy() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("run did not finish");
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = test_state(&dir);
        let (status, body) = send(&state, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_status_starts_ready() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = test_state(&dir);
        let (status, body) = send(&state, "GET", "/api/v1/stories/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_generating"], false);
        assert_eq!(body["status"], "Ready");
    }

    #[tokio::test]
    async fn test_generate_rejects_unknown_level() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = test_state(&dir);
        let (status, body) = send(
            &state,
            "POST",
            "/api/v1/stories/generate",
            Some(r#"{"level":"Expert"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(!state.run_slot.is_busy());
    }

    #[tokio::test]
    async fn test_generate_conflicts_while_a_run_is_active() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = test_state(&dir);
        let _held = state.run_slot.try_acquire().unwrap();

        let (status, body) = send(
            &state,
            "POST",
            "/api/v1/stories/generate",
            Some(r#"{"level":"Beginner"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_current_without_story_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = test_state(&dir);
        let (status, body) = send(&state, "GET", "/api/v1/stories/current", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_accept_saves_current_story_to_history() {
        let dir = tempfile::tempdir().unwrap();
        let (state, history) = test_state(&dir);
        ArtifactLayout::new(dir.path().join("output"))
            .write_concept(&sample_concept(2, &["Sofia"]))
            .await
            .unwrap();

        let (status, body) = send(&state, "POST", "/api/v1/stories/current/accept", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["saved"], true);
        assert_eq!(body["title_fi"], "Päivä torilla");
        assert_eq!(history.saved_count(), 1);
    }

    #[tokio::test]
    async fn test_generate_runs_to_completion_in_background() {
        let dir = tempfile::tempdir().unwrap();
        let (state, history) = test_state(&dir);

        let (status, body) = send(
            &state,
            "POST",
            "/api/v1/stories/generate",
            Some(r#"{"level":"intermediate"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["level"], "Intermediate");

        wait_until_idle(&state).await;

        let snapshot = state.status.snapshot();
        assert_eq!(snapshot.status, "Complete");
        assert_eq!(snapshot.logs.last().map(String::as_str), Some("All done! PDF created."));

        let (status, body) = send(&state, "GET", "/api/v1/stories/current", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["cards"],
            serde_json::json!(["/output/cards/story_card_1.png", "/output/cards/story_card_2.png"])
        );
        assert_eq!(body["pdf"], "/output/story.pdf");
        assert_eq!(history.saved_count(), 0);
    }

    #[tokio::test]
    async fn test_panicking_run_still_publishes_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = test_state_with(&dir, Arc::new(PanickingConcepts));

        let (status, _) = send(&state, "POST", "/api/v1/stories/generate", None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        wait_until_idle(&state).await;

        let snapshot = state.status.snapshot();
        assert!(!snapshot.is_generating);
        assert!(snapshot.status.starts_with("Failed: run aborted"), "{}", snapshot.status);

        // The slot is free again, so the next request is accepted.
        let (status, _) = send(&state, "POST", "/api/v1/stories/generate", None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        wait_until_idle(&state).await;
    }

    #[tokio::test]
    async fn test_exhausted_run_reports_last_retry_reason() {
        let dir = tempfile::tempdir().unwrap();
        // Every call fails to parse once the empty script runs out.
        let (state, _) = test_state_with(&dir, Arc::new(ScriptedConcepts::new(vec![])));

        let (status, _) = send(&state, "POST", "/api/v1/stories/generate", None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        wait_until_idle(&state).await;

        let snapshot = state.status.snapshot();
        assert_eq!(
            snapshot.status,
            "Failed: no story accepted after 3 attempt(s); last reason: malformed concept: script exhausted"
        );
        assert!(!snapshot.status.contains("grammar"));
    }

    #[tokio::test]
    async fn test_output_files_are_served() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = test_state(&dir);
        let layout = ArtifactLayout::new(dir.path().join("output"));
        layout.reset().await.unwrap();
        std::fs::write(layout.document_path(), b"%PDF-1.5").unwrap();

        let response = build_router(state)
            .oneshot(Request::get("/output/story.pdf").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
