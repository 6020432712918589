//! Axum route handlers for the Story API.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::document::collect_cards;
use crate::errors::AppError;
use crate::pipeline::orchestrator::RunOutcome;
use crate::pipeline::status::GenerationStatus;
use crate::state::AppState;
use crate::story::{Level, StoryConcept};

/// URL prefix under which the output root is served.
pub const OUTPUT_ROUTE: &str = "/output";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub level: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub run_id: Uuid,
    pub level: Level,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct CurrentStoryResponse {
    pub story: StoryConcept,
    /// Card URLs in page order.
    pub cards: Vec<String>,
    pub pdf: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AcceptResponse {
    pub saved: bool,
    pub title_fi: String,
    pub title_en: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/stories/generate
///
/// Starts a run in the background and returns immediately.
/// Progress is polled through the status endpoint.
pub async fn handle_generate(
    State(state): State<AppState>,
    body: Option<Json<GenerateRequest>>,
) -> Result<(StatusCode, Json<GenerateResponse>), AppError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let level = match request.level.as_deref() {
        Some(raw) => raw
            .parse::<Level>()
            .map_err(|e| AppError::Validation(e.to_string()))?,
        None => Level::default(),
    };

    let guard = state
        .run_slot
        .try_acquire()
        .ok_or_else(|| AppError::Conflict("A story is already being generated".to_string()))?;

    let run_id = Uuid::new_v4();
    state.status.begin(run_id);
    info!(%run_id, %level, "Story generation requested");

    let orchestrator = state.orchestrator();
    let status = state.status.clone();
    let max_attempts = state.config.max_attempts;

    tokio::spawn(async move {
        let _guard = guard;
        // The run gets its own task so a panic inside it still reaches `finish`.
        let run = tokio::spawn(async move { orchestrator.run(level, max_attempts).await });

        match run.await {
            Ok(Ok(RunOutcome::Completed(report))) => {
                info!(
                    %run_id,
                    title = %report.concept.title_fi,
                    attempts = report.attempts,
                    pages = report.document.page_count,
                    "Run complete"
                );
                status.finish("Complete");
            }
            Ok(Ok(RunOutcome::Exhausted { attempts, last_reason })) => {
                warn!(%run_id, attempts, ?last_reason, "Run exhausted its attempt budget");
                status.finish(&exhausted_status(attempts, last_reason.as_deref()));
            }
            Ok(Err(e)) => {
                error!(%run_id, "Run failed: {e}");
                status.finish(&format!("Failed: {e}"));
            }
            Err(e) => {
                error!(%run_id, "Run task aborted: {e}");
                status.finish(&format!("Failed: run aborted ({e})"));
            }
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(GenerateResponse {
            run_id,
            level,
            status: "started".to_string(),
        }),
    ))
}

/// Terminal status for a run that used up its attempts.
fn exhausted_status(attempts: u32, last_reason: Option<&str>) -> String {
    match last_reason {
        Some(reason) => format!("Failed: no story accepted after {attempts} attempt(s); last reason: {reason}"),
        None => format!("Failed: no story accepted after {attempts} attempt(s)"),
    }
}

/// GET /api/v1/stories/status
pub async fn handle_status(State(state): State<AppState>) -> Json<GenerationStatus> {
    Json(state.status.snapshot())
}

/// GET /api/v1/stories/current
///
/// The concept of the last run together with its card and PDF URLs.
pub async fn handle_current(State(state): State<AppState>) -> Result<Json<CurrentStoryResponse>, AppError> {
    let artifacts = state.artifacts();
    let story = artifacts
        .read_concept()
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .ok_or_else(|| AppError::NotFound("No story found".to_string()))?;

    let cards_dir = artifacts.cards_dir();
    let cards: Vec<String> = tokio::task::spawn_blocking(move || collect_cards(&cards_dir))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(|e| AppError::Internal(e.into()))?
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| format!("{OUTPUT_ROUTE}/cards/{}", name.to_string_lossy()))
        .collect();

    let pdf = tokio::fs::try_exists(artifacts.document_path())
        .await
        .unwrap_or(false)
        .then(|| format!("{OUTPUT_ROUTE}/story.pdf"));

    Ok(Json(CurrentStoryResponse { story, cards, pdf }))
}

/// POST /api/v1/stories/current/accept
///
/// Records the current story in the history so later runs avoid repeating it.
pub async fn handle_accept(State(state): State<AppState>) -> Result<Json<AcceptResponse>, AppError> {
    if state.run_slot.is_busy() {
        return Err(AppError::Conflict(
            "Cannot accept a story while a new one is being generated".to_string(),
        ));
    }

    let story = state
        .artifacts()
        .read_concept()
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .ok_or_else(|| AppError::NotFound("No story found".to_string()))?;

    state.history.save(&story).await?;
    info!(title = %story.title_fi, "Story accepted into history");

    Ok(Json(AcceptResponse {
        saved: true,
        title_fi: story.title_fi,
        title_en: story.title_en,
    }))
}
