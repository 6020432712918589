/// Pipeline orchestrator: drives one run from concept to PDF.
///
/// Concept generation and the quality gate loop under a shared attempt
/// budget. Once a concept passes, the asset stage runs exactly once and
/// degrades per page rather than failing. Only exhaustion (as an outcome)
/// and an empty document (as an error) reach the caller; everything else
/// becomes a status message.
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::assets::storage::{ArtifactLayout, ArtifactWriteError};
use crate::assets::{AssetPipeline, CharacterConsistencyManager, PageArtifact};
use crate::document::{self, CompiledDocument, DocumentError};
use crate::layout::CardCompositor;
use crate::llm_client::ImageGenerator;
use crate::pipeline::state_machine::{next_stage, InvalidTransition, RunStage, RunState, StageEvent};
use crate::pipeline::status::StatusSink;
use crate::story::{ConceptGenerator, HistoryStore, Level, QualityGate, StoryConcept, StorySummary};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no cards were produced, nothing to compile")]
    EmptyDocument,

    #[error("document compilation failed: {0}")]
    Document(DocumentError),

    #[error("output directory unusable: {0}")]
    Io(#[from] std::io::Error),

    #[error("concept could not be persisted: {0}")]
    Serialize(#[from] ArtifactWriteError),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}

impl From<DocumentError> for PipelineError {
    fn from(e: DocumentError) -> Self {
        match e {
            DocumentError::Empty => PipelineError::EmptyDocument,
            other => PipelineError::Document(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub output_dir: PathBuf,
    pub history_limit: usize,
    pub page_delay: Duration,
    pub retry_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub concept: StoryConcept,
    /// Attempt on which the concept passed the quality gate.
    pub attempts: u32,
    /// Characters whose reference sheet was generated, in concept order.
    pub characters: Vec<String>,
    pub pages: Vec<PageArtifact>,
    pub document: CompiledDocument,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(RunReport),
    /// No concept passed within the budget. `last_reason` is the parse error
    /// or gate feedback that caused the final retry.
    Exhausted {
        attempts: u32,
        last_reason: Option<String>,
    },
}

pub struct PipelineOrchestrator {
    concepts: Arc<dyn ConceptGenerator>,
    gate: Arc<dyn QualityGate>,
    images: Arc<dyn ImageGenerator>,
    history: Arc<dyn HistoryStore>,
    compositor: Arc<CardCompositor>,
    sink: Arc<dyn StatusSink>,
    layout: ArtifactLayout,
    settings: PipelineSettings,
}

impl PipelineOrchestrator {
    pub fn new(
        concepts: Arc<dyn ConceptGenerator>,
        gate: Arc<dyn QualityGate>,
        images: Arc<dyn ImageGenerator>,
        history: Arc<dyn HistoryStore>,
        compositor: Arc<CardCompositor>,
        sink: Arc<dyn StatusSink>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            concepts,
            gate,
            images,
            history,
            compositor,
            sink,
            layout: ArtifactLayout::new(settings.output_dir.clone()),
            settings,
        }
    }

    pub async fn run(&self, level: Level, max_attempts: u32) -> Result<RunOutcome, PipelineError> {
        self.sink.report("Cleaning up previous output...");
        self.layout.reset().await?;

        let prior = match self.history.load_recent(self.settings.history_limit).await {
            Ok(prior) => prior,
            Err(e) => {
                warn!("History unavailable, generating without it: {e}");
                Vec::new()
            }
        };

        let mut state = RunState::new(max_attempts);
        let mut report = None;

        while !state.stage.is_terminal() {
            let event = match &state.stage {
                RunStage::GeneratingConcept => self.generate_concept(level, &prior, &state).await,
                RunStage::ValidatingConcept(concept) => self.validate_concept(concept).await,
                RunStage::AssetPipeline(concept) => {
                    report = Some(self.produce(concept, state.attempt).await?);
                    StageEvent::AssetsDone
                }
                RunStage::Done | RunStage::Exhausted => break,
            };
            state = next_stage(state, event)?;
            info!(%state, "Stage transition");
        }

        match report {
            Some(report) if state.stage == RunStage::Done => Ok(RunOutcome::Completed(report)),
            _ => {
                self.sink
                    .report("Max retries reached. Failed to generate a grammatically correct story.");
                Ok(RunOutcome::Exhausted {
                    attempts: state.attempt.saturating_sub(1),
                    last_reason: state.last_feedback,
                })
            }
        }
    }

    async fn generate_concept(&self, level: Level, prior: &[StorySummary], state: &RunState) -> StageEvent {
        if state.attempt > 1 && !self.settings.retry_delay.is_zero() {
            tokio::time::sleep(self.settings.retry_delay).await;
        }

        self.sink.report(&format!(
            "Generating story concept for {level} level (Attempt {}/{})...",
            state.attempt, state.max_attempts
        ));

        match self.concepts.generate(level, prior).await {
            Ok(concept) => {
                info!(title_fi = %concept.title_fi, title_en = %concept.title_en, "Concept generated");
                StageEvent::ConceptReady(concept)
            }
            Err(e) => {
                warn!(attempt = state.attempt, "Concept generation failed: {e}");
                self.sink.report("Failed to generate story concept. Retrying...");
                StageEvent::ConceptMalformed(e.to_string())
            }
        }
    }

    async fn validate_concept(&self, concept: &StoryConcept) -> StageEvent {
        self.sink.report("Verifying grammar...");
        let verdict = self.gate.validate(concept).await;

        if verdict.valid {
            self.sink.report("Grammar check passed!");
            StageEvent::Validated
        } else {
            self.sink
                .report(&format!("Grammar check failed: {}", verdict.feedback));
            self.sink.report("Retrying generation...");
            StageEvent::Rejected(verdict.feedback)
        }
    }

    async fn produce(&self, concept: &StoryConcept, attempts: u32) -> Result<RunReport, PipelineError> {
        self.layout.write_concept(concept).await?;

        let sink = self.sink.as_ref();
        let characters = CharacterConsistencyManager::new(self.images.clone(), self.layout.clone())
            .materialize(&concept.characters, sink)
            .await;

        let pages = AssetPipeline::new(
            self.images.clone(),
            self.compositor.clone(),
            self.layout.clone(),
            self.settings.page_delay,
        )
        .run(concept, &characters, sink)
        .await;

        sink.report("Story generation complete!");
        sink.report("Compiling PDF...");

        let cards_dir = self.layout.cards_dir();
        let output = self.layout.document_path();
        let document = tokio::task::spawn_blocking(move || {
            let cards = document::collect_cards(&cards_dir)?;
            document::compile(&cards, &output)
        })
        .await??;

        sink.report("All done! PDF created.");

        Ok(RunReport {
            concept: concept.clone(),
            attempts,
            characters: characters.names().map(str::to_string).collect(),
            pages,
            document,
        })
    }
}
