use std::sync::Arc;

use crate::assets::ArtifactLayout;
use crate::config::Config;
use crate::layout::CardCompositor;
use crate::llm_client::ImageGenerator;
use crate::pipeline::guard::RunSlot;
use crate::pipeline::orchestrator::{PipelineOrchestrator, PipelineSettings};
use crate::pipeline::status::StatusChannel;
use crate::story::{ConceptGenerator, HistoryStore, QualityGate};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub concepts: Arc<dyn ConceptGenerator>,
    pub gate: Arc<dyn QualityGate>,
    pub images: Arc<dyn ImageGenerator>,
    /// Only written by the accept endpoint; runs just read it.
    pub history: Arc<dyn HistoryStore>,
    /// Resolved once at startup; font loading is too slow to repeat per card.
    pub compositor: Arc<CardCompositor>,
    pub status: StatusChannel,
    pub run_slot: RunSlot,
}

impl AppState {
    pub fn artifacts(&self) -> ArtifactLayout {
        ArtifactLayout::new(self.config.output_dir.clone())
    }

    /// A fresh orchestrator wired to this state, reporting into the status channel.
    pub fn orchestrator(&self) -> PipelineOrchestrator {
        PipelineOrchestrator::new(
            self.concepts.clone(),
            self.gate.clone(),
            self.images.clone(),
            self.history.clone(),
            self.compositor.clone(),
            Arc::new(self.status.clone()),
            PipelineSettings {
                output_dir: self.config.output_dir.clone(),
                history_limit: self.config.history_limit,
                page_delay: self.config.page_delay,
                retry_delay: self.config.retry_delay,
            },
        )
    }
}
