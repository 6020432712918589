//! Concept Generator — asks the text capability for a structured story concept.
//!
//! A response that cannot be parsed, or parses into a concept that breaks the
//! page invariants, is `ConceptError::Malformed`. The orchestrator retries it
//! against its shared attempt budget; nothing here aborts a run.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;
use crate::llm_client::{parse_json_response, LlmError, TextGenerator};
use crate::story::history::StorySummary;
use crate::story::models::{Level, StoryConcept};
use crate::story::prompts::{level_constraints, STORY_PROMPT_TEMPLATE};

#[derive(Debug, Error)]
pub enum ConceptError {
    #[error("malformed concept: {0}")]
    Malformed(String),

    #[error("text generation failed: {0}")]
    Capability(#[from] LlmError),
}

#[async_trait]
pub trait ConceptGenerator: Send + Sync {
    async fn generate(
        &self,
        level: Level,
        prior: &[StorySummary],
    ) -> Result<StoryConcept, ConceptError>;
}

/// Production generator backed by the text capability.
pub struct LlmConceptGenerator {
    llm: Arc<dyn TextGenerator>,
    page_count: usize,
}

impl LlmConceptGenerator {
    pub fn new(llm: Arc<dyn TextGenerator>, page_count: usize) -> Self {
        Self { llm, page_count }
    }
}

#[async_trait]
impl ConceptGenerator for LlmConceptGenerator {
    async fn generate(
        &self,
        level: Level,
        prior: &[StorySummary],
    ) -> Result<StoryConcept, ConceptError> {
        info!(%level, prior = prior.len(), "Requesting story concept");
        let prompt = build_story_prompt(level, prior, self.page_count);
        let raw = self.llm.generate_text(&prompt).await?;

        parse_concept(&raw, self.page_count).map_err(|e| {
            warn!("Concept rejected: {e}");
            debug!("Raw concept response: {raw}");
            e
        })
    }
}

/// Parses a raw model response into a concept and checks its structure.
pub fn parse_concept(raw: &str, expected_pages: usize) -> Result<StoryConcept, ConceptError> {
    let concept: StoryConcept = parse_json_response(raw)
        .map_err(|e| ConceptError::Malformed(format!("invalid JSON: {e}")))?;
    concept
        .check_structure(expected_pages)
        .map_err(|e| ConceptError::Malformed(e.to_string()))?;
    Ok(concept)
}

pub(crate) fn build_story_prompt(level: Level, prior: &[StorySummary], page_count: usize) -> String {
    let last_page = page_count.max(2);
    STORY_PROMPT_TEMPLATE
        .replace("{level}", level.as_str())
        .replace("{constraints}", level_constraints(level))
        .replace("{page_count}", &page_count.to_string())
        .replace("{last_page_minus_one}", &(last_page - 1).to_string())
        .replace("{last_page}", &last_page.to_string())
        .replace("{json_only}", JSON_ONLY_INSTRUCTION)
        .replace("{history}", &history_block(prior))
}

/// Renders prior stories as an "avoid these" list. Empty when there is no history.
fn history_block(prior: &[StorySummary]) -> String {
    if prior.is_empty() {
        return String::new();
    }

    let mut block = String::from(
        "**PREVIOUS STORIES (create something different: new theme, new title, new characters):**\n",
    );
    for summary in prior {
        block.push_str(&format!("- {} / {}", summary.title_fi, summary.title_en));
        if !summary.characters.is_empty() {
            block.push_str(&format!(" (characters: {})", summary.characters.join(", ")));
        }
        block.push('\n');
    }
    block
}
