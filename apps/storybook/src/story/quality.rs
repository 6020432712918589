//! Quality Gate — grammar and meaning review of the Finnish page text.
//!
//! Fail-closed: if the review cannot be obtained or parsed, the verdict is
//! invalid and the error text becomes the feedback.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;
use crate::llm_client::{parse_json_response, TextGenerator};
use crate::story::models::StoryConcept;
use crate::story::prompts::QUALITY_PROMPT_TEMPLATE;

const NO_FEEDBACK: &str = "No feedback provided";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityVerdict {
    pub valid: bool,
    pub feedback: String,
}

impl QualityVerdict {
    pub fn rejected(feedback: impl Into<String>) -> Self {
        Self {
            valid: false,
            feedback: feedback.into(),
        }
    }
}

#[async_trait]
pub trait QualityGate: Send + Sync {
    async fn validate(&self, concept: &StoryConcept) -> QualityVerdict;
}

/// Shape of the reviewer's JSON answer. Missing fields are tolerated.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(default)]
    valid: bool,
    feedback: Option<String>,
}

pub struct LlmQualityGate {
    llm: Arc<dyn TextGenerator>,
}

impl LlmQualityGate {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl QualityGate for LlmQualityGate {
    async fn validate(&self, concept: &StoryConcept) -> QualityVerdict {
        let prompt = QUALITY_PROMPT_TEMPLATE
            .replace("{story_text}", &review_payload(concept))
            .replace("{json_only}", JSON_ONLY_INSTRUCTION);

        let raw = match self.llm.generate_text(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Quality check call failed: {e}");
                return QualityVerdict::rejected(format!("Error during check: {e}"));
            }
        };

        match parse_json_response::<RawVerdict>(&raw) {
            Ok(verdict) => {
                info!(valid = verdict.valid, "Quality check finished");
                QualityVerdict {
                    valid: verdict.valid,
                    feedback: verdict.feedback.unwrap_or_else(|| NO_FEEDBACK.to_string()),
                }
            }
            Err(e) => {
                warn!("Quality check response unparseable: {e}");
                QualityVerdict::rejected(format!("Error during check: {e}"))
            }
        }
    }
}

/// One `Page N: <text>` line per page, in page order.
pub(crate) fn review_payload(concept: &StoryConcept) -> String {
    concept
        .pages
        .iter()
        .map(|p| format!("Page {}: {}", p.page_number, p.text_fi))
        .collect::<Vec<_>>()
        .join("\n")
}
