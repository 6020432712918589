//! Run state machine.
//!
//! ```text
//! GeneratingConcept ──ConceptReady──▶ ValidatingConcept ──Validated──▶ AssetPipeline ──AssetsDone──▶ Done
//!        ▲    │                               │
//!        │    └──ConceptMalformed──┐          │
//!        │                         ▼          ▼
//!        └────────── attempt + 1 ◀─────── Rejected
//!                         │
//!                         └── attempt > max_attempts ──▶ Exhausted
//! ```
//!
//! Malformed concepts and rejected verdicts share one attempt budget.
//! The asset stage is entered at most once and is never retried.
//! `next_stage` is pure; the orchestrator performs the side effects.

use std::fmt;

use thiserror::Error;

use crate::story::models::StoryConcept;

#[derive(Debug, Clone, PartialEq)]
pub enum RunStage {
    GeneratingConcept,
    ValidatingConcept(StoryConcept),
    AssetPipeline(StoryConcept),
    Done,
    Exhausted,
}

impl RunStage {
    pub fn name(&self) -> &'static str {
        match self {
            RunStage::GeneratingConcept => "GeneratingConcept",
            RunStage::ValidatingConcept(_) => "ValidatingConcept",
            RunStage::AssetPipeline(_) => "AssetPipeline",
            RunStage::Done => "Done",
            RunStage::Exhausted => "Exhausted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStage::Done | RunStage::Exhausted)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StageEvent {
    ConceptReady(StoryConcept),
    ConceptMalformed(String),
    Validated,
    Rejected(String),
    AssetsDone,
}

impl StageEvent {
    pub fn name(&self) -> &'static str {
        match self {
            StageEvent::ConceptReady(_) => "ConceptReady",
            StageEvent::ConceptMalformed(_) => "ConceptMalformed",
            StageEvent::Validated => "Validated",
            StageEvent::Rejected(_) => "Rejected",
            StageEvent::AssetsDone => "AssetsDone",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("event {event} is not valid in stage {stage}")]
pub struct InvalidTransition {
    pub stage: &'static str,
    pub event: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    /// 1-based number of the current concept attempt.
    pub attempt: u32,
    pub max_attempts: u32,
    pub stage: RunStage,
    /// Reason for the most recent retry, if any.
    pub last_feedback: Option<String>,
}

impl RunState {
    pub fn new(max_attempts: u32) -> Self {
        let stage = if max_attempts == 0 {
            RunStage::Exhausted
        } else {
            RunStage::GeneratingConcept
        };
        Self {
            attempt: 1,
            max_attempts,
            stage,
            last_feedback: None,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (attempt {}/{})", self.stage.name(), self.attempt, self.max_attempts)
    }
}

pub fn next_stage(state: RunState, event: StageEvent) -> Result<RunState, InvalidTransition> {
    let invalid = InvalidTransition {
        stage: state.stage.name(),
        event: event.name(),
    };
    let RunState {
        attempt,
        max_attempts,
        stage,
        last_feedback,
    } = state;

    let stage = match (stage, event) {
        (RunStage::GeneratingConcept, StageEvent::ConceptReady(concept)) => {
            RunStage::ValidatingConcept(concept)
        }
        (RunStage::ValidatingConcept(concept), StageEvent::Validated) => RunStage::AssetPipeline(concept),
        (RunStage::AssetPipeline(_), StageEvent::AssetsDone) => RunStage::Done,
        (RunStage::GeneratingConcept, StageEvent::ConceptMalformed(reason))
        | (RunStage::ValidatingConcept(_), StageEvent::Rejected(reason)) => {
            let attempt = attempt + 1;
            let stage = if attempt > max_attempts {
                RunStage::Exhausted
            } else {
                RunStage::GeneratingConcept
            };
            return Ok(RunState {
                attempt,
                max_attempts,
                stage,
                last_feedback: Some(reason),
            });
        }
        _ => return Err(invalid),
    };

    Ok(RunState {
        attempt,
        max_attempts,
        stage,
        last_feedback,
    })
}
