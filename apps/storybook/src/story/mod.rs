// Story concept: data model, generation, quality gate and history.
// All text capability calls go through llm_client traits.

pub mod concept;
pub mod history;
pub mod models;
pub mod prompts;
pub mod quality;

pub use concept::{ConceptGenerator, LlmConceptGenerator};
pub use history::{HistoryStore, JsonHistoryStore, StorySummary};
pub use models::{Level, StoryConcept};
pub use quality::{LlmQualityGate, QualityGate, QualityVerdict};
