// In-crate fakes for the capability traits, shared by unit tests.

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tokio::time::Instant;

use crate::llm_client::{GeneratedImage, ImageGenerator, LlmError, TextGenerator};
use crate::pipeline::status::StatusSink;
use crate::story::concept::{ConceptError, ConceptGenerator};
use crate::story::history::{HistoryError, HistoryStore, StorySummary};
use crate::story::models::{Level, StoryConcept};
use crate::story::quality::{QualityGate, QualityVerdict};

/// Replays canned text responses in order and records every prompt.
/// Once the script runs out every call fails with `EmptyContent`.
pub struct ScriptedText {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedText {
    pub fn new(responses: Vec<Result<String, LlmError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedText {
    async fn generate_text(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyContent))
    }
}

/// Returns a small valid PNG unless the prompt contains one of the failure
/// markers. Records `(prompt, had_reference)` for every call.
pub struct FakeImages {
    fail_markers: Vec<String>,
    image: GeneratedImage,
    calls: Mutex<Vec<(String, bool)>>,
}

impl Default for FakeImages {
    fn default() -> Self {
        Self {
            fail_markers: Vec::new(),
            image: tiny_png(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeImages {
    pub fn failing_on(markers: &[&str]) -> Self {
        Self {
            fail_markers: markers.iter().map(|m| m.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn returning(image: GeneratedImage) -> Self {
        Self {
            image,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, bool)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for FakeImages {
    async fn generate_image(
        &self,
        prompt: &str,
        reference: Option<&GeneratedImage>,
    ) -> Result<GeneratedImage, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), reference.is_some()));

        if self.fail_markers.iter().any(|m| prompt.contains(m.as_str())) {
            return Err(LlmError::Api {
                status: 429,
                message: "Resource has been exhausted".to_string(),
            });
        }
        Ok(self.image.clone())
    }
}

fn tiny_png() -> GeneratedImage {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([90, 140, 200])));
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    GeneratedImage {
        bytes: Bytes::from(buf),
        mime_type: "image/png".to_string(),
    }
}

#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl StatusSink for RecordingSink {
    fn report(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// Records each message with the tokio clock reading at the time it was
/// reported, so paused-clock tests can check the pauses between steps.
#[derive(Default)]
pub struct TimedSink {
    entries: Mutex<Vec<(String, Instant)>>,
}

impl TimedSink {
    pub fn messages(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(m, _)| m.clone())
            .collect()
    }

    /// Clock readings of the messages starting with `prefix`, in order.
    pub fn instants_of(&self, prefix: &str) -> Vec<Instant> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m.starts_with(prefix))
            .map(|(_, at)| *at)
            .collect()
    }
}

impl StatusSink for TimedSink {
    fn report(&self, message: &str) {
        self.entries
            .lock()
            .unwrap()
            .push((message.to_string(), Instant::now()));
    }
}

/// Replays concept results; records the prior titles seen on each call.
pub struct ScriptedConcepts {
    results: Mutex<VecDeque<Result<StoryConcept, ConceptError>>>,
    priors: Mutex<Vec<Vec<String>>>,
}

impl ScriptedConcepts {
    pub fn new(results: Vec<Result<StoryConcept, ConceptError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            priors: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.priors.lock().unwrap().len()
    }

    pub fn prior_titles(&self) -> Vec<Vec<String>> {
        self.priors.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConceptGenerator for ScriptedConcepts {
    async fn generate(&self, _level: Level, prior: &[StorySummary]) -> Result<StoryConcept, ConceptError> {
        self.priors
            .lock()
            .unwrap()
            .push(prior.iter().map(|s| s.title_fi.clone()).collect());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ConceptError::Malformed("script exhausted".to_string())))
    }
}

/// A generator whose every call panics, for exercising task supervision.
pub struct PanickingConcepts;

#[async_trait]
impl ConceptGenerator for PanickingConcepts {
    async fn generate(&self, _level: Level, _prior: &[StorySummary]) -> Result<StoryConcept, ConceptError> {
        panic!("concept generator crashed")
    }
}

/// Replays verdicts; an exhausted script approves.
pub struct ScriptedGate {
    verdicts: Mutex<VecDeque<QualityVerdict>>,
    calls: Mutex<usize>,
}

impl ScriptedGate {
    pub fn new(verdicts: Vec<QualityVerdict>) -> Self {
        Self {
            verdicts: Mutex::new(verdicts.into()),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl QualityGate for ScriptedGate {
    async fn validate(&self, _concept: &StoryConcept) -> QualityVerdict {
        *self.calls.lock().unwrap() += 1;
        self.verdicts.lock().unwrap().pop_front().unwrap_or(QualityVerdict {
            valid: true,
            feedback: "OK".to_string(),
        })
    }
}

#[derive(Default)]
pub struct MemoryHistory {
    entries: Mutex<Vec<StorySummary>>,
    limits: Mutex<Vec<usize>>,
    saved: Mutex<usize>,
}

impl MemoryHistory {
    pub fn push_summary(&self, title_fi: &str) {
        self.entries.lock().unwrap().push(StorySummary {
            title_fi: title_fi.to_string(),
            title_en: String::new(),
            characters: Vec::new(),
            saved_at: None,
        });
    }

    pub fn load_limits(&self) -> Vec<usize> {
        self.limits.lock().unwrap().clone()
    }

    pub fn saved_count(&self) -> usize {
        *self.saved.lock().unwrap()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn load_recent(&self, limit: usize) -> Result<Vec<StorySummary>, HistoryError> {
        self.limits.lock().unwrap().push(limit);
        let entries = self.entries.lock().unwrap();
        let skip = entries.len().saturating_sub(limit);
        Ok(entries[skip..].to_vec())
    }

    async fn save(&self, concept: &StoryConcept) -> Result<(), HistoryError> {
        *self.saved.lock().unwrap() += 1;
        self.entries
            .lock()
            .unwrap()
            .push(StorySummary::from_concept(concept));
        Ok(())
    }
}
