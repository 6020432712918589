//! Per-page illustration and card generation.
//!
//! Pages are processed strictly in order with a fixed pause between image
//! requests. Nothing here aborts the run: a failed or undecodable image is
//! replaced by a placeholder, and a card that cannot be written is skipped.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde::Serialize;
use tracing::{info, warn};

use crate::assets::characters::CharacterReference;
use crate::assets::prompts::page_prompt;
use crate::assets::storage::ArtifactLayout;
use crate::assets::AssetError;
use crate::layout::font_metrics::draw_builtin_text;
use crate::layout::CardCompositor;
use crate::llm_client::ImageGenerator;
use crate::pipeline::status::StatusSink;
use crate::story::models::{Page, StoryConcept};

const PLACEHOLDER_SIDE: u32 = 1024;
const PLACEHOLDER_BACKGROUND: Rgb<u8> = Rgb([173, 216, 230]);
const PLACEHOLDER_LABEL: &str = "Generated Image Placeholder";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageArtifact {
    pub page_number: u32,
    pub illustration_path: PathBuf,
    /// `None` when the card could not be composed or written.
    pub card_path: Option<PathBuf>,
    pub placeholder: bool,
}

pub struct AssetPipeline {
    images: Arc<dyn ImageGenerator>,
    compositor: Arc<CardCompositor>,
    layout: ArtifactLayout,
    page_delay: Duration,
}

impl AssetPipeline {
    pub fn new(
        images: Arc<dyn ImageGenerator>,
        compositor: Arc<CardCompositor>,
        layout: ArtifactLayout,
        page_delay: Duration,
    ) -> Self {
        Self {
            images,
            compositor,
            layout,
            page_delay,
        }
    }

    /// Produces exactly one artifact per concept page, in page order.
    pub async fn run(
        &self,
        concept: &StoryConcept,
        reference: &CharacterReference,
        sink: &dyn StatusSink,
    ) -> Vec<PageArtifact> {
        let mut artifacts = Vec::with_capacity(concept.pages.len());

        for (index, page) in concept.pages.iter().enumerate() {
            if index > 0 && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }
            sink.report(&format!("Processing Page {}...", page.page_number));
            artifacts.push(self.process_page(page, reference).await);
        }

        artifacts
    }

    async fn process_page(&self, page: &Page, reference: &CharacterReference) -> PageArtifact {
        let prompt = page_prompt(reference.primary_description(), &page.image_description);
        let primary = reference.primary().map(|r| &r.image);

        let bytes = match self.images.generate_image(&prompt, primary).await {
            Ok(image) => Some(image.bytes),
            Err(e) => {
                warn!(page = page.page_number, "Image generation failed, using placeholder: {e}");
                None
            }
        };

        let illustration_path = self.layout.page_image_path(page.page_number);
        let card_path = self.layout.card_path(page.page_number);

        let compositor = self.compositor.clone();
        let text_fi = page.text_fi.clone();
        let text_en = page.text_en.clone();
        let paths = (illustration_path.clone(), card_path.clone());

        let rendered = tokio::task::spawn_blocking(move || {
            render_page(&compositor, bytes, &text_fi, &text_en, &paths.0, &paths.1)
        })
        .await;

        let (placeholder, written) = match rendered {
            Ok(result) => result,
            Err(e) => (true, Err(AssetError::Join(e))),
        };

        let card_path = match written {
            Ok(()) => {
                info!(page = page.page_number, placeholder, "Card saved");
                Some(card_path)
            }
            Err(e) => {
                warn!(page = page.page_number, "Card skipped: {e}");
                None
            }
        };

        PageArtifact {
            page_number: page.page_number,
            illustration_path,
            card_path,
            placeholder,
        }
    }
}

/// Decodes (or substitutes) the illustration, saves it and writes the card.
/// Returns whether a placeholder was used, and the outcome of the writes.
fn render_page(
    compositor: &CardCompositor,
    bytes: Option<Bytes>,
    text_fi: &str,
    text_en: &str,
    illustration_path: &Path,
    card_path: &Path,
) -> (bool, Result<(), AssetError>) {
    let (illustration, placeholder) = match bytes.map(|b| image::load_from_memory(&b)) {
        Some(Ok(image)) => (image, false),
        Some(Err(e)) => {
            warn!("Undecodable image payload, using placeholder: {e}");
            (placeholder_image(), true)
        }
        None => (placeholder_image(), true),
    };

    let written = illustration
        .save_with_format(illustration_path, ImageFormat::Png)
        .and_then(|()| {
            compositor
                .compose(&illustration, text_fi, text_en)
                .save_with_format(card_path, ImageFormat::Png)
        })
        .map_err(AssetError::from);

    (placeholder, written)
}

/// 1024×1024 light-blue square with a small label in the top-left corner.
pub fn placeholder_image() -> DynamicImage {
    let mut canvas = RgbImage::from_pixel(PLACEHOLDER_SIDE, PLACEHOLDER_SIDE, PLACEHOLDER_BACKGROUND);
    draw_builtin_text(&mut canvas, PLACEHOLDER_LABEL, 10, 10, 16, Rgb([0, 0, 0]));
    DynamicImage::ImageRgb8(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::CardFont;
    use crate::llm_client::GeneratedImage;
    use crate::story::models::fixtures::sample_concept;
    use crate::test_support::{FakeImages, RecordingSink, TimedSink};

    async fn setup(images: FakeImages) -> (AssetPipeline, Arc<FakeImages>, tempfile::TempDir) {
        setup_with_delay(images, Duration::ZERO).await
    }

    async fn setup_with_delay(
        images: FakeImages,
        page_delay: Duration,
    ) -> (AssetPipeline, Arc<FakeImages>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArtifactLayout::new(dir.path());
        layout.reset().await.unwrap();
        let images = Arc::new(images);
        let pipeline = AssetPipeline::new(
            images.clone(),
            Arc::new(CardCompositor::new(CardFont::Builtin)),
            layout,
            page_delay,
        );
        (pipeline, images, dir)
    }

    #[test]
    fn test_placeholder_image_dimensions_and_colour() {
        let image = placeholder_image().to_rgb8();
        assert_eq!(image.dimensions(), (1024, 1024));
        assert_eq!(image.get_pixel(1000, 1000).0, [173, 216, 230]);
        assert!(image.pixels().any(|p| p.0 == [0, 0, 0]), "label must be drawn");
    }

    #[tokio::test]
    async fn test_run_produces_one_artifact_per_page() {
        let (pipeline, _, dir) = setup(FakeImages::default()).await;
        let concept = sample_concept(8, &["Sofia"]);
        let sink = RecordingSink::default();

        let artifacts = pipeline.run(&concept, &CharacterReference::default(), &sink).await;

        assert_eq!(artifacts.len(), 8);
        for (i, artifact) in artifacts.iter().enumerate() {
            let n = i as u32 + 1;
            assert_eq!(artifact.page_number, n);
            assert!(!artifact.placeholder);
            assert!(artifact.illustration_path.exists());
            let card = artifact.card_path.as_ref().unwrap();
            assert_eq!(card, &dir.path().join(format!("cards/story_card_{n}.png")));
            let dims = image::image_dimensions(card).unwrap();
            assert_eq!(dims, (1080, 1920));
        }
        assert_eq!(sink.messages()[0], "Processing Page 1...");
        assert_eq!(sink.messages()[7], "Processing Page 8...");
    }

    #[tokio::test]
    async fn test_failed_page_degrades_to_placeholder() {
        let (pipeline, _, _dir) = setup(FakeImages::failing_on(&["Scene 3 at"])).await;
        let concept = sample_concept(8, &[]);

        let artifacts = pipeline
            .run(&concept, &CharacterReference::default(), &RecordingSink::default())
            .await;

        assert_eq!(artifacts.len(), 8);
        assert!(artifacts[2].placeholder);
        assert!(artifacts[2].card_path.is_some());
        assert_eq!(artifacts.iter().filter(|a| a.placeholder).count(), 1);
        let saved = image::open(&artifacts[2].illustration_path).unwrap();
        assert_eq!(saved.width(), 1024);
    }

    #[tokio::test]
    async fn test_undecodable_payload_degrades_to_placeholder() {
        let garbage = GeneratedImage {
            bytes: Bytes::from_static(b"not an image"),
            mime_type: "image/png".to_string(),
        };
        let (pipeline, _, _dir) = setup(FakeImages::returning(garbage)).await;
        let concept = sample_concept(3, &[]);

        let artifacts = pipeline
            .run(&concept, &CharacterReference::default(), &RecordingSink::default())
            .await;

        assert!(artifacts.iter().all(|a| a.placeholder && a.card_path.is_some()));
    }

    #[tokio::test]
    async fn test_page_prompt_uses_primary_description_and_reference() {
        let (pipeline, images, dir) = setup(FakeImages::default()).await;
        let concept = sample_concept(3, &["Sofia"]);
        let manager = crate::assets::CharacterConsistencyManager::new(
            images.clone(),
            ArtifactLayout::new(dir.path()),
        );
        let sink = RecordingSink::default();
        let reference = manager.materialize(&concept.characters, &sink).await;

        pipeline.run(&concept, &reference, &sink).await;

        let calls = images.calls();
        // One character sheet, then three pages.
        assert_eq!(calls.len(), 4);
        assert!(!calls[0].1, "character sheets are generated without a reference");
        for (prompt, with_reference) in &calls[1..] {
            assert!(prompt.starts_with("Sofia, a person in a blue coat Scene"));
            assert!(with_reference);
        }
    }

    #[tokio::test]
    async fn test_unwritable_card_is_skipped() {
        let (pipeline, _, dir) = setup(FakeImages::default()).await;
        std::fs::remove_dir_all(dir.path().join("cards")).unwrap();
        let concept = sample_concept(2, &[]);

        let artifacts = pipeline
            .run(&concept, &CharacterReference::default(), &RecordingSink::default())
            .await;

        assert_eq!(artifacts.len(), 2);
        assert!(artifacts.iter().all(|a| a.card_path.is_none()));
        assert!(artifacts[0].illustration_path.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_delay_only_between_pages() {
        let delay = Duration::from_millis(1500);
        let (pipeline, _, _dir) = setup_with_delay(FakeImages::default(), delay).await;
        let concept = sample_concept(4, &[]);
        let sink = TimedSink::default();
        let started = tokio::time::Instant::now();

        pipeline.run(&concept, &CharacterReference::default(), &sink).await;

        let pages = sink.instants_of("Processing Page");
        assert_eq!(pages.len(), 4);
        assert!(pages[0] - started < delay, "page 1 must start without waiting");
        for pair in pages.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= delay && gap < delay * 2, "gap {gap:?}");
        }
        // Three pauses for four pages, none after the last.
        let total = tokio::time::Instant::now() - started;
        assert!(total >= delay * 3 && total < delay * 4, "total {total:?}");
    }
}
