//! Run-scoped artifact layout on disk.
//!
//! ```text
//! <root>/data/story.json
//! <root>/images/character_model_<Name>.png
//! <root>/images/page_<N>.png
//! <root>/cards/story_card_<N>.png
//! <root>/story.pdf
//! ```
//!
//! File names carry the page number so cards sort deterministically.
//! The whole root is cleared at the start of every run.

use std::path::PathBuf;

use tracing::info;

use crate::story::models::StoryConcept;

pub const CARD_PREFIX: &str = "story_card_";

#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    pub fn cards_dir(&self) -> PathBuf {
        self.root.join("cards")
    }

    pub fn concept_path(&self) -> PathBuf {
        self.data_dir().join("story.json")
    }

    pub fn page_image_path(&self, page_number: u32) -> PathBuf {
        self.images_dir().join(format!("page_{page_number}.png"))
    }

    pub fn card_path(&self, page_number: u32) -> PathBuf {
        self.cards_dir().join(format!("{CARD_PREFIX}{page_number}.png"))
    }

    pub fn character_model_path(&self, name: &str) -> PathBuf {
        self.images_dir()
            .join(format!("character_model_{}.png", safe_name(name)))
    }

    pub fn document_path(&self) -> PathBuf {
        self.root.join("story.pdf")
    }

    /// Removes everything under the root and recreates the sub-directories.
    pub async fn reset(&self) -> std::io::Result<()> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => info!(root = %self.root.display(), "Removed previous output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        for dir in [self.data_dir(), self.images_dir(), self.cards_dir()] {
            tokio::fs::create_dir_all(dir).await?;
        }
        Ok(())
    }

    pub async fn write_concept(&self, concept: &StoryConcept) -> Result<(), ArtifactWriteError> {
        let json = serde_json::to_string_pretty(concept)?;
        tokio::fs::create_dir_all(self.data_dir()).await?;
        tokio::fs::write(self.concept_path(), json).await?;
        Ok(())
    }

    /// Reads back the concept of the most recent run, if any.
    pub async fn read_concept(&self) -> Result<Option<StoryConcept>, ArtifactWriteError> {
        match tokio::fs::read_to_string(self.concept_path()).await {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactWriteError {
    #[error("artifact I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("concept (de)serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Keeps only alphanumeric characters, so names are safe as file names.
pub fn safe_name(name: &str) -> String {
    let cleaned: String = name.chars().filter(|c| c.is_alphanumeric()).collect();
    if cleaned.is_empty() {
        "Unknown".to_string()
    } else {
        cleaned
    }
}
