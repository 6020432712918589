//! Character reference images.
//!
//! One character sheet is generated per concept character, in concept order.
//! A failed character is reported and left out; it never blocks the others.
//! The first success becomes the primary reference attached to every page.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::assets::prompts::character_sheet_prompt;
use crate::assets::storage::ArtifactLayout;
use crate::assets::{decode_and_save, AssetError};
use crate::llm_client::{GeneratedImage, ImageGenerator};
use crate::pipeline::status::StatusSink;
use crate::story::models::Character;

#[derive(Debug, Clone)]
pub struct ReferenceImage {
    pub name: String,
    pub image: GeneratedImage,
    pub path: PathBuf,
}

/// Successful references in concept order plus the primary description.
#[derive(Debug, Clone, Default)]
pub struct CharacterReference {
    entries: Vec<ReferenceImage>,
    primary_description: String,
}

impl CharacterReference {
    /// First successful reference by concept order.
    pub fn primary(&self) -> Option<&ReferenceImage> {
        self.entries.first()
    }

    /// Description of the first concept character, even if its sheet failed.
    pub fn primary_description(&self) -> &str {
        &self.primary_description
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|r| r.name.as_str())
    }
}

pub struct CharacterConsistencyManager {
    images: Arc<dyn ImageGenerator>,
    layout: ArtifactLayout,
}

impl CharacterConsistencyManager {
    pub fn new(images: Arc<dyn ImageGenerator>, layout: ArtifactLayout) -> Self {
        Self { images, layout }
    }

    pub async fn materialize(&self, characters: &[Character], sink: &dyn StatusSink) -> CharacterReference {
        let mut reference = CharacterReference {
            entries: Vec::with_capacity(characters.len()),
            primary_description: characters
                .first()
                .map(|c| c.description.clone())
                .unwrap_or_default(),
        };

        for character in characters {
            sink.report(&format!("Processing character: {}", character.name));
            match self.generate_sheet(character).await {
                Ok(entry) => {
                    info!(name = %character.name, path = %entry.path.display(), "Character model saved");
                    reference.entries.push(entry);
                }
                Err(e) => {
                    warn!(name = %character.name, "Character model failed: {e}");
                    sink.report(&format!("Failed to generate model for {}", character.name));
                }
            }
        }

        reference
    }

    async fn generate_sheet(&self, character: &Character) -> Result<ReferenceImage, AssetError> {
        let prompt = character_sheet_prompt(&character.description);
        let image = self.images.generate_image(&prompt, None).await?;

        let path = self.layout.character_model_path(&character.name);
        decode_and_save(image.bytes.clone(), path.clone()).await?;

        Ok(ReferenceImage {
            name: character.name.clone(),
            image,
            path,
        })
    }
}
