// Visual assets: character references, page illustrations and cards,
// plus the on-disk artifact layout they are written into.

use std::path::PathBuf;

use bytes::Bytes;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

use crate::llm_client::LlmError;

pub mod characters;
pub mod pipeline;
pub mod prompts;
pub mod storage;

pub use characters::CharacterConsistencyManager;
pub use pipeline::{AssetPipeline, PageArtifact};
pub use storage::ArtifactLayout;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("image capability failed: {0}")]
    Capability(#[from] LlmError),

    #[error("image could not be decoded or encoded: {0}")]
    Image(#[from] image::ImageError),

    #[error("asset I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Decodes an image payload and writes it as PNG, off the async runtime.
pub(crate) async fn decode_and_save(bytes: Bytes, path: PathBuf) -> Result<DynamicImage, AssetError> {
    tokio::task::spawn_blocking(move || {
        let image = image::load_from_memory(&bytes)?;
        image.save_with_format(&path, ImageFormat::Png)?;
        Ok::<_, AssetError>(image)
    })
    .await?
}
