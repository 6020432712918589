//! Story history — summaries of previously accepted stories.
//!
//! Read by the concept generator at run start to steer away from repeated
//! themes. Written only when a caller accepts a finished story; the pipeline
//! itself never calls `save`.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::story::models::StoryConcept;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("history could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Title and cast of a past story. Title plus characters is enough for the
/// model to avoid repeating a theme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorySummary {
    pub title_fi: String,
    pub title_en: String,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl StorySummary {
    pub fn from_concept(concept: &StoryConcept) -> Self {
        Self {
            title_fi: concept.title_fi.clone(),
            title_en: concept.title_en.clone(),
            characters: concept.characters.iter().map(|c| c.name.clone()).collect(),
            saved_at: Some(Utc::now()),
        }
    }
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Returns at most `limit` summaries, oldest first, newest last.
    async fn load_recent(&self, limit: usize) -> Result<Vec<StorySummary>, HistoryError>;

    async fn save(&self, concept: &StoryConcept) -> Result<(), HistoryError>;
}

/// History kept as a JSON array in a single file.
/// A missing or unreadable file is treated as an empty history.
pub struct JsonHistoryStore {
    path: PathBuf,
}

impl JsonHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_all(&self) -> Result<Vec<StorySummary>, HistoryError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(path = %self.path.display(), "Ignoring corrupt history file: {e}");
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl HistoryStore for JsonHistoryStore {
    async fn load_recent(&self, limit: usize) -> Result<Vec<StorySummary>, HistoryError> {
        let mut entries = self.read_all().await?;
        let skip = entries.len().saturating_sub(limit);
        Ok(entries.split_off(skip))
    }

    async fn save(&self, concept: &StoryConcept) -> Result<(), HistoryError> {
        let mut entries = self.read_all().await?;
        entries.push(StorySummary::from_concept(concept));

        let json = serde_json::to_string_pretty(&entries)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, json).await?;

        info!(
            title = %concept.title_fi,
            total = entries.len(),
            "Saved story to history"
        );
        Ok(())
    }
}
