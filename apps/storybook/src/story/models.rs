//! Story data model — the concept produced by the text capability.
//!
//! JSON field names match the generation prompt's schema (`title_fi`, `text_en`,
//! `type`, ...), so the same types serve as wire format and as `data/story.json`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Target proficiency level. Drives sentence complexity and vocabulary constraints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "Beginner",
            Level::Intermediate => "Intermediate",
            Level::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown level '{0}' (expected Beginner, Intermediate or Advanced)")]
pub struct UnknownLevel(pub String);

impl FromStr for Level {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Level::Beginner),
            "intermediate" => Ok(Level::Intermediate),
            "advanced" => Ok(Level::Advanced),
            _ => Err(UnknownLevel(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Cover,
    Story,
    Cta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    /// Full visual description (hair, skin, clothes, accessories).
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub page_number: u32,
    #[serde(rename = "type")]
    pub kind: PageKind,
    pub text_fi: String,
    pub text_en: String,
    pub image_description: String,
}

/// A complete story concept. Immutable once accepted by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryConcept {
    pub title_fi: String,
    pub title_en: String,
    #[serde(default)]
    pub characters: Vec<Character>,
    pub pages: Vec<Page>,
}

/// Structural defects that make a parsed concept unusable.
#[derive(Debug, Error, PartialEq)]
pub enum StructureError {
    #[error("expected {expected} pages, got {actual}")]
    PageCount { expected: usize, actual: usize },

    #[error("page at position {position} is numbered {found}")]
    Numbering { position: usize, found: u32 },

    #[error("first page must be the cover")]
    CoverNotFirst,

    #[error("last page must be the call to action")]
    CtaNotLast,

    #[error("page {0} has an unexpected kind {1:?}")]
    MisplacedKind(u32, PageKind),
}

impl StoryConcept {
    /// Checks the page invariants: exactly `expected_pages` pages numbered 1..=P,
    /// a single cover first, a single call-to-action last, story pages between.
    pub fn check_structure(&self, expected_pages: usize) -> Result<(), StructureError> {
        let actual = self.pages.len();
        if actual != expected_pages || actual < 2 {
            return Err(StructureError::PageCount {
                expected: expected_pages,
                actual,
            });
        }

        for (i, page) in self.pages.iter().enumerate() {
            if page.page_number as usize != i + 1 {
                return Err(StructureError::Numbering {
                    position: i + 1,
                    found: page.page_number,
                });
            }
        }

        if self.pages[0].kind != PageKind::Cover {
            return Err(StructureError::CoverNotFirst);
        }
        if self.pages[actual - 1].kind != PageKind::Cta {
            return Err(StructureError::CtaNotLast);
        }
        if let Some(page) = self.pages[1..actual - 1]
            .iter()
            .find(|p| p.kind != PageKind::Story)
        {
            return Err(StructureError::MisplacedKind(page.page_number, page.kind));
        }

        Ok(())
    }
}
