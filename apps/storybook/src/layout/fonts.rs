//! Font resolution — an ordered candidate list, first loadable wins.
//!
//! Order: configured font files, then named system families via `fontdb`,
//! then the generic sans-serif family, and finally the built-in bitmap font.
//! The system font database is only scanned if a family candidate is reached.

use std::path::PathBuf;

use ab_glyph::{FontArc, FontVec, InvalidFont};
use fontdb::{Database, Family, Query};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::layout::font_metrics::CardFont;

/// System families tried after the configured files, in order.
const PREFERRED_FAMILIES: [&str; 4] = ["Arial", "Helvetica", "DejaVu Sans", "Liberation Sans"];

#[derive(Debug, Clone, PartialEq)]
pub enum FontCandidate {
    File(PathBuf),
    Family(String),
    SansSerif,
}

#[derive(Debug, Error)]
pub enum FontError {
    #[error("font file unreadable: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid font data: {0}")]
    Invalid(#[from] InvalidFont),

    #[error("no system font matches {0}")]
    NotFound(String),
}

/// Configured files first, then the preferred families, then generic sans-serif.
pub fn default_candidates(font_paths: &[PathBuf]) -> Vec<FontCandidate> {
    font_paths
        .iter()
        .cloned()
        .map(FontCandidate::File)
        .chain(
            PREFERRED_FAMILIES
                .iter()
                .map(|name| FontCandidate::Family(name.to_string())),
        )
        .chain(std::iter::once(FontCandidate::SansSerif))
        .collect()
}

/// Returns the first candidate that loads, or the built-in bitmap font.
pub fn resolve_font(candidates: &[FontCandidate]) -> CardFont {
    let mut db: Option<Database> = None;

    for candidate in candidates {
        match load_candidate(candidate, &mut db) {
            Ok(font) => {
                info!(?candidate, "Card font resolved");
                return CardFont::Glyph(font);
            }
            Err(e) => debug!(?candidate, "Font candidate skipped: {e}"),
        }
    }

    warn!("No font candidates available, using built-in bitmap font");
    CardFont::Builtin
}

fn load_candidate(candidate: &FontCandidate, db: &mut Option<Database>) -> Result<FontArc, FontError> {
    match candidate {
        FontCandidate::File(path) => {
            let data = std::fs::read(path)?;
            Ok(FontArc::try_from_vec(data)?)
        }
        FontCandidate::Family(name) => load_system(db, Family::Name(name.as_str()), name),
        FontCandidate::SansSerif => load_system(db, Family::SansSerif, "sans-serif"),
    }
}

fn load_system(db: &mut Option<Database>, family: Family<'_>, label: &str) -> Result<FontArc, FontError> {
    let db = db.get_or_insert_with(|| {
        let mut db = Database::new();
        db.load_system_fonts();
        debug!(faces = db.len(), "Loaded system font database");
        db
    });

    let families = [family];
    let query = Query {
        families: &families,
        ..Query::default()
    };
    let id = db
        .query(&query)
        .ok_or_else(|| FontError::NotFound(label.to_string()))?;
    let (data, index) = db
        .with_face_data(id, |data, index| (data.to_vec(), index))
        .ok_or_else(|| FontError::NotFound(label.to_string()))?;

    Ok(FontArc::new(FontVec::try_from_vec_and_index(data, index)?))
}
