//! Document compiler — story cards into a single PDF.
//!
//! Each card becomes one page showing the card full-bleed. Cards are embedded
//! as JPEG (`DCTDecode`) so the PDF stays a reasonable size, and the page size
//! is the card's pixel size at 144 dpi (a 1080×1920 card is 540×960 pt).

use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use thiserror::Error;
use tracing::{info, warn};

use crate::assets::storage::CARD_PREFIX;

const DPI: f32 = 144.0;
const JPEG_QUALITY: u8 = 90;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("no cards to compile")]
    Empty,

    #[error("document I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("card image could not be read or encoded: {0}")]
    Image(#[from] image::ImageError),

    #[error("PDF assembly failed: {0}")]
    Pdf(#[from] lopdf::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDocument {
    pub path: PathBuf,
    pub page_count: usize,
}

/// Lists `story_card_*.png` in `dir`, ordered by page number.
///
/// If any file name carries no parseable number the whole list falls back to
/// lexical order. A missing directory yields an empty list.
pub fn collect_cards(dir: &Path) -> Result<Vec<PathBuf>, DocumentError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut cards = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_card = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(CARD_PREFIX) && n.ends_with(".png"));
        if is_card {
            cards.push(path);
        }
    }

    let numbered: Option<Vec<(u32, PathBuf)>> = cards
        .iter()
        .map(|p| card_number(p).map(|n| (n, p.clone())))
        .collect();

    match numbered {
        Some(mut numbered) => {
            numbered.sort_by_key(|(n, _)| *n);
            Ok(numbered.into_iter().map(|(_, p)| p).collect())
        }
        None => {
            warn!(dir = %dir.display(), "Card names without page numbers, using lexical order");
            cards.sort();
            Ok(cards)
        }
    }
}

fn card_number(path: &Path) -> Option<u32> {
    path.file_stem()?
        .to_str()?
        .strip_prefix(CARD_PREFIX)?
        .parse()
        .ok()
}

/// Writes one PDF page per card, in the given order. CPU and disk bound;
/// async callers run it on a blocking thread.
pub fn compile(cards: &[PathBuf], output: &Path) -> Result<CompiledDocument, DocumentError> {
    if cards.is_empty() {
        return Err(DocumentError::Empty);
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(cards.len());

    for card in cards {
        let rgb = image::open(card)?.to_rgb8();
        let (width, height) = rgb.dimensions();

        let mut jpeg = Vec::new();
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY))?;

        let image_stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
                "Filter" => "DCTDecode",
            },
            jpeg,
        )
        .with_compression(false);
        let image_id = doc.add_object(image_stream);

        let page_width = width as f32 * 72.0 / DPI;
        let page_height = height as f32 * 72.0 / DPI;

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(page_width),
                        Object::Real(0.0),
                        Object::Real(0.0),
                        Object::Real(page_height),
                        Object::Real(0.0),
                        Object::Real(0.0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im1".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(page_width),
                Object::Real(page_height),
            ],
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im1" => image_id },
            },
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let page_count = kids.len();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    std::fs::write(output, bytes)?;

    info!(path = %output.display(), pages = page_count, "PDF compiled");
    Ok(CompiledDocument {
        path: output.to_path_buf(),
        page_count,
    })
}
