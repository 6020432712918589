//! Card compositor — one illustration plus two text blocks on a 9:16 canvas.
//!
//! ```text
//! ┌──────────── 1080 ────────────┐
//! │ margin                       │
//! │  ┌────────────────────────┐  │
//! │  │ illustration (square,  │  │
//! │  │ safe width × safe width│  │
//! │  └────────────────────────┘  │
//! │          image gap           │
//! │   primary text   (60 %)      │  1920
//! │          block gap           │
//! │   secondary text (40 %)      │
//! │ margin                       │
//! └──────────────────────────────┘
//! ```
//!
//! The primary (Finnish) block is full-contrast, the secondary (English) block
//! is muted, like a subtitle. Both are fit independently and centred line by line.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use serde::Serialize;

use crate::layout::fit::{fit_text, FitParams, FittedText};
use crate::layout::font_metrics::{CardFont, TextMeasure};

/// Geometry and typography of a card. All lengths in px.
#[derive(Debug, Clone)]
pub struct CardLayout {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
    pub image_gap: u32,
    pub block_gap: u32,
    /// Share of the text area given to the primary block.
    pub primary_share: f32,
    pub line_spacing: f32,
    pub size_step: u32,
    pub primary_size: (u32, u32),
    pub secondary_size: (u32, u32),
    pub background: Rgb<u8>,
    pub primary_color: Rgb<u8>,
    pub secondary_color: Rgb<u8>,
}

impl Default for CardLayout {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            margin: 60,
            image_gap: 40,
            block_gap: 40,
            primary_share: 0.6,
            line_spacing: 20.0,
            size_step: 2,
            primary_size: (60, 28),
            secondary_size: (48, 22),
            background: Rgb([255, 255, 255]),
            primary_color: Rgb([0, 0, 0]),
            secondary_color: Rgb([0x55, 0x55, 0x55]),
        }
    }
}

impl CardLayout {
    /// Side of the square illustration: the safe content width.
    pub fn image_side(&self) -> u32 {
        self.width.saturating_sub(2 * self.margin)
    }
}

/// A text block positioned on the card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedBlock {
    pub top: u32,
    pub max_height: f32,
    pub text: FittedText,
}

/// Where everything goes on a card, computed without drawing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardPlan {
    pub image_origin: (u32, u32),
    pub image_side: u32,
    pub primary: PlacedBlock,
    pub secondary: PlacedBlock,
}

pub struct CardCompositor {
    font: CardFont,
    layout: CardLayout,
}

impl CardCompositor {
    pub fn new(font: CardFont) -> Self {
        Self::with_layout(font, CardLayout::default())
    }

    pub fn with_layout(font: CardFont, layout: CardLayout) -> Self {
        Self { font, layout }
    }

    /// Computes the card layout for the two texts.
    pub fn plan(&self, text_primary: &str, text_secondary: &str) -> CardPlan {
        let l = &self.layout;
        let side = l.image_side();
        let max_width = side as f32;

        let text_top = l.margin + side + l.image_gap;
        let text_bottom = l.height.saturating_sub(l.margin);
        let available = text_bottom
            .saturating_sub(text_top)
            .saturating_sub(l.block_gap) as f32;
        let primary_height = (available * l.primary_share).floor();
        let secondary_height = available - primary_height;

        let primary = fit_text(
            text_primary,
            &self.font,
            &FitParams {
                initial_size: l.primary_size.0,
                min_size: l.primary_size.1,
                step: l.size_step,
                max_width,
                max_height: primary_height,
                line_spacing: l.line_spacing,
            },
        );
        let secondary = fit_text(
            text_secondary,
            &self.font,
            &FitParams {
                initial_size: l.secondary_size.0,
                min_size: l.secondary_size.1,
                step: l.size_step,
                max_width,
                max_height: secondary_height,
                line_spacing: l.line_spacing,
            },
        );

        // The translation follows the primary text directly, but never starts
        // below the primary block's share of the area.
        let secondary_top =
            text_top + primary.height.min(primary_height).ceil() as u32 + l.block_gap;

        CardPlan {
            image_origin: (l.margin, l.margin),
            image_side: side,
            primary: PlacedBlock {
                top: text_top,
                max_height: primary_height,
                text: primary,
            },
            secondary: PlacedBlock {
                top: secondary_top,
                max_height: secondary_height,
                text: secondary,
            },
        }
    }

    /// Renders the card. Pure CPU work; run it on a blocking thread.
    pub fn compose(&self, illustration: &DynamicImage, text_primary: &str, text_secondary: &str) -> RgbImage {
        let l = &self.layout;
        let plan = self.plan(text_primary, text_secondary);
        let mut canvas = RgbImage::from_pixel(l.width, l.height, l.background);

        if plan.image_side > 0 {
            let picture = illustration
                .resize_exact(plan.image_side, plan.image_side, FilterType::Lanczos3)
                .to_rgb8();
            imageops::overlay(
                &mut canvas,
                &picture,
                plan.image_origin.0 as i64,
                plan.image_origin.1 as i64,
            );
        }

        self.draw_block(&mut canvas, &plan.primary, l.primary_color);
        self.draw_block(&mut canvas, &plan.secondary, l.secondary_color);
        canvas
    }

    fn draw_block(&self, canvas: &mut RgbImage, block: &PlacedBlock, color: Rgb<u8>) {
        let size = block.text.font_size;
        let advance = self.font.line_height(size) + self.layout.line_spacing;
        let mut y = block.top as f32;

        for line in &block.text.lines {
            let line_width = self.font.text_width(line, size);
            let x = ((self.layout.width as f32 - line_width) / 2.0).round() as i32;
            self.font.draw_line(canvas, line, x, y.round() as i32, size, color);
            y += advance;
        }
    }
}
