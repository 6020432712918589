//! Text fitting — greedy word wrap plus a font-size search.
//!
//! # Algorithm
//! 1. Wrap: pack whitespace-delimited words into lines whose rendered width is
//!    at most `max_width`. A word wider than `max_width` gets a line of its own
//!    (no hyphenation).
//! 2. Fit: starting at `initial_size`, shrink by `step` while the wrapped block
//!    is taller than `max_height`, stopping at `min_size`.
//!
//! Block height = lines × line_height + line_spacing × (lines − 1).
//! Overflow at `min_size` is returned as-is and flagged, never an error.
//! The search is deterministic for a given text and `TextMeasure`.

use serde::Serialize;

use crate::layout::font_metrics::TextMeasure;

/// Inputs to the font-size search. Sizes are in px.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitParams {
    pub initial_size: u32,
    pub min_size: u32,
    pub step: u32,
    pub max_width: f32,
    pub max_height: f32,
    pub line_spacing: f32,
}

/// The chosen size and the lines wrapped at that size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FittedText {
    pub font_size: u32,
    pub lines: Vec<String>,
    /// Rendered block height at `font_size`.
    pub height: f32,
    /// True when even `min_size` exceeds `max_height`.
    pub overflow: bool,
}

/// Greedy word wrap at a fixed size.
pub fn wrap_lines(text: &str, measure: &dyn TextMeasure, size: u32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }

        let candidate = format!("{current} {word}");
        if measure.text_width(&candidate, size) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

pub fn block_height(measure: &dyn TextMeasure, size: u32, line_count: usize, line_spacing: f32) -> f32 {
    if line_count == 0 {
        return 0.0;
    }
    line_count as f32 * measure.line_height(size) + line_spacing * (line_count - 1) as f32
}

/// Finds the largest size (in `step` decrements from `initial_size`) whose
/// wrapped block fits `max_height`, or the `min_size` layout if none does.
pub fn fit_text(text: &str, measure: &dyn TextMeasure, params: &FitParams) -> FittedText {
    let step = params.step.max(1);
    let mut size = params.initial_size.max(params.min_size);

    loop {
        let lines = wrap_lines(text, measure, size, params.max_width);
        let height = block_height(measure, size, lines.len(), params.line_spacing);

        if height <= params.max_height || size <= params.min_size {
            return FittedText {
                font_size: size,
                overflow: height > params.max_height,
                lines,
                height,
            };
        }

        size = size.saturating_sub(step).max(params.min_size);
    }
}
