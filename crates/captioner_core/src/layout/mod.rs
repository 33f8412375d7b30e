//! Caption text layout.
//!
//! Turns caption text plus the probed frame size into wrapped lines and
//! derived sizes (font, line height, stroke). Everything here is a pure
//! function of its inputs; results are recomputed for every render and
//! never cached across jobs.
//!
//! # Sizing
//!
//! ```text
//! font_size   = floor(frame_height / (divisor + (line_count - 1) * compression))
//! stroke      = max(min_stroke, floor(font_size / stroke_divisor))
//! line_height = font_size + line_padding
//! ```
//!
//! More lines give a smaller font, so a caption block stays within roughly
//! a third of the frame height.

mod wrap;

pub use wrap::{char_width, is_wide, wrap_words, Measure};

use serde::{Deserialize, Serialize};

use crate::config::LayoutSettings;
use crate::models::{CaptionRole, CaptionSpec};

/// Wrapped lines and derived sizes for one caption.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutResult {
    /// Wrapped lines, top to bottom. Empty when there is nothing to draw.
    pub lines: Vec<String>,
    pub font_size_px: u32,
    pub line_height_px: u32,
    pub stroke_width_px: u32,
}

impl LayoutResult {
    /// Whether the caption produced no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Calibrated layout constants.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutParams {
    pub base_divisor: u32,
    pub compression_factor: u32,
    pub max_chars_per_line: usize,
    /// Measure CJK captions in visual width units.
    pub cjk_aware: bool,
    /// Fraction of `max_chars_per_line` used as the visual budget.
    pub cjk_wrap_ratio: f64,
    pub line_padding: u32,
    pub stroke_divisor: u32,
    pub min_stroke: u32,
    /// Base divisor used for the branding caption (smaller text).
    pub branding_divisor: u32,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            base_divisor: 12,
            compression_factor: 2,
            max_chars_per_line: 30,
            cjk_aware: true,
            cjk_wrap_ratio: 0.6,
            line_padding: 5,
            stroke_divisor: 10,
            min_stroke: 2,
            branding_divisor: 24,
        }
    }
}

impl From<&LayoutSettings> for LayoutParams {
    fn from(settings: &LayoutSettings) -> Self {
        Self {
            base_divisor: settings.base_divisor.max(1),
            compression_factor: settings.compression_factor,
            max_chars_per_line: settings.max_chars_per_line.max(1),
            cjk_aware: settings.cjk_aware,
            cjk_wrap_ratio: settings.cjk_wrap_ratio,
            line_padding: settings.line_padding,
            stroke_divisor: settings.stroke_divisor.max(1),
            min_stroke: settings.min_stroke,
            branding_divisor: settings.branding_divisor.max(1),
        }
    }
}

/// Lays out captions with a fixed set of parameters.
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    params: LayoutParams,
}

impl LayoutEngine {
    pub fn new(params: LayoutParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &LayoutParams {
        &self.params
    }

    /// Wrap plain text by character count and size it for the frame.
    ///
    /// Empty or whitespace-only text, and a zero-sized frame, yield an
    /// empty result with all sizes zero.
    pub fn wrap_and_size(
        &self,
        text: &str,
        frame_width: u32,
        frame_height: u32,
        max_chars_per_line: usize,
    ) -> LayoutResult {
        self.layout(
            text,
            frame_width,
            frame_height,
            max_chars_per_line,
            Measure::Chars,
            self.params.base_divisor,
        )
    }

    /// Lay out a caption, picking the measure and divisor from its
    /// language and role.
    pub fn layout_caption(
        &self,
        caption: &CaptionSpec,
        frame_width: u32,
        frame_height: u32,
    ) -> LayoutResult {
        let cjk = self.params.cjk_aware && caption.effective_language().is_cjk();
        let (measure, budget) = if cjk {
            let visual =
                (self.params.max_chars_per_line as f64 * self.params.cjk_wrap_ratio).floor();
            (Measure::Visual, (visual as usize).max(1))
        } else {
            (Measure::Chars, self.params.max_chars_per_line)
        };

        let divisor = match caption.role {
            CaptionRole::Branding => self.params.branding_divisor,
            CaptionRole::Top | CaptionRole::Bottom => self.params.base_divisor,
        };

        self.layout(
            &caption.text,
            frame_width,
            frame_height,
            budget,
            measure,
            divisor,
        )
    }

    fn layout(
        &self,
        text: &str,
        frame_width: u32,
        frame_height: u32,
        budget: usize,
        measure: Measure,
        divisor: u32,
    ) -> LayoutResult {
        if frame_width == 0 || frame_height == 0 {
            return LayoutResult::default();
        }

        let lines = wrap_words(text, budget, measure);
        if lines.is_empty() {
            return LayoutResult::default();
        }

        let font_size_px = self.font_size(frame_height, lines.len(), divisor);
        LayoutResult {
            lines,
            font_size_px,
            line_height_px: font_size_px + self.params.line_padding,
            stroke_width_px: (font_size_px / self.params.stroke_divisor.max(1))
                .max(self.params.min_stroke),
        }
    }

    /// Font size for `line_count` lines; never below one pixel.
    pub fn font_size(&self, frame_height: u32, line_count: usize, divisor: u32) -> u32 {
        let extra_lines = line_count.max(1) as u32 - 1;
        let denominator = divisor.max(1) + extra_lines * self.params.compression_factor;
        (frame_height / denominator).max(1)
    }
}

/// [`LayoutEngine::wrap_and_size`] with the calibrated default constants.
pub fn wrap_and_size(
    text: &str,
    frame_width: u32,
    frame_height: u32,
    max_chars_per_line: usize,
) -> LayoutResult {
    LayoutEngine::default().wrap_and_size(text, frame_width, frame_height, max_chars_per_line)
}
