//! Filter stages and their serialization.

use std::fmt;

use crate::models::MixDurationPolicy;

use super::escape::{quote_literal, quote_value};

/// Media type of a raw input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    fn specifier(&self) -> &'static str {
        match self {
            StreamKind::Video => "v",
            StreamKind::Audio => "a",
        }
    }
}

/// A stream a stage reads from or writes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamLabel {
    /// A stream of an engine input (`[1:a]`).
    Input { index: usize, kind: StreamKind },
    /// An intermediate label allocated by the builder (`[v3]`).
    Node(String),
}

impl StreamLabel {
    pub fn input(index: usize, kind: StreamKind) -> Self {
        StreamLabel::Input { index, kind }
    }

    /// Label name without brackets, as used by `-map`.
    pub fn name(&self) -> String {
        match self {
            StreamLabel::Input { index, kind } => format!("{}:{}", index, kind.specifier()),
            StreamLabel::Node(name) => name.clone(),
        }
    }
}

impl fmt::Display for StreamLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.name())
    }
}

/// Parameters of one text-draw operation (one line of text).
#[derive(Debug, Clone, PartialEq)]
pub struct DrawText {
    /// Plain text; escaped only at serialization.
    pub text: String,
    pub font_file: Option<String>,
    pub font_size: u32,
    pub font_color: String,
    pub border_width: u32,
    pub border_color: String,
    /// Horizontal position expression.
    pub x: String,
    /// Vertical position expression.
    pub y: String,
}

/// Fade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeKind {
    In,
    Out,
}

/// Operation performed by a stage.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// Composite the second input over the first at an expression position.
    Overlay { x: String, y: String },
    /// Resize; `-1` keeps the aspect ratio for that axis.
    Scale { width: i32, height: i32 },
    DrawText(DrawText),
    /// Cut audio at `end_secs`.
    ATrim { end_secs: f64 },
    Volume { db: f64 },
    AFade {
        kind: FadeKind,
        start_secs: f64,
        duration_secs: f64,
    },
    AMix {
        inputs: usize,
        duration: MixDurationPolicy,
    },
}

impl FilterOp {
    /// Engine filter name.
    pub fn name(&self) -> &'static str {
        match self {
            FilterOp::Overlay { .. } => "overlay",
            FilterOp::Scale { .. } => "scale",
            FilterOp::DrawText(_) => "drawtext",
            FilterOp::ATrim { .. } => "atrim",
            FilterOp::Volume { .. } => "volume",
            FilterOp::AFade { .. } => "afade",
            FilterOp::AMix { .. } => "amix",
        }
    }

    /// Kind of stream the operation produces.
    pub fn output_kind(&self) -> StreamKind {
        match self {
            FilterOp::Overlay { .. } | FilterOp::Scale { .. } | FilterOp::DrawText(_) => {
                StreamKind::Video
            }
            FilterOp::ATrim { .. }
            | FilterOp::Volume { .. }
            | FilterOp::AFade { .. }
            | FilterOp::AMix { .. } => StreamKind::Audio,
        }
    }

    /// Serialize as `name=args`.
    pub fn to_filter_string(&self) -> String {
        match self {
            FilterOp::Overlay { x, y } => format!("overlay=x={}:y={}", x, y),
            FilterOp::Scale { width, height } => format!("scale={}:{}", width, height),
            FilterOp::DrawText(draw) => {
                let mut args = Vec::with_capacity(8);
                if let Some(font) = &draw.font_file {
                    args.push(format!("fontfile={}", quote_value(font)));
                }
                args.push(format!("text={}", quote_literal(&draw.text)));
                args.push(format!("fontsize={}", draw.font_size));
                args.push(format!("fontcolor={}", draw.font_color));
                args.push(format!("borderw={}", draw.border_width));
                args.push(format!("bordercolor={}", draw.border_color));
                args.push(format!("x={}", draw.x));
                args.push(format!("y={}", draw.y));
                format!("drawtext={}", args.join(":"))
            }
            FilterOp::ATrim { end_secs } => format!("atrim=end={}", secs(*end_secs)),
            FilterOp::Volume { db } => format!("volume={}dB", db),
            FilterOp::AFade {
                kind,
                start_secs,
                duration_secs,
            } => {
                let t = match kind {
                    FadeKind::In => "in",
                    FadeKind::Out => "out",
                };
                format!(
                    "afade=t={}:st={}:d={}",
                    t,
                    secs(*start_secs),
                    secs(*duration_secs)
                )
            }
            FilterOp::AMix { inputs, duration } => format!(
                "amix=inputs={}:duration={}:dropout_transition=0:normalize=0",
                inputs,
                duration.as_engine_value()
            ),
        }
    }
}

/// Seconds with millisecond precision.
fn secs(value: f64) -> String {
    format!("{:.3}", value.max(0.0))
}

/// One node of the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterStage {
    pub inputs: Vec<StreamLabel>,
    pub output: StreamLabel,
    pub op: FilterOp,
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for input in &self.inputs {
            write!(f, "{}", input)?;
        }
        write!(f, "{}{}", self.op.to_filter_string(), self.output)
    }
}
