//! Errors raised while assembling a filter graph.
//!
//! Any of these indicates a bug in graph construction rather than bad
//! input: a well-formed request never produces one.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphBuildError {
    #[error("Stage {stage} reads label [{label}] before it is produced")]
    UnknownLabel { stage: usize, label: String },

    #[error("Label [{label}] is consumed more than once (stage {stage})")]
    LabelReused { stage: usize, label: String },

    #[error("Label [{label}] is produced twice (stage {stage})")]
    DuplicateLabel { stage: usize, label: String },

    #[error("Stage {stage} reads input #{index} but only {inputs} inputs are attached")]
    InputOutOfRange {
        stage: usize,
        index: usize,
        inputs: usize,
    },

    #[error("Label [{label}] is neither consumed nor mapped to the output")]
    DanglingLabel { label: String },

    #[error("Sink label [{label}] is not produced by any stage")]
    MissingSink { label: String },

    #[error("Stage {stage} draws an empty text literal")]
    EmptyText { stage: usize },

    #[error("Escaped literal does not parse back to its text: {text:?}")]
    LiteralRoundTrip { text: String },

    #[error("Frame size of the primary video is unknown")]
    MissingFrameSize,
}
