//! Filter-graph construction.
//!
//! Graphs are modelled as an ordered list of [`FilterStage`]s. The
//! [`GraphBuilder`] allocates labels and serializes the list exactly once,
//! which is also the only place caption text is escaped.
//!
//! - [`escape`]: literal escaping and its reference parser
//! - [`stage`]: stage and operation types
//! - [`builder`]: label bookkeeping, validation, serialization
//! - [`compose`]: full render graphs per output variant

pub mod builder;
pub mod compose;
pub mod errors;
pub mod escape;
pub mod stage;

pub use builder::{build_graph, FilterGraph, GraphBuilder};
pub use compose::{
    AudioPolicy, CaptionStyle, ComposedGraph, GraphComposer, OutputMapping, RenderInputs,
    StreamMap,
};
pub use errors::GraphBuildError;
pub use escape::{escape_literal, quote_literal, quote_value, unescape_literal};
pub use stage::{DrawText, FadeKind, FilterOp, FilterStage, StreamKind, StreamLabel};
