//! Label bookkeeping and single-pass serialization of a stage list.

use std::collections::{HashMap, HashSet};

use super::errors::GraphBuildError;
use super::escape::{quote_literal, unescape_literal};
use super::stage::{FilterOp, FilterStage, StreamKind, StreamLabel};

/// A validated, serialized filter graph.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGraph {
    pub stages: Vec<FilterStage>,
    /// The graph description passed to the engine.
    pub graph_text: String,
    /// Labels left for the output mapping, in the order given to `build`.
    pub sink_labels: Vec<String>,
}

impl FilterGraph {
    /// Number of stages running a given filter.
    pub fn count_ops(&self, name: &str) -> usize {
        self.stages.iter().filter(|s| s.op.name() == name).count()
    }
}

/// Accumulates stages for one render, allocating output labels.
///
/// The label counter lives as long as the builder, so labels are unique
/// within a graph and a fresh builder is used for every render.
#[derive(Debug)]
pub struct GraphBuilder {
    input_count: usize,
    stages: Vec<FilterStage>,
    next_label: usize,
}

impl GraphBuilder {
    /// Create a builder for a command with `input_count` engine inputs.
    pub fn new(input_count: usize) -> Self {
        Self {
            input_count,
            stages: Vec::new(),
            next_label: 0,
        }
    }

    /// Append a stage reading `inputs`; returns its freshly allocated output.
    pub fn push(&mut self, inputs: Vec<StreamLabel>, op: FilterOp) -> StreamLabel {
        let prefix = match op.output_kind() {
            StreamKind::Video => "v",
            StreamKind::Audio => "a",
        };
        let output = StreamLabel::Node(format!("{}{}", prefix, self.next_label));
        self.next_label += 1;
        self.stages.push(FilterStage {
            inputs,
            output: output.clone(),
            op,
        });
        output
    }

    /// Append a single-input stage.
    pub fn chain(&mut self, input: StreamLabel, op: FilterOp) -> StreamLabel {
        self.push(vec![input], op)
    }

    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Validate and serialize. `sinks` are the labels mapped to the output.
    pub fn build(self, sinks: &[StreamLabel]) -> Result<FilterGraph, GraphBuildError> {
        build_graph(self.input_count, self.stages, sinks)
    }
}

/// Validate a stage list and serialize it to graph text.
///
/// On failure the offending graph text is logged before the error is
/// returned.
pub fn build_graph(
    input_count: usize,
    stages: Vec<FilterStage>,
    sinks: &[StreamLabel],
) -> Result<FilterGraph, GraphBuildError> {
    let graph_text = stages
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(";");

    if let Err(err) = validate(input_count, &stages, sinks) {
        tracing::error!(graph = %graph_text, error = %err, "Filter graph failed validation");
        return Err(err);
    }

    Ok(FilterGraph {
        stages,
        graph_text,
        sink_labels: sinks.iter().map(StreamLabel::name).collect(),
    })
}

fn validate(
    input_count: usize,
    stages: &[FilterStage],
    sinks: &[StreamLabel],
) -> Result<(), GraphBuildError> {
    let mut produced: HashMap<String, usize> = HashMap::new();
    let mut consumed: HashSet<String> = HashSet::new();

    for (idx, stage) in stages.iter().enumerate() {
        for input in &stage.inputs {
            match input {
                StreamLabel::Input { index, .. } => {
                    if *index >= input_count {
                        return Err(GraphBuildError::InputOutOfRange {
                            stage: idx,
                            index: *index,
                            inputs: input_count,
                        });
                    }
                }
                StreamLabel::Node(name) => {
                    if !produced.contains_key(name) {
                        return Err(GraphBuildError::UnknownLabel {
                            stage: idx,
                            label: name.clone(),
                        });
                    }
                    if !consumed.insert(name.clone()) {
                        return Err(GraphBuildError::LabelReused {
                            stage: idx,
                            label: name.clone(),
                        });
                    }
                }
            }
        }

        if let FilterOp::DrawText(draw) = &stage.op {
            if draw.text.trim().is_empty() {
                return Err(GraphBuildError::EmptyText { stage: idx });
            }
            if unescape_literal(&quote_literal(&draw.text)).as_deref() != Some(draw.text.as_str())
            {
                return Err(GraphBuildError::LiteralRoundTrip {
                    text: draw.text.clone(),
                });
            }
        }

        let name = stage.output.name();
        let fresh = matches!(stage.output, StreamLabel::Node(_)) && !produced.contains_key(&name);
        if !fresh {
            return Err(GraphBuildError::DuplicateLabel {
                stage: idx,
                label: name,
            });
        }
        produced.insert(name, idx);
    }

    let mut mapped = HashSet::new();
    for sink in sinks {
        let name = sink.name();
        if !produced.contains_key(&name) {
            return Err(GraphBuildError::MissingSink { label: name });
        }
        if consumed.contains(&name) || !mapped.insert(name.clone()) {
            return Err(GraphBuildError::LabelReused {
                stage: stages.len(),
                label: name,
            });
        }
    }

    // Report the earliest unused label first
    let mut dangling: Vec<(&String, &usize)> = produced
        .iter()
        .filter(|(name, _)| !consumed.contains(*name) && !mapped.contains(*name))
        .collect();
    dangling.sort_by_key(|(_, idx)| **idx);
    if let Some((name, _)) = dangling.first() {
        return Err(GraphBuildError::DanglingLabel {
            label: (*name).clone(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filtergraph::stage::DrawText;

    fn text_op(text: &str) -> FilterOp {
        FilterOp::DrawText(DrawText {
            text: text.to_string(),
            font_file: None,
            font_size: 60,
            font_color: "white".to_string(),
            border_width: 6,
            border_color: "black".to_string(),
            x: "(w-text_w)/2".to_string(),
            y: "40".to_string(),
        })
    }

    #[test]
    fn chained_stages_thread_previous_output() {
        for n in 1..=8 {
            let mut builder = GraphBuilder::new(1);
            let mut current = StreamLabel::input(0, StreamKind::Video);
            for i in 0..n {
                current = builder.chain(current, text_op(&format!("line {i}")));
            }
            let graph = builder.build(&[current.clone()]).unwrap();

            assert_eq!(graph.stages.len(), n);
            assert_eq!(
                graph.stages[0].inputs,
                vec![StreamLabel::input(0, StreamKind::Video)]
            );
            for k in 1..n {
                assert_eq!(graph.stages[k].inputs, vec![graph.stages[k - 1].output.clone()]);
            }
            assert_eq!(graph.sink_labels, vec![current.name()]);
            assert_eq!(graph.stages[n - 1].output, current);
        }
    }

    #[test]
    fn serializes_once_with_semicolons() {
        let mut builder = GraphBuilder::new(2);
        let scaled = builder.chain(
            StreamLabel::input(1, StreamKind::Video),
            FilterOp::Scale {
                width: 1280,
                height: -1,
            },
        );
        let composed = builder.push(
            vec![StreamLabel::input(0, StreamKind::Video), scaled],
            FilterOp::Overlay {
                x: "(W-w)/2".to_string(),
                y: "H-h".to_string(),
            },
        );
        let graph = builder.build(&[composed]).unwrap();
        assert_eq!(
            graph.graph_text,
            "[1:v]scale=1280:-1[v0];[0:v][v0]overlay=x=(W-w)/2:y=H-h[v1]"
        );
        assert_eq!(graph.count_ops("overlay"), 1);
    }

    #[test]
    fn rejects_label_used_before_assignment() {
        let stages = vec![FilterStage {
            inputs: vec![StreamLabel::Node("v9".to_string())],
            output: StreamLabel::Node("v0".to_string()),
            op: text_op("x"),
        }];
        let err = build_graph(1, stages, &[StreamLabel::Node("v0".to_string())]).unwrap_err();
        assert_eq!(
            err,
            GraphBuildError::UnknownLabel {
                stage: 0,
                label: "v9".to_string()
            }
        );
    }

    #[test]
    fn rejects_label_consumed_twice() {
        let mut builder = GraphBuilder::new(1);
        let first = builder.chain(StreamLabel::input(0, StreamKind::Video), text_op("a"));
        builder.chain(first.clone(), text_op("b"));
        let last = builder.chain(first, text_op("c"));
        let err = builder.build(&[last]).unwrap_err();
        assert!(matches!(err, GraphBuildError::LabelReused { stage: 2, .. }));
    }

    #[test]
    fn rejects_out_of_range_input() {
        let mut builder = GraphBuilder::new(1);
        let out = builder.chain(
            StreamLabel::input(3, StreamKind::Audio),
            FilterOp::Volume { db: 0.0 },
        );
        assert!(matches!(
            builder.build(&[out]),
            Err(GraphBuildError::InputOutOfRange { index: 3, .. })
        ));
    }

    #[test]
    fn rejects_dangling_and_missing_sinks() {
        let mut builder = GraphBuilder::new(1);
        builder.chain(StreamLabel::input(0, StreamKind::Video), text_op("a"));
        assert!(matches!(
            builder.build(&[]),
            Err(GraphBuildError::DanglingLabel { .. })
        ));

        let builder = GraphBuilder::new(1);
        assert!(matches!(
            builder.build(&[StreamLabel::Node("aout".to_string())]),
            Err(GraphBuildError::MissingSink { .. })
        ));
    }

    #[test]
    fn rejects_empty_draw_literal() {
        let mut builder = GraphBuilder::new(1);
        let out = builder.chain(StreamLabel::input(0, StreamKind::Video), text_op("  "));
        assert_eq!(
            builder.build(&[out]),
            Err(GraphBuildError::EmptyText { stage: 0 })
        );
    }

    #[test]
    fn rejects_literal_that_cannot_round_trip() {
        let mut builder = GraphBuilder::new(1);
        let out = builder.chain(StreamLabel::input(0, StreamKind::Video), text_op("a\rb"));
        assert!(matches!(
            builder.build(&[out]),
            Err(GraphBuildError::LiteralRoundTrip { .. })
        ));
    }
}
