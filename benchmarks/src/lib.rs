//! Shared helpers for tokenpass benchmark suites.

use tokenpass_kernel::graph::{GraphError, SearchGraphBuilder, SearchGraphV1, StateKindV1};
use tokenpass_search::scorer::{FeatureFrameV1, TableScorer};

/// A layered graph: `width` parallel HMM states per layer, every state
/// linked to every state of the next layer, each with a self-loop.
///
/// The last layer feeds a final state. Senone `k` is shared by the
/// `k`-th state of every layer.
///
/// # Errors
///
/// Returns [`GraphError`] if the graph fails to build.
#[allow(clippy::cast_precision_loss)]
pub fn layered_graph(width: u32, layers: u32) -> Result<SearchGraphV1, GraphError> {
    let mut b = SearchGraphBuilder::new();
    let initial = b.add_state(StateKindV1::Initial);
    let fin = b.add_state(StateKindV1::Final);
    let mut previous = vec![initial];
    for layer in 0..layers {
        let current: Vec<_> = (0..width)
            .map(|k| b.add_hmm(k, &format!("L{layer}K{k}")))
            .collect();
        for &from in &previous {
            for (k, &to) in current.iter().enumerate() {
                b.add_arc(from, to, 0.0, -0.1 * k as f32, 0.0);
            }
        }
        for &state in &current {
            b.add_arc(state, state, 0.0, -0.05, 0.0);
        }
        previous = current;
    }
    for &state in &previous {
        b.add_arc(state, fin, 0.0, 0.0, 0.0);
    }
    b.build()
}

/// `count` frames scoring senone `k` at `-0.01 k - 0.001 frame`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ramp_scorer(width: u32, count: u32) -> (TableScorer, Vec<FeatureFrameV1>) {
    let mut table = TableScorer::new();
    for frame in 0..count {
        for k in 0..width {
            table = table.with_senone(frame, k, -0.01 * k as f32 - 0.001 * frame as f32);
        }
    }
    let frames = (0..count).map(|i| FeatureFrameV1::new(i, vec![0.0])).collect();
    (table, frames)
}
