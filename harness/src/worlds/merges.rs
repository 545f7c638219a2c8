//! Worlds where several paths meet in one state: a fan-in state that keeps
//! them apart, and a combine state that sums them.

use tokenpass_kernel::graph::{SearchGraphBuilder, SearchGraphV1, StateKindV1, StateSemanticsV1};
use tokenpass_search::policy::DecoderPolicyV1;
use tokenpass_search::scorer::FeatureFrameV1;

use crate::contract::{DecodeWorldV1, ScorerInputV1, WorldError};

/// Two grammar predecessors feed a fan-in emitting state.
///
/// Both contexts survive, so the final state collects two results
/// (`-2.0` and `-3.0`).
pub struct FanIn;

impl DecodeWorldV1 for FanIn {
    #[allow(clippy::unnecessary_literal_bound)]
    fn world_id(&self) -> &str {
        "fan_in"
    }

    fn build_graph(&self) -> Result<SearchGraphV1, WorldError> {
        let mut b = SearchGraphBuilder::new();
        let i = b.add_state(StateKindV1::Initial);
        let p1 = b.add_state(StateKindV1::Grammar { label: "p1".into() });
        let p2 = b.add_state(StateKindV1::Grammar { label: "p2".into() });
        let x = b.add_hmm(1, "X");
        let f = b.add_state(StateKindV1::Final);
        b.mark_fan_in(x);
        b.add_arc(i, p1, 0.0, -2.0, 0.0)
            .add_arc(i, p2, 0.0, -3.0, 0.0)
            .add_arc(p1, x, 0.0, 0.0, 0.0)
            .add_arc(p2, x, 0.0, 0.0, 0.0)
            .add_arc(x, f, 0.0, 0.0, 0.0);
        Ok(b.build()?)
    }

    fn features(&self) -> Vec<FeatureFrameV1> {
        vec![FeatureFrameV1::new(0, vec![0.0])]
    }

    fn scorer(&self) -> ScorerInputV1 {
        ScorerInputV1::Uniform
    }
}

/// Paths of probability 0.3 and 0.4 meet in a non-emitting combine state.
///
/// With `bushderby_eta = 1` the merged token scores `ln 0.7`.
pub struct CombineMerge;

impl DecodeWorldV1 for CombineMerge {
    #[allow(clippy::unnecessary_literal_bound)]
    fn world_id(&self) -> &str {
        "combine_merge"
    }

    fn build_graph(&self) -> Result<SearchGraphV1, WorldError> {
        let mut b = SearchGraphBuilder::new();
        let i = b.add_state(StateKindV1::Initial);
        let x = b.add_state(StateKindV1::Grammar { label: "sum".into() });
        let y = b.add_hmm(1, "Y");
        let f = b.add_state(StateKindV1::Final);
        b.set_semantics(x, StateSemanticsV1::Combine);
        b.add_arc(i, x, 0.0, 0.3f32.ln(), 0.0)
            .add_arc(i, x, 0.0, 0.4f32.ln(), 0.0)
            .add_arc(x, y, 0.0, 0.0, 0.0)
            .add_arc(y, f, 0.0, 0.0, 0.0);
        Ok(b.build()?)
    }

    fn features(&self) -> Vec<FeatureFrameV1> {
        vec![FeatureFrameV1::new(0, vec![0.0])]
    }

    fn scorer(&self) -> ScorerInputV1 {
        ScorerInputV1::Uniform
    }

    fn policy(&self) -> DecoderPolicyV1 {
        DecoderPolicyV1 {
            bushderby_eta: 1.0,
            ..DecoderPolicyV1::default()
        }
    }
}
