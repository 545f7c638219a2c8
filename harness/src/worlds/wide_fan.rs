//! `WideFan`: many parallel emitting branches under a tight absolute beam.
//!
//! Branch `k` enters with language weight `-0.5 k` and scores `-0.25 k`
//! per frame, so the best three branches are always `k = 0, 1, 2`.

use tokenpass_kernel::graph::{SearchGraphBuilder, SearchGraphV1, StateKindV1};
use tokenpass_search::policy::DecoderPolicyV1;
use tokenpass_search::scorer::{FeatureFrameV1, TableScorer};

use crate::contract::{DecodeWorldV1, ScorerInputV1, WorldError};

/// Number of parallel branches.
pub const BRANCHES: u32 = 9;
/// Feature frames in the utterance.
pub const FRAMES: u32 = 3;
/// Absolute beam the world decodes with.
pub const BEAM: i32 = 3;

pub struct WideFan;

#[allow(clippy::cast_precision_loss)]
fn branch_weight(k: u32, per_unit: f32) -> f32 {
    per_unit * k as f32
}

impl DecodeWorldV1 for WideFan {
    #[allow(clippy::unnecessary_literal_bound)]
    fn world_id(&self) -> &str {
        "wide_fan"
    }

    fn build_graph(&self) -> Result<SearchGraphV1, WorldError> {
        let mut b = SearchGraphBuilder::new();
        let i = b.add_state(StateKindV1::Initial);
        let f = b.add_state(StateKindV1::Final);
        for k in 0..BRANCHES {
            let h = b.add_hmm(k, &format!("B{k}"));
            b.add_arc(i, h, 0.0, branch_weight(k, -0.5), 0.0)
                .add_arc(h, h, 0.0, 0.0, 0.0)
                .add_arc(h, f, 0.0, 0.0, 0.0);
        }
        Ok(b.build()?)
    }

    fn features(&self) -> Vec<FeatureFrameV1> {
        (0..FRAMES)
            .map(|i| FeatureFrameV1::new(i, vec![1.0, 0.5]))
            .collect()
    }

    fn scorer(&self) -> ScorerInputV1 {
        let mut table = TableScorer::new();
        for frame in 0..FRAMES {
            for k in 0..BRANCHES {
                table = table.with_senone(frame, k, branch_weight(k, -0.25));
            }
        }
        ScorerInputV1::Table(table)
    }

    fn policy(&self) -> DecoderPolicyV1 {
        DecoderPolicyV1 {
            absolute_beam_width: BEAM,
            ..DecoderPolicyV1::default()
        }
    }
}
