//! Chain-shaped worlds: a single path, a two-arc fork, and a unit chain
//! whose phonetic contexts only line up along one route.

use tokenpass_kernel::graph::{SearchGraphBuilder, SearchGraphV1, StateKindV1};
use tokenpass_kernel::unit::UnitV1;
use tokenpass_search::policy::DecoderPolicyV1;
use tokenpass_search::scorer::{FeatureFrameV1, TableScorer};

use crate::contract::{DecodeWorldV1, ScorerInputV1, WorldError};

fn silent_frames(count: u32) -> Vec<FeatureFrameV1> {
    (0..count).map(|i| FeatureFrameV1::new(i, vec![0.0])).collect()
}

/// Three emitting states in a row; the last one is final.
///
/// One frame of uniform scores gives a single result scoring `-3.0`.
pub struct LinearChain;

impl DecodeWorldV1 for LinearChain {
    #[allow(clippy::unnecessary_literal_bound)]
    fn world_id(&self) -> &str {
        "linear_chain"
    }

    fn build_graph(&self) -> Result<SearchGraphV1, WorldError> {
        let mut b = SearchGraphBuilder::new();
        let a = b.add_hmm(0, "A");
        let m = b.add_hmm(1, "B");
        let c = b.add_hmm(2, "C");
        b.mark_final(c);
        b.add_arc(a, m, 0.0, -1.0, 0.0).add_arc(m, c, 0.0, -2.0, 0.0);
        Ok(b.build()?)
    }

    fn features(&self) -> Vec<FeatureFrameV1> {
        silent_frames(1)
    }

    fn scorer(&self) -> ScorerInputV1 {
        ScorerInputV1::Uniform
    }
}

/// Two arcs of different weight into the same emitting state.
///
/// The `-5.0` arc wins; the `-10.0` arc survives only as an alternate.
pub struct ViterbiFork;

impl DecodeWorldV1 for ViterbiFork {
    #[allow(clippy::unnecessary_literal_bound)]
    fn world_id(&self) -> &str {
        "viterbi_fork"
    }

    fn build_graph(&self) -> Result<SearchGraphV1, WorldError> {
        let mut b = SearchGraphBuilder::new();
        let i = b.add_state(StateKindV1::Initial);
        let x = b.add_hmm(1, "X");
        let f = b.add_state(StateKindV1::Final);
        b.add_arc(i, x, 0.0, -10.0, 0.0)
            .add_arc(i, x, 0.0, -5.0, 0.0)
            .add_arc(x, f, 0.0, -0.5, 0.0);
        Ok(b.build()?)
    }

    fn features(&self) -> Vec<FeatureFrameV1> {
        silent_frames(1)
    }

    fn scorer(&self) -> ScorerInputV1 {
        ScorerInputV1::Uniform
    }
}

/// Context-dependent units. Only `A → B` chains; `A → C` and the
/// entry into `Z` fail the context check.
///
/// ```text
/// initial ─▶ A(-,B) ─▶ hA ─┬─▶ B(A,-) ─▶ hB ─▶ final
///    │                 ↺   └─▶ C(A,-) ─▶ hC ─▶ final
///    └─▶ Z(Q,-) ─▶ hZ ─▶ final
/// ```
pub struct ContextChain;

impl DecodeWorldV1 for ContextChain {
    #[allow(clippy::unnecessary_literal_bound)]
    fn world_id(&self) -> &str {
        "context_chain"
    }

    fn build_graph(&self) -> Result<SearchGraphV1, WorldError> {
        let mut b = SearchGraphBuilder::new();
        let i = b.add_state(StateKindV1::Initial);
        let unit_a = b.add_state(StateKindV1::Unit(UnitV1::with_context("A", &[], &["B"])));
        let hmm_a = b.add_hmm(1, "A");
        let unit_b = b.add_state(StateKindV1::Unit(UnitV1::with_context("B", &["A"], &[])));
        let hmm_b = b.add_hmm(2, "B");
        let unit_c = b.add_state(StateKindV1::Unit(UnitV1::with_context("C", &["A"], &[])));
        let hmm_c = b.add_hmm(3, "C");
        let unit_z = b.add_state(StateKindV1::Unit(UnitV1::with_context("Z", &["Q"], &[])));
        let hmm_z = b.add_hmm(4, "Z");
        let f = b.add_state(StateKindV1::Final);
        b.add_arc(i, unit_a, 0.0, 0.0, 0.0)
            .add_arc(i, unit_z, 0.0, 0.0, 0.0)
            .add_arc(unit_a, hmm_a, 0.0, 0.0, 0.0)
            .add_arc(hmm_a, hmm_a, 0.0, -0.1, 0.0)
            .add_arc(hmm_a, unit_b, 0.0, 0.0, 0.0)
            .add_arc(hmm_a, unit_c, 0.0, 0.0, 0.0)
            .add_arc(unit_b, hmm_b, 0.0, 0.0, 0.0)
            .add_arc(unit_c, hmm_c, 0.0, 0.0, 0.0)
            .add_arc(unit_z, hmm_z, 0.0, 0.0, 0.0)
            .add_arc(hmm_b, f, 0.0, 0.0, 0.0)
            .add_arc(hmm_c, f, 0.0, 0.0, 0.0)
            .add_arc(hmm_z, f, 0.0, 0.0, 0.0);
        Ok(b.build()?)
    }

    fn features(&self) -> Vec<FeatureFrameV1> {
        silent_frames(2)
    }

    fn scorer(&self) -> ScorerInputV1 {
        ScorerInputV1::Table(
            TableScorer::new()
                .with_senone(0, 1, -0.5)
                .with_senone(1, 1, -2.0)
                .with_senone(1, 2, -0.25),
        )
    }

    fn policy(&self) -> DecoderPolicyV1 {
        DecoderPolicyV1 {
            filter_successors: true,
            ..DecoderPolicyV1::default()
        }
    }
}
