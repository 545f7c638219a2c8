//! Structural properties of the decoder that must hold for any graph.
//!
//! - Alternates per token never exceed `max_edges - 1` after finish.
//! - Equal-score candidates: the later one wins, the earlier is kept.
//! - Combine fan-in is bounded by the graph, not by the work budget.
//! - Every exported token reaches the start token.

use tokenpass_harness::runner::run_world;
use tokenpass_harness::worlds::all_worlds;
use tokenpass_kernel::graph::{SearchGraphBuilder, SearchGraphV1, StateKindV1, StateSemanticsV1};
use tokenpass_search::audit::TerminationReasonV1;
use tokenpass_search::manager::{DecodeResultV1, SearchManager};
use tokenpass_search::policy::DecoderPolicyV1;
use tokenpass_search::scorer::{FeatureFrameV1, UniformScorer};
use tokenpass_search::token_graph::{EdgeKindV1, TokenGraphV1};

#[allow(clippy::cast_precision_loss)]
fn parallel_arcs(count: u32, step: f32, combine: bool) -> SearchGraphV1 {
    let mut b = SearchGraphBuilder::new();
    let i = b.add_state(StateKindV1::Initial);
    let x = if combine {
        let x = b.add_state(StateKindV1::Grammar { label: "sum".into() });
        b.set_semantics(x, StateSemanticsV1::Combine);
        x
    } else {
        b.add_hmm(1, "X")
    };
    let y = b.add_hmm(2, "Y");
    let f = b.add_state(StateKindV1::Final);
    for k in 0..count {
        b.add_arc(i, x, 0.0, step * k as f32, 0.0);
    }
    b.add_arc(x, y, 0.0, 0.0, 0.0).add_arc(y, f, 0.0, 0.0, 0.0);
    if !combine {
        b.add_arc(x, f, 0.0, 0.0, 0.0);
    }
    b.build().unwrap()
}

fn decode(graph: &SearchGraphV1, policy: DecoderPolicyV1, frames: u32) -> DecodeResultV1 {
    let features: Vec<FeatureFrameV1> = (0..frames).map(|i| FeatureFrameV1::new(i, vec![])).collect();
    SearchManager::new(graph, &UniformScorer, policy)
        .unwrap()
        .recognize(&features)
        .unwrap()
}

/// ACCEPTANCE: ALTERNATES-BOUNDED
#[test]
fn alternates_are_capped_at_finish() {
    let graph = parallel_arcs(10, -1.0, false);
    let policy = DecoderPolicyV1 {
        max_edges: 3,
        ..DecoderPolicyV1::default()
    };
    let result = decode(&graph, policy, 1);
    let alternates = result.alternates.as_ref().unwrap();
    assert!(alternates.tracked() > 0);
    for (winner, losers) in alternates.iter() {
        assert!(losers.len() <= 2, "{winner} keeps {} alternates", losers.len());
        // the best losers are the ones kept
        let scores: Vec<f32> = losers.iter().map(|t| result.arena.score(*t)).collect();
        assert_eq!(scores, vec![-1.0, -2.0]);
    }
}

/// ACCEPTANCE: TIE-ADMITTED
#[test]
fn equal_scores_prefer_the_later_candidate() {
    let graph = parallel_arcs(4, 0.0, false);
    let first = decode(&graph, DecoderPolicyV1::default(), 1);
    let second = decode(&graph, DecoderPolicyV1::default(), 1);

    let chain = first.predecessor_chain(first.best_result().unwrap());
    let x_token = chain[1];
    let losers = first
        .alternates
        .as_ref()
        .unwrap()
        .alternate_predecessors(x_token)
        .unwrap();
    assert_eq!(losers.len(), 3);
    assert!(losers.iter().all(|l| *l < x_token));
    assert_eq!(
        second.predecessor_chain(second.best_result().unwrap()),
        chain
    );
}

/// ACCEPTANCE: COMBINE-FAN-IN
#[test]
fn combine_admission_scales_with_incoming_arcs() {
    let arcs = 200;
    let graph = parallel_arcs(arcs, -0.01, true);
    let policy = DecoderPolicyV1 {
        bushderby_eta: 1.0,
        absolute_beam_width: 5,
        max_work_per_frame: 8,
        ..DecoderPolicyV1::default()
    };
    let result = decode(&graph, policy.clone(), 1);
    assert_eq!(result.termination, TerminationReasonV1::InputExhausted);
    assert!(result.frames[0].tokens_created >= u64::from(arcs));

    let expected: f64 = (0..arcs).map(|k| (-0.01 * f64::from(k)).exp()).sum::<f64>().ln();
    let best = f64::from(result.best_score().unwrap());
    assert!((best - expected).abs() < 1e-3, "got {best}, want {expected}");

    let no_lattice = decode(
        &graph,
        DecoderPolicyV1 {
            build_lattice: false,
            ..policy
        },
        1,
    );
    assert!(no_lattice.frames[0].tokens_created < 5);
    let best = f64::from(no_lattice.best_score().unwrap());
    assert!((best - expected).abs() < 1e-3);
}

/// ACCEPTANCE: LATTICE-ROOTED
#[test]
fn exported_tokens_reach_the_start_token() {
    for world in all_worlds() {
        let report = run_world(world.as_ref()).unwrap();
        let graph: &TokenGraphV1 = &report.token_graph;
        let starts = graph
            .nodes
            .iter()
            .filter(|n| {
                !graph
                    .edges
                    .iter()
                    .any(|e| e.from == n.id && e.kind == EdgeKindV1::Predecessor)
            })
            .count();
        if report.results.is_empty() {
            assert!(graph.nodes.is_empty());
        } else {
            assert_eq!(starts, 1, "world {}", report.world_id);
        }
    }
}

#[test]
fn every_world_finishes_cleanly() {
    for world in all_worlds() {
        let report = run_world(world.as_ref()).unwrap();
        assert!(report.termination.is_complete(), "world {}", report.world_id);
        assert!(!report.results.is_empty(), "world {}", report.world_id);
    }
}
