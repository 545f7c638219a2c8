//! Decoder scenario lock tests, run end to end through the harness.
//!
//! - A: linear chain of emitting states yields one result at `-3.0`.
//! - B: Viterbi keeps the better arc and records the loser.
//! - C: absolute beam keeps exactly the top tokens.
//! - D: combine states sum path probabilities.
//! - E: fan-in states keep one token per incoming context.

use tokenpass_harness::runner::{run_decode, run_world};
use tokenpass_harness::worlds::chains::{ContextChain, LinearChain, ViterbiFork};
use tokenpass_harness::worlds::merges::{CombineMerge, FanIn};
use tokenpass_harness::worlds::wide_fan::{WideFan, BEAM, FRAMES};
use tokenpass_search::audit::TerminationReasonV1;
use tokenpass_search::policy::DecoderPolicyV1;

/// ACCEPTANCE: SCENARIO-A
#[test]
fn linear_chain_single_result() {
    let report = run_world(&LinearChain).unwrap();
    assert_eq!(report.termination, TerminationReasonV1::InputExhausted);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.best_score(), Some(-3.0));
    assert_eq!(report.results[0].path.len(), 3);
    assert_eq!(report.final_frame, 1);
}

/// ACCEPTANCE: SCENARIO-B
#[test]
fn viterbi_fork_keeps_best_arc() {
    let report = run_world(&ViterbiFork).unwrap();
    assert_eq!(report.best_score(), Some(-5.5));
    assert_eq!(report.frames[0].viterbi_pruned, 1);
    assert_eq!(report.token_graph.alternate_edges(), 1);
    let loser = report
        .token_graph
        .nodes
        .iter()
        .find(|n| n.score == -10.0)
        .expect("losing token is exported as an alternate");
    assert!(!loser.is_result);
}

/// ACCEPTANCE: SCENARIO-C
#[test]
fn wide_fan_respects_absolute_beam() {
    let report = run_world(&WideFan).unwrap();
    let beam = u64::try_from(BEAM).unwrap();

    let first = &report.frames[1];
    assert_eq!(first.active_before_purge, 9);
    assert_eq!(first.active_after_purge, beam);
    assert_eq!(first.beam_pruned, 6);
    for event in &report.frames[1..] {
        assert!(event.active_after_purge <= beam, "frame {}", event.frame);
    }

    assert_eq!(report.final_frame, FRAMES);
    let scores: Vec<f32> = report.results.iter().map(|r| r.score).collect();
    assert_eq!(scores, vec![0.0, -1.25, -2.5]);
}

/// ACCEPTANCE: SCENARIO-D
#[test]
fn combine_merge_sums_paths() {
    let report = run_world(&CombineMerge).unwrap();
    let best = report.best_score().unwrap();
    assert!((best - 0.7f32.ln()).abs() < 1e-4, "got {best}");
    assert_eq!(report.frames[0].combine_passes, 2);
    assert_eq!(report.frames[0].deferred_tokens, 1);
}

/// ACCEPTANCE: SCENARIO-D
#[test]
fn combine_merge_with_default_eta_is_viterbi() {
    let report = run_decode(&CombineMerge, &DecoderPolicyV1::default()).unwrap();
    let best = report.best_score().unwrap();
    assert!((best - 0.4f32.ln()).abs() < 1e-4, "got {best}");
}

/// ACCEPTANCE: SCENARIO-E
#[test]
fn fan_in_keeps_both_contexts() {
    let report = run_world(&FanIn).unwrap();
    let scores: Vec<f32> = report.results.iter().map(|r| r.score).collect();
    assert_eq!(scores, vec![-2.0, -3.0]);
    assert_eq!(report.frames[0].viterbi_pruned, 0);
}

#[test]
fn context_chain_rejects_misaligned_units() {
    let report = run_world(&ContextChain).unwrap();
    assert_eq!(report.best_score(), Some(-0.75));
    assert_eq!(report.results.len(), 1);
    let rejected: Vec<u64> = report.frames.iter().map(|e| e.context_rejected).collect();
    assert_eq!(rejected, vec![1, 1, 1]);
}

#[test]
fn context_chain_without_filter_rejects_nothing() {
    let report = run_decode(&ContextChain, &DecoderPolicyV1::default()).unwrap();
    assert_eq!(report.best_score(), Some(-0.75));
    assert!(report.frames.iter().all(|e| e.context_rejected == 0));
}
