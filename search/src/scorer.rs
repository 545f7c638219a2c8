//! Acoustic scoring seam.
//!
//! The decoder never computes acoustic scores itself. It hands the current
//! feature frame and the states of its emitting tokens to an
//! [`AcousticScorer`] and reads back one log score per state.

use std::collections::BTreeMap;

use tokenpass_kernel::graph::{SearchStateV1, StateKindV1};
use tokenpass_kernel::logmath::LOG_ZERO;

/// One frame of audio features.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrameV1 {
    /// Position of the frame in the utterance.
    pub index: u32,
    pub values: Vec<f32>,
}

impl FeatureFrameV1 {
    #[must_use]
    pub fn new(index: u32, values: Vec<f32>) -> Self {
        Self { index, values }
    }
}

/// Trait for acoustic scoring.
///
/// Implementations must return exactly `states.len()` scores, in order.
/// Scores are natural-log likelihoods; NaN is clamped by the caller.
pub trait AcousticScorer: Send + Sync {
    fn score_frame(&self, frame: &FeatureFrameV1, states: &[&SearchStateV1]) -> Vec<f32>;
}

/// Scores every state 0.0 (log of one).
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformScorer;

impl AcousticScorer for UniformScorer {
    fn score_frame(&self, _frame: &FeatureFrameV1, states: &[&SearchStateV1]) -> Vec<f32> {
        vec![0.0; states.len()]
    }
}

/// Fixed per-frame, per-senone scores.
///
/// HMM states are looked up by senone; every other kind is looked up by
/// state id. Missing entries score `LOG_ZERO`.
#[derive(Debug, Clone, Default)]
pub struct TableScorer {
    by_senone: BTreeMap<(u32, u32), f32>,
    by_state: BTreeMap<(u32, u32), f32>,
}

impl TableScorer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Score for `senone` on frame `frame`.
    #[must_use]
    pub fn with_senone(mut self, frame: u32, senone: u32, score: f32) -> Self {
        self.by_senone.insert((frame, senone), score);
        self
    }

    /// Score for a non-HMM emitting state on frame `frame`.
    #[must_use]
    pub fn with_state(mut self, frame: u32, state: u32, score: f32) -> Self {
        self.by_state.insert((frame, state), score);
        self
    }

    fn lookup(&self, frame: u32, state: &SearchStateV1) -> f32 {
        let entry = match &state.kind {
            StateKindV1::Hmm { senone, .. } => self.by_senone.get(&(frame, *senone)),
            _ => self.by_state.get(&(frame, state.id.0)),
        };
        entry.copied().unwrap_or(LOG_ZERO)
    }
}

impl AcousticScorer for TableScorer {
    fn score_frame(&self, frame: &FeatureFrameV1, states: &[&SearchStateV1]) -> Vec<f32> {
        states.iter().map(|s| self.lookup(frame.index, s)).collect()
    }
}
