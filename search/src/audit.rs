//! Frame audit log: one event per recognized frame plus the termination
//! reason.
//!
//! The ordered list of [`FrameEventV1`] entries is the decision surface of a
//! decode. Reports serialize it through canonical JSON, so everything here
//! is integer-valued.

/// What happened while one frame was scored, purged and grown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameEventV1 {
    /// Frame index after the advance.
    pub frame: u32,
    /// Size of the list that was scored, before purge.
    pub active_before_purge: u64,
    /// Size after purge.
    pub active_after_purge: u64,
    /// Tokens removed by absolute or relative beam pruning.
    pub beam_pruned: u64,
    /// Tokens materialized in the arena during the grow.
    pub tokens_created: u64,
    /// Candidates that lost a Viterbi comparison.
    pub viterbi_pruned: u64,
    /// Arcs skipped by phonetic context filtering.
    pub context_rejected: u64,
    /// Grow passes run (1 unless combine states deferred work).
    pub combine_passes: u64,
    /// Combine tokens placed on a deferred list across all passes.
    pub deferred_tokens: u64,
    /// Final-state tokens collected by this frame's grow.
    pub results: u64,
    /// `true` when `grow_skip_interval` suppressed the grow.
    pub grow_skipped: bool,
}

/// Why a decode stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReasonV1 {
    /// All feature frames were consumed.
    InputExhausted,
    /// The active list emptied before input ran out.
    BeamExhausted,
    /// A grow exceeded `max_work_per_frame` work-list pops.
    WorkBudgetExceeded { frame: u32 },
    /// A panic was caught in a collaborator callback.
    InternalPanic { stage: PanicStageV1 },
}

/// Stage at which a panic was caught.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanicStageV1 {
    /// `AcousticScorer::score_frame()` panicked.
    ScoreFrame,
}

impl FrameEventV1 {
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "active_after_purge": self.active_after_purge,
            "active_before_purge": self.active_before_purge,
            "beam_pruned": self.beam_pruned,
            "combine_passes": self.combine_passes,
            "context_rejected": self.context_rejected,
            "deferred_tokens": self.deferred_tokens,
            "frame": self.frame,
            "grow_skipped": self.grow_skipped,
            "results": self.results,
            "tokens_created": self.tokens_created,
            "viterbi_pruned": self.viterbi_pruned,
        })
    }
}

impl TerminationReasonV1 {
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            Self::InputExhausted => serde_json::json!({"type": "input_exhausted"}),
            Self::BeamExhausted => serde_json::json!({"type": "beam_exhausted"}),
            Self::WorkBudgetExceeded { frame } => {
                serde_json::json!({"frame": frame, "type": "work_budget_exceeded"})
            }
            Self::InternalPanic { stage } => {
                serde_json::json!({"stage": panic_stage_str(*stage), "type": "internal_panic"})
            }
        }
    }

    /// Whether the decode ran to the end of its input.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::InputExhausted)
    }
}

fn panic_stage_str(s: PanicStageV1) -> &'static str {
    match s {
        PanicStageV1::ScoreFrame => "score_frame",
    }
}
