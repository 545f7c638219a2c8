//! Frame-synchronous token-passing search.
//!
//! One utterance is `start_recognition` followed by `recognize_frame` once
//! per feature frame, then once with `None`. Each frame scores the emitting
//! tokens of the active list, purges it to the beam, and grows the
//! survivors through the graph until every branch rests on an emitting
//! state (the next frame's active list) or a final state (a result).
//!
//! Growing uses an explicit work-list instead of recursion. Non-emitting
//! combine states collect contributions from every incoming path before
//! their children are expanded, so a grow runs in passes: each pass defers
//! the combine tokens it creates, and the next pass expands them once their
//! working scores have been finalized.
//!
//! A token's children are all created before any of them is expanded, so
//! the `tokens_created` and `viterbi_pruned` counters and the order of
//! recorded alternates follow this work-list order and differ from a
//! depth-first walk of the same graph. Best scores do not.
//!
//! All runtime endings (input exhausted, empty beam, work budget, scorer
//! panic) are reported as [`TerminationReasonV1`] values. Errors are
//! reserved for policy problems and scorer contract breaches.

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tokenpass_kernel::graph::{SearchGraphV1, SearchStateV1, StateId};
use tokenpass_kernel::logmath::{add_as_linear, sanitize};
use tokenpass_kernel::unit::{is_valid_transition, UnitV1};

use crate::active_list::ActiveList;
use crate::alternates::AlternateHypothesisManager;
use crate::audit::{FrameEventV1, PanicStageV1, TerminationReasonV1};
use crate::best_token::BestTokenMap;
use crate::error::SearchError;
use crate::policy::DecoderPolicyV1;
use crate::scorer::{AcousticScorer, FeatureFrameV1};
use crate::token::{EntryScores, TokenArena, TokenId};

/// Outcome of one `recognize_frame` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStep {
    /// More frames may be supplied.
    Continue,
    /// The utterance is over.
    Done(TerminationReasonV1),
}

/// Everything a finished decode leaves behind.
///
/// The arena is complete and read-only: lattice consumers walk predecessor
/// links from `results` and consult `alternates` at each token.
#[derive(Debug, Clone)]
pub struct DecodeResultV1 {
    /// Final-state tokens collected by the last grow.
    pub results: Vec<TokenId>,
    pub arena: TokenArena,
    /// `None` when lattice building was disabled.
    pub alternates: Option<AlternateHypothesisManager>,
    pub frames: Vec<FrameEventV1>,
    pub termination: TerminationReasonV1,
    /// Frame counter when the decode stopped.
    pub final_frame: u32,
}

impl DecodeResultV1 {
    /// Highest-scoring result; ties go to the older token.
    #[must_use]
    pub fn best_result(&self) -> Option<TokenId> {
        self.results.iter().copied().min_by(|a, b| {
            self.arena
                .score(*b)
                .total_cmp(&self.arena.score(*a))
                .then_with(|| a.cmp(b))
        })
    }

    #[must_use]
    pub fn best_score(&self) -> Option<f32> {
        self.best_result().map(|t| self.arena.score(t))
    }

    /// Tokens from `token` back to the start token.
    #[must_use]
    pub fn predecessor_chain(&self, token: TokenId) -> Vec<TokenId> {
        self.arena.predecessor_chain(token).map(|t| t.id).collect()
    }
}

/// Per-grow bookkeeping.
#[derive(Debug, Default)]
struct GrowStats {
    tokens_created: u64,
    viterbi_pruned: u64,
    beam_pruned: u64,
    context_rejected: u64,
    passes: u64,
    deferred: u64,
    over_budget: bool,
}

/// Transient state of one grow.
struct Grow {
    best: BestTokenMap,
    /// Non-emitting `(state, fan-in context, score bits)` already expanded
    /// this grow.
    expanded: HashSet<(StateId, Option<StateId>, u32)>,
    /// Work-list of `(token, may_be_stale)`.
    stack: Vec<(TokenId, bool)>,
    deferred: Vec<TokenId>,
    threshold: f32,
    word_threshold: f32,
    work: u64,
    stats: GrowStats,
}

/// Fan-in states are keyed by the state of the token entering them.
fn fan_in_context(target: &SearchStateV1, from: StateId) -> Option<StateId> {
    target.is_fan_in.then_some(from)
}

/// Drives decoding of one utterance at a time over a fixed graph.
pub struct SearchManager<'a> {
    graph: &'a SearchGraphV1,
    scorer: &'a dyn AcousticScorer,
    policy: DecoderPolicyV1,
    arena: TokenArena,
    active: ActiveList,
    best_tokens: BestTokenMap,
    alternates: Option<AlternateHypothesisManager>,
    results: Vec<TokenId>,
    frames: Vec<FrameEventV1>,
    frame: u32,
    started: bool,
    termination: Option<TerminationReasonV1>,
}

impl<'a> SearchManager<'a> {
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidPolicy`] if the policy fails validation.
    pub fn new(
        graph: &'a SearchGraphV1,
        scorer: &'a dyn AcousticScorer,
        policy: DecoderPolicyV1,
    ) -> Result<Self, SearchError> {
        policy.validate()?;
        let active = ActiveList::new(policy.active_list_config());
        Ok(Self {
            graph,
            scorer,
            policy,
            arena: TokenArena::new(),
            active,
            best_tokens: BestTokenMap::new(),
            alternates: None,
            results: Vec::new(),
            frames: Vec::new(),
            frame: 0,
            started: false,
            termination: None,
        })
    }

    /// Reset to a fresh utterance: plant the start token on the initial
    /// state and grow it to the first emitting frontier.
    ///
    /// # Errors
    ///
    /// [`SearchError::ArenaOverflow`] if the token arena fills up.
    pub fn start_recognition(&mut self) -> Result<(), SearchError> {
        self.arena = TokenArena::new();
        self.active = self.active.new_instance();
        self.best_tokens = BestTokenMap::new();
        self.alternates = self
            .policy
            .build_lattice
            .then(|| AlternateHypothesisManager::new(self.policy.max_edges));
        self.results.clear();
        self.frames.clear();
        self.frame = 0;
        self.termination = None;
        self.started = true;

        let start = self.arena.start(self.graph.initial_state().id, 0)?;
        self.active.add(start, &self.arena);
        let stats = self.grow()?;
        let event = self.frame_event(0, 0, 0, &stats, false);
        tracing::debug!(
            frame = 0,
            active = self.active.len(),
            created = stats.tokens_created,
            "start grow"
        );
        self.frames.push(event);
        if stats.over_budget {
            self.termination = Some(TerminationReasonV1::WorkBudgetExceeded { frame: 0 });
        }
        Ok(())
    }

    /// Advance one frame. `None` marks the end of input.
    ///
    /// # Errors
    ///
    /// [`SearchError::NotStarted`] before `start_recognition`;
    /// [`SearchError::ScorerContractViolation`] if the scorer returns the
    /// wrong number of scores; [`SearchError::ArenaOverflow`] if the arena
    /// fills up.
    pub fn recognize_frame(
        &mut self,
        features: Option<&FeatureFrameV1>,
    ) -> Result<FrameStep, SearchError> {
        if !self.started {
            return Err(SearchError::NotStarted);
        }
        if let Some(reason) = self.termination {
            return Ok(FrameStep::Done(reason));
        }
        let Some(features) = features else {
            return Ok(self.stop(TerminationReasonV1::InputExhausted));
        };
        if self.active.is_empty() {
            let reason = if self.results.is_empty() {
                TerminationReasonV1::BeamExhausted
            } else {
                TerminationReasonV1::InputExhausted
            };
            return Ok(self.stop(reason));
        }
        if let Some(reason) = self.score_tokens(features)? {
            return Ok(self.stop(reason));
        }

        let before = self.active.len();
        let pruned = self.active.purge(&self.arena);
        let after = self.active.len();
        self.frame += 1;

        let skip = self.policy.grow_skip_interval != 0
            && self.frame % self.policy.grow_skip_interval == 0;
        let stats = if skip {
            self.carry_forward()?;
            GrowStats::default()
        } else {
            self.grow()?
        };
        let event = self.frame_event(before, after, pruned, &stats, skip);
        tracing::debug!(
            frame = self.frame,
            active_before_purge = before,
            beam_pruned = pruned,
            created = stats.tokens_created,
            next_active = self.active.len(),
            results = self.results.len(),
            passes = stats.passes,
            "frame"
        );
        self.frames.push(event);

        if stats.over_budget {
            let reason = TerminationReasonV1::WorkBudgetExceeded { frame: self.frame };
            tracing::warn!(
                frame = self.frame,
                budget = self.policy.max_work_per_frame,
                "work budget exceeded"
            );
            return Ok(self.stop(reason));
        }
        Ok(FrameStep::Continue)
    }

    /// Decode a whole utterance.
    ///
    /// # Errors
    ///
    /// Any error from [`Self::start_recognition`] or
    /// [`Self::recognize_frame`].
    pub fn recognize(mut self, features: &[FeatureFrameV1]) -> Result<DecodeResultV1, SearchError> {
        self.start_recognition()?;
        for frame in features.iter().map(Some).chain(std::iter::once(None)) {
            if let FrameStep::Done(_) = self.recognize_frame(frame)? {
                break;
            }
        }
        Ok(self.finish())
    }

    /// Close the utterance and hand over the token lattice.
    ///
    /// A decode the caller stops early between frames is reported as
    /// [`TerminationReasonV1::InputExhausted`].
    #[must_use]
    pub fn finish(mut self) -> DecodeResultV1 {
        if let Some(alternates) = self.alternates.as_mut() {
            alternates.purge(&self.arena);
        }
        let termination = self
            .termination
            .unwrap_or(TerminationReasonV1::InputExhausted);
        tracing::info!(
            termination = ?termination,
            frames = self.frame,
            results = self.results.len(),
            arena = self.arena.len(),
            active_lattice = self.lattice_size(self.active.tokens()),
            result_lattice = self.lattice_size(&self.results),
            "decode finished"
        );
        DecodeResultV1 {
            results: self.results,
            arena: self.arena,
            alternates: self.alternates,
            frames: self.frames,
            termination,
            final_frame: self.frame,
        }
    }

    #[must_use]
    pub fn frame(&self) -> u32 {
        self.frame
    }

    #[must_use]
    pub fn arena(&self) -> &TokenArena {
        &self.arena
    }

    #[must_use]
    pub fn active_list(&self) -> &ActiveList {
        &self.active
    }

    /// Best tokens of the most recent grow.
    #[must_use]
    pub fn best_token_map(&self) -> &BestTokenMap {
        &self.best_tokens
    }

    #[must_use]
    pub fn results(&self) -> &[TokenId] {
        &self.results
    }

    #[must_use]
    pub fn alternates(&self) -> Option<&AlternateHypothesisManager> {
        self.alternates.as_ref()
    }

    #[must_use]
    pub fn frame_events(&self) -> &[FrameEventV1] {
        &self.frames
    }

    fn stop(&mut self, reason: TerminationReasonV1) -> FrameStep {
        self.termination = Some(reason);
        FrameStep::Done(reason)
    }

    fn state(&self, id: StateId) -> &'a SearchStateV1 {
        let graph: &'a SearchGraphV1 = self.graph;
        &graph.states()[id.index()]
    }

    /// Apply this frame's acoustic scores to the emitting active tokens.
    /// Returns a termination reason if the scorer panicked.
    fn score_tokens(
        &mut self,
        features: &FeatureFrameV1,
    ) -> Result<Option<TerminationReasonV1>, SearchError> {
        let emitting: Vec<TokenId> = self
            .active
            .tokens()
            .iter()
            .copied()
            .filter(|t| self.state(self.arena.get(*t).state).emitting)
            .collect();
        let states: Vec<&SearchStateV1> = emitting
            .iter()
            .map(|t| self.state(self.arena.get(*t).state))
            .collect();

        let scorer = self.scorer;
        let Ok(scores) = catch_unwind(AssertUnwindSafe(|| scorer.score_frame(features, &states)))
        else {
            tracing::warn!(frame = self.frame, "acoustic scorer panicked");
            return Ok(Some(TerminationReasonV1::InternalPanic {
                stage: PanicStageV1::ScoreFrame,
            }));
        };
        if scores.len() != emitting.len() {
            return Err(SearchError::ScorerContractViolation {
                expected: emitting.len(),
                actual: scores.len(),
            });
        }
        for (token, score) in emitting.iter().zip(scores) {
            self.arena
                .apply_acoustic_score(*token, sanitize(score), features.index)?;
        }
        self.active.refresh_best(&self.arena);
        Ok(None)
    }

    /// Keep the purged list alive through a skipped grow. Each survivor is
    /// carried into a fresh token on the same state so the next frame can
    /// score it again.
    fn carry_forward(&mut self) -> Result<(), SearchError> {
        let fresh = self.active.new_instance();
        let old = std::mem::replace(&mut self.active, fresh);
        for &token in old.tokens() {
            let current = self.arena.get(token);
            let state = current.state;
            let entry = EntryScores {
                score: current.score(),
                language: 0.0,
                insertion: 0.0,
            };
            let carried = self.arena.child(token, state, entry, self.frame)?;
            self.active.add(carried, &self.arena);
        }
        Ok(())
    }

    /// Expand the active list into the next frame's frontier.
    fn grow(&mut self) -> Result<GrowStats, SearchError> {
        let fresh = self.active.new_instance();
        let old = std::mem::replace(&mut self.active, fresh);
        self.results.clear();
        let word_threshold = match self.policy.word_beam() {
            Some(offset) => old.best_score() + offset,
            None => f32::NEG_INFINITY,
        };
        let mut grow = Grow {
            best: BestTokenMap::new(),
            expanded: HashSet::new(),
            stack: Vec::new(),
            deferred: Vec::new(),
            threshold: old.beam_threshold(),
            word_threshold,
            work: 0,
            stats: GrowStats::default(),
        };

        let mut frontier: Vec<TokenId> = old.tokens().to_vec();
        let mut first_pass = true;
        loop {
            grow.stats.passes += 1;
            for &root in &frontier {
                grow.stack.push((root, !first_pass));
                while let Some((token, may_be_stale)) = grow.stack.pop() {
                    grow.work += 1;
                    if grow.work > self.policy.max_work_per_frame {
                        grow.stats.over_budget = true;
                        self.best_tokens = grow.best;
                        return Ok(grow.stats);
                    }
                    if may_be_stale && self.is_superseded(&grow.best, token) {
                        continue;
                    }
                    self.collect_successors(&mut grow, token)?;
                }
            }
            if grow.deferred.is_empty() {
                break;
            }
            frontier = std::mem::take(&mut grow.deferred);
            for &token in &frontier {
                self.arena.finalize_combine(token, self.policy.bushderby_eta);
            }
            grow.stats.deferred += frontier.len() as u64;
            first_pass = false;
            tracing::trace!(pass = grow.stats.passes, deferred = frontier.len(), "combine pass");
        }

        for &token in self.active.tokens() {
            if self.is_combine(self.arena.get(token).state) {
                self.arena.finalize_combine(token, self.policy.bushderby_eta);
            }
        }
        self.active.refresh_best(&self.arena);
        self.best_tokens = grow.best;
        Ok(grow.stats)
    }

    fn is_combine(&self, state: StateId) -> bool {
        self.policy.enable_combine && self.state(state).is_combine()
    }

    /// Whether a better (or tied, later) token has since taken `token`'s
    /// place in the best-token map.
    fn is_superseded(&self, best: &BestTokenMap, token: TokenId) -> bool {
        let current = self.arena.get(token);
        let Some(pred) = current.predecessor else {
            return false;
        };
        let target = self.state(current.state);
        let context = fan_in_context(target, self.arena.get(pred).state);
        best.get(current.state, context) != Some(token)
    }

    /// The most recent unit on `token`'s path, including its own state.
    fn previous_unit(&self, token: TokenId) -> Option<&'a UnitV1> {
        let graph: &'a SearchGraphV1 = self.graph;
        self.arena
            .predecessor_chain(token)
            .find_map(|t| graph.states()[t.state.index()].unit())
    }

    fn collect_successors(&mut self, grow: &mut Grow, token: TokenId) -> Result<(), SearchError> {
        let current = self.arena.get(token);
        let score = current.score();
        let state = self.state(current.state);

        if !state.emitting {
            let context = current
                .predecessor
                .and_then(|pred| fan_in_context(state, self.arena.get(pred).state));
            if !grow.expanded.insert((state.id, context, score.to_bits())) {
                return Ok(());
            }
        }
        if score < grow.threshold {
            return Ok(());
        }
        if state.is_word() && score < grow.word_threshold {
            return Ok(());
        }

        for arc in &state.arcs {
            let target = self.state(arc.target);
            if self.policy.filter_successors {
                if let Some(unit) = target.unit() {
                    if !is_valid_transition(self.previous_unit(token), unit) {
                        grow.stats.context_rejected += 1;
                        continue;
                    }
                }
            }

            let candidate = sanitize(
                score + arc.language_log_prob + arc.acoustic_log_prob + arc.insertion_log_prob,
            );
            if self.policy.want_entry_pruning
                && (candidate < grow.threshold
                    || (target.is_word() && candidate < grow.word_threshold))
            {
                grow.stats.beam_pruned += 1;
                continue;
            }
            let entry = EntryScores {
                score: candidate,
                language: arc.language_log_prob,
                insertion: arc.insertion_log_prob,
            };

            if target.is_final {
                let result = self.arena.child(token, target.id, entry, self.frame)?;
                grow.stats.tokens_created += 1;
                self.results.push(result);
                continue;
            }
            self.admit(grow, token, state.id, target, entry)?;
        }
        Ok(())
    }

    /// Viterbi (or combine) admission of one candidate into `target`.
    fn admit(
        &mut self,
        grow: &mut Grow,
        from: TokenId,
        from_state: StateId,
        target: &'a SearchStateV1,
        entry: EntryScores,
    ) -> Result<(), SearchError> {
        let combine = self.is_combine(target.id);
        let context = fan_in_context(target, from_state);
        let incumbent = grow.best.get(target.id, context);
        tracing::trace!(state = %target.id, ?context, ?incumbent, candidate = entry.score, "best token lookup");
        let contribution = f64::from(entry.score) * self.policy.bushderby_eta;

        if let Some(inc) = incumbent {
            if entry.score < self.arena.score(inc) {
                grow.stats.viterbi_pruned += 1;
                if combine {
                    let working = add_as_linear(self.arena.get(inc).working_score, contribution);
                    self.arena.set_working_score(inc, working);
                }
                if let Some(alternates) = self.alternates.as_mut() {
                    let loser = self.arena.child(from, target.id, entry, self.frame)?;
                    grow.stats.tokens_created += 1;
                    alternates.add_alternate_predecessor(inc, loser);
                }
                return Ok(());
            }
        }

        if !combine && !self.active.is_insertable(entry.score) {
            grow.stats.beam_pruned += 1;
            return Ok(());
        }

        let token = self.arena.child(from, target.id, entry, self.frame)?;
        grow.stats.tokens_created += 1;
        if combine {
            let prior = incumbent.map_or(f64::NEG_INFINITY, |inc| self.arena.get(inc).working_score);
            self.arena
                .set_working_score(token, add_as_linear(prior, contribution));
        }
        grow.best.insert(target.id, context, token);

        if let Some(old) = incumbent {
            grow.stats.viterbi_pruned += 1;
            if let Some(alternates) = self.alternates.as_mut() {
                alternates.change_successor(token, old);
                alternates.add_alternate_predecessor(token, old);
            }
        }

        if target.emitting {
            match incumbent {
                Some(old) => self.active.replace(old, token, &self.arena),
                None => self.active.add(token, &self.arena),
            }
        } else if combine {
            if let Some(old) = incumbent {
                grow.deferred.retain(|t| *t != old);
            }
            grow.deferred.push(token);
        } else {
            grow.stack.push((token, true));
        }
        Ok(())
    }

    fn frame_event(
        &self,
        before: usize,
        after: usize,
        pruned: usize,
        stats: &GrowStats,
        skipped: bool,
    ) -> FrameEventV1 {
        FrameEventV1 {
            frame: self.frame,
            active_before_purge: before as u64,
            active_after_purge: after as u64,
            beam_pruned: pruned as u64 + stats.beam_pruned,
            tokens_created: stats.tokens_created,
            viterbi_pruned: stats.viterbi_pruned,
            context_rejected: stats.context_rejected,
            combine_passes: stats.passes,
            deferred_tokens: stats.deferred,
            results: self.results.len() as u64,
            grow_skipped: skipped,
        }
    }

    /// Distinct tokens reachable from `roots` through predecessor links.
    fn lattice_size(&self, roots: &[TokenId]) -> usize {
        let mut seen = HashSet::new();
        for &root in roots {
            for token in self.arena.predecessor_chain(root) {
                if !seen.insert(token.id) {
                    break;
                }
            }
        }
        seen.len()
    }
}
