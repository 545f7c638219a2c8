//! Per-frame best-token map used for Viterbi deduplication.
//!
//! Non-fan-in states hold at most one entry. Fan-in states are keyed by
//! `(state, context)` where the context is the state of the incoming
//! token's predecessor, so distinct incoming contexts live side by side and
//! only same-context arrivals compete.

use std::collections::BTreeMap;

use tokenpass_kernel::graph::StateId;

use crate::token::TokenId;

/// Map key: the target state plus, for fan-in states, the incoming context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct BestKey {
    state: StateId,
    context: Option<StateId>,
}

/// Transient, owned per-frame map from state to its best token.
///
/// `BTreeMap` keeps iteration order deterministic for exports.
#[derive(Debug, Default)]
pub struct BestTokenMap {
    entries: BTreeMap<BestKey, TokenId>,
}

impl BestTokenMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The best token for `state` under `context`. Pass `None` for
    /// non-fan-in states.
    #[must_use]
    pub fn get(&self, state: StateId, context: Option<StateId>) -> Option<TokenId> {
        self.entries.get(&BestKey { state, context }).copied()
    }

    /// Record `token` as best, returning the displaced incumbent.
    pub fn insert(
        &mut self,
        state: StateId,
        context: Option<StateId>,
        token: TokenId,
    ) -> Option<TokenId> {
        self.entries.insert(BestKey { state, context }, token)
    }

    /// Every live best token for `state`, across all contexts.
    #[must_use]
    pub fn tokens_for(&self, state: StateId) -> Vec<TokenId> {
        self.entries
            .range(
                BestKey {
                    state,
                    context: None,
                }..,
            )
            .take_while(|(k, _)| k.state == state)
            .map(|(_, t)| *t)
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
