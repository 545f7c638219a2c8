//! Bounded lists of Viterbi-losing predecessors, kept for lattice building.

use std::collections::BTreeMap;

use crate::token::{TokenArena, TokenId};

/// Default `max_edges`.
pub const DEFAULT_MAX_EDGES: usize = 100;

/// Maps each winning token to the losers it beat.
#[derive(Debug, Clone)]
pub struct AlternateHypothesisManager {
    max_edges: usize,
    losers: BTreeMap<TokenId, Vec<TokenId>>,
}

impl Default for AlternateHypothesisManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EDGES)
    }
}

impl AlternateHypothesisManager {
    #[must_use]
    pub fn new(max_edges: usize) -> Self {
        Self {
            max_edges,
            losers: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn max_edges(&self) -> usize {
        self.max_edges
    }

    pub fn add_alternate_predecessor(&mut self, winner: TokenId, loser: TokenId) {
        self.losers.entry(winner).or_default().push(loser);
    }

    /// Alternates recorded for `token`, or `None` if it is untracked.
    #[must_use]
    pub fn alternate_predecessors(&self, token: TokenId) -> Option<&[TokenId]> {
        self.losers.get(&token).map(Vec::as_slice)
    }

    /// Move `old`'s list to `new`. If `new` already has one, `old`'s
    /// entries are appended to it.
    pub fn change_successor(&mut self, new: TokenId, old: TokenId) {
        if let Some(list) = self.losers.remove(&old) {
            match self.losers.get_mut(&new) {
                Some(existing) => existing.extend(list),
                None => {
                    self.losers.insert(new, list);
                }
            }
        }
    }

    /// Sort every list by descending score (ties by id) and keep at most
    /// `max_edges - 1` entries.
    pub fn purge(&mut self, arena: &TokenArena) {
        let keep = self.max_edges.saturating_sub(1);
        for list in self.losers.values_mut() {
            list.sort_by(|a, b| {
                arena
                    .score(*b)
                    .total_cmp(&arena.score(*a))
                    .then_with(|| a.cmp(b))
            });
            list.truncate(keep);
        }
    }

    /// Number of tokens with an alternates list.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.losers.len()
    }

    /// `(winner, alternates)` pairs in token-id order.
    pub fn iter(&self) -> impl Iterator<Item = (TokenId, &[TokenId])> + '_ {
        self.losers.iter().map(|(k, v)| (*k, v.as_slice()))
    }
}
