//! Beam-pruned frontier of emitting tokens for one frame.
//!
//! The list stores token handles; scores are read through the
//! [`TokenArena`], so every method that compares scores borrows it.
//! Ordering for truncation is descending score with ties broken by token id
//! (creation order), so purge is deterministic.

use std::collections::HashMap;

use crate::token::{TokenArena, TokenId};

/// Pruning configuration shared by every list in a decode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveListConfig {
    /// Maximum tokens kept by `purge`; `<= 0` disables absolute pruning.
    pub absolute_beam_width: i32,
    /// Non-positive log offset from the best score; `None` disables.
    pub relative_beam_width: Option<f32>,
    /// When `false`, `add` may purge early once the list doubles the beam.
    pub strict_pruning: bool,
}

impl Default for ActiveListConfig {
    fn default() -> Self {
        Self {
            absolute_beam_width: 2000,
            relative_beam_width: None,
            strict_pruning: true,
        }
    }
}

impl ActiveListConfig {
    fn absolute_limit(&self) -> Option<usize> {
        usize::try_from(self.absolute_beam_width)
            .ok()
            .filter(|w| *w > 0)
    }
}

/// The frontier of one frame.
#[derive(Debug, Clone)]
pub struct ActiveList {
    config: ActiveListConfig,
    tokens: Vec<TokenId>,
    location: HashMap<TokenId, usize>,
    best_score: f32,
    best_token: Option<TokenId>,
    high_water: usize,
}

impl ActiveList {
    #[must_use]
    pub fn new(config: ActiveListConfig) -> Self {
        Self {
            config,
            tokens: Vec::new(),
            location: HashMap::new(),
            best_score: f32::NEG_INFINITY,
            best_token: None,
            high_water: 0,
        }
    }

    /// An empty list with the same configuration, for the next frame.
    #[must_use]
    pub fn new_instance(&self) -> Self {
        Self::new(self.config)
    }

    #[must_use]
    pub fn config(&self) -> &ActiveListConfig {
        &self.config
    }

    /// Append `token`, updating the running best.
    pub fn add(&mut self, token: TokenId, arena: &TokenArena) {
        self.location.insert(token, self.tokens.len());
        self.tokens.push(token);
        self.high_water = self.high_water.max(self.tokens.len());
        self.note_score(token, arena.score(token));

        if !self.config.strict_pruning {
            if let Some(limit) = self.config.absolute_limit() {
                if self.tokens.len() > limit.saturating_mul(2) {
                    let pruned = self.purge(arena);
                    tracing::trace!(pruned, "early purge of non-strict active list");
                }
            }
        }
    }

    /// Swap `old` for `new` in place. A missing `old` is logged and `new`
    /// is appended instead.
    pub fn replace(&mut self, old: TokenId, new: TokenId, arena: &TokenArena) {
        match self.location.remove(&old) {
            Some(slot) => {
                self.tokens[slot] = new;
                self.location.insert(new, slot);
                if self.best_token == Some(old) {
                    self.refresh_best(arena);
                } else {
                    self.note_score(new, arena.score(new));
                }
            }
            None => {
                tracing::warn!(%old, %new, "replaced token missing from active list");
                self.add(new, arena);
            }
        }
    }

    /// Remove `token` if present. Returns whether it was.
    pub fn remove(&mut self, token: TokenId, arena: &TokenArena) -> bool {
        let Some(slot) = self.location.remove(&token) else {
            return false;
        };
        self.tokens.swap_remove(slot);
        if let Some(moved) = self.tokens.get(slot) {
            self.location.insert(*moved, slot);
        }
        if self.best_token == Some(token) {
            self.refresh_best(arena);
        }
        true
    }

    /// Whether a token scoring `score` would survive the relative beam.
    #[must_use]
    pub fn is_insertable(&self, score: f32) -> bool {
        match self.config.relative_beam_width {
            None => true,
            Some(offset) => score >= self.best_score + offset,
        }
    }

    /// Truncate to the absolute beam, then drop tokens outside the relative
    /// beam. Returns how many tokens were removed.
    pub fn purge(&mut self, arena: &TokenArena) -> usize {
        let before = self.tokens.len();
        self.tokens.sort_by(|a, b| {
            arena
                .score(*b)
                .total_cmp(&arena.score(*a))
                .then_with(|| a.cmp(b))
        });
        if let Some(limit) = self.config.absolute_limit() {
            self.tokens.truncate(limit);
        }
        match self.tokens.first() {
            Some(&best) => {
                self.best_token = Some(best);
                self.best_score = arena.score(best);
            }
            None => {
                self.best_token = None;
                self.best_score = f32::NEG_INFINITY;
            }
        }
        if let Some(offset) = self.config.relative_beam_width {
            let threshold = self.best_score + offset;
            self.tokens.retain(|t| arena.score(*t) >= threshold);
        }
        self.reindex();
        before - self.tokens.len()
    }

    /// Recompute the running best from the arena.
    pub fn refresh_best(&mut self, arena: &TokenArena) {
        let mut best: Option<(f32, TokenId)> = None;
        for &token in &self.tokens {
            let score = arena.score(token);
            if outranks(score, token, best) {
                best = Some((score, token));
            }
        }
        self.best_score = best.map_or(f32::NEG_INFINITY, |(s, _)| s);
        self.best_token = best.map(|(_, t)| t);
    }

    /// `best_score + relative_beam_width`, or negative infinity when
    /// relative pruning is off.
    #[must_use]
    pub fn beam_threshold(&self) -> f32 {
        match self.config.relative_beam_width {
            Some(offset) => self.best_score + offset,
            None => f32::NEG_INFINITY,
        }
    }

    /// Best score seen; negative infinity for an empty list.
    #[must_use]
    pub fn best_score(&self) -> f32 {
        self.best_score
    }

    #[must_use]
    pub fn best_token(&self) -> Option<TokenId> {
        self.best_token
    }

    #[must_use]
    pub fn tokens(&self) -> &[TokenId] {
        &self.tokens
    }

    #[must_use]
    pub fn contains(&self, token: TokenId) -> bool {
        self.location.contains_key(&token)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Largest size the list reached.
    #[must_use]
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    fn note_score(&mut self, token: TokenId, score: f32) {
        let current = self.best_token.map(|t| (self.best_score, t));
        if outranks(score, token, current) {
            self.best_score = score;
            self.best_token = Some(token);
        }
    }

    fn reindex(&mut self) {
        self.location.clear();
        for (slot, token) in self.tokens.iter().enumerate() {
            self.location.insert(*token, slot);
        }
    }
}

/// Higher score wins; equal scores go to the older token.
fn outranks(score: f32, token: TokenId, current: Option<(f32, TokenId)>) -> bool {
    match current {
        None => true,
        Some((best, id)) => score > best || (score.total_cmp(&best).is_eq() && token < id),
    }
}
