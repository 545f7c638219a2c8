//! Tokens and the append-only token arena.
//!
//! A token is one partial hypothesis: a scored path through the search
//! graph, linked to its predecessor by [`TokenId`]. Tokens are never
//! removed during an utterance because lattice consumers walk predecessor
//! links after decoding finishes. Once an utterance is done the arena is
//! read-only and can be shared freely.

use tokenpass_kernel::graph::StateId;
use tokenpass_kernel::logmath::sanitize;

use crate::error::SearchError;

/// Handle of a token in its [`TokenArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(pub u32);

impl TokenId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// One partial-hypothesis path.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenV1 {
    pub id: TokenId,
    /// `None` only for the utterance start token.
    pub predecessor: Option<TokenId>,
    pub state: StateId,
    /// Path score on entry to `state`, before any acoustic score.
    pub entry_score: f32,
    /// Acoustic score for the frame this token consumed, once scored.
    pub acoustic_score: Option<f32>,
    /// Language component of the entering arc.
    pub language_score: f32,
    /// Insertion component of the entering arc.
    pub insertion_score: f32,
    /// Frame index at creation.
    pub frame: u32,
    /// Accumulated log-sum of scaled incoming contributions (combine states).
    pub working_score: f64,
    /// Index of the feature frame consumed, for emitting tokens.
    pub feature_frame: Option<u32>,
}

impl TokenV1 {
    /// Cumulative path score including the acoustic score when present.
    #[must_use]
    pub fn score(&self) -> f32 {
        sanitize(self.entry_score + self.acoustic_score.unwrap_or(0.0))
    }

    #[must_use]
    pub fn is_start(&self) -> bool {
        self.predecessor.is_none()
    }
}

/// The per-arc components recorded on a child token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryScores {
    pub score: f32,
    pub language: f32,
    pub insertion: f32,
}

/// Append-only token storage for one utterance.
#[derive(Debug, Clone, Default)]
pub struct TokenArena {
    tokens: Vec<TokenV1>,
}

impl TokenArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> Result<TokenId, SearchError> {
        u32::try_from(self.tokens.len())
            .map(TokenId)
            .map_err(|_| SearchError::ArenaOverflow)
    }

    /// Create the utterance start token.
    ///
    /// # Errors
    ///
    /// [`SearchError::ArenaOverflow`] if the arena is full.
    pub fn start(&mut self, state: StateId, frame: u32) -> Result<TokenId, SearchError> {
        let id = self.next_id()?;
        self.tokens.push(TokenV1 {
            id,
            predecessor: None,
            state,
            entry_score: 0.0,
            acoustic_score: None,
            language_score: 0.0,
            insertion_score: 0.0,
            frame,
            working_score: f64::NEG_INFINITY,
            feature_frame: None,
        });
        Ok(id)
    }

    /// Create a successor of `predecessor`.
    ///
    /// # Errors
    ///
    /// [`SearchError::ArenaOverflow`] if the arena is full.
    pub fn child(
        &mut self,
        predecessor: TokenId,
        state: StateId,
        scores: EntryScores,
        frame: u32,
    ) -> Result<TokenId, SearchError> {
        let id = self.next_id()?;
        self.tokens.push(TokenV1 {
            id,
            predecessor: Some(predecessor),
            state,
            entry_score: sanitize(scores.score),
            acoustic_score: None,
            language_score: scores.language,
            insertion_score: scores.insertion,
            frame,
            working_score: f64::NEG_INFINITY,
            feature_frame: None,
        });
        Ok(id)
    }

    /// Look up a token.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this arena.
    #[must_use]
    pub fn get(&self, id: TokenId) -> &TokenV1 {
        &self.tokens[id.index()]
    }

    #[must_use]
    pub fn try_get(&self, id: TokenId) -> Option<&TokenV1> {
        self.tokens.get(id.index())
    }

    /// Shorthand for `get(id).score()`.
    #[must_use]
    pub fn score(&self, id: TokenId) -> f32 {
        self.get(id).score()
    }

    /// Apply the acoustic score for `feature_frame`. Only once per token.
    ///
    /// # Errors
    ///
    /// [`SearchError::TokenAlreadyScored`] on a second application.
    pub fn apply_acoustic_score(
        &mut self,
        id: TokenId,
        score: f32,
        feature_frame: u32,
    ) -> Result<(), SearchError> {
        let token = &mut self.tokens[id.index()];
        if token.acoustic_score.is_some() {
            return Err(SearchError::TokenAlreadyScored { token: id });
        }
        token.acoustic_score = Some(sanitize(score));
        token.feature_frame = Some(feature_frame);
        Ok(())
    }

    pub fn set_working_score(&mut self, id: TokenId, working: f64) {
        self.tokens[id.index()].working_score = working;
    }

    /// Rewrite a combine token's score from its working score.
    ///
    /// A pure function of the working score, so repeating it without an
    /// intervening combination is a no-op. Tokens that never received a
    /// contribution keep their score.
    pub fn finalize_combine(&mut self, id: TokenId, eta: f64) {
        let token = &mut self.tokens[id.index()];
        if token.working_score == f64::NEG_INFINITY {
            return;
        }
        #[allow(clippy::cast_possible_truncation)]
        let rescaled = (token.working_score / eta) as f32;
        token.entry_score = sanitize(rescaled);
    }

    /// Walk from `id` back to the start token.
    pub fn predecessor_chain(&self, id: TokenId) -> impl Iterator<Item = &TokenV1> + '_ {
        let mut next = self.try_get(id);
        std::iter::from_fn(move || {
            let current = next?;
            next = current.predecessor.and_then(|p| self.try_get(p));
            Some(current)
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TokenV1> + '_ {
        self.tokens.iter()
    }
}
