//! Typed search errors.
//!
//! `SearchError` covers pre-flight failures (bad policy) and contract
//! breaches by collaborators. Ordinary decode endings, including an
//! exhausted beam or a blown work budget, are not errors; they are
//! reported via [`crate::audit::TerminationReasonV1`].

use thiserror::Error;

use crate::token::TokenId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// A policy field is out of range.
    #[error("invalid decoder policy: {detail}")]
    InvalidPolicy { detail: String },

    /// A policy document could not be parsed.
    #[error("policy parse error: {detail}")]
    PolicyParse { detail: String },

    /// The scorer returned the wrong number of scores.
    #[error("acoustic scorer returned {actual} scores for {expected} tokens")]
    ScorerContractViolation { expected: usize, actual: usize },

    /// An acoustic score was applied twice to the same token.
    #[error("token {token} already carries an acoustic score")]
    TokenAlreadyScored { token: TokenId },

    /// More tokens than a `TokenId` can address.
    #[error("token arena overflow")]
    ArenaOverflow,

    /// `recognize_frame` was called before `start_recognition`.
    #[error("recognition has not been started")]
    NotStarted,
}
