//! Tokenpass Search: frame-synchronous token-passing beam search.
//!
//! This crate advances a frontier of partial hypotheses through a
//! [`tokenpass_kernel::graph::SearchGraphV1`], one feature frame at a time.
//! It depends only on `tokenpass_kernel`; it does NOT depend on
//! `tokenpass_harness`.
//!
//! # Crate dependency graph
//!
//! ```text
//! tokenpass_kernel  ←  tokenpass_search  ←  tokenpass_harness
//! (graph, logmath)     (tokens, beams)      (worlds, runner, reports)
//! ```
//!
//! # Key types
//!
//! - [`TokenArena`]: append-only token storage; predecessor links are ids
//! - [`ActiveList`]: one frame's frontier with absolute and relative beams
//! - [`BestTokenMap`]: per-frame Viterbi deduplication
//! - [`AlternateHypothesisManager`]: losing predecessors kept for lattices
//! - [`SearchManager`]: the expansion algorithm and frame loop
//! - [`AcousticScorer`]: trait for per-frame acoustic scoring
//! - [`DecoderPolicyV1`]: beam, lattice and combine configuration
//! - [`TokenGraphV1`]: canonical export of the result lattice

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod active_list;
pub mod alternates;
pub mod audit;
pub mod best_token;
pub mod error;
pub mod manager;
pub mod policy;
pub mod scorer;
pub mod token;
pub mod token_graph;

pub use active_list::{ActiveList, ActiveListConfig};
pub use alternates::AlternateHypothesisManager;
pub use audit::{FrameEventV1, PanicStageV1, TerminationReasonV1};
pub use best_token::BestTokenMap;
pub use error::SearchError;
pub use manager::{DecodeResultV1, FrameStep, SearchManager};
pub use policy::DecoderPolicyV1;
pub use scorer::{AcousticScorer, FeatureFrameV1, TableScorer, UniformScorer};
pub use token::{TokenArena, TokenId, TokenV1};
pub use token_graph::TokenGraphV1;
