//! Decode world contract: the minimal trait a world must implement.
//!
//! Worlds provide a search graph, a feature sequence and an acoustic
//! scorer. Worlds may NOT run the decoder, hash artifacts or write reports;
//! those are runner concerns.

use thiserror::Error;

use tokenpass_kernel::graph::{GraphError, SearchGraphV1};
use tokenpass_search::policy::DecoderPolicyV1;
use tokenpass_search::scorer::{AcousticScorer, FeatureFrameV1, TableScorer, UniformScorer};

/// Typed failure for world construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    /// The world's graph failed structural validation.
    #[error("graph build failed: {0}")]
    Graph(#[from] GraphError),
}

/// The scorer a world decodes with.
///
/// The variant is echoed into the report so a reader knows which scoring
/// regime produced the scores.
#[derive(Debug, Clone)]
pub enum ScorerInputV1 {
    /// Every emitting state scores 0.0.
    Uniform,
    /// Fixed per-frame scores.
    Table(TableScorer),
}

impl ScorerInputV1 {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::Table(_) => "table",
        }
    }

    #[must_use]
    pub fn as_scorer(&self) -> &dyn AcousticScorer {
        match self {
            Self::Uniform => &UniformScorer,
            Self::Table(table) => table,
        }
    }
}

/// The contract a world must implement to be decoded by the runner.
pub trait DecodeWorldV1 {
    /// Unique world identifier (e.g., `"linear_chain"`).
    fn world_id(&self) -> &str;

    /// Build the world's search graph.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Graph`] if the graph is malformed.
    fn build_graph(&self) -> Result<SearchGraphV1, WorldError>;

    /// The feature frames of the utterance, in order.
    fn features(&self) -> Vec<FeatureFrameV1>;

    fn scorer(&self) -> ScorerInputV1;

    /// Policy the world is meant to be decoded with.
    fn policy(&self) -> DecoderPolicyV1 {
        DecoderPolicyV1::default()
    }
}
