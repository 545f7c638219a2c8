//! Token graph export: the lattice-relevant slice of a finished decode.
//!
//! Starting from every result token, the walk follows predecessor links and
//! alternate predecessors (and their own chains) until it reaches the start
//! token. The output is canonical: nodes sorted by id, edges sorted by
//! `(from, to, kind)`.

use std::collections::BTreeSet;

use tokenpass_kernel::graph::StateId;
use tokenpass_kernel::proof::canon::{canonical_json_bytes, score_bits, CanonError};
use tokenpass_kernel::proof::hash::{canonical_hash, ContentHash};
use tokenpass_kernel::proof::hash_domain::HashDomain;

use crate::manager::DecodeResultV1;
use crate::token::TokenId;

/// Why one token links to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EdgeKindV1 {
    Predecessor,
    Alternate,
}

impl EdgeKindV1 {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Predecessor => "predecessor",
            Self::Alternate => "alternate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TokenGraphEdgeV1 {
    pub from: TokenId,
    pub to: TokenId,
    pub kind: EdgeKindV1,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenGraphNodeV1 {
    pub id: TokenId,
    pub state: StateId,
    pub frame: u32,
    pub score: f32,
    pub is_result: bool,
}

/// Reachable tokens and their links.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGraphV1 {
    pub nodes: Vec<TokenGraphNodeV1>,
    pub edges: Vec<TokenGraphEdgeV1>,
}

impl TokenGraphV1 {
    /// Collect every token reachable from the decode's results.
    #[must_use]
    pub fn from_result(result: &DecodeResultV1) -> Self {
        let arena = &result.arena;
        let results: BTreeSet<TokenId> = result.results.iter().copied().collect();
        let mut visited: BTreeSet<TokenId> = BTreeSet::new();
        let mut edges: BTreeSet<TokenGraphEdgeV1> = BTreeSet::new();
        let mut stack: Vec<TokenId> = result.results.clone();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(token) = arena.try_get(id) else {
                continue;
            };
            if let Some(pred) = token.predecessor {
                edges.insert(TokenGraphEdgeV1 {
                    from: id,
                    to: pred,
                    kind: EdgeKindV1::Predecessor,
                });
                stack.push(pred);
            }
            let alternates = result
                .alternates
                .as_ref()
                .and_then(|a| a.alternate_predecessors(id))
                .unwrap_or_default();
            for &alt in alternates {
                edges.insert(TokenGraphEdgeV1 {
                    from: id,
                    to: alt,
                    kind: EdgeKindV1::Alternate,
                });
                stack.push(alt);
            }
        }

        let nodes = visited
            .iter()
            .filter_map(|id| arena.try_get(*id))
            .map(|t| TokenGraphNodeV1 {
                id: t.id,
                state: t.state,
                frame: t.frame,
                score: t.score(),
                is_result: results.contains(&t.id),
            })
            .collect();

        Self {
            nodes,
            edges: edges.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        let nodes: Vec<serde_json::Value> = self
            .nodes
            .iter()
            .map(|n| {
                serde_json::json!({
                    "frame": n.frame,
                    "id": n.id.0,
                    "is_result": n.is_result,
                    "score_bits": score_bits(n.score),
                    "state": n.state.0,
                })
            })
            .collect();
        let edges: Vec<serde_json::Value> = self
            .edges
            .iter()
            .map(|e| {
                serde_json::json!({
                    "from": e.from.0,
                    "kind": e.kind.as_str(),
                    "to": e.to.0,
                })
            })
            .collect();
        serde_json::json!({
            "edges": edges,
            "nodes": nodes,
        })
    }

    /// # Errors
    ///
    /// Returns [`CanonError`] if serialization fails.
    pub fn to_canonical_json_bytes(&self) -> Result<Vec<u8>, CanonError> {
        canonical_json_bytes(&self.to_json_value())
    }

    /// # Errors
    ///
    /// Returns [`CanonError`] if serialization fails.
    pub fn digest(&self) -> Result<ContentHash, CanonError> {
        let bytes = self.to_canonical_json_bytes()?;
        Ok(canonical_hash(HashDomain::TokenGraph, &bytes))
    }

    /// Number of alternate edges.
    #[must_use]
    pub fn alternate_edges(&self) -> usize {
        self.edges
            .iter()
            .filter(|e| e.kind == EdgeKindV1::Alternate)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::DecoderPolicyV1;
    use crate::scorer::{FeatureFrameV1, UniformScorer};
    use crate::SearchManager;
    use tokenpass_kernel::graph::{SearchGraphBuilder, SearchGraphV1, StateKindV1};

    /// Two competing routes into one emitting state, then a final state.
    fn fork_graph() -> SearchGraphV1 {
        let mut b = SearchGraphBuilder::new();
        let i = b.add_state(StateKindV1::Initial);
        let x = b.add_hmm(1, "X");
        let f = b.add_state(StateKindV1::Final);
        b.add_arc(i, x, 0.0, -1.0, 0.0)
            .add_arc(i, x, 0.0, -4.0, 0.0)
            .add_arc(x, f, 0.0, -0.5, 0.0);
        b.build().unwrap()
    }

    fn decode(policy: DecoderPolicyV1) -> DecodeResultV1 {
        let graph = fork_graph();
        let mgr = SearchManager::new(&graph, &UniformScorer, policy).unwrap();
        mgr.recognize(&[FeatureFrameV1::new(0, vec![])]).unwrap()
    }

    #[test]
    fn walks_predecessors_and_alternates() {
        let result = decode(DecoderPolicyV1::default());
        let graph = TokenGraphV1::from_result(&result);
        // result, winner on X, its loser, and the shared start token
        assert_eq!(graph.nodes.len(), 4);
        assert_eq!(graph.alternate_edges(), 1);
        assert_eq!(graph.nodes.iter().filter(|n| n.is_result).count(), 1);
        assert!(graph.nodes.windows(2).all(|w| w[0].id < w[1].id));
        let predecessor_edges = graph.edges.len() - graph.alternate_edges();
        assert_eq!(predecessor_edges, 3);
    }

    #[test]
    fn lattice_off_exports_only_the_chain() {
        let result = decode(DecoderPolicyV1 {
            build_lattice: false,
            ..DecoderPolicyV1::default()
        });
        let graph = TokenGraphV1::from_result(&result);
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.alternate_edges(), 0);
    }

    #[test]
    fn digest_is_stable_across_runs() {
        let a = TokenGraphV1::from_result(&decode(DecoderPolicyV1::default()));
        let b = TokenGraphV1::from_result(&decode(DecoderPolicyV1::default()));
        assert_eq!(a.digest().unwrap(), b.digest().unwrap());
        let bytes = a.to_canonical_json_bytes().unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed["edges"][0]["kind"], "predecessor");
    }
}
