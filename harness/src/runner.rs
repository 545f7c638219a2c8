//! Harness runner: decodes a world and packages the outcome as a report.
//!
//! The runner uses ONLY public decoder APIs. It does not implement any
//! search logic itself.
//!
//! # Pipeline
//!
//! ```text
//! policy.validate() → build_graph() → graph digest
//!   → SearchManager::recognize(features) → DecodeResultV1
//!   → TokenGraphV1::from_result() → token graph digest
//!   → report JSON → canonical bytes → report digest
//! ```

use thiserror::Error;

use tokenpass_kernel::proof::canon::{canonical_json_bytes, score_bits, CanonError};
use tokenpass_kernel::proof::hash::{canonical_hash, ContentHash};
use tokenpass_kernel::proof::hash_domain::HashDomain;
use tokenpass_search::audit::{FrameEventV1, TerminationReasonV1};
use tokenpass_search::error::SearchError;
use tokenpass_search::manager::{DecodeResultV1, SearchManager};
use tokenpass_search::policy::DecoderPolicyV1;
use tokenpass_search::scorer::FeatureFrameV1;
use tokenpass_search::token_graph::TokenGraphV1;

use crate::contract::{DecodeWorldV1, WorldError};

/// Schema tag written into every report.
pub const REPORT_SCHEMA_VERSION: &str = "decode_report.v1";

/// Error during a harness run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("world failed: {0}")]
    World(#[from] WorldError),
    #[error("decoder failed: {0}")]
    Search(#[from] SearchError),
    #[error("canonical JSON failed: {0}")]
    Canon(#[from] CanonError),
}

/// One final-state token as it appears in a report.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultEntryV1 {
    pub token: u32,
    pub state: u32,
    pub score: f32,
    /// Token ids from the result back to the start token.
    pub path: Vec<u32>,
}

/// Auditable outcome of decoding one world.
#[derive(Debug, Clone)]
pub struct DecodeReportV1 {
    pub world_id: String,
    pub policy_digest: ContentHash,
    pub graph_digest: ContentHash,
    pub termination: TerminationReasonV1,
    pub final_frame: u32,
    pub frames: Vec<FrameEventV1>,
    /// Results ordered best first.
    pub results: Vec<ResultEntryV1>,
    pub token_graph: TokenGraphV1,
    pub token_graph_digest: ContentHash,
    /// Canonical JSON bytes of the report.
    pub report_bytes: Vec<u8>,
    /// `canonical_hash(DecodeReport, report_bytes)`.
    pub digest: ContentHash,
}

impl DecodeReportV1 {
    #[must_use]
    pub fn best_score(&self) -> Option<f32> {
        self.results.first().map(|r| r.score)
    }
}

/// Decode `world` under `policy` and build its report.
///
/// A decode that stops early (empty beam, work budget, scorer panic) still
/// produces a report; its termination field says why.
///
/// # Errors
///
/// Returns [`RunError::Search`] for invalid policies or scorer contract
/// breaches, [`RunError::World`] if the world's graph does not build.
pub fn run_decode(
    world: &dyn DecodeWorldV1,
    policy: &DecoderPolicyV1,
) -> Result<DecodeReportV1, RunError> {
    let span = tracing::info_span!("run_decode", world = world.world_id());
    let _guard = span.enter();

    policy.validate()?;
    let graph = world.build_graph()?;
    let graph_digest = graph.digest()?;
    let features = world.features();
    let scorer = world.scorer();

    let manager = SearchManager::new(&graph, scorer.as_scorer(), policy.clone())?;
    let result = manager.recognize(&features)?;

    let token_graph = TokenGraphV1::from_result(&result);
    let token_graph_digest = token_graph.digest()?;
    let results = ranked_results(&result);
    let frame_log = frame_log_json(&result.frames);
    let frame_log_digest = canonical_hash(HashDomain::FrameLog, &canonical_json_bytes(&frame_log)?);

    let report_json = serde_json::json!({
        "features": features_json(&features),
        "final_frame": result.final_frame,
        "frame_log": frame_log,
        "frame_log_digest": frame_log_digest.as_str(),
        "graph_digest": graph_digest.as_str(),
        "policy": policy.to_json_value(),
        "policy_digest": policy.digest().as_str(),
        "results": results_json(&results),
        "schema_version": REPORT_SCHEMA_VERSION,
        "scorer": scorer.kind(),
        "termination": result.termination.to_json_value(),
        "token_graph_digest": token_graph_digest.as_str(),
        "world_id": world.world_id(),
    });
    let report_bytes = canonical_json_bytes(&report_json)?;
    let digest = canonical_hash(HashDomain::DecodeReport, &report_bytes);

    tracing::info!(
        termination = ?result.termination,
        results = results.len(),
        tokens = result.arena.len(),
        digest = digest.as_str(),
        "decode report built"
    );

    Ok(DecodeReportV1 {
        world_id: world.world_id().to_string(),
        policy_digest: policy.digest(),
        graph_digest,
        termination: result.termination,
        final_frame: result.final_frame,
        frames: result.frames.clone(),
        results,
        token_graph,
        token_graph_digest,
        report_bytes,
        digest,
    })
}

/// Decode `world` under the policy it declares.
///
/// # Errors
///
/// See [`run_decode`].
pub fn run_world(world: &dyn DecodeWorldV1) -> Result<DecodeReportV1, RunError> {
    run_decode(world, &world.policy())
}

fn ranked_results(result: &DecodeResultV1) -> Vec<ResultEntryV1> {
    let mut entries: Vec<ResultEntryV1> = result
        .results
        .iter()
        .map(|&id| {
            let token = result.arena.get(id);
            ResultEntryV1 {
                token: id.0,
                state: token.state.0,
                score: token.score(),
                path: result.predecessor_chain(id).iter().map(|t| t.0).collect(),
            }
        })
        .collect();
    entries.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.token.cmp(&b.token)));
    entries
}

fn results_json(results: &[ResultEntryV1]) -> serde_json::Value {
    let values: Vec<serde_json::Value> = results
        .iter()
        .map(|r| {
            serde_json::json!({
                "path": r.path,
                "score_bits": score_bits(r.score),
                "state": r.state,
                "token": r.token,
            })
        })
        .collect();
    serde_json::Value::Array(values)
}

fn frame_log_json(frames: &[FrameEventV1]) -> serde_json::Value {
    serde_json::Value::Array(frames.iter().map(FrameEventV1::to_json_value).collect())
}

/// Feature values are echoed as little-endian `f32` bytes in hex.
fn features_json(features: &[FeatureFrameV1]) -> serde_json::Value {
    let values: Vec<serde_json::Value> = features
        .iter()
        .map(|f| {
            let bytes: Vec<u8> = f.values.iter().flat_map(|v| v.to_le_bytes()).collect();
            serde_json::json!({
                "index": f.index,
                "values_hex": hex::encode(bytes),
            })
        })
        .collect();
    serde_json::Value::Array(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worlds::chains::{LinearChain, ViterbiFork};

    #[test]
    fn linear_chain_report_is_deterministic() {
        let a = run_world(&LinearChain).unwrap();
        let b = run_world(&LinearChain).unwrap();
        assert_eq!(a.report_bytes, b.report_bytes);
        assert_eq!(a.digest, b.digest);
        assert_eq!(a.termination, TerminationReasonV1::InputExhausted);
        assert_eq!(a.best_score(), Some(-3.0));
    }

    #[test]
    fn report_echoes_world_and_policy() {
        let report = run_world(&ViterbiFork).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&report.report_bytes).unwrap();
        assert_eq!(json["schema_version"], REPORT_SCHEMA_VERSION);
        assert_eq!(json["world_id"], "viterbi_fork");
        assert_eq!(json["policy_digest"], report.policy_digest.as_str());
        assert_eq!(json["graph_digest"], report.graph_digest.as_str());
        assert_eq!(
            json["frame_log"].as_array().unwrap().len(),
            report.frames.len()
        );
    }

    #[test]
    fn policy_changes_the_digest() {
        let default = run_world(&ViterbiFork).unwrap();
        let no_lattice = run_decode(
            &ViterbiFork,
            &DecoderPolicyV1 {
                build_lattice: false,
                ..DecoderPolicyV1::default()
            },
        )
        .unwrap();
        assert_ne!(default.digest, no_lattice.digest);
        assert_eq!(default.graph_digest, no_lattice.graph_digest);
        assert!(no_lattice.token_graph.alternate_edges() == 0);
    }

    #[test]
    fn invalid_policy_is_an_error() {
        let policy = DecoderPolicyV1 {
            bushderby_eta: 0.0,
            ..DecoderPolicyV1::default()
        };
        let err = run_decode(&LinearChain, &policy).unwrap_err();
        assert!(matches!(err, RunError::Search(SearchError::InvalidPolicy { .. })));
    }
}
