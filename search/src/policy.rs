//! Decoder policy: beam widths, lattice bookkeeping and combine settings.

use serde::Deserialize;

use tokenpass_kernel::logmath::relative_beam_to_log;
use tokenpass_kernel::proof::canon::{canonical_json_bytes, f64_bits};
use tokenpass_kernel::proof::hash::{canonical_hash, ContentHash};
use tokenpass_kernel::proof::hash_domain::HashDomain;

use crate::active_list::ActiveListConfig;
use crate::error::SearchError;

/// Decoder configuration.
///
/// Every field has a default, so a policy document only names what it
/// overrides. Unknown fields are ignored so older readers accept newer
/// documents. Relative beams are linear probabilities in `[0, 1]`; `0.0`
/// disables them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DecoderPolicyV1 {
    /// Tokens kept per frame after purge; `<= 0` disables.
    pub absolute_beam_width: i32,
    /// Minimum fraction of the best path probability kept.
    pub relative_beam_width: f64,
    /// Defer pruning until every arc into a token has been scored.
    pub strict_pruning: bool,
    /// Alternates kept per token, plus one.
    pub max_edges: usize,
    /// Record Viterbi losers for lattice building.
    pub build_lattice: bool,
    /// Combine-mode temperature.
    pub bushderby_eta: f64,
    /// When off, combine-tagged states compete like any other.
    pub enable_combine: bool,
    /// Reject unit transitions whose phonetic contexts do not chain.
    pub filter_successors: bool,
    /// Word states below `best * width` are not expanded; `0.0` disables.
    pub relative_word_beam_width: f64,
    /// Skip candidates below the previous frame's beam before admission.
    pub want_entry_pruning: bool,
    /// Skip the grow step every Nth frame; `0` never skips.
    pub grow_skip_interval: u32,
    /// Work-list pops allowed per grow.
    pub max_work_per_frame: u64,
}

impl Default for DecoderPolicyV1 {
    fn default() -> Self {
        Self {
            absolute_beam_width: 2000,
            relative_beam_width: 0.0,
            strict_pruning: true,
            max_edges: 100,
            build_lattice: true,
            bushderby_eta: 1e99,
            enable_combine: true,
            filter_successors: false,
            relative_word_beam_width: 0.0,
            want_entry_pruning: false,
            grow_skip_interval: 0,
            max_work_per_frame: 1_000_000,
        }
    }
}

impl DecoderPolicyV1 {
    /// Parse a JSON policy document and validate it.
    ///
    /// # Errors
    ///
    /// [`SearchError::PolicyParse`] for malformed JSON or mistyped fields,
    /// [`SearchError::InvalidPolicy`] for out-of-range values.
    pub fn from_json_str(json: &str) -> Result<Self, SearchError> {
        let policy: Self = serde_json::from_str(json).map_err(|e| SearchError::PolicyParse {
            detail: e.to_string(),
        })?;
        policy.validate()?;
        Ok(policy)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidPolicy`] naming the first bad field.
    pub fn validate(&self) -> Result<(), SearchError> {
        if !self.bushderby_eta.is_finite() || self.bushderby_eta <= 0.0 {
            return Err(SearchError::InvalidPolicy {
                detail: format!(
                    "bushderby_eta must be finite and positive, got {}",
                    self.bushderby_eta
                ),
            });
        }
        for (name, value) in [
            ("relative_beam_width", self.relative_beam_width),
            ("relative_word_beam_width", self.relative_word_beam_width),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SearchError::InvalidPolicy {
                    detail: format!("{name} must be in [0, 1], got {value}"),
                });
            }
        }
        if self.max_work_per_frame == 0 {
            return Err(SearchError::InvalidPolicy {
                detail: "max_work_per_frame must be positive".into(),
            });
        }
        Ok(())
    }

    /// Pruning configuration for the decode's active lists.
    #[must_use]
    pub fn active_list_config(&self) -> ActiveListConfig {
        ActiveListConfig {
            absolute_beam_width: self.absolute_beam_width,
            relative_beam_width: relative_beam_to_log(self.relative_beam_width),
            strict_pruning: self.strict_pruning,
        }
    }

    /// Log offset of the word beam, or `None` when disabled.
    #[must_use]
    pub fn word_beam(&self) -> Option<f32> {
        relative_beam_to_log(self.relative_word_beam_width)
    }

    /// JSON echo for reports. Floats are written as bit patterns.
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "absolute_beam_width": self.absolute_beam_width,
            "build_lattice": self.build_lattice,
            "bushderby_eta_bits": f64_bits(self.bushderby_eta),
            "enable_combine": self.enable_combine,
            "filter_successors": self.filter_successors,
            "grow_skip_interval": self.grow_skip_interval,
            "max_edges": self.max_edges,
            "max_work_per_frame": self.max_work_per_frame,
            "relative_beam_width_bits": f64_bits(self.relative_beam_width),
            "relative_word_beam_width_bits": f64_bits(self.relative_word_beam_width),
            "strict_pruning": self.strict_pruning,
            "want_entry_pruning": self.want_entry_pruning,
        })
    }

    /// Content hash of the canonical policy echo.
    #[must_use]
    pub fn digest(&self) -> ContentHash {
        // The echo holds only integers and booleans, so canonicalization
        // cannot fail; an empty payload is hashed if it ever does.
        let bytes = canonical_json_bytes(&self.to_json_value()).unwrap_or_default();
        canonical_hash(HashDomain::DecoderPolicy, &bytes)
    }
}
