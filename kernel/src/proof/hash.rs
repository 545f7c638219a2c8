//! Content hashing with domain separation.
//!
//! Algorithm: SHA-256 over `domain_bytes || data`. Exactly one place
//! computes digests; callers pick a [`HashDomain`] so two artifact kinds
//! with identical bytes never collide.

use sha2::{Digest, Sha256};

use super::hash_domain::HashDomain;

/// A content-addressed digest in `"algorithm:hex_digest"` form.
///
/// Invariant: the inner string has exactly one `:` with non-empty text on
/// both sides (enforced by [`ContentHash::parse`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash {
    full: String,
    colon: usize,
}

impl ContentHash {
    /// Parse from `"algorithm:hex"` form.
    ///
    /// Returns `None` when the colon is missing or either side is empty.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let colon = s.find(':')?;
        if colon == 0 || colon == s.len() - 1 || s[colon + 1..].contains(':') {
            return None;
        }
        Some(Self {
            full: s.to_string(),
            colon,
        })
    }

    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.full[..self.colon]
    }

    #[must_use]
    pub fn hex_digest(&self) -> &str {
        &self.full[self.colon + 1..]
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.full
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full)
    }
}

/// Compute `sha256(domain || data)` rendered as `"sha256:<hex>"`.
#[must_use]
pub fn canonical_hash(domain: HashDomain, data: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(domain.as_bytes());
    hasher.update(data);
    let hex_digest = hex::encode(hasher.finalize());
    ContentHash {
        colon: "sha256".len(),
        full: format!("sha256:{hex_digest}"),
    }
}
