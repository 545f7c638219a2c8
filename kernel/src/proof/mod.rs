//! Proof module: canonical JSON bytes and domain-separated content hashing.
//!
//! Exports produced by the decoder (token graphs, decode reports) route
//! through here so that the same decode always yields the same bytes and
//! the same digest.

pub mod canon;
pub mod hash;
pub mod hash_domain;
