//! Tokenpass Kernel: the leaf layer of the tokenpass decoder.
//!
//! # API Surface
//!
//! - [`logmath`] -- log-domain score arithmetic and the zero-probability floor
//! - [`graph`] -- the search-state graph a decoder walks (states, arcs, builder)
//! - [`unit`] -- phonetic units and left/right context validity
//! - [`proof`] -- canonical JSON bytes and domain-separated SHA-256 hashing
//!
//! # Module Dependency Direction
//!
//! `logmath` ← `unit` ← `graph` → `proof`, and `proof` depends on nothing internal.
//!
//! One-way only. No cycles.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod graph;
pub mod logmath;
pub mod proof;
pub mod unit;
