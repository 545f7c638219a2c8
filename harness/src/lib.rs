//! Tokenpass Harness: world-level orchestration for the decoder.
//!
//! The harness decodes a world with `tokenpass_search` and packages the
//! outcome as a canonical, content-addressed report.
//!
//! The harness does NOT implement search logic. It delegates to the
//! decoder. Worlds provide graphs, features and scorers only; the harness
//! owns orchestration and persistence.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod contract;
pub mod report_dir;
pub mod runner;
pub mod worlds;
