//! Report directory persistence: write/read/verify a decode report on disk.
//!
//! # Directory layout
//!
//! ```text
//! <dir>/
//!   report.json          canonical JSON report
//!   token_graph.json     canonical JSON token graph
//!   report_digest.txt    ASCII digest string (e.g. "sha256:...")
//! ```
//!
//! The directory path is never part of any hash surface.
//!
//! # Fail-closed semantics
//!
//! - Missing files → error
//! - Extra files → error
//! - Non-canonical JSON → error
//! - Report digest or token graph digest mismatch → error

use std::collections::BTreeSet;
use std::path::Path;

use thiserror::Error;

use tokenpass_kernel::proof::canon::canonical_json_bytes;
use tokenpass_kernel::proof::hash::{canonical_hash, ContentHash};
use tokenpass_kernel::proof::hash_domain::HashDomain;

use crate::runner::{DecodeReportV1, REPORT_SCHEMA_VERSION};

const REPORT_FILENAME: &str = "report.json";
const TOKEN_GRAPH_FILENAME: &str = "token_graph.json";
const DIGEST_FILENAME: &str = "report_digest.txt";

const REQUIRED_FILENAMES: &[&str] = &[REPORT_FILENAME, TOKEN_GRAPH_FILENAME, DIGEST_FILENAME];

/// Error writing a report directory.
#[derive(Debug, Error)]
pub enum ReportDirWriteError {
    #[error("I/O error: {detail}")]
    Io { detail: String },
    #[error("canonical JSON error: {detail}")]
    Canon { detail: String },
}

/// Error reading a report directory.
#[derive(Debug, Error)]
pub enum ReportDirReadError {
    #[error("I/O error: {detail}")]
    Io { detail: String },
    #[error("missing file: {filename}")]
    MissingFile { filename: String },
    #[error("undeclared extra file: {name}")]
    ExtraFile { name: String },
    #[error("{filename} is not valid JSON: {detail}")]
    Parse { filename: String, detail: String },
    #[error("{filename} is not in canonical form")]
    NonCanonical { filename: String },
    #[error("report schema version mismatch: {found}")]
    SchemaMismatch { found: String },
    #[error("report digest mismatch: stored={stored}, recomputed={recomputed}")]
    DigestMismatch { stored: String, recomputed: String },
    #[error("token graph digest mismatch: declared={declared}, recomputed={recomputed}")]
    TokenGraphMismatch {
        declared: String,
        recomputed: String,
    },
}

/// A report loaded back from disk and verified.
#[derive(Debug, Clone)]
pub struct ReportDirV1 {
    pub report: serde_json::Value,
    pub report_bytes: Vec<u8>,
    pub token_graph_bytes: Vec<u8>,
    pub digest: ContentHash,
}

/// Write a report into `dir`, creating it if needed.
///
/// # Errors
///
/// Returns [`ReportDirWriteError`] on I/O failure or canonical JSON error.
pub fn write_report_dir(report: &DecodeReportV1, dir: &Path) -> Result<(), ReportDirWriteError> {
    std::fs::create_dir_all(dir).map_err(|e| ReportDirWriteError::Io {
        detail: format!("create_dir_all: {e}"),
    })?;
    let token_graph_bytes =
        report
            .token_graph
            .to_canonical_json_bytes()
            .map_err(|e| ReportDirWriteError::Canon {
                detail: e.to_string(),
            })?;

    write_atomic(&dir.join(REPORT_FILENAME), &report.report_bytes)?;
    write_atomic(&dir.join(TOKEN_GRAPH_FILENAME), &token_graph_bytes)?;
    write_atomic(&dir.join(DIGEST_FILENAME), report.digest.as_str().as_bytes())?;
    tracing::debug!(dir = %dir.display(), digest = report.digest.as_str(), "report written");
    Ok(())
}

/// Read and verify a report directory.
///
/// # Errors
///
/// Returns [`ReportDirReadError`] on any validation failure.
pub fn read_report_dir(dir: &Path) -> Result<ReportDirV1, ReportDirReadError> {
    let report_bytes = read_required(dir, REPORT_FILENAME)?;
    let token_graph_bytes = read_required(dir, TOKEN_GRAPH_FILENAME)?;
    let digest_bytes = read_required(dir, DIGEST_FILENAME)?;

    let required: BTreeSet<&str> = REQUIRED_FILENAMES.iter().copied().collect();
    for name in list_files(dir)? {
        if !required.contains(name.as_str()) {
            return Err(ReportDirReadError::ExtraFile { name });
        }
    }

    let report = parse_canonical(REPORT_FILENAME, &report_bytes)?;
    parse_canonical(TOKEN_GRAPH_FILENAME, &token_graph_bytes)?;

    let schema = report["schema_version"].as_str().unwrap_or("");
    if schema != REPORT_SCHEMA_VERSION {
        return Err(ReportDirReadError::SchemaMismatch {
            found: schema.to_string(),
        });
    }

    let recomputed = canonical_hash(HashDomain::DecodeReport, &report_bytes);
    let stored = String::from_utf8_lossy(&digest_bytes).trim().to_string();
    if recomputed.as_str() != stored {
        return Err(ReportDirReadError::DigestMismatch {
            stored,
            recomputed: recomputed.as_str().to_string(),
        });
    }

    let token_graph_digest = canonical_hash(HashDomain::TokenGraph, &token_graph_bytes);
    let declared = report["token_graph_digest"].as_str().unwrap_or("");
    if token_graph_digest.as_str() != declared {
        return Err(ReportDirReadError::TokenGraphMismatch {
            declared: declared.to_string(),
            recomputed: token_graph_digest.as_str().to_string(),
        });
    }

    Ok(ReportDirV1 {
        report,
        report_bytes,
        token_graph_bytes,
        digest: recomputed,
    })
}

fn parse_canonical(filename: &str, bytes: &[u8]) -> Result<serde_json::Value, ReportDirReadError> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| ReportDirReadError::Parse {
            filename: filename.to_string(),
            detail: e.to_string(),
        })?;
    let canonical = canonical_json_bytes(&value).map_err(|_| ReportDirReadError::NonCanonical {
        filename: filename.to_string(),
    })?;
    if canonical != bytes {
        return Err(ReportDirReadError::NonCanonical {
            filename: filename.to_string(),
        });
    }
    Ok(value)
}

/// Write via temp file + rename.
fn write_atomic(path: &Path, content: &[u8]) -> Result<(), ReportDirWriteError> {
    let dir = path.parent().ok_or_else(|| ReportDirWriteError::Io {
        detail: "no parent directory".into(),
    })?;
    let temp_path = dir.join(format!(
        ".tmp_{}",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));
    std::fs::write(&temp_path, content).map_err(|e| ReportDirWriteError::Io {
        detail: format!("write {}: {e}", temp_path.display()),
    })?;
    std::fs::rename(&temp_path, path).map_err(|e| ReportDirWriteError::Io {
        detail: format!("rename {} → {}: {e}", temp_path.display(), path.display()),
    })
}

fn read_required(dir: &Path, filename: &str) -> Result<Vec<u8>, ReportDirReadError> {
    std::fs::read(dir.join(filename)).map_err(|_| ReportDirReadError::MissingFile {
        filename: filename.to_string(),
    })
}

/// Regular files in `dir`, skipping leftover temp files.
fn list_files(dir: &Path) -> Result<BTreeSet<String>, ReportDirReadError> {
    let io = |e: std::io::Error| ReportDirReadError::Io {
        detail: e.to_string(),
    };
    let mut files = BTreeSet::new();
    for entry in std::fs::read_dir(dir).map_err(io)? {
        let entry = entry.map_err(io)?;
        if !entry.file_type().map_err(io)?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if !name.starts_with(".tmp_") {
                files.insert(name.to_string());
            }
        }
    }
    Ok(files)
}
