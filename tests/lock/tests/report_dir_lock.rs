//! Report directory lock tests: every world survives a disk round trip,
//! and the stored digest is exactly the in-memory digest.

use tokenpass_harness::report_dir::{read_report_dir, write_report_dir, ReportDirReadError};
use tokenpass_harness::runner::run_world;
use tokenpass_harness::worlds::all_worlds;
use tokenpass_harness::worlds::merges::FanIn;

/// ACCEPTANCE: REPORT-DIR-ROUNDTRIP
#[test]
fn every_world_roundtrips_through_disk() {
    let root = tempfile::tempdir().unwrap();
    for world in all_worlds() {
        let report = run_world(world.as_ref()).unwrap();
        let dir = root.path().join(&report.world_id);
        write_report_dir(&report, &dir).unwrap();

        let loaded = read_report_dir(&dir).unwrap();
        assert_eq!(loaded.digest, report.digest);
        assert_eq!(loaded.report_bytes, report.report_bytes);
        assert_eq!(
            loaded.token_graph_bytes,
            report.token_graph.to_canonical_json_bytes().unwrap()
        );
        let stored = std::fs::read_to_string(dir.join("report_digest.txt")).unwrap();
        assert_eq!(stored, report.digest.as_str());
    }
}

/// ACCEPTANCE: REPORT-DIR-FAIL-CLOSED
#[test]
fn edited_report_is_rejected() {
    let report = run_world(&FanIn).unwrap();
    let dir = tempfile::tempdir().unwrap();
    write_report_dir(&report, dir.path()).unwrap();

    let path = dir.path().join("report.json");
    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, text.replace("\"fan_in\"", "\"fan_out\"")).unwrap();

    let err = read_report_dir(dir.path()).unwrap_err();
    assert!(
        matches!(err, ReportDirReadError::DigestMismatch { .. }),
        "got {err}"
    );
}

#[test]
fn rewriting_a_directory_is_idempotent() {
    let report = run_world(&FanIn).unwrap();
    let dir = tempfile::tempdir().unwrap();
    write_report_dir(&report, dir.path()).unwrap();
    write_report_dir(&report, dir.path()).unwrap();
    assert!(read_report_dir(dir.path()).is_ok());
}
