//! Determinism lock tests.
//!
//! - DETERMINISM-INPROC: N>=10 runs of every world yield identical report bytes.
//! - DETERMINISM-CROSSPROC: the `decode_fixture` binary prints the same
//!   digests under different working directories and locales, and they
//!   match the in-process digests.
//! - NO-PATH-IN-HASH: report bytes never mention the working directory.

use std::process::Command;

use tokenpass_harness::runner::run_world;
use tokenpass_harness::worlds::all_worlds;

fn inproc_digests() -> String {
    all_worlds()
        .iter()
        .map(|w| {
            let report = run_world(w.as_ref()).unwrap();
            format!("{}={}\n", report.world_id, report.digest.as_str())
        })
        .collect()
}

fn run_variant(work_dir: &std::path::Path, env_overrides: &[(&str, &str)]) -> String {
    let bin = env!("CARGO_BIN_EXE_decode_fixture");
    let mut command = Command::new(bin);
    command
        .current_dir(work_dir)
        .env_remove("LC_ALL")
        .env_remove("LANG")
        .env_remove("RUST_LOG");
    for &(key, val) in env_overrides {
        command.env(key, val);
    }
    let output = command
        .output()
        .unwrap_or_else(|e| panic!("failed to spawn {bin}: {e}"));
    assert!(
        output.status.success(),
        "decode_fixture exited with {}: stderr={}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}

/// ACCEPTANCE: DETERMINISM-INPROC
#[test]
fn determinism_inproc_n10() {
    for world in all_worlds() {
        let first = run_world(world.as_ref()).unwrap();
        for i in 1..=10 {
            let again = run_world(world.as_ref()).unwrap();
            assert_eq!(
                again.report_bytes, first.report_bytes,
                "{} diverged on run {i}",
                first.world_id
            );
            assert_eq!(again.token_graph_digest, first.token_graph_digest);
        }
    }
}

/// ACCEPTANCE: DETERMINISM-CROSSPROC
#[test]
fn determinism_crossproc_env_variants() {
    let expected = inproc_digests();
    let tmp = tempfile::tempdir().unwrap();
    let variants: [(&std::path::Path, &[(&str, &str)]); 3] = [
        (std::path::Path::new(env!("CARGO_MANIFEST_DIR")), &[]),
        (tmp.path(), &[("LC_ALL", "C")]),
        (tmp.path(), &[("LANG", "tr_TR.UTF-8"), ("TZ", "Asia/Tokyo")]),
    ];
    for (dir, env) in variants {
        let out = run_variant(dir, env);
        assert_eq!(out, expected, "variant dir={} env={env:?}", dir.display());
    }
}

/// ACCEPTANCE: NO-PATH-IN-HASH
#[test]
fn report_bytes_do_not_mention_paths() {
    let cwd = std::env::current_dir().unwrap();
    let cwd = cwd.to_string_lossy();
    for world in all_worlds() {
        let report = run_world(world.as_ref()).unwrap();
        let text = String::from_utf8(report.report_bytes).unwrap();
        assert!(!text.contains(cwd.as_ref()), "{}", report.world_id);
        assert!(!text.contains(env!("CARGO_MANIFEST_DIR")));
    }
}
