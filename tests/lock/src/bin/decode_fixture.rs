//! Binary that decodes every built-in world and prints deterministic
//! output lines for cross-process verification.
//!
//! Usage: `decode_fixture`
//! Output: one line per world, `world_id=report_digest`.

use std::process::ExitCode;

use tokenpass_harness::runner::run_world;
use tokenpass_harness::worlds::all_worlds;

fn main() -> ExitCode {
    for world in all_worlds() {
        match run_world(world.as_ref()) {
            Ok(report) => println!("{}={}", report.world_id, report.digest.as_str()),
            Err(e) => {
                eprintln!("{}: {e}", world.world_id());
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}
