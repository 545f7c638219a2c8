use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use tokenpass_benchmarks::{layered_graph, ramp_scorer};
use tokenpass_harness::runner::run_world;
use tokenpass_harness::worlds::all_worlds;
use tokenpass_search::manager::SearchManager;
use tokenpass_search::policy::DecoderPolicyV1;
use tokenpass_search::token_graph::TokenGraphV1;

const WIDTH: u32 = 32;
const LAYERS: u32 = 6;
const FRAMES: u32 = 20;

// ---------------------------------------------------------------------------
// Full decode under different absolute beams
// ---------------------------------------------------------------------------

fn bench_decode_beams(c: &mut Criterion) {
    let graph = layered_graph(WIDTH, LAYERS).unwrap();
    let (scorer, frames) = ramp_scorer(WIDTH, FRAMES);
    let mut group = c.benchmark_group("decode_layered");
    for &beam in &[8i32, 64, 512] {
        group.bench_with_input(BenchmarkId::new("beam", beam), &beam, |b, &beam| {
            let policy = DecoderPolicyV1 {
                absolute_beam_width: beam,
                ..DecoderPolicyV1::default()
            };
            b.iter(|| {
                let result = SearchManager::new(&graph, &scorer, policy.clone())
                    .and_then(|m| m.recognize(&frames))
                    .unwrap();
                black_box(result.best_score())
            });
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Lattice bookkeeping cost
// ---------------------------------------------------------------------------

fn bench_lattice_overhead(c: &mut Criterion) {
    let graph = layered_graph(WIDTH, LAYERS).unwrap();
    let (scorer, frames) = ramp_scorer(WIDTH, FRAMES);
    let mut group = c.benchmark_group("lattice");
    for build_lattice in [false, true] {
        let policy = DecoderPolicyV1 {
            absolute_beam_width: 64,
            build_lattice,
            ..DecoderPolicyV1::default()
        };
        group.bench_function(BenchmarkId::from_parameter(build_lattice), |b| {
            b.iter(|| {
                let result = SearchManager::new(&graph, &scorer, policy.clone())
                    .and_then(|m| m.recognize(&frames))
                    .unwrap();
                black_box(TokenGraphV1::from_result(&result).nodes.len())
            });
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Auditable report for every built-in world
// ---------------------------------------------------------------------------

fn bench_reports(c: &mut Criterion) {
    c.bench_function("report_all_worlds", |b| {
        let worlds = all_worlds();
        b.iter(|| {
            for world in &worlds {
                black_box(run_world(world.as_ref()).unwrap().digest);
            }
        });
    });
}

criterion_group!(benches, bench_decode_beams, bench_lattice_overhead, bench_reports);
criterion_main!(benches);
