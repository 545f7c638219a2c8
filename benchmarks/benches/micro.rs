use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

use tokenpass_kernel::graph::StateId;
use tokenpass_kernel::logmath::add_as_linear;
use tokenpass_search::active_list::{ActiveList, ActiveListConfig};
use tokenpass_search::best_token::BestTokenMap;
use tokenpass_search::token::{EntryScores, TokenArena, TokenId};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[allow(clippy::cast_precision_loss)]
fn arena_with(n: u32) -> (TokenArena, Vec<TokenId>) {
    let mut arena = TokenArena::new();
    let start = arena.start(StateId(0), 0).unwrap();
    let ids = (0..n)
        .map(|i| {
            // scatter scores so the sort does real work
            let score = -((i.wrapping_mul(7919) % n) as f32) * 0.01;
            let entry = EntryScores {
                score,
                language: score,
                insertion: 0.0,
            };
            arena.child(start, StateId(i + 1), entry, 0).unwrap()
        })
        .collect();
    (arena, ids)
}

// ---------------------------------------------------------------------------
// Active list purge
// ---------------------------------------------------------------------------

fn bench_purge(c: &mut Criterion) {
    let mut group = c.benchmark_group("active_list_purge");
    for &size in &[100u32, 1_000, 10_000] {
        let (arena, ids) = arena_with(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter_batched(
                || {
                    let mut list = ActiveList::new(ActiveListConfig {
                        absolute_beam_width: 50,
                        relative_beam_width: Some(-1.0),
                        strict_pruning: true,
                    });
                    for &id in &ids {
                        list.add(id, &arena);
                    }
                    list
                },
                |mut list| black_box(list.purge(&arena)),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Best token map
// ---------------------------------------------------------------------------

fn bench_best_token_map(c: &mut Criterion) {
    let mut group = c.benchmark_group("best_token_insert");
    for &size in &[100u32, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &n| {
            b.iter(|| {
                let mut map = BestTokenMap::new();
                for i in 0..n {
                    let context = (i % 3 == 0).then_some(StateId(i / 3));
                    map.insert(StateId(i % 97), context, TokenId(i));
                }
                black_box(map.len())
            });
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Log-domain sum
// ---------------------------------------------------------------------------

fn bench_add_as_linear(c: &mut Criterion) {
    c.bench_function("add_as_linear_1000", |b| {
        b.iter(|| {
            let mut acc = f64::NEG_INFINITY;
            for i in 0..1000u32 {
                acc = add_as_linear(acc, -0.001 * f64::from(i));
            }
            black_box(acc)
        });
    });
}

criterion_group!(benches, bench_purge, bench_best_token_map, bench_add_as_linear);
criterion_main!(benches);
