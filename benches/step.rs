//! Integration-pass benchmarks: scalar vs SIMD vs parallel SIMD.
//!
//! Compares the three realizations of the symplectic Euler step across
//! ensemble sizes chosen to exercise different levels of the memory
//! hierarchy. Timing the scalar AoS pass and the vectorized SoA pass on the
//! same generated data is the performance half of the equivalence harness;
//! the correctness half lives in the test suite.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::SeedableRng;

use simdstep::ensemble::generate;
use simdstep::step::{par_simd_step, scalar_step, simd_step};

/// Ensemble sizes targeting successive levels of the memory hierarchy.
///
/// A particle spans 36 bytes across the nine f32 field planes:
///
/// - **4 Ki particles**: ~144 KiB, in L2 - tests raw computational throughput
/// - **64 Ki particles**: ~2.25 MiB, L2→L3 transition
/// - **256 Ki particles**: ~9 MiB, L3 cache
/// - **1 Mi particles**: ~36 MiB, exceeds most L3 caches - memory-bound,
///   and the size the harness binary runs by default
const ENSEMBLE_SIZES: &[usize] = &[4_096, 65_536, 262_144, 1_048_576];

/// Parallel dispatch only pays for itself above this ensemble size; below
/// it `par_simd_step` falls through to the single-threaded kernel anyway.
const PARALLEL_SIZE_THRESHOLD: usize = 16 * 1024;

fn step_benchmarks(c: &mut Criterion) {
    for &size in ENSEMBLE_SIZES {
        let mut group = c.benchmark_group("IntegrationStep");
        group.throughput(Throughput::Elements(size as u64));

        // Fixed seed so every implementation sees identical particle data
        let mut rng = StdRng::seed_from_u64(42);
        let (aos, soa) = generate(size, &mut rng).unwrap();

        group.bench_with_input(BenchmarkId::new("scalar_aos", size), &size, |b, _| {
            b.iter_batched(
                || aos.clone(),
                |mut ensemble| {
                    scalar_step(&mut ensemble);
                    black_box(ensemble);
                },
                BatchSize::LargeInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("simd_soa", size), &size, |b, _| {
            b.iter_batched(
                || soa.clone(),
                |mut ensemble| {
                    simd_step(&mut ensemble);
                    black_box(ensemble);
                },
                BatchSize::LargeInput,
            )
        });

        if size > PARALLEL_SIZE_THRESHOLD {
            group.bench_with_input(BenchmarkId::new("par_simd_soa", size), &size, |b, _| {
                b.iter_batched(
                    || soa.clone(),
                    |mut ensemble| {
                        par_simd_step(&mut ensemble);
                        black_box(ensemble);
                    },
                    BatchSize::LargeInput,
                )
            });
        }

        group.finish();
    }
}

criterion_group!(benches, step_benchmarks);
criterion_main!(benches);
