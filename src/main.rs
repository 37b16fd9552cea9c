//! Correctness and timing harness for the integration kernel.
//!
//! Builds N particles with randomized initial state mirrored into both
//! layouts, times the scalar pass over the AoS copy and the vector pass over
//! the SoA copy, then compares every field of every particle within a fixed
//! absolute tolerance. Any mismatch prints the divergent operands and exits
//! nonzero.

use std::env;
use std::process;
use std::time::Instant;

use chrono::Local;
use rand::rngs::StdRng;
use rand::SeedableRng;

use simdstep::ensemble::{generate, verify_equivalence};
use simdstep::error::{validation_error, Result};
use simdstep::simd::{LANE_COUNT, VECTOR_ALIGNMENT};
use simdstep::step::{scalar_step, simd_step, DT};

/// Default ensemble size, overridable by the first positional argument.
const DEFAULT_ENSEMBLE_SIZE: usize = 1_048_576;

/// Fixed generator seed so runs are reproducible.
const SEED: u64 = 0x5EED_CAFE;

/// Absolute tolerance for the scalar/vector equivalence check.
const EPSILON: f32 = 0.1;

fn parse_ensemble_size() -> Result<usize> {
    let Some(arg) = env::args().nth(1) else {
        return Ok(DEFAULT_ENSEMBLE_SIZE);
    };

    let n: usize = arg
        .parse()
        .map_err(|_| validation_error(format!("invalid ensemble size: {arg:?}")))?;

    if n == 0 {
        return Err(validation_error("ensemble size must be positive"));
    }

    Ok(n)
}

fn run() -> Result<()> {
    let n = parse_ensemble_size()?;

    println!("simdstep {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!(
        "{n} particles, dt = {DT}, {LANE_COUNT} lanes, {VECTOR_ALIGNMENT}-byte aligned planes"
    );

    let mut rng = StdRng::seed_from_u64(SEED);

    let start = Instant::now();
    let (mut aos, mut soa) = generate(n, &mut rng)?;
    println!("{:>32} {:>12.3?}", "generation:", start.elapsed());

    let start = Instant::now();
    scalar_step(&mut aos);
    println!("{:>32} {:>12.3?}", "scalar pass (AoS):", start.elapsed());

    let start = Instant::now();
    simd_step(&mut soa);
    println!("{:>32} {:>12.3?}", "vector pass (SoA):", start.elapsed());

    let start = Instant::now();
    verify_equivalence(&aos, &soa, EPSILON)?;
    println!("{:>32} {:>12.3?}", "verification:", start.elapsed());

    println!("Success, the two data sets are equal!");
    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{error}");
        process::exit(1);
    }
}
