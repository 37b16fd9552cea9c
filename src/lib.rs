//! Vectorized particle integration with a scalar cross-check.
//!
//! The crate advances a large particle ensemble by one semi-implicit Euler
//! timestep along two independent paths: a scalar reference walking an
//! array-of-structures layout, and a hand-batched vector kernel walking a
//! structure-of-arrays layout whose field planes are aligned to the register
//! width of the instruction set selected at build time. The harness binary
//! times both passes and fails with a nonzero exit if any particle field
//! diverges between them beyond an absolute tolerance.
//!
//! The vector width (4, 8, or 16 f32 lanes) is fixed at compile time by the
//! build script from the widest supported extension; a target without any
//! recognized extension does not build.

#![cfg_attr(
    all(
        any(target_arch = "x86", target_arch = "x86_64"),
        rustc_channel = "nightly"
    ),
    feature(avx512_target_feature, stdarch_x86_avx512)
)]

pub mod ensemble;
pub mod error;
pub mod simd;
pub mod step;
pub mod utils;
