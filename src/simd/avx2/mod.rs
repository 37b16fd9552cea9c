//! AVX2 SIMD implementation for 256-bit vector operations.
//!
//! Compiled when the build script detects AVX2 on the target CPU. Provides
//! [`f32x8::F32x8`], an 8-lane single-precision vector with fused
//! multiply-add, which makes the integration batch width 8 particles per
//! field.
//!
//! # Architecture Requirements
//!
//! - **CPU Support**: Intel Haswell (2013+) or AMD Excavator (2015+)
//! - **Instruction Sets**: AVX, AVX2, and FMA
//! - **Memory Alignment**: strict aligned loads/stores require 32-byte
//!   aligned field buffers

pub mod f32x8;
