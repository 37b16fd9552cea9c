//! ARM NEON SIMD implementation for 128-bit vector operations.
//!
//! Compiled on aarch64 targets, where NEON is part of the baseline. The
//! batch width is 4 particles per field. NEON loads and stores have no
//! strict aligned forms; field buffers are still allocated on the 16-byte
//! register boundary so the layout matches the x86 paths.

pub mod f32x4;
