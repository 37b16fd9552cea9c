//! Instruction-set specific vector types behind one compile-time alias.
//!
//! Exactly one of the submodules is compiled, selected by the build script
//! from the widest vector extension the target supports. Each defines a
//! wrapper over the native single-precision register with an identical API,
//! and this module re-exports the selected type as [`WideF32`] together with
//! its [`LANE_COUNT`] and [`VECTOR_ALIGNMENT`], so code batching over
//! particles is written once against the chosen width.

#[cfg(avx2)]
pub mod avx2;

#[cfg(avx512)]
pub mod avx512;

#[cfg(neon)]
pub mod neon;

#[cfg(sse)]
pub mod sse;

pub mod traits;

#[cfg(sse)]
pub use sse::f32x4::{F32x4 as WideF32, LANE_COUNT, SSE_ALIGNMENT as VECTOR_ALIGNMENT};

#[cfg(avx2)]
pub use avx2::f32x8::{F32x8 as WideF32, AVX_ALIGNMENT as VECTOR_ALIGNMENT, LANE_COUNT};

#[cfg(avx512)]
pub use avx512::f32x16::{F32x16 as WideF32, AVX512_ALIGNMENT as VECTOR_ALIGNMENT, LANE_COUNT};

#[cfg(neon)]
pub use neon::f32x4::{F32x4 as WideF32, LANE_COUNT, NEON_ALIGNMENT as VECTOR_ALIGNMENT};
