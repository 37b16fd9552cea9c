//! AVX2 8-lane f32 SIMD vector implementation.
//!
//! This module provides `F32x8`, a SIMD vector type that wraps Intel's AVX2
//! `__m256` intrinsic to perform vectorized operations on 8 single-precision
//! floating-point values simultaneously using 256-bit AVX2 instructions.
//!
//! # Architecture Requirements
//!
//! - **CPU Support**: Intel processors with AVX2 support (Haswell and later)
//! - **Target Architecture**: x86_64 (and x86 with SSE compatibility)
//! - **Compilation**: Must be compiled with AVX2 and FMA enabled
//!   (`-C target-feature=+avx2,+fma`), which the build script arranges
//!
//! # Supported Operations
//!
//! ## Loading and Storing
//! - `From<&[f32]>` trait - High-level loading with automatic partial handling
//! - `load_aligned()`, `load_unaligned()` - Direct memory loading
//! - `load_partial()` - Safe partial loading for sizes < 8
//! - `store_at()` - Automatic store with size and alignment detection
//! - `store_aligned_at()`, `store_unaligned_at()` - Direct memory storing
//!
//! ## Arithmetic
//! - Element-wise addition (`+`), subtraction (`-`), multiplication (`*`),
//!   division (`/`)
//! - `fmadd()` - fused multiply-add in a single rounding step

#[cfg(target_arch = "x86")]
use std::arch::x86::*;

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use std::ops::{Add, Div, Mul, Sub};

use crate::simd::traits::{Alignment, SimdFma, SimdLoad, SimdStore};

/// AVX2 memory alignment requirement in bytes.
///
/// The strict forms of the AVX load/store instructions (`_mm256_load_ps`,
/// `_mm256_store_ps`) fault on addresses that are not 32-byte aligned, so
/// every buffer handed to them must start on this boundary.
pub const AVX_ALIGNMENT: usize = 32;

/// Number of f32 elements that fit in an AVX2 256-bit vector.
///
/// AVX2 vectors contain 8 single-precision floating-point values
/// (8 × 32 bits = 256 bits). This constant is the particle batch width on
/// AVX2 targets.
pub const LANE_COUNT: usize = 8;

/// AVX2 SIMD vector containing 8 packed f32 values.
///
/// Maintains both the underlying AVX2 register and the count of valid
/// elements for partial operations at the end of a data slice.
#[derive(Copy, Clone, Debug)]
pub struct F32x8 {
    /// Number of valid elements in the vector (1-8)
    pub size: usize,
    /// AVX2 256-bit vector register containing 8 packed f32 values
    pub elements: __m256,
}

impl Alignment<f32> for F32x8 {
    /// Checks if a pointer is aligned for strict AVX2 loads and stores.
    #[inline(always)]
    fn is_aligned(ptr: *const f32) -> bool {
        let ptr = ptr as usize;

        ptr % core::mem::align_of::<__m256>() == 0
    }
}

impl From<&[f32]> for F32x8 {
    /// Creates an F32x8 vector from a slice of f32 values.
    ///
    /// Automatically selects the appropriate loading method based on slice
    /// length:
    /// - For slices with at least 8 elements: uses a full SIMD load
    /// - For slices with fewer than 8 elements: uses a masked partial load
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the slice is empty.
    fn from(slice: &[f32]) -> Self {
        debug_assert!(!slice.is_empty(), "data pointer can't be NULL");

        let size = slice.len();

        match slice.len().cmp(&LANE_COUNT) {
            std::cmp::Ordering::Less => unsafe { Self::load_partial(slice.as_ptr(), size) },
            std::cmp::Ordering::Equal | std::cmp::Ordering::Greater => unsafe {
                Self::load(slice.as_ptr(), LANE_COUNT)
            },
        }
    }
}

impl SimdLoad<f32> for F32x8 {
    type Output = Self;

    /// Broadcasts a single value into all 8 lanes.
    #[inline(always)]
    fn splat(value: f32) -> Self::Output {
        Self {
            elements: unsafe { _mm256_set1_ps(value) },
            size: LANE_COUNT,
        }
    }

    /// Loads exactly 8 elements from memory.
    ///
    /// Automatically chooses between aligned and unaligned load based on
    /// pointer alignment.
    ///
    /// # Safety
    ///
    /// Pointer must not be null and must point to at least 8 valid f32
    /// values.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if size != 8 or if pointer is null.
    #[inline(always)]
    unsafe fn load(ptr: *const f32, size: usize) -> Self::Output {
        debug_assert!(size == LANE_COUNT, "Size must be == {LANE_COUNT}");
        debug_assert!(!ptr.is_null(), "Pointer must not be null");

        match F32x8::is_aligned(ptr) {
            true => unsafe { Self::load_aligned(ptr) },
            false => unsafe { Self::load_unaligned(ptr) },
        }
    }

    /// Loads 8 elements from 32-byte aligned memory.
    ///
    /// Uses the strict `_mm256_load_ps` intrinsic, which faults on an
    /// unaligned address rather than silently degrading.
    ///
    /// # Safety
    ///
    /// Pointer must be 32-byte aligned and point to at least 8 valid f32
    /// values.
    #[inline(always)]
    unsafe fn load_aligned(ptr: *const f32) -> Self::Output {
        Self {
            elements: _mm256_load_ps(ptr),
            size: LANE_COUNT,
        }
    }

    /// Loads 8 elements from unaligned memory via `_mm256_loadu_ps`.
    ///
    /// # Safety
    ///
    /// Pointer must point to at least 8 valid f32 values.
    #[inline(always)]
    unsafe fn load_unaligned(ptr: *const f32) -> Self::Output {
        Self {
            elements: _mm256_loadu_ps(ptr),
            size: LANE_COUNT,
        }
    }

    /// Loads fewer than 8 elements using masked loading operations.
    ///
    /// Uses `_mm256_maskload_ps` with a mask derived from `size`, so lanes
    /// past the end of the source are never read. Unloaded lanes are zero.
    ///
    /// # Safety
    ///
    /// Pointer must not be null and must point to at least `size` valid f32
    /// values.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if size >= 8 or if pointer is null.
    #[inline(always)]
    unsafe fn load_partial(ptr: *const f32, size: usize) -> Self::Output {
        debug_assert!(
            size < LANE_COUNT,
            "{}",
            format!("Size must be < {LANE_COUNT}")
        );

        debug_assert!(!ptr.is_null(), "Pointer must not be null");

        let mask = match size {
            1 => _mm256_setr_epi32(-1, 0, 0, 0, 0, 0, 0, 0),
            2 => _mm256_setr_epi32(-1, -1, 0, 0, 0, 0, 0, 0),
            3 => _mm256_setr_epi32(-1, -1, -1, 0, 0, 0, 0, 0),
            4 => _mm256_setr_epi32(-1, -1, -1, -1, 0, 0, 0, 0),
            5 => _mm256_setr_epi32(-1, -1, -1, -1, -1, 0, 0, 0),
            6 => _mm256_setr_epi32(-1, -1, -1, -1, -1, -1, 0, 0),
            7 => _mm256_setr_epi32(-1, -1, -1, -1, -1, -1, -1, 0),
            _ => unreachable!(),
        };

        Self {
            elements: _mm256_maskload_ps(ptr, mask),
            size,
        }
    }
}

impl SimdStore<f32> for F32x8 {
    /// Stores vector data at the given pointer location.
    ///
    /// Automatically chooses the most appropriate store method based on the
    /// vector size (partial vs. full store) and pointer alignment.
    ///
    /// # Safety
    ///
    /// Pointer must not be null and must point to sufficient writable memory
    /// for `self.size` elements.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if size > 8 or if pointer is null.
    #[inline(always)]
    unsafe fn store_at(&self, ptr: *mut f32) {
        debug_assert!(
            self.size <= LANE_COUNT,
            "{}",
            format!("Size must be <= {LANE_COUNT}")
        );
        debug_assert!(!ptr.is_null(), "Pointer must not be null");

        match self.size.cmp(&LANE_COUNT) {
            std::cmp::Ordering::Less => unsafe { self.store_at_partial(ptr) },
            std::cmp::Ordering::Equal => match F32x8::is_aligned(ptr) {
                true => unsafe { self.store_aligned_at(ptr) },
                false => unsafe { self.store_unaligned_at(ptr) },
            },
            std::cmp::Ordering::Greater => unreachable!("Size cannot exceed LANE_COUNT"),
        }
    }

    /// Stores 8 elements to 32-byte aligned memory.
    ///
    /// Uses the strict `_mm256_store_ps` intrinsic, which faults on an
    /// unaligned address.
    ///
    /// # Safety
    ///
    /// Pointer must be 32-byte aligned and point to at least 8 valid f32
    /// memory locations.
    #[inline(always)]
    unsafe fn store_aligned_at(&self, ptr: *mut f32) {
        _mm256_store_ps(ptr, self.elements)
    }

    /// Stores 8 elements to unaligned memory via `_mm256_storeu_ps`.
    ///
    /// # Safety
    ///
    /// Pointer must point to at least 8 valid f32 memory locations.
    #[inline(always)]
    unsafe fn store_unaligned_at(&self, ptr: *mut f32) {
        _mm256_storeu_ps(ptr, self.elements)
    }

    /// Stores only the valid elements using masked store operations.
    ///
    /// Uses `_mm256_maskstore_ps` with masks corresponding to `self.size`,
    /// so memory past the intended range is never written.
    ///
    /// # Safety
    ///
    /// Pointer must not be null and must point to at least `self.size` valid
    /// f32 memory locations.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if size >= 8 or if pointer is null.
    #[inline(always)]
    unsafe fn store_at_partial(&self, ptr: *mut f32) {
        debug_assert!(
            self.size < LANE_COUNT,
            "{}",
            format!("Size must be < {LANE_COUNT}")
        );
        debug_assert!(!ptr.is_null(), "Pointer must not be null");

        let mask: __m256i = match self.size {
            1 => _mm256_setr_epi32(-1, 0, 0, 0, 0, 0, 0, 0),
            2 => _mm256_setr_epi32(-1, -1, 0, 0, 0, 0, 0, 0),
            3 => _mm256_setr_epi32(-1, -1, -1, 0, 0, 0, 0, 0),
            4 => _mm256_setr_epi32(-1, -1, -1, -1, 0, 0, 0, 0),
            5 => _mm256_setr_epi32(-1, -1, -1, -1, -1, 0, 0, 0),
            6 => _mm256_setr_epi32(-1, -1, -1, -1, -1, -1, 0, 0),
            7 => _mm256_setr_epi32(-1, -1, -1, -1, -1, -1, -1, 0),
            _ => unreachable!("Size must be < LANE_COUNT"),
        };

        _mm256_maskstore_ps(ptr, mask, self.elements);
    }
}

impl SimdFma for F32x8 {
    /// Computes `self * a + b` with `_mm256_fmadd_ps`.
    ///
    /// A single FMA instruction performs the multiply and the add in one
    /// rounding step, which is why the vector path's last bits can differ
    /// from the scalar reference.
    #[inline(always)]
    fn fmadd(self, a: Self, b: Self) -> Self {
        debug_assert!(
            self.size == a.size && self.size == b.size,
            "Operands must have the same size (got {}, {} and {})",
            self.size,
            a.size,
            b.size
        );

        Self {
            size: self.size,
            elements: unsafe { _mm256_fmadd_ps(self.elements, a.elements, b.elements) },
        }
    }
}

/// Element-wise addition of two F32x8 vectors using `_mm256_add_ps`.
///
/// # Panics
///
/// Panics in debug builds if the operands have different sizes.
impl Add for F32x8 {
    type Output = Self;

    #[inline(always)]
    fn add(self, rhs: Self) -> Self::Output {
        debug_assert!(
            self.size == rhs.size,
            "Operands must have the same size (expected {} lanes, got {} and {})",
            LANE_COUNT,
            self.size,
            rhs.size
        );

        Self {
            size: self.size,
            elements: unsafe { _mm256_add_ps(self.elements, rhs.elements) },
        }
    }
}

/// Element-wise subtraction of two F32x8 vectors using `_mm256_sub_ps`.
impl Sub for F32x8 {
    type Output = Self;

    #[inline(always)]
    fn sub(self, rhs: Self) -> Self::Output {
        debug_assert!(
            self.size == rhs.size,
            "Operands must have the same size (expected {} lanes, got {} and {})",
            LANE_COUNT,
            self.size,
            rhs.size
        );

        Self {
            size: self.size,
            elements: unsafe { _mm256_sub_ps(self.elements, rhs.elements) },
        }
    }
}

/// Element-wise multiplication of two F32x8 vectors using `_mm256_mul_ps`.
impl Mul for F32x8 {
    type Output = Self;

    #[inline(always)]
    fn mul(self, rhs: Self) -> Self::Output {
        debug_assert!(
            self.size == rhs.size,
            "Operands must have the same size (expected {} lanes, got {} and {})",
            LANE_COUNT,
            self.size,
            rhs.size
        );

        Self {
            size: self.size,
            elements: unsafe { _mm256_mul_ps(self.elements, rhs.elements) },
        }
    }
}

/// Element-wise division of two F32x8 vectors using `_mm256_div_ps`.
impl Div for F32x8 {
    type Output = Self;

    #[inline(always)]
    fn div(self, rhs: Self) -> Self::Output {
        debug_assert!(
            self.size == rhs.size,
            "Operands must have the same size (expected {} lanes, got {} and {})",
            LANE_COUNT,
            self.size,
            rhs.size
        );

        Self {
            size: self.size,
            elements: unsafe { _mm256_div_ps(self.elements, rhs.elements) },
        }
    }
}
