//! AVX-512 16-lane f32 SIMD vector implementation.
//!
//! Wraps the 512-bit `__m512` register. Partial loads and stores use the
//! native `__mmask16` masked forms, so no lane past the active count is ever
//! touched. The strict `_mm512_load_ps` / `_mm512_store_ps` forms require
//! 64-byte aligned addresses.

#[cfg(target_arch = "x86")]
use std::arch::x86::*;

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use std::ops::{Add, Div, Mul, Sub};

use crate::simd::traits::{Alignment, SimdFma, SimdLoad, SimdStore};

/// AVX-512 memory alignment requirement in bytes.
pub const AVX512_ALIGNMENT: usize = 64;

/// The number of f32 lanes in an AVX-512 vector.
pub const LANE_COUNT: usize = 16;

/// AVX-512 SIMD vector containing 16 packed f32 values.
#[derive(Copy, Clone, Debug)]
pub struct F32x16 {
    /// Number of valid elements in the vector (1-16)
    pub size: usize,
    /// AVX-512 512-bit vector register containing 16 packed f32 values
    pub elements: __m512,
}

impl Alignment<f32> for F32x16 {
    #[inline(always)]
    fn is_aligned(ptr: *const f32) -> bool {
        let ptr = ptr as usize;

        ptr % core::mem::align_of::<__m512>() == 0
    }
}

impl From<&[f32]> for F32x16 {
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

impl SimdLoad<f32> for F32x16 {
    type Output = Self;

    #[inline(always)]
    fn splat(value: f32) -> Self::Output {
        Self {
            elements: unsafe { _mm512_set1_ps(value) },
            size: LANE_COUNT,
        }
    }

    /// Loads exactly 16 elements, dispatching on pointer alignment.
    ///
    /// # Safety
    ///
    /// Pointer must not be null and must point to at least 16 valid f32
    /// values.
    #[inline(always)]
    unsafe fn load(ptr: *const f32, size: usize) -> Self::Output {
        debug_assert!(size == LANE_COUNT, "Size must be == {LANE_COUNT}");
        debug_assert!(!ptr.is_null(), "Pointer must not be null");

        match F32x16::is_aligned(ptr) {
            true => unsafe { Self::load_aligned(ptr) },
            false => unsafe { Self::load_unaligned(ptr) },
        }
    }

    /// Loads 16 elements from 64-byte aligned memory with `_mm512_load_ps`.
    ///
    /// # Safety
    ///
    /// Pointer must be 64-byte aligned and point to at least 16 valid f32
    /// values.
    #[inline(always)]
    unsafe fn load_aligned(ptr: *const f32) -> Self::Output {
        Self {
            elements: _mm512_load_ps(ptr),
            size: LANE_COUNT,
        }
    }

    /// Loads 16 elements from unaligned memory with `_mm512_loadu_ps`.
    ///
    /// # Safety
    ///
    /// Pointer must point to at least 16 valid f32 values.
    #[inline(always)]
    unsafe fn load_unaligned(ptr: *const f32) -> Self::Output {
        Self {
            elements: _mm512_loadu_ps(ptr),
            size: LANE_COUNT,
        }
    }

    /// Loads `size` elements with a zeroing masked load.
    ///
    /// # Safety
    ///
    /// Pointer must not be null and must point to at least `size` valid f32
    /// values.
    #[inline(always)]
    unsafe fn load_partial(ptr: *const f32, size: usize) -> Self::Output {
        debug_assert!(
            size < LANE_COUNT,
            "{}",
            format!("Size must be < {LANE_COUNT}")
        );
        debug_assert!(!ptr.is_null(), "Pointer must not be null");

        // Lower `size` bits set, e.g. size = 3 -> 0b0000_0000_0000_0111
        let mask: __mmask16 = (1 << size) - 1;

        Self {
            elements: _mm512_maskz_loadu_ps(mask, ptr),
            size,
        }
    }
}

impl SimdStore<f32> for F32x16 {
    /// Stores the active lanes, dispatching on size and pointer alignment.
    ///
    /// # Safety
    ///
    /// Pointer must not be null and must point to writable memory for
    /// `self.size` elements.
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
            std::cmp::Ordering::Equal => match F32x16::is_aligned(ptr) {
                true => unsafe { self.store_aligned_at(ptr) },
                false => unsafe { self.store_unaligned_at(ptr) },
            },
            std::cmp::Ordering::Greater => unreachable!("Size cannot exceed LANE_COUNT"),
        }
    }

    /// Stores 16 elements to 64-byte aligned memory with `_mm512_store_ps`.
    ///
    /// # Safety
    ///
    /// Pointer must be 64-byte aligned and point to at least 16 valid f32
    /// memory locations.
    #[inline(always)]
    unsafe fn store_aligned_at(&self, ptr: *mut f32) {
        _mm512_store_ps(ptr, self.elements)
    }

    /// Stores 16 elements to unaligned memory with `_mm512_storeu_ps`.
    ///
    /// # Safety
    ///
    /// Pointer must point to at least 16 valid f32 memory locations.
    #[inline(always)]
    unsafe fn store_unaligned_at(&self, ptr: *mut f32) {
        _mm512_storeu_ps(ptr, self.elements)
    }

    /// Stores only the active lanes with a masked store.
    ///
    /// # Safety
    ///
    /// Pointer must not be null and must point to at least `self.size` valid
    /// f32 memory locations.
    #[inline(always)]
    unsafe fn store_at_partial(&self, ptr: *mut f32) {
        debug_assert!(
            self.size < LANE_COUNT,
            "{}",
            format!("Size must be < {LANE_COUNT}")
        );
        debug_assert!(!ptr.is_null(), "Pointer must not be null");

        let mask: __mmask16 = (1 << self.size) - 1;

        _mm512_mask_storeu_ps(ptr, mask, self.elements);
    }
}

impl SimdFma for F32x16 {
    /// Computes `self * a + b` with `_mm512_fmadd_ps`.
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
            elements: unsafe { _mm512_fmadd_ps(self.elements, a.elements, b.elements) },
        }
    }
}

/// Element-wise addition using `_mm512_add_ps`.
impl Add for F32x16 {
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
            elements: unsafe { _mm512_add_ps(self.elements, rhs.elements) },
        }
    }
}

/// Element-wise subtraction using `_mm512_sub_ps`.
impl Sub for F32x16 {
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
            elements: unsafe { _mm512_sub_ps(self.elements, rhs.elements) },
        }
    }
}

/// Element-wise multiplication using `_mm512_mul_ps`.
impl Mul for F32x16 {
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
            elements: unsafe { _mm512_mul_ps(self.elements, rhs.elements) },
        }
    }
}

/// Element-wise division using `_mm512_div_ps`.
impl Div for F32x16 {
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
            elements: unsafe { _mm512_div_ps(self.elements, rhs.elements) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::alloc::{alloc, dealloc, Layout};

    fn alloc_aligned(size: usize, align: usize) -> *mut f32 {
        let layout = Layout::from_size_align(size * std::mem::size_of::<f32>(), align).unwrap();
        unsafe { alloc(layout) as *mut f32 }
    }

    fn dealloc_aligned(ptr: *mut f32, size: usize, align: usize) {
        let layout = Layout::from_size_align(size * std::mem::size_of::<f32>(), align).unwrap();
        unsafe { dealloc(ptr as *mut u8, layout) };
    }

    fn extract_elements(vec: &F32x16) -> [f32; 16] {
        let mut result = [0.0f32; 16];
        unsafe {
            _mm512_storeu_ps(result.as_mut_ptr(), vec.elements);
        }
        result
    }

    #[test]
    fn test_is_aligned_64_byte_boundary() {
        let aligned_ptr = alloc_aligned(16, 64);
        assert!(F32x16::is_aligned(aligned_ptr));
        assert!(!F32x16::is_aligned(unsafe { aligned_ptr.add(1) }));
        dealloc_aligned(aligned_ptr, 16, 64);
    }

    #[test]
    fn test_from_slice_full_and_partial() {
        let data: Vec<f32> = (0..16).map(|i| i as f32).collect();
        let vec = F32x16::from(data.as_slice());
        assert_eq!(vec.size, 16);
        assert_eq!(extract_elements(&vec)[..], data[..]);

        let partial = F32x16::from(&data[..5]);
        assert_eq!(partial.size, 5);
        let elements = extract_elements(&partial);
        assert_eq!(&elements[..5], &data[..5]);
        assert!(elements[5..].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_aligned_load_store_roundtrip() {
        let src = alloc_aligned(16, 64);
        let dst = alloc_aligned(16, 64);
        let data: Vec<f32> = (0..16).map(|i| (i as f32) - 8.0).collect();

        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), src, 16);
            let vec = F32x16::load_aligned(src);
            vec.store_aligned_at(dst);
            assert_eq!(std::slice::from_raw_parts(dst, 16), &data[..]);
        }

        dealloc_aligned(src, 16, 64);
        dealloc_aligned(dst, 16, 64);
    }

    #[test]
    fn test_partial_store_leaves_tail_untouched() {
        for size in 1..16 {
            let data: Vec<f32> = (0..size).map(|i| (i + 1) as f32).collect();
            let vec = unsafe { F32x16::load_partial(data.as_ptr(), size) };

            let mut buffer = [9.0f32; 16];
            unsafe { vec.store_at_partial(buffer.as_mut_ptr()) };

            for (i, e) in buffer.iter().enumerate() {
                if i < size {
                    assert_eq!(*e, (i + 1) as f32);
                } else {
                    assert_eq!(*e, 9.0, "tail clobbered at {i} for size {size}");
                }
            }
        }
    }

    #[test]
    fn test_fmadd_matches_scalar_mul_add() {
        let a: Vec<f32> = (0..16).map(|i| (i as f32) * 0.25 - 2.0).collect();
        let b: Vec<f32> = (0..16).map(|i| 3.0 - (i as f32) * 0.5).collect();
        let c: Vec<f32> = (0..16).map(|i| (i as f32) * 0.125).collect();

        let result = extract_elements(
            &F32x16::from(a.as_slice())
                .fmadd(F32x16::from(b.as_slice()), F32x16::from(c.as_slice())),
        );

        for i in 0..16 {
            let expected = a[i].mul_add(b[i], c[i]);
            assert!(
                (result[i] - expected).abs() <= f32::EPSILON * expected.abs().max(1.0),
                "lane {i}: {} vs {expected}",
                result[i]
            );
        }
    }
}
