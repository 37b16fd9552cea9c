//! SSE 4-lane f32 SIMD vector implementation.
//!
//! Wraps the 128-bit `__m128` register. The strict `_mm_load_ps` /
//! `_mm_store_ps` forms require 16-byte aligned addresses and fault
//! otherwise, which is why the SoA field planes are allocated on that
//! boundary.

#[cfg(target_arch = "x86")]
use std::arch::x86::*;

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use std::ops::{Add, Div, Mul, Sub};

use crate::simd::traits::{Alignment, SimdFma, SimdLoad, SimdStore};

/// SSE memory alignment requirement in bytes.
pub const SSE_ALIGNMENT: usize = 16;

/// Number of f32 elements in a 128-bit SSE vector.
pub const LANE_COUNT: usize = 4;

/// SSE SIMD vector containing 4 packed f32 values.
#[derive(Copy, Clone, Debug)]
pub struct F32x4 {
    /// Number of valid elements in the vector (1-4)
    pub size: usize,
    /// SSE 128-bit vector register containing 4 packed f32 values
    pub elements: __m128,
}

impl Alignment<f32> for F32x4 {
    #[inline(always)]
    fn is_aligned(ptr: *const f32) -> bool {
        let ptr = ptr as usize;

        ptr % core::mem::align_of::<__m128>() == 0
    }
}

impl From<&[f32]> for F32x4 {
    /// Loads a full vector from slices of at least 4 elements, a partial
    /// vector otherwise.
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

impl SimdLoad<f32> for F32x4 {
    type Output = Self;

    #[inline(always)]
    fn splat(value: f32) -> Self::Output {
        Self {
            elements: unsafe { _mm_set1_ps(value) },
            size: LANE_COUNT,
        }
    }

    /// Loads exactly 4 elements, dispatching on pointer alignment.
    ///
    /// # Safety
    ///
    /// Pointer must not be null and must point to at least 4 valid f32
    /// values.
    #[inline(always)]
    unsafe fn load(ptr: *const f32, size: usize) -> Self::Output {
        debug_assert!(size == LANE_COUNT, "Size must be == {LANE_COUNT}");
        debug_assert!(!ptr.is_null(), "Pointer must not be null");

        match F32x4::is_aligned(ptr) {
            true => unsafe { Self::load_aligned(ptr) },
            false => unsafe { Self::load_unaligned(ptr) },
        }
    }

    /// Loads 4 elements from 16-byte aligned memory with `_mm_load_ps`.
    ///
    /// # Safety
    ///
    /// Pointer must be 16-byte aligned and point to at least 4 valid f32
    /// values.
    #[inline(always)]
    unsafe fn load_aligned(ptr: *const f32) -> Self::Output {
        Self {
            elements: _mm_load_ps(ptr),
            size: LANE_COUNT,
        }
    }

    /// Loads 4 elements from unaligned memory with `_mm_loadu_ps`.
    ///
    /// # Safety
    ///
    /// Pointer must point to at least 4 valid f32 values.
    #[inline(always)]
    unsafe fn load_unaligned(ptr: *const f32) -> Self::Output {
        Self {
            elements: _mm_loadu_ps(ptr),
            size: LANE_COUNT,
        }
    }

    /// Loads fewer than 4 elements, zeroing the remaining lanes.
    ///
    /// SSE has no masked load, so the elements are staged through a zeroed
    /// stack buffer first.
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

        let mut staged = [0.0f32; LANE_COUNT];
        std::ptr::copy_nonoverlapping(ptr, staged.as_mut_ptr(), size);

        Self {
            elements: _mm_loadu_ps(staged.as_ptr()),
            size,
        }
    }
}

impl SimdStore<f32> for F32x4 {
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
            std::cmp::Ordering::Equal => match F32x4::is_aligned(ptr) {
                true => unsafe { self.store_aligned_at(ptr) },
                false => unsafe { self.store_unaligned_at(ptr) },
            },
            std::cmp::Ordering::Greater => unreachable!("Size cannot exceed LANE_COUNT"),
        }
    }

    /// Stores 4 elements to 16-byte aligned memory with `_mm_store_ps`.
    ///
    /// # Safety
    ///
    /// Pointer must be 16-byte aligned and point to at least 4 valid f32
    /// memory locations.
    #[inline(always)]
    unsafe fn store_aligned_at(&self, ptr: *mut f32) {
        _mm_store_ps(ptr, self.elements)
    }

    /// Stores 4 elements to unaligned memory with `_mm_storeu_ps`.
    ///
    /// # Safety
    ///
    /// Pointer must point to at least 4 valid f32 memory locations.
    #[inline(always)]
    unsafe fn store_unaligned_at(&self, ptr: *mut f32) {
        _mm_storeu_ps(ptr, self.elements)
    }

    /// Stores only the active lanes through a stack buffer.
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

        let mut staged = [0.0f32; LANE_COUNT];
        _mm_storeu_ps(staged.as_mut_ptr(), self.elements);
        std::ptr::copy_nonoverlapping(staged.as_ptr(), ptr, self.size);
    }
}

impl SimdFma for F32x4 {
    /// Computes `self * a + b` as a multiply followed by an add.
    ///
    /// The SSE4.1 baseline does not include the FMA extension, so the two
    /// roundings of mul-then-add are the best available here. This matches
    /// the scalar reference ordering, which keeps the equivalence check
    /// tight on SSE-only targets.
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
            elements: unsafe { _mm_add_ps(_mm_mul_ps(self.elements, a.elements), b.elements) },
        }
    }
}

/// Element-wise addition using `_mm_add_ps`.
impl Add for F32x4 {
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
            elements: unsafe { _mm_add_ps(self.elements, rhs.elements) },
        }
    }
}

/// Element-wise subtraction using `_mm_sub_ps`.
impl Sub for F32x4 {
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
            elements: unsafe { _mm_sub_ps(self.elements, rhs.elements) },
        }
    }
}

/// Element-wise multiplication using `_mm_mul_ps`.
impl Mul for F32x4 {
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
            elements: unsafe { _mm_mul_ps(self.elements, rhs.elements) },
        }
    }
}

/// Element-wise division using `_mm_div_ps`.
impl Div for F32x4 {
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
            elements: unsafe { _mm_div_ps(self.elements, rhs.elements) },
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

    fn extract_elements(vec: &F32x4) -> [f32; 4] {
        let mut result = [0.0f32; 4];
        unsafe {
            _mm_storeu_ps(result.as_mut_ptr(), vec.elements);
        }
        result
    }

    #[test]
    fn test_is_aligned_16_byte_boundary() {
        let aligned_ptr = alloc_aligned(4, 16);
        assert!(F32x4::is_aligned(aligned_ptr));
        assert!(!F32x4::is_aligned(unsafe { aligned_ptr.add(1) }));
        dealloc_aligned(aligned_ptr, 4, 16);
    }

    #[test]
    fn test_from_slice_full_and_partial() {
        let data = [1.0f32, 2.0, 3.0, 4.0];
        let vec = F32x4::from(data.as_slice());
        assert_eq!(vec.size, 4);
        assert_eq!(extract_elements(&vec), data);

        let partial = F32x4::from(&data[..3]);
        assert_eq!(partial.size, 3);
        let elements = extract_elements(&partial);
        assert_eq!(&elements[..3], &data[..3]);
        assert_eq!(elements[3], 0.0);
    }

    #[test]
    fn test_splat() {
        let vec = F32x4::splat(0.5);
        assert_eq!(extract_elements(&vec), [0.5; 4]);
    }

    #[test]
    fn test_aligned_load_store_roundtrip() {
        let src = alloc_aligned(4, 16);
        let dst = alloc_aligned(4, 16);
        let data = [1.5f32, -2.5, 3.5, -4.5];

        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), src, 4);
            let vec = F32x4::load_aligned(src);
            vec.store_aligned_at(dst);
            assert_eq!(std::slice::from_raw_parts(dst, 4), &data);
        }

        dealloc_aligned(src, 4, 16);
        dealloc_aligned(dst, 4, 16);
    }

    #[test]
    fn test_partial_store_leaves_tail_untouched() {
        for size in 1..4 {
            let data: Vec<f32> = (0..size).map(|i| (i + 1) as f32).collect();
            let vec = unsafe { F32x4::load_partial(data.as_ptr(), size) };

            let mut buffer = [9.0f32; 4];
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
    fn test_fmadd_matches_scalar() {
        let a = [0.5f32, -1.5, 2.0, 3.25];
        let b = [2.0f32, 3.0, -1.0, 0.5];
        let c = [1.0f32, -1.0, 0.0, 10.0];

        let result = extract_elements(
            &F32x4::from(a.as_slice()).fmadd(F32x4::from(b.as_slice()), F32x4::from(c.as_slice())),
        );

        for i in 0..4 {
            // mul-then-add here, so the scalar expression matches exactly
            assert_eq!(result[i], a[i] * b[i] + c[i], "lane {i}");
        }
    }

    #[test]
    fn test_operators() {
        let a = F32x4::from([2.0f32, 4.0, 6.0, 8.0].as_slice());
        let b = F32x4::from([2.0f32; 4].as_slice());

        assert_eq!(extract_elements(&(a + b)), [4.0, 6.0, 8.0, 10.0]);
        assert_eq!(extract_elements(&(a - b)), [0.0, 2.0, 4.0, 6.0]);
        assert_eq!(extract_elements(&(a * b)), [4.0, 8.0, 12.0, 16.0]);
        assert_eq!(extract_elements(&(a / b)), [1.0, 2.0, 3.0, 4.0]);
    }
}
