//! NEON 4-lane f32 SIMD vector implementation.

#[cfg(target_arch = "aarch64")]
use std::arch::aarch64::*;

use std::ops::{Add, Div, Mul, Sub};

use crate::simd::traits::{Alignment, SimdFma, SimdLoad, SimdStore};

/// Field-buffer alignment used on NEON targets, in bytes.
///
/// `vld1q_f32`/`vst1q_f32` accept any address, so this is a layout
/// convention rather than a hardware requirement.
pub const NEON_ALIGNMENT: usize = 16;

/// Number of f32 elements in a 128-bit NEON vector.
pub const LANE_COUNT: usize = 4;

/// NEON SIMD vector containing 4 packed f32 values.
#[derive(Copy, Clone, Debug)]
pub struct F32x4 {
    /// Number of valid elements in the vector (1-4)
    pub size: usize,
    /// NEON 128-bit vector register containing 4 packed f32 values
    pub elements: float32x4_t,
}

impl Alignment<f32> for F32x4 {
    #[inline(always)]
    fn is_aligned(ptr: *const f32) -> bool {
        let ptr = ptr as usize;

        ptr % NEON_ALIGNMENT == 0
    }
}

impl From<&[f32]> for F32x4 {
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
            elements: unsafe { vdupq_n_f32(value) },
            size: LANE_COUNT,
        }
    }

    /// Loads exactly 4 elements with `vld1q_f32`.
    ///
    /// # Safety
    ///
    /// Pointer must not be null and must point to at least 4 valid f32
    /// values.
    #[inline(always)]
    unsafe fn load(ptr: *const f32, size: usize) -> Self::Output {
        debug_assert!(size == LANE_COUNT, "Size must be == {LANE_COUNT}");
        debug_assert!(!ptr.is_null(), "Pointer must not be null");

        Self {
            elements: vld1q_f32(ptr),
            size,
        }
    }

    /// Same as `load_unaligned`; NEON has no strict aligned load form.
    ///
    /// # Safety
    ///
    /// Pointer must point to at least 4 valid f32 values.
    #[inline(always)]
    unsafe fn load_aligned(ptr: *const f32) -> Self::Output {
        Self {
            elements: vld1q_f32(ptr),
            size: LANE_COUNT,
        }
    }

    /// Loads 4 elements from memory of any alignment.
    ///
    /// # Safety
    ///
    /// Pointer must point to at least 4 valid f32 values.
    #[inline(always)]
    unsafe fn load_unaligned(ptr: *const f32) -> Self::Output {
        Self {
            elements: vld1q_f32(ptr),
            size: LANE_COUNT,
        }
    }

    /// Loads fewer than 4 elements lane by lane, zeroing the rest.
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

        let elements = match size {
            1 => {
                let v = vdupq_n_f32(0.0);
                vsetq_lane_f32(*ptr.add(0), v, 0)
            }
            2 => {
                let mut v = vdupq_n_f32(0.0);
                v = vsetq_lane_f32(*ptr.add(0), v, 0);
                vsetq_lane_f32(*ptr.add(1), v, 1)
            }
            3 => {
                let mut v = vdupq_n_f32(0.0);
                v = vsetq_lane_f32(*ptr.add(0), v, 0);
                v = vsetq_lane_f32(*ptr.add(1), v, 1);
                vsetq_lane_f32(*ptr.add(2), v, 2)
            }
            _ => unreachable!("Size must be < {}", LANE_COUNT),
        };

        Self { elements, size }
    }
}

impl SimdStore<f32> for F32x4 {
    /// Stores the active lanes with `vst1q_f32`, partial lanes one by one.
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
            std::cmp::Ordering::Equal => unsafe { self.store_unaligned_at(ptr) },
            std::cmp::Ordering::Greater => unreachable!("Size cannot exceed LANE_COUNT"),
        }
    }

    /// Same as `store_unaligned_at`; NEON has no strict aligned store form.
    ///
    /// # Safety
    ///
    /// Pointer must point to at least 4 valid f32 memory locations.
    #[inline(always)]
    unsafe fn store_aligned_at(&self, ptr: *mut f32) {
        vst1q_f32(ptr, self.elements)
    }

    /// Stores 4 elements to memory of any alignment.
    ///
    /// # Safety
    ///
    /// Pointer must point to at least 4 valid f32 memory locations.
    #[inline(always)]
    unsafe fn store_unaligned_at(&self, ptr: *mut f32) {
        vst1q_f32(ptr, self.elements)
    }

    /// Stores only the active lanes, one lane at a time.
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

        match self.size {
            1 => {
                *ptr.add(0) = vgetq_lane_f32(self.elements, 0);
            }
            2 => {
                *ptr.add(0) = vgetq_lane_f32(self.elements, 0);
                *ptr.add(1) = vgetq_lane_f32(self.elements, 1);
            }
            3 => {
                *ptr.add(0) = vgetq_lane_f32(self.elements, 0);
                *ptr.add(1) = vgetq_lane_f32(self.elements, 1);
                *ptr.add(2) = vgetq_lane_f32(self.elements, 2);
            }
            _ => unreachable!("Size must be < {}", LANE_COUNT),
        }
    }
}

impl SimdFma for F32x4 {
    /// Computes `self * a + b` with the fused `vfmaq_f32` instruction.
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
            // vfmaq_f32(acc, x, y) computes acc + x * y
            elements: unsafe { vfmaq_f32(b.elements, self.elements, a.elements) },
        }
    }
}

/// Element-wise addition using `vaddq_f32`.
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
            elements: unsafe { vaddq_f32(self.elements, rhs.elements) },
        }
    }
}

/// Element-wise subtraction using `vsubq_f32`.
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
            elements: unsafe { vsubq_f32(self.elements, rhs.elements) },
        }
    }
}

/// Element-wise multiplication using `vmulq_f32`.
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
            elements: unsafe { vmulq_f32(self.elements, rhs.elements) },
        }
    }
}

/// Element-wise division using `vdivq_f32`.
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
            elements: unsafe { vdivq_f32(self.elements, rhs.elements) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract_elements(vec: &F32x4) -> [f32; 4] {
        let mut result = [0.0f32; 4];
        unsafe {
            vst1q_f32(result.as_mut_ptr(), vec.elements);
        }
        result
    }

    #[test]
    fn test_from_slice_full_and_partial() {
        let data = [1.0f32, 2.0, 3.0, 4.0];
        let vec = F32x4::from(data.as_slice());
        assert_eq!(vec.size, 4);
        assert_eq!(extract_elements(&vec), data);

        let partial = F32x4::from(&data[..2]);
        assert_eq!(partial.size, 2);
        let elements = extract_elements(&partial);
        assert_eq!(&elements[..2], &data[..2]);
        assert_eq!(&elements[2..], &[0.0, 0.0]);
    }

    #[test]
    fn test_splat() {
        let vec = F32x4::splat(1.0 / 60.0);
        assert_eq!(extract_elements(&vec), [1.0 / 60.0; 4]);
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
    fn test_fmadd_matches_scalar_mul_add() {
        let a = [0.5f32, -1.5, 2.0, 3.25];
        let b = [2.0f32, 3.0, -1.0, 0.5];
        let c = [1.0f32, -1.0, 0.0, 10.0];

        let result = extract_elements(
            &F32x4::from(a.as_slice()).fmadd(F32x4::from(b.as_slice()), F32x4::from(c.as_slice())),
        );

        for i in 0..4 {
            let expected = a[i].mul_add(b[i], c[i]);
            assert!(
                (result[i] - expected).abs() <= f32::EPSILON * expected.abs().max(1.0),
                "lane {i}: {} vs {expected}",
                result[i]
            );
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
