//! Alignment guarantees of the SoA field planes.
//!
//! The batched kernel uses the strict aligned forms of the vector loads and
//! stores, which fault on a misaligned address. Rather than provoking that
//! undefined behavior, these tests validate the address modulo contract of
//! every plane directly.

use rand::rngs::StdRng;
use rand::SeedableRng;

use simdstep::ensemble::{generate, SoaEnsemble};
use simdstep::simd::{LANE_COUNT, VECTOR_ALIGNMENT};
use simdstep::utils::AlignedVec;

fn assert_plane_aligned(ptr: *const f32, name: &str) {
    assert_eq!(
        ptr as usize % VECTOR_ALIGNMENT,
        0,
        "{name} plane base address not {VECTOR_ALIGNMENT}-byte aligned"
    );
}

fn assert_all_planes_aligned(soa: &SoaEnsemble) {
    assert_plane_aligned(soa.positions.x.as_ptr(), "pos.x");
    assert_plane_aligned(soa.positions.y.as_ptr(), "pos.y");
    assert_plane_aligned(soa.positions.z.as_ptr(), "pos.z");
    assert_plane_aligned(soa.velocities.dx.as_ptr(), "vel.dx");
    assert_plane_aligned(soa.velocities.dy.as_ptr(), "vel.dy");
    assert_plane_aligned(soa.velocities.dz.as_ptr(), "vel.dz");
    assert_plane_aligned(soa.accelerations.ddx.as_ptr(), "acc.ddx");
    assert_plane_aligned(soa.accelerations.ddy.as_ptr(), "acc.ddy");
    assert_plane_aligned(soa.accelerations.ddz.as_ptr(), "acc.ddz");
}

#[test]
fn test_alignment_matches_register_width() {
    // The alignment boundary is exactly one register's worth of f32 lanes
    assert_eq!(VECTOR_ALIGNMENT, LANE_COUNT * std::mem::size_of::<f32>());
}

#[test]
fn test_allocated_planes_are_aligned() {
    // Odd sizes included: alignment is a property of the base address, not
    // of the element count
    for n in [1usize, 3, LANE_COUNT, LANE_COUNT * 100 + 1, 12_345] {
        let soa = SoaEnsemble::allocate(n).unwrap();
        assert_all_planes_aligned(&soa);
        assert_eq!(soa.len(), n);
    }
}

#[test]
fn test_generated_planes_are_aligned() {
    let mut rng = StdRng::seed_from_u64(11);
    let (_, soa) = generate(997, &mut rng).unwrap();
    assert_all_planes_aligned(&soa);
}

#[test]
fn test_cloned_planes_keep_alignment() {
    let soa = SoaEnsemble::allocate(100).unwrap();
    let copy = soa.clone();
    assert_all_planes_aligned(&copy);
}

#[test]
fn test_aligned_vec_rejects_bad_layouts() {
    assert!(AlignedVec::<f32>::new_zeroed(0, VECTOR_ALIGNMENT).is_err());
    assert!(AlignedVec::<f32>::new_zeroed(16, 24).is_err());
    assert!(AlignedVec::<f32>::new_zeroed(16, 2).is_err());
}

#[test]
fn test_zero_size_ensemble_rejected() {
    assert!(SoaEnsemble::allocate(0).is_err());
}
