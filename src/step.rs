//! Semi-implicit (symplectic) Euler integration over a particle ensemble.
//!
//! One fixed timestep, applied once to every particle:
//!
//! ```text
//! v_new = v_old + a * dt
//! p_new = p_old + (v_new + v_old) * (dt / 2)
//! ```
//!
//! per axis, per particle. The velocity used in the position update is the
//! average of the values before and after the velocity update, so the old
//! velocity must be captured before the stored one is overwritten.
//!
//! Three realizations of the identical algorithm:
//!
//! - [`scalar_step`] walks the AoS layout one particle at a time and is the
//!   reference whose output the harness treats as ground truth.
//! - [`simd_step`] walks the SoA layout in [`LANE_COUNT`]-wide batches with
//!   aligned vector loads/stores and fused multiply-add; a trailing
//!   remainder shorter than one batch goes through the scalar formula
//!   elementwise.
//! - [`par_simd_step`] fans the batched kernel across rayon workers in
//!   chunks that are multiples of the batch width.
//!
//! The scalar and vector paths may disagree in their last bits because of
//! operation ordering and FMA fusion, which is exactly why the harness
//! compares them within an absolute epsilon rather than bit-exactly.

use rayon::prelude::*;

use crate::ensemble::{AosEnsemble, SoaEnsemble};
use crate::simd::traits::{SimdFma, SimdLoad, SimdStore};
use crate::simd::{WideF32, LANE_COUNT};

/// Fixed timestep for the whole run.
pub const DT: f32 = 1.0 / 60.0;

/// Derived half-step constant used by the position update.
pub const DT_HALF: f32 = DT / 2.0;

/// Particles per rayon work item in [`par_simd_step`].
///
/// Must stay a multiple of every supported `LANE_COUNT` so chunk base
/// addresses keep the register alignment of the underlying planes.
const PARALLEL_CHUNK: usize = 16 * 1024;

/// Advances every particle of the AoS ensemble by one timestep.
///
/// This is the scalar reference path. The previous velocity is copied out
/// before the stored velocity is updated; reusing the updated value in the
/// position update would change the numerical result.
pub fn scalar_step(ensemble: &mut AosEnsemble) {
    for i in 0..ensemble.len() {
        let prev = ensemble.velocities[i];

        let delta_vel_x = ensemble.accelerations[i].ddx * DT;
        let delta_vel_y = ensemble.accelerations[i].ddy * DT;
        let delta_vel_z = ensemble.accelerations[i].ddz * DT;
        ensemble.velocities[i].dx += delta_vel_x;
        ensemble.velocities[i].dy += delta_vel_y;
        ensemble.velocities[i].dz += delta_vel_z;

        let summed_vel_x = ensemble.velocities[i].dx + prev.dx;
        let summed_vel_y = ensemble.velocities[i].dy + prev.dy;
        let summed_vel_z = ensemble.velocities[i].dz + prev.dz;
        ensemble.positions[i].x += summed_vel_x * DT_HALF;
        ensemble.positions[i].y += summed_vel_y * DT_HALF;
        ensemble.positions[i].z += summed_vel_z * DT_HALF;
    }
}

/// Advances one span of SoA field planes: full batches through the vector
/// registers, then the remainder through the scalar formula.
///
/// All six mutable slices and three acceleration slices must have the same
/// length. Slice bases must keep the planes' register alignment, which
/// holds for whole planes and for chunks cut at multiples of `LANE_COUNT`.
#[allow(clippy::too_many_arguments)]
fn step_block(
    pos_x: &mut [f32],
    pos_y: &mut [f32],
    pos_z: &mut [f32],
    vel_dx: &mut [f32],
    vel_dy: &mut [f32],
    vel_dz: &mut [f32],
    acc_ddx: &[f32],
    acc_ddy: &[f32],
    acc_ddz: &[f32],
) {
    let n = pos_x.len();
    debug_assert!(
        [
            pos_y.len(),
            pos_z.len(),
            vel_dx.len(),
            vel_dy.len(),
            vel_dz.len(),
            acc_ddx.len(),
            acc_ddy.len(),
            acc_ddz.len(),
        ]
        .iter()
        .all(|&len| len == n),
        "field planes must have equal lengths"
    );

    let dt = WideF32::splat(DT);
    let dt_half = WideF32::splat(DT_HALF);

    let batched = n - n % LANE_COUNT;

    for i in (0..batched).step_by(LANE_COUNT) {
        unsafe {
            let pos_x_w = WideF32::load_aligned(pos_x.as_ptr().add(i));
            let pos_y_w = WideF32::load_aligned(pos_y.as_ptr().add(i));
            let pos_z_w = WideF32::load_aligned(pos_z.as_ptr().add(i));
            let prev_vel_x = WideF32::load_aligned(vel_dx.as_ptr().add(i));
            let prev_vel_y = WideF32::load_aligned(vel_dy.as_ptr().add(i));
            let prev_vel_z = WideF32::load_aligned(vel_dz.as_ptr().add(i));
            let acc_x = WideF32::load_aligned(acc_ddx.as_ptr().add(i));
            let acc_y = WideF32::load_aligned(acc_ddy.as_ptr().add(i));
            let acc_z = WideF32::load_aligned(acc_ddz.as_ptr().add(i));

            // vel += acc * dt
            let vel_x = acc_x.fmadd(dt, prev_vel_x);
            let vel_y = acc_y.fmadd(dt, prev_vel_y);
            let vel_z = acc_z.fmadd(dt, prev_vel_z);

            // pos += (vel + prev_vel) * (dt / 2)
            let pos_x_w = (vel_x + prev_vel_x).fmadd(dt_half, pos_x_w);
            let pos_y_w = (vel_y + prev_vel_y).fmadd(dt_half, pos_y_w);
            let pos_z_w = (vel_z + prev_vel_z).fmadd(dt_half, pos_z_w);

            vel_x.store_aligned_at(vel_dx.as_mut_ptr().add(i));
            vel_y.store_aligned_at(vel_dy.as_mut_ptr().add(i));
            vel_z.store_aligned_at(vel_dz.as_mut_ptr().add(i));
            pos_x_w.store_aligned_at(pos_x.as_mut_ptr().add(i));
            pos_y_w.store_aligned_at(pos_y.as_mut_ptr().add(i));
            pos_z_w.store_aligned_at(pos_z.as_mut_ptr().add(i));
        }
    }

    // Trailing remainder shorter than one batch: the scalar formula applied
    // elementwise to the leftover indices.
    for i in batched..n {
        let prev_dx = vel_dx[i];
        let prev_dy = vel_dy[i];
        let prev_dz = vel_dz[i];

        vel_dx[i] += acc_ddx[i] * DT;
        vel_dy[i] += acc_ddy[i] * DT;
        vel_dz[i] += acc_ddz[i] * DT;

        pos_x[i] += (vel_dx[i] + prev_dx) * DT_HALF;
        pos_y[i] += (vel_dy[i] + prev_dy) * DT_HALF;
        pos_z[i] += (vel_dz[i] + prev_dz) * DT_HALF;
    }
}

/// Advances every particle of the SoA ensemble by one timestep using the
/// vector registers of the compile-time selected instruction set.
pub fn simd_step(ensemble: &mut SoaEnsemble) {
    step_block(
        &mut ensemble.positions.x,
        &mut ensemble.positions.y,
        &mut ensemble.positions.z,
        &mut ensemble.velocities.dx,
        &mut ensemble.velocities.dy,
        &mut ensemble.velocities.dz,
        &ensemble.accelerations.ddx,
        &ensemble.accelerations.ddy,
        &ensemble.accelerations.ddz,
    );
}

/// Advances every particle of the SoA ensemble, fanning batches across the
/// rayon thread pool.
///
/// Small ensembles fall through to the single-threaded kernel, where the
/// parallel dispatch overhead exceeds any benefit.
pub fn par_simd_step(ensemble: &mut SoaEnsemble) {
    if ensemble.len() <= PARALLEL_CHUNK {
        return simd_step(ensemble);
    }

    (
        ensemble.positions.x.par_chunks_mut(PARALLEL_CHUNK),
        ensemble.positions.y.par_chunks_mut(PARALLEL_CHUNK),
        ensemble.positions.z.par_chunks_mut(PARALLEL_CHUNK),
        ensemble.velocities.dx.par_chunks_mut(PARALLEL_CHUNK),
        ensemble.velocities.dy.par_chunks_mut(PARALLEL_CHUNK),
        ensemble.velocities.dz.par_chunks_mut(PARALLEL_CHUNK),
        ensemble.accelerations.ddx.par_chunks(PARALLEL_CHUNK),
        ensemble.accelerations.ddy.par_chunks(PARALLEL_CHUNK),
        ensemble.accelerations.ddz.par_chunks(PARALLEL_CHUNK),
    )
        .into_par_iter()
        .for_each(|(px, py, pz, vdx, vdy, vdz, addx, addy, addz)| {
            step_block(px, py, pz, vdx, vdy, vdz, addx, addy, addz);
        });
}
