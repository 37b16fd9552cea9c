//! Dual-layout particle ensemble storage.
//!
//! The same N particles are held in two representations seeded from
//! identical values: an array-of-structures layout ([`AosEnsemble`])
//! consumed by the scalar integrator, and a structure-of-arrays layout
//! ([`SoaEnsemble`]) whose nine field planes are contiguous, register-width
//! aligned buffers consumed by the vectorized integrator. After both
//! integrators run, [`verify_equivalence`] compares every field of every
//! particle within an absolute tolerance.

use rand::Rng;

use crate::error::{divergence_error, validation_error, Result};
use crate::simd::VECTOR_ALIGNMENT;
use crate::utils::AlignedVec;

/// Position components are drawn uniformly from `[-POSITION_BOUND, POSITION_BOUND]`.
pub const POSITION_BOUND: f32 = 100_000.0;

/// Velocity components are drawn uniformly from `[-VELOCITY_BOUND, VELOCITY_BOUND]`.
pub const VELOCITY_BOUND: f32 = 100.0;

/// Acceleration components are drawn uniformly from `[-ACCELERATION_BOUND, ACCELERATION_BOUND]`.
pub const ACCELERATION_BOUND: f32 = 10.0;

/// Particle position in three dimensions.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Particle velocity in three dimensions.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
    pub dz: f32,
}

/// Particle acceleration in three dimensions.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Acceleration {
    pub ddx: f32,
    pub ddy: f32,
    pub ddz: f32,
}

/// Array-of-structures layout: one record sequence per field group, index
/// `i` in each sequence referring to the same particle.
///
/// This is the layout the scalar reference integrator walks particle by
/// particle.
#[derive(Clone, Debug)]
pub struct AosEnsemble {
    pub positions: Vec<Position>,
    pub velocities: Vec<Velocity>,
    pub accelerations: Vec<Acceleration>,
}

impl AosEnsemble {
    /// Number of particles in the ensemble.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Structure-of-arrays position planes.
#[derive(Clone, Debug)]
pub struct SoaPositions {
    pub x: AlignedVec<f32>,
    pub y: AlignedVec<f32>,
    pub z: AlignedVec<f32>,
}

/// Structure-of-arrays velocity planes.
#[derive(Clone, Debug)]
pub struct SoaVelocities {
    pub dx: AlignedVec<f32>,
    pub dy: AlignedVec<f32>,
    pub dz: AlignedVec<f32>,
}

/// Structure-of-arrays acceleration planes.
#[derive(Clone, Debug)]
pub struct SoaAccelerations {
    pub ddx: AlignedVec<f32>,
    pub ddy: AlignedVec<f32>,
    pub ddz: AlignedVec<f32>,
}

/// Structure-of-arrays layout: nine flat field planes of length N, each
/// starting on a [`VECTOR_ALIGNMENT`] boundary so the strict aligned vector
/// loads and stores of the batched integrator are legal on every batch
/// offset.
#[derive(Clone, Debug)]
pub struct SoaEnsemble {
    pub positions: SoaPositions,
    pub velocities: SoaVelocities,
    pub accelerations: SoaAccelerations,
}

impl SoaEnsemble {
    /// Reserves the nine aligned field planes for `n` particles.
    ///
    /// # Errors
    ///
    /// Returns a layout error for `n == 0` and an allocation error if any
    /// plane cannot be allocated on the register boundary. Planes already
    /// allocated are released on the error path.
    pub fn allocate(n: usize) -> Result<Self> {
        let plane = || AlignedVec::<f32>::new_zeroed(n, VECTOR_ALIGNMENT);

        Ok(SoaEnsemble {
            positions: SoaPositions {
                x: plane()?,
                y: plane()?,
                z: plane()?,
            },
            velocities: SoaVelocities {
                dx: plane()?,
                dy: plane()?,
                dz: plane()?,
            },
            accelerations: SoaAccelerations {
                ddx: plane()?,
                ddy: plane()?,
                ddz: plane()?,
            },
        })
    }

    /// Number of particles in the ensemble.
    pub fn len(&self) -> usize {
        self.positions.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.x.is_empty()
    }
}

/// Generates `n` particles with randomized initial state and mirrors them
/// into both layouts.
///
/// Every one of the nine scalar fields is drawn independently from its
/// range, so axes are uncorrelated. The generator instance is constructed
/// and seeded by the caller, which makes reproducibility an explicit
/// contract: the same seeded generator produces byte-identical ensembles.
///
/// # Errors
///
/// Returns a validation error for `n == 0` and propagates aligned
/// allocation failures.
pub fn generate<R: Rng>(n: usize, rng: &mut R) -> Result<(AosEnsemble, SoaEnsemble)> {
    if n == 0 {
        return Err(validation_error("ensemble size must be positive"));
    }

    let mut soa = SoaEnsemble::allocate(n)?;

    let mut aos = AosEnsemble {
        positions: Vec::with_capacity(n),
        velocities: Vec::with_capacity(n),
        accelerations: Vec::with_capacity(n),
    };

    for i in 0..n {
        let position = Position {
            x: rng.random_range(-POSITION_BOUND..=POSITION_BOUND),
            y: rng.random_range(-POSITION_BOUND..=POSITION_BOUND),
            z: rng.random_range(-POSITION_BOUND..=POSITION_BOUND),
        };
        let velocity = Velocity {
            dx: rng.random_range(-VELOCITY_BOUND..=VELOCITY_BOUND),
            dy: rng.random_range(-VELOCITY_BOUND..=VELOCITY_BOUND),
            dz: rng.random_range(-VELOCITY_BOUND..=VELOCITY_BOUND),
        };
        let acceleration = Acceleration {
            ddx: rng.random_range(-ACCELERATION_BOUND..=ACCELERATION_BOUND),
            ddy: rng.random_range(-ACCELERATION_BOUND..=ACCELERATION_BOUND),
            ddz: rng.random_range(-ACCELERATION_BOUND..=ACCELERATION_BOUND),
        };

        aos.positions.push(position);
        aos.velocities.push(velocity);
        aos.accelerations.push(acceleration);

        soa.positions.x[i] = position.x;
        soa.positions.y[i] = position.y;
        soa.positions.z[i] = position.z;
        soa.velocities.dx[i] = velocity.dx;
        soa.velocities.dy[i] = velocity.dy;
        soa.velocities.dz[i] = velocity.dz;
        soa.accelerations.ddx[i] = acceleration.ddx;
        soa.accelerations.ddy[i] = acceleration.ddy;
        soa.accelerations.ddz[i] = acceleration.ddz;
    }

    Ok((aos, soa))
}

/// Absolute-tolerance scalar equality.
#[inline(always)]
fn within(a: f32, b: f32, epsilon: f32) -> bool {
    (a - b).abs() <= epsilon
}

/// Compares every field of every particle between the two layouts.
///
/// The tolerance is absolute, not relative: field magnitudes span four
/// orders of magnitude between accelerations and positions, and the check
/// deliberately keeps the single loose bound the harness has always used.
///
/// On the first particle with any divergent field, all nine field pairs of
/// that particle are printed to stderr before the error is returned, so the
/// diverging operands are visible even when the caller only reports the
/// first field.
///
/// # Errors
///
/// Returns a validation error if the two layouts hold different particle
/// counts, and a divergence error naming the first failing index and field
/// otherwise.
pub fn verify_equivalence(aos: &AosEnsemble, soa: &SoaEnsemble, epsilon: f32) -> Result<()> {
    if aos.len() != soa.len() {
        return Err(validation_error(format!(
            "layouts hold different particle counts ({} vs {})",
            aos.len(),
            soa.len()
        )));
    }

    for i in 0..aos.len() {
        let pairs: [(&'static str, f32, f32); 9] = [
            ("pos.x", aos.positions[i].x, soa.positions.x[i]),
            ("pos.y", aos.positions[i].y, soa.positions.y[i]),
            ("pos.z", aos.positions[i].z, soa.positions.z[i]),
            ("vel.dx", aos.velocities[i].dx, soa.velocities.dx[i]),
            ("vel.dy", aos.velocities[i].dy, soa.velocities.dy[i]),
            ("vel.dz", aos.velocities[i].dz, soa.velocities.dz[i]),
            ("acc.ddx", aos.accelerations[i].ddx, soa.accelerations.ddx[i]),
            ("acc.ddy", aos.accelerations[i].ddy, soa.accelerations.ddy[i]),
            ("acc.ddz", aos.accelerations[i].ddz, soa.accelerations.ddz[i]),
        ];

        if let Some(&(field, a, b)) = pairs.iter().find(|(_, a, b)| !within(*a, *b, epsilon)) {
            eprintln!("particle {i} diverged beyond epsilon {epsilon}:");
            for (name, scalar, vector) in pairs {
                eprintln!("  {name:<8} scalar = {scalar:<16} vector = {vector}");
            }
            return Err(divergence_error(i, field, a, b, epsilon));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_rejects_zero_particles() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(generate(0, &mut rng).is_err());
    }

    #[test]
    fn test_generated_fields_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let (aos, _) = generate(256, &mut rng).unwrap();

        for p in &aos.positions {
            for v in [p.x, p.y, p.z] {
                assert!((-POSITION_BOUND..=POSITION_BOUND).contains(&v));
            }
        }
        for v in &aos.velocities {
            for c in [v.dx, v.dy, v.dz] {
                assert!((-VELOCITY_BOUND..=VELOCITY_BOUND).contains(&c));
            }
        }
        for a in &aos.accelerations {
            for c in [a.ddx, a.ddy, a.ddz] {
                assert!((-ACCELERATION_BOUND..=ACCELERATION_BOUND).contains(&c));
            }
        }
    }

    #[test]
    fn test_layouts_mirror_each_other_at_generation() {
        let mut rng = StdRng::seed_from_u64(99);
        let (aos, soa) = generate(100, &mut rng).unwrap();

        for i in 0..100 {
            assert_eq!(aos.positions[i].x, soa.positions.x[i]);
            assert_eq!(aos.positions[i].y, soa.positions.y[i]);
            assert_eq!(aos.positions[i].z, soa.positions.z[i]);
            assert_eq!(aos.velocities[i].dx, soa.velocities.dx[i]);
            assert_eq!(aos.velocities[i].dy, soa.velocities.dy[i]);
            assert_eq!(aos.velocities[i].dz, soa.velocities.dz[i]);
            assert_eq!(aos.accelerations[i].ddx, soa.accelerations.ddx[i]);
            assert_eq!(aos.accelerations[i].ddy, soa.accelerations.ddy[i]);
            assert_eq!(aos.accelerations[i].ddz, soa.accelerations.ddz[i]);
        }
    }

    #[test]
    fn test_equal_ensembles_verify() {
        let mut rng = StdRng::seed_from_u64(3);
        let (aos, soa) = generate(64, &mut rng).unwrap();
        assert!(verify_equivalence(&aos, &soa, 0.0).is_ok());
    }

    #[test]
    fn test_divergence_is_detected_and_located() {
        let mut rng = StdRng::seed_from_u64(3);
        let (aos, mut soa) = generate(64, &mut rng).unwrap();

        soa.velocities.dy[17] += 1.0;

        let err = verify_equivalence(&aos, &soa, 0.1).unwrap_err();
        match err {
            crate::error::SimdstepError::DivergenceError { index, field, .. } => {
                assert_eq!(index, 17);
                assert_eq!(field, "vel.dy");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_divergence_within_epsilon_passes() {
        let mut rng = StdRng::seed_from_u64(3);
        let (aos, mut soa) = generate(64, &mut rng).unwrap();

        soa.positions.z[5] += 0.05;

        assert!(verify_equivalence(&aos, &soa, 0.1).is_ok());
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let mut rng = StdRng::seed_from_u64(3);
        let (aos, _) = generate(64, &mut rng).unwrap();
        let (_, soa) = generate(32, &mut rng).unwrap();

        assert!(verify_equivalence(&aos, &soa, 0.1).is_err());
    }
}
