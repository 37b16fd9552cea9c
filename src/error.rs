//! Error types for simdstep operations.
//!
//! This module defines custom error types that provide better error handling
//! than panicking, allowing the harness to report and exit cleanly on failure.

use std::fmt;

/// Errors that can occur during simdstep operations.
#[derive(Debug, Clone, PartialEq)]
pub enum SimdstepError {
    /// Memory allocation failed.
    AllocationError {
        /// The size that was requested to be allocated.
        requested_size: usize,
        /// The alignment that was requested.
        requested_alignment: usize,
        /// Human-readable error message.
        message: String,
    },
    /// Invalid layout parameters were provided.
    LayoutError {
        /// The size parameter that caused the error.
        size: usize,
        /// The alignment parameter that caused the error.
        alignment: usize,
        /// Human-readable error message.
        message: String,
    },
    /// Input validation error.
    ValidationError {
        /// Human-readable error message.
        message: String,
    },
    /// The scalar and vector integration results diverged beyond tolerance.
    DivergenceError {
        /// Particle index at which the first divergence was found.
        index: usize,
        /// Name of the first field that diverged at that index.
        field: &'static str,
        /// Value produced by the scalar reference path.
        scalar: f32,
        /// Value produced by the vectorized path.
        vector: f32,
        /// Absolute tolerance that was exceeded.
        tolerance: f32,
    },
}

impl fmt::Display for SimdstepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimdstepError::AllocationError {
                requested_size,
                requested_alignment,
                message,
            } => write!(
                f,
                "Memory allocation failed: {} (requested {} bytes with {} byte alignment)",
                message, requested_size, requested_alignment
            ),
            SimdstepError::LayoutError {
                size,
                alignment,
                message,
            } => write!(
                f,
                "Invalid memory layout: {} (size: {}, alignment: {})",
                message, size, alignment
            ),
            SimdstepError::ValidationError { message } => {
                write!(f, "Validation error: {}", message)
            }
            SimdstepError::DivergenceError {
                index,
                field,
                scalar,
                vector,
                tolerance,
            } => write!(
                f,
                "Results diverged at particle {}: {} scalar={} vector={} (tolerance {})",
                index, field, scalar, vector, tolerance
            ),
        }
    }
}

impl std::error::Error for SimdstepError {}

/// Result type alias for simdstep operations.
pub type Result<T> = std::result::Result<T, SimdstepError>;

/// Creates an allocation error.
pub fn allocation_error(size: usize, alignment: usize, message: impl Into<String>) -> SimdstepError {
    SimdstepError::AllocationError {
        requested_size: size,
        requested_alignment: alignment,
        message: message.into(),
    }
}

/// Creates a layout error.
pub fn layout_error(size: usize, alignment: usize, message: impl Into<String>) -> SimdstepError {
    SimdstepError::LayoutError {
        size,
        alignment,
        message: message.into(),
    }
}

/// Creates a validation error.
pub fn validation_error(message: impl Into<String>) -> SimdstepError {
    SimdstepError::ValidationError {
        message: message.into(),
    }
}

/// Creates a divergence error for the first failing field of a particle.
pub fn divergence_error(
    index: usize,
    field: &'static str,
    scalar: f32,
    vector: f32,
    tolerance: f32,
) -> SimdstepError {
    SimdstepError::DivergenceError {
        index,
        field,
        scalar,
        vector,
        tolerance,
    }
}
