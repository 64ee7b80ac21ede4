// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;

/// Errors that can occur during solver setup, tent pitching, or a slab solve.
#[derive(Debug)]
pub enum SolveError {
    /// Spatial dimension is not supported (only 1 and 2 are defined).
    UnsupportedDimension(usize),
    /// Polynomial order is invalid (must be >= 1).
    InvalidOrder(usize),
    /// Wavespeed is not positive and finite.
    InvalidWavespeed(f64),
    /// Slab height is not positive and finite.
    InvalidSlabHeight(f64),
    /// The mesh has no elements.
    EmptyMesh,
    /// A tent face degenerated to zero or non-finite area.
    DegenerateFace {
        /// The tent's anchor vertex id.
        vertex: usize,
        /// The mesh element the face belongs to.
        element: usize,
    },
    /// The local tent system is singular or nearly singular.
    SingularSystem {
        /// Index of the tent whose solve failed.
        tent: usize,
    },
    /// Tent pitching could not advance a vertex front (mesh/wavespeed mismatch).
    PitchingStalled {
        /// The vertex whose front stalled.
        vertex: usize,
    },
    /// The dependency graph contains a cycle; the schedule cannot complete.
    CyclicDependency {
        /// Number of tents that were processed before the stall.
        processed: usize,
        /// Total number of tents in the slab.
        total: usize,
    },
    /// An input wavefront's length does not match the mesh and quadrature rule.
    WavefrontMismatch {
        /// Expected buffer length.
        expected: usize,
        /// Length of the buffer provided.
        got: usize,
    },
    /// Other error with a descriptive message.
    Other(String),
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveError::UnsupportedDimension(d) => {
                write!(f, "unsupported spatial dimension: {} (must be 1 or 2)", d)
            }
            SolveError::InvalidOrder(p) => {
                write!(f, "invalid polynomial order: {} (must be >= 1)", p)
            }
            SolveError::InvalidWavespeed(c) => {
                write!(f, "invalid wavespeed: {} (must be positive and finite)", c)
            }
            SolveError::InvalidSlabHeight(dt) => {
                write!(
                    f,
                    "invalid slab height: {} (must be positive and finite)",
                    dt
                )
            }
            SolveError::EmptyMesh => write!(f, "mesh has no elements"),
            SolveError::DegenerateFace { vertex, element } => {
                write!(
                    f,
                    "degenerate tent face at vertex {} on element {}",
                    vertex, element
                )
            }
            SolveError::SingularSystem { tent } => {
                write!(f, "singular local system in tent {}", tent)
            }
            SolveError::PitchingStalled { vertex } => {
                write!(f, "tent pitching stalled at vertex {}", vertex)
            }
            SolveError::CyclicDependency { processed, total } => {
                write!(
                    f,
                    "dependency cycle: only {} of {} tents could be scheduled",
                    processed, total
                )
            }
            SolveError::WavefrontMismatch { expected, got } => {
                write!(
                    f,
                    "wavefront length mismatch: expected {}, got {}",
                    expected, got
                )
            }
            SolveError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SolveError {}

/// Convenience type alias for Results with SolveError.
pub type Result<T> = std::result::Result<T, SolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unsupported_dimension() {
        let e = SolveError::UnsupportedDimension(3);
        assert_eq!(
            e.to_string(),
            "unsupported spatial dimension: 3 (must be 1 or 2)"
        );
    }

    #[test]
    fn display_singular_system() {
        let e = SolveError::SingularSystem { tent: 17 };
        assert_eq!(e.to_string(), "singular local system in tent 17");
    }

    #[test]
    fn display_cyclic_dependency() {
        let e = SolveError::CyclicDependency {
            processed: 3,
            total: 9,
        };
        assert_eq!(
            e.to_string(),
            "dependency cycle: only 3 of 9 tents could be scheduled"
        );
    }

    #[test]
    fn display_degenerate_face() {
        let e = SolveError::DegenerateFace {
            vertex: 2,
            element: 5,
        };
        assert_eq!(
            e.to_string(),
            "degenerate tent face at vertex 2 on element 5"
        );
    }

    #[test]
    fn display_wavefront_mismatch() {
        let e = SolveError::WavefrontMismatch {
            expected: 120,
            got: 60,
        };
        assert_eq!(
            e.to_string(),
            "wavefront length mismatch: expected 120, got 60"
        );
    }
}
