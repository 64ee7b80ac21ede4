// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! The wavefront: solution traces on a time-slab boundary.
//!
//! For every (element, quadrature point) pair the buffer holds D+2 values:
//! the solution value, the D spatial gradient components *stored negated*,
//! and the time derivative. Tents read their elements' samples as bottom
//! boundary data and overwrite them with the top-face trace, so the buffer
//! is shared mutable state across concurrently running tents. Slots are
//! `AtomicU64` bit-casts of `f64`; per-slot ordering is relaxed because the
//! scheduler's dependency counters provide the acquire/release edge between
//! a tent and its successors, and the dependency graph guarantees that no
//! two concurrent tents touch the same slot.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Result, SolveError};
use crate::mesh::MeshAccess;
use crate::quadrature::QuadratureRule;

/// Solution trace at one quadrature point: value, negated spatial
/// gradient, time derivative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavefrontSample<const D: usize> {
    /// Solution value u.
    pub value: f64,
    /// Spatial gradient components, stored as -du/dx_i.
    pub gradient: [f64; D],
    /// Time derivative du/dt.
    pub time_derivative: f64,
}

impl<const D: usize> WavefrontSample<D> {
    /// A zero trace.
    pub fn zero() -> Self {
        WavefrontSample {
            value: 0.0,
            gradient: [0.0; D],
            time_derivative: 0.0,
        }
    }
}

/// Solution traces for a whole time-slab boundary, indexed by
/// `(element, quadrature point)`.
pub struct WavefrontBuffer<const D: usize> {
    data: Box<[AtomicU64]>,
    num_elements: usize,
    samples_per_element: usize,
    time: f64,
}

impl<const D: usize> WavefrontBuffer<D> {
    /// Record size per quadrature point.
    pub const RECORD: usize = D + 2;

    /// Zero-initialized buffer representing the slab boundary at `time`.
    pub fn new(num_elements: usize, samples_per_element: usize, time: f64) -> Self {
        let len = num_elements * samples_per_element * Self::RECORD;
        let data: Box<[AtomicU64]> = (0..len).map(|_| AtomicU64::new(0)).collect();
        WavefrontBuffer {
            data,
            num_elements,
            samples_per_element,
            time,
        }
    }

    /// Rebuild a buffer from flat values (record-major layout).
    ///
    /// # Errors
    /// Returns an error if the length does not match the mesh and rule.
    pub fn from_values(
        values: Vec<f64>,
        num_elements: usize,
        samples_per_element: usize,
        time: f64,
    ) -> Result<Self> {
        let expected = num_elements * samples_per_element * Self::RECORD;
        if values.len() != expected {
            return Err(SolveError::WavefrontMismatch {
                expected,
                got: values.len(),
            });
        }
        let data: Box<[AtomicU64]> = values.iter().map(|v| AtomicU64::new(v.to_bits())).collect();
        Ok(WavefrontBuffer {
            data,
            num_elements,
            samples_per_element,
            time,
        })
    }

    /// Number of mesh elements covered.
    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    /// Quadrature points per element.
    pub fn samples_per_element(&self) -> usize {
        self.samples_per_element
    }

    /// Total number of stored f64 values.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The slab-boundary time this buffer represents.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Advance the represented time (after a completed slab).
    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    fn slot(&self, el: usize, iq: usize) -> usize {
        (el * self.samples_per_element + iq) * Self::RECORD
    }

    /// Read the trace at one (element, quadrature point).
    pub fn sample(&self, el: usize, iq: usize) -> WavefrontSample<D> {
        let base = self.slot(el, iq);
        let load = |k: usize| f64::from_bits(self.data[base + k].load(Ordering::Relaxed));
        let mut gradient = [0.0; D];
        for (i, g) in gradient.iter_mut().enumerate() {
            *g = load(1 + i);
        }
        WavefrontSample {
            value: load(0),
            gradient,
            time_derivative: load(D + 1),
        }
    }

    /// Overwrite the trace at one (element, quadrature point).
    pub fn store(&self, el: usize, iq: usize, sample: &WavefrontSample<D>) {
        let base = self.slot(el, iq);
        let put = |k: usize, v: f64| self.data[base + k].store(v.to_bits(), Ordering::Relaxed);
        put(0, sample.value);
        for (i, &g) in sample.gradient.iter().enumerate() {
            put(1 + i, g);
        }
        put(D + 1, sample.time_derivative);
    }

    /// Fill every sample from a space-time solution evaluated at this
    /// buffer's time, at each element's mapped quadrature points.
    pub fn fill_from<M, F>(&self, mesh: &M, rule: &QuadratureRule<D>, solution: F)
    where
        M: MeshAccess<D>,
        F: Fn([f64; D], f64) -> WavefrontSample<D>,
    {
        for el in 0..self.num_elements {
            for iq in 0..rule.len() {
                let x = mesh.map_reference(el, rule.point(iq));
                self.store(el, iq, &solution(x, self.time));
            }
        }
    }

    /// Snapshot of all stored values in layout order (for comparisons
    /// and inspection).
    pub fn values_to_vec(&self) -> Vec<f64> {
        self.data
            .iter()
            .map(|a| f64::from_bits(a.load(Ordering::Relaxed)))
            .collect()
    }
}
