// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Driving entry point: advance a wavefront by one time slab.
//!
//! [`TentSolver`] wires the collaborators together: it pitches the slab,
//! initializes the wavefront from the analytic test solution when none is
//! supplied, runs every tent through the dependency-graph executor, and
//! reports the L2 verification error at the advanced time. The returned
//! wavefront feeds the next slab.

use crate::basis::TrefftzBasis;
use crate::error::{Result, SolveError};
use crate::mesh::MeshAccess;
use crate::quadrature::QuadratureRule;
use crate::scheduler::{execute_graph, SlabProgress};
use crate::solver::{CoefficientBuffer, LocalTentSolver, TentScratch};
use crate::tent::pitch_slab;
use crate::verify::{l2_error, reference_wavefront, test_solution};
use crate::wavefront::WavefrontBuffer;

/// Result of one completed slab.
pub struct SlabSolution<const D: usize> {
    /// The propagated wavefront at the advanced time.
    pub wavefront: WavefrontBuffer<D>,
    /// L2 verification error against the analytic solution at the
    /// advanced time. Diagnostic only.
    pub l2_error: f64,
    /// Per-element Trefftz coefficients of the last tent covering each
    /// element.
    pub coefficients: CoefficientBuffer,
    /// Number of tents processed.
    pub tents_processed: usize,
}

/// Space-time Trefftz solver for the acoustic wave equation on one mesh.
pub struct TentSolver<'a, const D: usize, M: MeshAccess<D>> {
    mesh: &'a M,
    wavespeed: f64,
    basis: TrefftzBasis<D>,
    rule: QuadratureRule<D>,
    num_threads: Option<usize>,
    progress_callback: Option<Box<dyn Fn(SlabProgress) + Send + Sync>>,
}

impl<'a, const D: usize, M: MeshAccess<D> + Sync> TentSolver<'a, D, M> {
    /// Create a solver for the given mesh, polynomial order, and wavespeed.
    ///
    /// # Errors
    /// Rejects spatial dimensions other than 1 and 2, an empty mesh,
    /// order 0, and a non-finite or non-positive wavespeed.
    pub fn new(mesh: &'a M, order: usize, wavespeed: f64) -> Result<Self> {
        if D != 1 && D != 2 {
            return Err(SolveError::UnsupportedDimension(D));
        }
        if mesh.num_elements() == 0 {
            return Err(SolveError::EmptyMesh);
        }
        let basis = TrefftzBasis::new(order, wavespeed)?;
        let rule = QuadratureRule::with_exactness(2 * order);
        Ok(TentSolver {
            mesh,
            wavespeed,
            basis,
            rule,
            num_threads: None,
            progress_callback: None,
        })
    }

    /// Set the number of worker threads (builder method).
    /// If not specified, defaults to the number of available CPU cores.
    ///
    /// Results are bit-identical for any thread count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }

    /// Set a progress callback invoked periodically during a slab solve
    /// (builder method).
    pub fn with_progress(mut self, callback: Box<dyn Fn(SlabProgress) + Send + Sync>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Override the quadrature exactness degree (builder method).
    /// The default is twice the polynomial order.
    pub fn with_quadrature_exactness(mut self, degree: usize) -> Self {
        self.rule = QuadratureRule::with_exactness(degree);
        self
    }

    /// Dimension of the Trefftz basis.
    pub fn num_basis(&self) -> usize {
        self.basis.num_basis()
    }

    /// The quadrature rule used on element faces and for wavefront samples.
    pub fn quadrature(&self) -> &QuadratureRule<D> {
        &self.rule
    }

    fn get_num_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Advance the wavefront by one slab of the given height.
    ///
    /// An absent `wavefront` is initialized from the analytic test
    /// solution at time 0. A supplied wavefront must match this solver's
    /// mesh and quadrature rule; its recorded time is the slab's start.
    ///
    /// # Errors
    /// Fails on invalid slab height, a mismatched wavefront, degenerate
    /// tent geometry, or a singular local system. A failure abandons the
    /// whole slab.
    pub fn evolve(
        &self,
        slab_height: f64,
        wavefront: Option<WavefrontBuffer<D>>,
    ) -> Result<SlabSolution<D>> {
        let slab = pitch_slab(self.mesh, slab_height, self.wavespeed)?;
        let ne = self.mesh.num_elements();

        let mut wavefront = match wavefront {
            Some(wf) => {
                let expected = ne * self.rule.len() * WavefrontBuffer::<D>::RECORD;
                if wf.len() != expected
                    || wf.num_elements() != ne
                    || wf.samples_per_element() != self.rule.len()
                {
                    return Err(SolveError::WavefrontMismatch {
                        expected,
                        got: wf.len(),
                    });
                }
                wf
            }
            None => reference_wavefront(self.mesh, &self.rule, self.wavespeed, 0.0),
        };
        let start_time = wavefront.time();

        let coefficients = CoefficientBuffer::new(ne, self.basis.num_basis());
        // Tent times are slab-local; boundary data lives in absolute time.
        let wavespeed = self.wavespeed;
        let local = LocalTentSolver::new(self.mesh, &self.basis, &self.rule, move |x, t| {
            test_solution(wavespeed, x, start_time + t)
        });

        let nbasis = self.basis.num_basis();
        execute_graph(
            &slab.dependency,
            self.get_num_threads(),
            self.progress_callback.as_deref(),
            || TentScratch::new(nbasis, D),
            |i, scratch| local.solve_tent(i, &slab.tents[i], &wavefront, &coefficients, scratch),
        )?;

        let end_time = start_time + slab_height;
        wavefront.set_time(end_time);
        let reference = reference_wavefront(self.mesh, &self.rule, self.wavespeed, end_time);
        let error = l2_error(self.mesh, &self.rule, &wavefront, &reference);

        Ok(SlabSolution {
            wavefront,
            l2_error: error,
            coefficients,
            tents_processed: slab.tents.len(),
        })
    }
}
