// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Per-tent assembly, solve, and trace propagation.
//!
//! Each tent yields one dense `nbasis x nbasis` system. Because the basis
//! satisfies the wave equation exactly, only boundary terms appear: a flux
//! bilinear form on the tent's top face, the same structure plus a mass
//! term on the bottom face (where the known wavefront data feeds the right
//! hand side with mirrored signs), and a boundary-condition term on
//! lateral faces at the mesh boundary. After the LU solve the coefficients
//! are evaluated on the top face and written back into the wavefront - the
//! only place a tent touches shared state.
//!
//! Throughout, `sig`/`tau` denote the negated spatial gradients of trial
//! and test functions; the wavefront stores its gradient components with
//! the same sign convention.

use std::sync::atomic::{AtomicU64, Ordering};

use ndarray::{Array1, Array2};

use crate::basis::TrefftzBasis;
use crate::error::{Result, SolveError};
use crate::geometry::{lateral_face, tent_face};
use crate::linalg;
use crate::mesh::MeshAccess;
use crate::quadrature::QuadratureRule;
use crate::tent::Tent;
use crate::wavefront::{WavefrontBuffer, WavefrontSample};

/// Per-worker scratch for one tent solve: the local system and basis
/// evaluation buffers. Checked out per tent invocation and reset on entry;
/// the backing allocations are reused across tents.
pub struct TentScratch {
    elmat: Array2<f64>,
    elvec: Array1<f64>,
    shape: Vec<f64>,
    dshape: Vec<f64>,
}

impl TentScratch {
    /// Scratch sized for a basis of dimension `nbasis` in spatial
    /// dimension `d`.
    pub fn new(nbasis: usize, d: usize) -> Self {
        TentScratch {
            elmat: Array2::zeros((nbasis, nbasis)),
            elvec: Array1::zeros(nbasis),
            shape: vec![0.0; nbasis],
            dshape: vec![0.0; nbasis * (d + 1)],
        }
    }

    fn reset(&mut self) {
        self.elmat.fill(0.0);
        self.elvec.fill(0.0);
    }
}

/// Per-element solution coefficients of a slab, shared across tents.
///
/// Successive tents on an element overwrite its coefficients; the
/// dependency graph totally orders those writers, so the slots follow the
/// same disjointness argument as the wavefront.
pub struct CoefficientBuffer {
    data: Box<[AtomicU64]>,
    nbasis: usize,
}

impl CoefficientBuffer {
    /// Zeroed coefficient storage for `num_elements` elements.
    pub fn new(num_elements: usize, nbasis: usize) -> Self {
        let data: Box<[AtomicU64]> = (0..num_elements * nbasis)
            .map(|_| AtomicU64::new(0))
            .collect();
        CoefficientBuffer { data, nbasis }
    }

    /// Basis dimension per element.
    pub fn nbasis(&self) -> usize {
        self.nbasis
    }

    fn store(&self, el: usize, coeffs: &Array1<f64>) {
        let base = el * self.nbasis;
        for (k, &v) in coeffs.iter().enumerate() {
            self.data[base + k].store(v.to_bits(), Ordering::Relaxed);
        }
    }

    /// Snapshot of one element's coefficients.
    pub fn element(&self, el: usize) -> Vec<f64> {
        let base = el * self.nbasis;
        (0..self.nbasis)
            .map(|k| f64::from_bits(self.data[base + k].load(Ordering::Relaxed)))
            .collect()
    }
}

/// Assembles and solves the local system of one tent and propagates the
/// solution trace. `F` supplies the prescribed boundary time-derivative
/// for lateral faces.
pub struct LocalTentSolver<'a, const D: usize, M, F> {
    mesh: &'a M,
    basis: &'a TrefftzBasis<D>,
    rule: &'a QuadratureRule<D>,
    wavespeed: f64,
    boundary_data: F,
}

impl<'a, const D: usize, M, F> LocalTentSolver<'a, D, M, F>
where
    M: MeshAccess<D>,
    F: Fn([f64; D], f64) -> WavefrontSample<D>,
{
    /// Bind the solver to its collaborators.
    pub fn new(
        mesh: &'a M,
        basis: &'a TrefftzBasis<D>,
        rule: &'a QuadratureRule<D>,
        boundary_data: F,
    ) -> Self {
        LocalTentSolver {
            mesh,
            basis,
            rule,
            wavespeed: basis.wavespeed(),
            boundary_data,
        }
    }

    /// Process one tent: assemble, solve, and publish the top-face trace
    /// into `wavefront` and the coefficients into `coefficients`.
    ///
    /// # Errors
    /// Returns an error for degenerate face geometry or a singular local
    /// system; both are fatal for the enclosing slab.
    pub fn solve_tent(
        &self,
        tent_index: usize,
        tent: &Tent,
        wavefront: &WavefrontBuffer<D>,
        coefficients: &CoefficientBuffer,
        scratch: &mut TentScratch,
    ) -> Result<()> {
        let nbasis = self.basis.num_basis();
        let cc = 1.0 / (self.wavespeed * self.wavespeed);
        let ref_vol = QuadratureRule::<D>::reference_volume();
        scratch.reset();

        let center = self.mesh.point(tent.vertex);
        let tcenter = tent.tbot + 0.5 * tent.height();
        let placed = self.basis.placed(center, tcenter, tent.height());

        for &el in &tent.els {
            let top = tent_face(tent, el, self.mesh, true)?;
            let bot = tent_face(tent, el, self.mesh, false)?;
            let (ntop_x, ntop_t) = top.normal(true);
            let (nbot_x, nbot_t) = bot.normal(false);

            for iq in 0..self.rule.len() {
                let xi = self.rule.point(iq);
                let x = self.mesh.map_reference(el, xi);
                let rw = self.rule.weight(iq);

                // Top of tent: flux bilinear form against the unknown trace.
                let t = top.time_at(xi);
                placed.eval_grad(x, t, &mut scratch.dshape);
                let w = rw * top.area / ref_vol;
                for j in 0..nbasis {
                    let dj = &scratch.dshape[j * (D + 1)..(j + 1) * (D + 1)];
                    let dj_t = dj[D];
                    let tau_n: f64 = -(0..D).map(|d| dj[d] * ntop_x[d]).sum::<f64>();
                    for i in 0..nbasis {
                        let di = &scratch.dshape[i * (D + 1)..(i + 1) * (D + 1)];
                        let sig_tau: f64 = (0..D).map(|d| di[d] * dj[d]).sum();
                        let sig_n: f64 = -(0..D).map(|d| di[d] * ntop_x[d]).sum::<f64>();
                        scratch.elmat[[j, i]] += w
                            * (di[D] * dj_t * ntop_t * cc
                                + sig_tau * ntop_t
                                + di[D] * tau_n
                                + dj_t * sig_n);
                    }
                }

                // Bottom of tent: mass term plus the known boundary data
                // with mirrored signs.
                let t = bot.time_at(xi);
                placed.eval(x, t, &mut scratch.shape);
                placed.eval_grad(x, t, &mut scratch.dshape);
                let w = rw * bot.area / ref_vol;
                let known = wavefront.sample(el, iq);
                for j in 0..nbasis {
                    let dj = &scratch.dshape[j * (D + 1)..(j + 1) * (D + 1)];
                    let dj_t = dj[D];
                    let tau_n: f64 = -(0..D).map(|d| dj[d] * nbot_x[d]).sum::<f64>();
                    let sig_u_tau: f64 =
                        (0..D).map(|d| known.gradient[d] * (-dj[d])).sum::<f64>();
                    let sig_u_n: f64 = (0..D).map(|d| known.gradient[d] * nbot_x[d]).sum();
                    scratch.elvec[j] += w
                        * (-known.time_derivative * dj_t * nbot_t * cc
                            - sig_u_tau * nbot_t
                            - known.time_derivative * tau_n
                            - dj_t * sig_u_n
                            + known.value * scratch.shape[j]);
                    for i in 0..nbasis {
                        scratch.elmat[[j, i]] += w * scratch.shape[i] * scratch.shape[j];
                    }
                }
            }
        }

        // Lateral faces impose the outer boundary condition.
        for &sel in self.mesh.vertex_boundary_elements(tent.vertex) {
            let face = lateral_face(tent, sel, self.mesh)?;
            for iq in 0..self.rule.len() {
                let (x, t) = face.map(self.rule.point(iq));
                placed.eval_grad(x, t, &mut scratch.dshape);
                let w = self.rule.weight(iq) * face.area / ref_vol;
                let vbar = (self.boundary_data)(x, t).time_derivative;
                for j in 0..nbasis {
                    let dj = &scratch.dshape[j * (D + 1)..(j + 1) * (D + 1)];
                    let dj_t = dj[D];
                    let tau_n: f64 = -(0..D).map(|d| dj[d] * face.normal[d]).sum::<f64>();
                    scratch.elvec[j] -= w * tau_n * vbar;
                    for i in 0..nbasis {
                        let di = &scratch.dshape[i * (D + 1)..(i + 1) * (D + 1)];
                        let sig_n: f64 = -(0..D).map(|d| di[d] * face.normal[d]).sum::<f64>();
                        scratch.elmat[[j, i]] += w * sig_n * dj_t;
                    }
                }
            }
        }

        if !linalg::factor_and_solve(&mut scratch.elmat, &mut scratch.elvec) {
            return Err(SolveError::SingularSystem { tent: tent_index });
        }
        let sol = &scratch.elvec;

        for &el in &tent.els {
            coefficients.store(el, sol);
        }

        // Evaluate the solution on the tent's top face and publish the
        // trace; spatial gradient components are stored negated.
        for &el in &tent.els {
            let top = tent_face(tent, el, self.mesh, true)?;
            for iq in 0..self.rule.len() {
                let xi = self.rule.point(iq);
                let x = self.mesh.map_reference(el, xi);
                let t = top.time_at(xi);
                placed.eval(x, t, &mut scratch.shape);
                placed.eval_grad(x, t, &mut scratch.dshape);

                let mut value = 0.0;
                let mut grad = [0.0; D];
                let mut dt = 0.0;
                for n in 0..nbasis {
                    let dn = &scratch.dshape[n * (D + 1)..(n + 1) * (D + 1)];
                    value += scratch.shape[n] * sol[n];
                    for d in 0..D {
                        grad[d] -= dn[d] * sol[n];
                    }
                    dt += dn[D] * sol[n];
                }
                wavefront.store(
                    el,
                    iq,
                    &WavefrontSample {
                        value,
                        gradient: grad,
                        time_derivative: dt,
                    },
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::SimplicialMesh;
    use crate::tent::pitch_slab;
    use crate::verify::test_solution;

    fn solve_first_tent(
        order: usize,
        n_elements: usize,
        wavespeed: f64,
    ) -> (WavefrontBuffer<1>, SimplicialMesh<1>, QuadratureRule<1>, Tent) {
        let mesh = SimplicialMesh::<1>::interval(n_elements, 0.0, 1.0).unwrap();
        let basis = TrefftzBasis::<1>::new(order, wavespeed).unwrap();
        let rule = QuadratureRule::<1>::with_exactness(2 * order);
        let slab = pitch_slab(&mesh, 0.4, wavespeed).unwrap();

        let wavefront = WavefrontBuffer::<1>::new(mesh.num_elements(), rule.len(), 0.0);
        wavefront.fill_from(&mesh, &rule, |x, t| test_solution(wavespeed, x, t));

        let coeffs = CoefficientBuffer::new(mesh.num_elements(), basis.num_basis());
        let local = LocalTentSolver::new(&mesh, &basis, &rule, move |x, t| {
            test_solution(wavespeed, x, t)
        });

        // The first pitched tent has no predecessors: its bottom data is
        // exactly the analytic initial condition.
        let tent = slab.tents[0].clone();
        let mut scratch = TentScratch::new(basis.num_basis(), 1);
        local
            .solve_tent(0, &tent, &wavefront, &coeffs, &mut scratch)
            .unwrap();
        (wavefront, mesh, rule, tent)
    }

    #[test]
    fn single_tent_reproduces_analytic_trace() {
        let wavespeed = 1.0;
        let (wavefront, mesh, rule, tent) = solve_first_tent(5, 16, wavespeed);

        for &el in &tent.els {
            let top = tent_face(&tent, el, &mesh, true).unwrap();
            for iq in 0..rule.len() {
                let xi = rule.point(iq);
                let x = mesh.map_reference(el, xi);
                let t = top.time_at(xi);
                let exact = test_solution::<1>(wavespeed, x, t);
                let got = wavefront.sample(el, iq);
                assert!(
                    (got.value - exact.value).abs() < 1e-5,
                    "value at x={} t={}: {} vs {}",
                    x[0],
                    t,
                    got.value,
                    exact.value
                );
                assert!((got.gradient[0] - exact.gradient[0]).abs() < 1e-3);
                assert!((got.time_derivative - exact.time_derivative).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn untouched_elements_keep_initial_data() {
        let wavespeed = 1.0;
        let (wavefront, mesh, rule, tent) = solve_first_tent(3, 16, wavespeed);
        for el in 0..mesh.num_elements() {
            if tent.els.contains(&el) {
                continue;
            }
            for iq in 0..rule.len() {
                let x = mesh.map_reference(el, rule.point(iq));
                let exact = test_solution::<1>(wavespeed, x, 0.0);
                assert_eq!(wavefront.sample(el, iq), exact);
            }
        }
    }

    #[test]
    fn coefficient_buffer_roundtrip() {
        let buf = CoefficientBuffer::new(3, 4);
        let coeffs = Array1::from(vec![1.0, -2.0, 3.5, 0.25]);
        buf.store(1, &coeffs);
        assert_eq!(buf.element(1), vec![1.0, -2.0, 3.5, 0.25]);
        assert_eq!(buf.element(0), vec![0.0; 4]);
        assert_eq!(buf.nbasis(), 4);
    }

    #[test]
    fn scratch_reset_clears_system() {
        let mut scratch = TentScratch::new(3, 1);
        scratch.elmat[[1, 2]] = 5.0;
        scratch.elvec[0] = -1.0;
        scratch.reset();
        assert_eq!(scratch.elmat[[1, 2]], 0.0);
        assert_eq!(scratch.elvec[0], 0.0);
    }
}
