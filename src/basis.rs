// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Polynomial Trefftz basis for the acoustic wave equation.
//!
//! Every basis function satisfies `u_tt = c^2 laplace(u)` exactly, so local
//! tent problems reduce to boundary integrals. The basis consists of
//! directional powers `((d . (x - x0) + c (t - t0)) / h)^k` with unit
//! directions `d`: for D=1 the two directions {+1, -1} per degree (the
//! characteristic monomials of d'Alembert's solution), for D=2 a set of
//! `2k+1` equispaced unit directions per degree `k`. The resulting counts
//! are `2p+1` (D=1) and `(p+1)^2` (D=2), the dimensions of the full
//! polynomial Trefftz spaces of degree `p`.
//!
//! Centering at the tent midpoint and scaling by the tent height keep the
//! local systems well conditioned.

use crate::error::{Result, SolveError};

/// Trefftz basis for a fixed polynomial order and wavespeed.
///
/// Placement (center and element size) varies per tent; call
/// [`TrefftzBasis::placed`] to obtain an evaluator for one tent.
pub struct TrefftzBasis<const D: usize> {
    wavespeed: f64,
    /// Per basis function: polynomial degree and unit direction.
    terms: Vec<(u32, [f64; D])>,
}

impl<const D: usize> TrefftzBasis<D> {
    /// Build the basis for the given polynomial order (>= 1) and wavespeed.
    pub fn new(order: usize, wavespeed: f64) -> Result<Self> {
        assert!(D == 1 || D == 2, "TrefftzBasis only supports D=1 or D=2");
        if order == 0 {
            return Err(SolveError::InvalidOrder(order));
        }
        if !wavespeed.is_finite() || wavespeed <= 0.0 {
            return Err(SolveError::InvalidWavespeed(wavespeed));
        }

        let mut terms = Vec::new();
        terms.push((0, [0.0; D]));
        for k in 1..=order as u32 {
            if D == 1 {
                let mut plus = [0.0; D];
                plus[0] = 1.0;
                let mut minus = [0.0; D];
                minus[0] = -1.0;
                terms.push((k, plus));
                terms.push((k, minus));
            } else {
                // 2k+1 equispaced directions span the degree-k wave
                // polynomials; the odd count keeps the set antipode-free.
                let m = 2 * k + 1;
                for l in 0..m {
                    let theta = 2.0 * std::f64::consts::PI * l as f64 / m as f64;
                    let mut d = [0.0; D];
                    d[0] = theta.cos();
                    d[D - 1] = theta.sin();
                    terms.push((k, d));
                }
            }
        }

        Ok(TrefftzBasis { wavespeed, terms })
    }

    /// Dimension of the basis.
    pub fn num_basis(&self) -> usize {
        self.terms.len()
    }

    /// The wavespeed the basis was built for.
    pub fn wavespeed(&self) -> f64 {
        self.wavespeed
    }

    /// Evaluator placed at a tent's space-time center with its time extent
    /// as the scaling size.
    pub fn placed(&self, center: [f64; D], tcenter: f64, elsize: f64) -> PlacedBasis<'_, D> {
        PlacedBasis {
            basis: self,
            center,
            tcenter,
            inv_size: 1.0 / elsize,
        }
    }
}

/// A [`TrefftzBasis`] bound to one tent's center and size.
pub struct PlacedBasis<'a, const D: usize> {
    basis: &'a TrefftzBasis<D>,
    center: [f64; D],
    tcenter: f64,
    inv_size: f64,
}

impl<const D: usize> PlacedBasis<'_, D> {
    /// Basis values at a space-time point, written into `shape`
    /// (length `num_basis`).
    pub fn eval(&self, x: [f64; D], t: f64, shape: &mut [f64]) {
        for (n, &(k, d)) in self.basis.terms.iter().enumerate() {
            shape[n] = self.argument(x, t, d).powi(k as i32);
        }
    }

    /// Basis space-time gradients at a point, written into `dshape` as
    /// `num_basis` rows of D+1 entries (D spatial derivatives, then the
    /// time derivative).
    pub fn eval_grad(&self, x: [f64; D], t: f64, dshape: &mut [f64]) {
        let c = self.basis.wavespeed;
        for (n, &(k, d)) in self.basis.terms.iter().enumerate() {
            let row = &mut dshape[n * (D + 1)..(n + 1) * (D + 1)];
            if k == 0 {
                row.fill(0.0);
                continue;
            }
            let s = self.argument(x, t, d);
            let factor = k as f64 * s.powi(k as i32 - 1) * self.inv_size;
            for i in 0..D {
                row[i] = factor * d[i];
            }
            row[D] = factor * c;
        }
    }

    /// Scaled characteristic argument `(d . (x - x0) + c (t - t0)) / h`.
    fn argument(&self, x: [f64; D], t: f64, d: [f64; D]) -> f64 {
        let mut s = self.basis.wavespeed * (t - self.tcenter);
        for i in 0..D {
            s += d[i] * (x[i] - self.center[i]);
        }
        s * self.inv_size
    }
}
