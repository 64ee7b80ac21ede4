// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Verification against a closed-form solution of the wave equation.
//!
//! The error functional is L2-type over the value component only: the
//! square root of the quadrature-weighted sum of squared differences at
//! every (element, quadrature point). It is a diagnostic; a large error
//! never fails a run.

use crate::mesh::MeshAccess;
use crate::quadrature::QuadratureRule;
use crate::wavefront::{WavefrontBuffer, WavefrontSample};

/// Closed-form test solution of `u_tt = c^2 laplace(u)`.
///
/// D=1: `u = sin(k (c t + x))` with k = 3. D=2: a plane wave along the
/// diagonal, `u = sin(c t + (x + y) / sqrt(2))`. Samples follow the
/// wavefront storage convention: the spatial gradient is negated.
pub fn test_solution<const D: usize>(wavespeed: f64, x: [f64; D], t: f64) -> WavefrontSample<D> {
    if D == 1 {
        let k = 3.0;
        let phase = k * (wavespeed * t + x[0]);
        WavefrontSample {
            value: phase.sin(),
            gradient: [-k * phase.cos(); D],
            time_derivative: wavespeed * k * phase.cos(),
        }
    } else {
        let sq = 0.5f64.sqrt();
        let phase = wavespeed * t + sq * (x[0] + x[D - 1]);
        WavefrontSample {
            value: phase.sin(),
            gradient: [-sq * phase.cos(); D],
            time_derivative: wavespeed * phase.cos(),
        }
    }
}

/// Wavefront filled from the test solution at the given time.
pub fn reference_wavefront<const D: usize, M: MeshAccess<D>>(
    mesh: &M,
    rule: &QuadratureRule<D>,
    wavespeed: f64,
    time: f64,
) -> WavefrontBuffer<D> {
    let wf = WavefrontBuffer::new(mesh.num_elements(), rule.len(), time);
    wf.fill_from(mesh, rule, |x, t| test_solution(wavespeed, x, t));
    wf
}

/// L2-type error of the value component between two wavefronts, weighted
/// by the physical quadrature weights of each element.
pub fn l2_error<const D: usize, M: MeshAccess<D>>(
    mesh: &M,
    rule: &QuadratureRule<D>,
    wavefront: &WavefrontBuffer<D>,
    reference: &WavefrontBuffer<D>,
) -> f64 {
    let mut err2 = 0.0;
    for el in 0..mesh.num_elements() {
        let det = mesh.jacobian_det(el);
        for iq in 0..rule.len() {
            let diff = wavefront.sample(el, iq).value - reference.sample(el, iq).value;
            err2 += diff * diff * rule.weight(iq) * det;
        }
    }
    err2.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::SimplicialMesh;

    #[test]
    fn closed_loop_identity_error_is_zero() {
        let mesh = SimplicialMesh::<1>::interval(8, 0.0, 1.0).unwrap();
        let rule = QuadratureRule::<1>::with_exactness(6);
        let dt = 0.37;
        let wf = reference_wavefront(&mesh, &rule, 1.0, dt);
        let reference = reference_wavefront(&mesh, &rule, 1.0, dt);
        assert_eq!(l2_error(&mesh, &rule, &wf, &reference), 0.0);
    }

    #[test]
    fn error_detects_time_offset() {
        let mesh = SimplicialMesh::<1>::interval(8, 0.0, 1.0).unwrap();
        let rule = QuadratureRule::<1>::with_exactness(6);
        let wf = reference_wavefront(&mesh, &rule, 1.0, 0.0);
        let reference = reference_wavefront(&mesh, &rule, 1.0, 0.25);
        assert!(l2_error(&mesh, &rule, &wf, &reference) > 0.1);
    }

    #[test]
    fn test_solution_gradient_convention_1d() {
        // Stored gradient is the negated x-derivative of the value.
        let c = 2.0;
        let h = 1e-6;
        let at = |x: f64, t: f64| test_solution::<1>(c, [x], t);
        let s = at(0.3, 0.7);
        let dudx = (at(0.3 + h, 0.7).value - at(0.3 - h, 0.7).value) / (2.0 * h);
        let dudt = (at(0.3, 0.7 + h).value - at(0.3, 0.7 - h).value) / (2.0 * h);
        assert!((s.gradient[0] + dudx).abs() < 1e-8);
        assert!((s.time_derivative - dudt).abs() < 1e-8);
    }

    #[test]
    fn test_solution_satisfies_wave_equation_2d() {
        let c = 1.3;
        let h = 1e-4;
        let at = |x: f64, y: f64, t: f64| test_solution::<2>(c, [x, y], t).value;
        let (x0, y0, t0) = (0.4, 0.6, 0.2);
        let u = at(x0, y0, t0);
        let uxx = (at(x0 + h, y0, t0) - 2.0 * u + at(x0 - h, y0, t0)) / (h * h);
        let uyy = (at(x0, y0 + h, t0) - 2.0 * u + at(x0, y0 - h, t0)) / (h * h);
        let utt = (at(x0, y0, t0 + h) - 2.0 * u + at(x0, y0, t0 - h)) / (h * h);
        assert!((utt - c * c * (uxx + uyy)).abs() < 1e-5);
    }

    #[test]
    fn l2_error_scales_with_domain() {
        // A constant difference of 1 over [0, 1] gives error 1.
        let mesh = SimplicialMesh::<1>::interval(4, 0.0, 1.0).unwrap();
        let rule = QuadratureRule::<1>::with_exactness(4);
        let a = WavefrontBuffer::<1>::new(4, rule.len(), 0.0);
        let b = WavefrontBuffer::<1>::new(4, rule.len(), 0.0);
        a.fill_from(&mesh, &rule, |_, _| WavefrontSample {
            value: 1.0,
            gradient: [0.0],
            time_derivative: 0.0,
        });
        assert!((l2_error(&mesh, &rule, &a, &b) - 1.0).abs() < 1e-12);
    }
}
