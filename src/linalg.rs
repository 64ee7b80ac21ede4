// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Dense in-place LU factorization and solve for the local tent systems.
//!
//! Partial pivoting over `ndarray` storage; the factors overwrite the
//! input matrix (L unit lower triangular below the diagonal, U on and
//! above it) and the solution overwrites the right-hand side.

use ndarray::{Array1, Array2};

/// Pivot magnitudes below this are treated as singular.
const PIVOT_TOL: f64 = 1e-30;

/// Factorize `a` in place with partial pivoting, recording row swaps in
/// `pivots` (length n). Returns false if a pivot falls below tolerance.
pub fn lu_factor(a: &mut Array2<f64>, pivots: &mut [usize]) -> bool {
    let n = a.nrows();
    debug_assert_eq!(n, a.ncols());
    debug_assert_eq!(n, pivots.len());

    for k in 0..n {
        let mut max_val = a[[k, k]].abs();
        let mut max_row = k;
        for i in (k + 1)..n {
            let val = a[[i, k]].abs();
            if val > max_val {
                max_val = val;
                max_row = i;
            }
        }
        if !max_val.is_finite() || max_val < PIVOT_TOL {
            return false;
        }

        pivots[k] = max_row;
        if max_row != k {
            for j in 0..n {
                a.swap([k, j], [max_row, j]);
            }
        }

        let pivot = a[[k, k]];
        for i in (k + 1)..n {
            let factor = a[[i, k]] / pivot;
            a[[i, k]] = factor;
            for j in (k + 1)..n {
                a[[i, j]] -= factor * a[[k, j]];
            }
        }
    }
    true
}

/// Solve `L U x = P b` in place using factors from [`lu_factor`];
/// `b` is overwritten with the solution.
pub fn lu_solve(a: &Array2<f64>, pivots: &[usize], b: &mut Array1<f64>) {
    let n = a.nrows();

    for k in 0..n {
        let p = pivots[k];
        if p != k {
            b.swap(k, p);
        }
    }

    // Forward substitution with unit lower triangle
    for i in 1..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= a[[i, j]] * b[j];
        }
        b[i] = sum;
    }

    // Backward substitution with U
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            sum -= a[[i, j]] * b[j];
        }
        b[i] = sum / a[[i, i]];
    }
}

/// Factorize and solve in one call. Returns false if the matrix is
/// singular or nearly singular; `b` then holds unspecified data.
pub fn factor_and_solve(a: &mut Array2<f64>, b: &mut Array1<f64>) -> bool {
    let n = a.nrows();
    let mut pivots = vec![0usize; n];
    if !lu_factor(a, &mut pivots) {
        return false;
    }
    lu_solve(a, &pivots, b);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn solve_identity() {
        let mut a = Array2::<f64>::eye(3);
        let mut b = array![1.0, 2.0, 3.0];
        assert!(factor_and_solve(&mut a, &mut b));
        assert_eq!(b, array![1.0, 2.0, 3.0]);
    }

    #[test]
    fn solve_known_system() {
        // [[2,1],[1,3]] x = [5, 10] -> x = [1, 3]
        let mut a = array![[2.0, 1.0], [1.0, 3.0]];
        let mut b = array![5.0, 10.0];
        assert!(factor_and_solve(&mut a, &mut b));
        assert!((b[0] - 1.0).abs() < 1e-14);
        assert!((b[1] - 3.0).abs() < 1e-14);
    }

    #[test]
    fn solve_requires_pivoting() {
        // Zero on the initial diagonal forces a row swap.
        let mut a = array![[0.0, 1.0], [1.0, 0.0]];
        let mut b = array![2.0, 7.0];
        assert!(factor_and_solve(&mut a, &mut b));
        assert!((b[0] - 7.0).abs() < 1e-14);
        assert!((b[1] - 2.0).abs() < 1e-14);
    }

    #[test]
    fn singular_matrix_reported() {
        let mut a = array![[1.0, 2.0], [2.0, 4.0]];
        let mut b = array![1.0, 2.0];
        assert!(!factor_and_solve(&mut a, &mut b));
    }

    #[test]
    fn residual_of_random_system() {
        // Deterministic pseudo-random fill; check A x = b to rounding.
        let n = 12;
        let mut seed = 42u64;
        let mut rand = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 11) as f64 / (1u64 << 53) as f64 - 0.5
        };
        let a0 = Array2::from_shape_fn((n, n), |_| rand());
        let b0 = Array1::from_shape_fn(n, |_| rand());

        let mut a = a0.clone();
        let mut x = b0.clone();
        assert!(factor_and_solve(&mut a, &mut x));

        let residual = a0.dot(&x) - &b0;
        let max = residual.iter().fold(0.0f64, |m, &v| m.max(v.abs()));
        assert!(max < 1e-10, "residual {}", max);
    }
}
