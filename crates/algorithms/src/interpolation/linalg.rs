//! Dense solvers for the small systems built by the interpolators
//!
//! Matrices are row-major `n x n` slices.

use fwdet_core::{Error, Result};

/// Pivot magnitude below which a system is treated as singular
const PIVOT_EPS: f64 = 1e-14;

/// Solve `Ax = b` by Gaussian elimination with partial pivoting.
///
/// `mat` and `rhs` are overwritten.
pub fn gauss_solve(n: usize, mat: &mut [f64], rhs: &mut [f64]) -> Result<Vec<f64>> {
    debug_assert_eq!(mat.len(), n * n);
    debug_assert_eq!(rhs.len(), n);

    for col in 0..n {
        let (pivot_row, pivot_abs) = (col..n)
            .map(|row| (row, mat[row * n + col].abs()))
            .fold((col, -1.0), |best, cur| if cur.1 > best.1 { cur } else { best });

        if pivot_abs.is_nan() || pivot_abs < PIVOT_EPS {
            return Err(Error::Singular(format!(
                "zero pivot in column {col} of a {n}x{n} system"
            )));
        }

        if pivot_row != col {
            for j in 0..n {
                mat.swap(col * n + j, pivot_row * n + j);
            }
            rhs.swap(col, pivot_row);
        }

        let pivot = mat[col * n + col];
        for row in (col + 1)..n {
            let factor = mat[row * n + col] / pivot;
            if factor == 0.0 {
                continue;
            }
            mat[row * n + col] = 0.0;
            for j in (col + 1)..n {
                mat[row * n + j] -= factor * mat[col * n + j];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = vec![0.0_f64; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|j| mat[row * n + j] * x[j]).sum();
        x[row] = (rhs[row] - tail) / mat[row * n + row];
    }
    Ok(x)
}

/// Lower-triangular Cholesky factor `L` with `A = L Lᵀ`.
///
/// Returns `None` when `A` is not numerically positive definite.
pub fn cholesky(n: usize, mat: &[f64]) -> Option<Vec<f64>> {
    debug_assert_eq!(mat.len(), n * n);
    let mut l = vec![0.0_f64; n * n];

    for i in 0..n {
        for j in 0..=i {
            let dot: f64 = (0..j).map(|k| l[i * n + k] * l[j * n + k]).sum();
            let v = mat[i * n + j] - dot;
            if i == j {
                if v.is_nan() || v <= 0.0 {
                    return None;
                }
                l[i * n + i] = v.sqrt();
            } else {
                l[i * n + j] = v / l[j * n + j];
            }
        }
    }
    Some(l)
}

/// Solve `L Lᵀ x = b` given the factor from [`cholesky`].
pub fn cholesky_solve(n: usize, l: &[f64], b: &[f64]) -> Vec<f64> {
    let mut y = vec![0.0_f64; n];
    for i in 0..n {
        let dot: f64 = (0..i).map(|k| l[i * n + k] * y[k]).sum();
        y[i] = (b[i] - dot) / l[i * n + i];
    }

    let mut x = vec![0.0_f64; n];
    for i in (0..n).rev() {
        let dot: f64 = ((i + 1)..n).map(|k| l[k * n + i] * x[k]).sum();
        x[i] = (y[i] - dot) / l[i * n + i];
    }
    x
}
