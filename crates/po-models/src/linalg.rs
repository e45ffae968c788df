//! ndarray ↔ nalgebra conversions and the decompositions the fitters use
//!
//! Data and results live in `ndarray`; factorizations are done by
//! `nalgebra`. Every helper takes and returns `ndarray` types.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use ndarray::{Array1, Array2};

use crate::base::{ModelError, Result};

/// Convert an ndarray Array2 to a nalgebra DMatrix
#[inline]
pub fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

/// Convert an ndarray Array1 to a nalgebra DVector
#[inline]
pub fn to_dvector(v: &Array1<f64>) -> DVector<f64> {
    DVector::from_iterator(v.len(), v.iter().copied())
}

/// Convert a nalgebra DMatrix to an ndarray Array2
#[inline]
pub fn to_array2(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn(m.shape(), |(i, j)| m[(i, j)])
}

/// Convert a nalgebra DVector to an ndarray Array1
#[inline]
pub fn to_array1(v: &DVector<f64>) -> Array1<f64> {
    Array1::from_iter(v.iter().copied())
}

/// Cholesky factorization that also rejects zero or non-finite pivots
fn cholesky(a: &Array2<f64>, context: &str) -> Result<Cholesky<f64, Dyn>> {
    let chol = to_dmatrix(a)
        .cholesky()
        .ok_or_else(|| ModelError::singular(context))?;
    let l = chol.l_dirty();
    if (0..l.nrows()).any(|i| !(l[(i, i)] > 0.0 && l[(i, i)].is_finite())) {
        return Err(ModelError::singular(context));
    }
    Ok(chol)
}

/// Solve the symmetric positive-definite system `A x = b` and return
/// `(x, A⁻¹)`, both from one Cholesky factorization.
pub fn solve_and_invert(
    a: &Array2<f64>,
    b: &Array1<f64>,
    context: &str,
) -> Result<(Array1<f64>, Array2<f64>)> {
    let chol = cholesky(a, context)?;
    let solution = chol.solve(&to_dvector(b));
    let inverse = chol.inverse();
    Ok((to_array1(&solution), to_array2(&inverse)))
}

/// Solve the symmetric positive-definite system `A x = b`
pub fn solve_spd(a: &Array2<f64>, b: &Array1<f64>, context: &str) -> Result<Array1<f64>> {
    let chol = cholesky(a, context)?;
    Ok(to_array1(&chol.solve(&to_dvector(b))))
}

/// Inverse of a symmetric positive-definite matrix
pub fn spd_inverse(a: &Array2<f64>, context: &str) -> Result<Array2<f64>> {
    Ok(to_array2(&cholesky(a, context)?.inverse()))
}

/// Lower Cholesky factor `L` with `A = L L'`
pub fn cholesky_lower(a: &Array2<f64>, context: &str) -> Result<Array2<f64>> {
    Ok(to_array2(&cholesky(a, context)?.l()))
}

/// `ln |A|` of a symmetric positive-definite matrix, `None` if not SPD
pub fn log_det_spd(a: &Array2<f64>) -> Option<f64> {
    let chol = cholesky(a, "log determinant").ok()?;
    let l = chol.l_dirty();
    Some(2.0 * (0..l.nrows()).map(|i| l[(i, i)].ln()).sum::<f64>())
}

/// General square inverse by LU
pub fn invert(a: &Array2<f64>, context: &str) -> Result<Array2<f64>> {
    to_dmatrix(a)
        .try_inverse()
        .map(|inv| to_array2(&inv))
        .ok_or_else(|| ModelError::singular(context))
}

/// Numerical rank from the singular values, relative to the largest one
pub fn rank(x: &Array2<f64>, rel_tol: f64) -> usize {
    if x.is_empty() {
        return 0;
    }
    let singular = to_dmatrix(x).singular_values();
    let max = singular.iter().copied().fold(0.0_f64, f64::max);
    if max == 0.0 {
        return 0;
    }
    singular.iter().filter(|&&s| s > rel_tol * max).count()
}

/// Quadratic form `d' A⁺ d` restricted to the positive eigen-subspace of the
/// symmetric matrix `A`. Returns the value and the dimension of that subspace.
pub fn psd_quadratic_form(a: &Array2<f64>, d: &Array1<f64>, rel_tol: f64) -> (f64, usize) {
    let eigen = to_dmatrix(a).symmetric_eigen();
    let max = eigen
        .eigenvalues
        .iter()
        .map(|v| v.abs())
        .fold(0.0_f64, f64::max);
    if max == 0.0 {
        return (0.0, 0);
    }

    let d = to_dvector(d);
    let mut value = 0.0;
    let mut dim = 0;
    for (k, &lambda) in eigen.eigenvalues.iter().enumerate() {
        if lambda > rel_tol * max {
            let projection = eigen.eigenvectors.column(k).dot(&d);
            value += projection * projection / lambda;
            dim += 1;
        }
    }
    (value, dim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_conversions_preserve_layout() {
        let a = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let m = to_dmatrix(&a);
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m[(1, 0)], 4.0);
        assert_eq!(to_array2(&m), a);

        // non-standard layout
        let t = a.t().to_owned();
        assert_eq!(to_dmatrix(&a.t().to_owned())[(2, 1)], t[[2, 1]]);

        let v = array![1.0, -2.0];
        assert_eq!(to_array1(&to_dvector(&v)), v);
    }

    #[test]
    fn test_solve_and_invert() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let b = array![2.0, 1.0];
        let (x, inv) = solve_and_invert(&a, &b, "test").unwrap();

        assert_abs_diff_eq!(x[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 0.0, epsilon = 1e-12);

        let identity = a.dot(&inv);
        assert_abs_diff_eq!(identity[[0, 0]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(identity[[0, 1]], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_singular_matrix_is_reported() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        let err = solve_spd(&a, &array![1.0, 1.0], "X'X").unwrap_err();
        assert!(matches!(err, ModelError::SingularMatrix { .. }));
        assert_eq!(rank(&a, 1e-10), 1);
        assert!(log_det_spd(&a).is_none());
    }

    #[test]
    fn test_log_det_and_cholesky() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        assert_abs_diff_eq!(log_det_spd(&a).unwrap(), 8.0_f64.ln(), epsilon = 1e-12);

        let l = cholesky_lower(&a, "test").unwrap();
        assert_eq!(l[[0, 1]], 0.0);
        let rebuilt = l.dot(&l.t());
        assert_abs_diff_eq!(rebuilt[[1, 1]], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_psd_quadratic_form_drops_null_directions() {
        // rank one: only the first axis carries variance
        let a = array![[2.0, 0.0], [0.0, 0.0]];
        let d = array![1.0, 5.0];
        let (value, dim) = psd_quadratic_form(&a, &d, 1e-8);
        assert_eq!(dim, 1);
        assert_abs_diff_eq!(value, 0.5, epsilon = 1e-12);

        // negative directions are ignored as well
        let a = array![[1.0, 0.0], [0.0, -1.0]];
        let (_, dim) = psd_quadratic_form(&a, &d, 1e-8);
        assert_eq!(dim, 1);
    }
}
