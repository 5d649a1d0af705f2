//! Parameter covariance from a least squares Jacobian.
//!
//! For a fit with `n` points and `p` parameters, the estimated covariance is
//!
//! ```text
//! C = s² (JᵀJ)⁻¹,   s² = SSE / (n - p)
//! ```
//!
//! (residual variance estimated from the data, as for unweighted curve fits
//! with no absolute sigma).

use nalgebra::{DMatrix, DVector};

/// Covariance matrix of the parameters, or `None` when `JᵀJ` is not
/// positive definite or the result is not finite.
pub fn parameter_covariance(jacobian: &DMatrix<f64>, sse: f64) -> Option<DMatrix<f64>> {
    let n = jacobian.nrows();
    let p = jacobian.ncols();
    if n <= p || !sse.is_finite() || sse < 0.0 {
        return None;
    }

    if !jacobian.iter().all(|v| v.is_finite()) {
        return None;
    }
    let normal = jacobian.transpose() * jacobian;

    // Cholesky can succeed on a numerically singular matrix by a rounding
    // margin; require a usable condition number first.
    let sv = normal.clone().svd(false, false).singular_values;
    if !(sv.max().is_finite() && sv.min() > sv.max() * 1e-12) {
        return None;
    }

    let inverse = normal.cholesky()?.inverse();
    let s2 = sse / (n - p) as f64;
    let cov = inverse * s2;

    let diagonal_ok = cov.diagonal().iter().all(|v| v.is_finite() && *v >= 0.0);
    if diagonal_ok { Some(cov) } else { None }
}

/// Marginal 1-sigma uncertainties (square roots of the diagonal).
pub fn marginal_sigmas(cov: &DMatrix<f64>) -> DVector<f64> {
    cov.diagonal().map(f64::sqrt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_line_covariance() {
        // y = b0 + b1 x at x = 0, 1, 2 with SSE = 1 => s² = 1.
        let j = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let cov = parameter_covariance(&j, 1.0).unwrap();
        // (JᵀJ)⁻¹ = [[5, -3], [-3, 3]] / 6
        assert!((cov[(0, 0)] - 5.0 / 6.0).abs() < 1e-12);
        assert!((cov[(0, 1)] + 0.5).abs() < 1e-12);
        assert!((cov[(1, 1)] - 0.5).abs() < 1e-12);

        let s = marginal_sigmas(&cov);
        assert!((s[1] - 0.5_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn singular_normal_matrix_has_no_covariance() {
        let j = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);
        assert!(parameter_covariance(&j, 1.0).is_none());
    }

    #[test]
    fn non_finite_jacobian_has_no_covariance() {
        let j = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, f64::NAN, 1.0, 2.0]);
        assert!(parameter_covariance(&j, 1.0).is_none());
    }

    #[test]
    fn no_degrees_of_freedom_has_no_covariance() {
        let j = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1.0]);
        assert!(parameter_covariance(&j, 0.0).is_none());
    }
}
