//! Linear least squares via SVD.
//!
//! Each Levenberg-Marquardt iteration solves a damped linear problem
//!
//! ```text
//! minimize ‖J δ - r‖² + λ ‖D δ‖²
//! ```
//!
//! which we express as an ordinary least squares problem on the stacked system
//! `[J; sqrt(λ) D] δ = [r; 0]`. Stacking keeps the conditioning of `J` rather
//! than squaring it as the normal equations `JᵀJ` would.
//!
//! Nalgebra's `QR::solve` is intended for square systems and panics for tall
//! matrices, so we use SVD.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is non-finite or too ill-conditioned to solve
/// robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    // Nalgebra's SVD panics on NaN input.
    if !(x.iter().all(|v| v.is_finite()) && y.iter().all(|v| v.is_finite())) {
        return None;
    }
    let svd = x.clone().svd(true, true);

    // A rank-deficient design (e.g. all abscissae identical) has a vanishing
    // singular value; reject it instead of returning a minimum-norm guess.
    let max_sv = svd.singular_values.max();
    let min_sv = svd.singular_values.min();
    if !(max_sv.is_finite() && max_sv > 0.0) || min_sv <= max_sv * 1e-12 {
        return None;
    }

    let beta = svd.solve(y, 1e-14).ok()?;
    if beta.iter().all(|v| v.is_finite()) {
        Some(beta)
    } else {
        None
    }
}

/// Solve the damped step `[J; sqrt(λ) D] δ = [r; 0]` where `D = diag(d)`.
pub fn solve_damped(
    jacobian: &DMatrix<f64>,
    residuals: &DVector<f64>,
    lambda: f64,
    scale: &DVector<f64>,
) -> Option<DVector<f64>> {
    let n = jacobian.nrows();
    let p = jacobian.ncols();

    let mut stacked = DMatrix::<f64>::zeros(n + p, p);
    stacked.view_mut((0, 0), (n, p)).copy_from(jacobian);
    if !lambda.is_finite() {
        return None;
    }
    let damping = lambda.max(0.0).sqrt();
    for j in 0..p {
        stacked[(n + j, j)] = damping * scale[j];
    }

    let mut rhs = DVector::<f64>::zeros(n + p);
    rhs.rows_mut(0, n).copy_from(residuals);

    solve_least_squares(&stacked, &rhs)
}
