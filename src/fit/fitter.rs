//! Nonlinear least squares fit of the response model.
//!
//! Given points `(e_i, d_i)` (emitted, mean detected) we minimize
//!
//! ```text
//! SSE(a, b) = Σ (d_i - a·(1 - exp(-e_i / b)))²
//! ```
//!
//! with a Levenberg-Marquardt iteration. Both constants must stay positive, so
//! the iteration runs on `θ = (ln a, ln b)`: every iterate maps back to a
//! strictly positive `(a, b)` and the solver can never wander into a negative
//! asymptote.
//!
//! Uncertainties come from the covariance `s²·(JᵀJ)⁻¹` evaluated in the
//! original `(a, b)` coordinates at the solution.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::domain::{FitQuality, FittedResponseModel, ReducedResponseCurve, ResponseParams};
use crate::error::{AppError, Stage};
use crate::math::{marginal_sigmas, parameter_covariance, solve_damped};
use crate::models::{forward, forward_gradient};

/// Number of free parameters (a, b).
const N_PARAMS: usize = 2;

/// Smallest damping scale, so flat directions still get damped.
const MIN_SCALE: f64 = 1e-12;

/// Damping above which the iteration is considered stuck.
const MAX_LAMBDA: f64 = 1e20;

/// Solver settings.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Starting point. Both values must be finite and > 0.
    pub initial: ResponseParams,
    /// Iteration cap (accepted + rejected steps).
    pub max_iterations: usize,
    /// Converged when an accepted step reduces SSE by less than `f_tol · SSE`.
    pub f_tol: f64,
    /// Converged when a step in `θ` is smaller than `x_tol · (‖θ‖ + x_tol)`.
    pub x_tol: f64,
    /// Initial Levenberg-Marquardt damping.
    pub lambda_init: f64,
}

impl FitOptions {
    /// Settings for a single reference curve.
    pub fn single() -> Self {
        Self {
            initial: ResponseParams { a: 10.0, b: 20.0 },
            max_iterations: 500,
            f_tol: 1e-12,
            x_tol: 1e-10,
            lambda_init: 1e-3,
        }
    }

    /// Settings for several pooled curves: larger, noisier sample, higher cap.
    pub fn joint() -> Self {
        Self {
            initial: ResponseParams { a: 20.0, b: 30.0 },
            max_iterations: 20_000,
            ..Self::single()
        }
    }
}

impl Default for FitOptions {
    fn default() -> Self {
        Self::single()
    }
}

/// Fit one reduced curve.
pub fn fit_response(curve: &ReducedResponseCurve, opts: &FitOptions) -> Result<FittedResponseModel, AppError> {
    if curve.is_empty() {
        return Err(AppError::data_shape("Reduced response curve is empty.")
            .at(Stage::Fitting)
            .for_input(curve.label.clone()));
    }
    fit_points(&curve.emitted(), &curve.detected(), opts).map_err(|e| e.for_input(curve.label.clone()))
}

/// Fit several curves at once.
///
/// Points from all curves are concatenated into one unordered sample; dataset
/// boundaries carry no weighting. Every curve must be non-empty so that a bad
/// reference file is reported instead of silently contributing nothing.
pub fn fit_response_joint(
    curves: &[ReducedResponseCurve],
    opts: &FitOptions,
) -> Result<FittedResponseModel, AppError> {
    if curves.is_empty() {
        return Err(AppError::data_shape("No reference curves to fit.").at(Stage::Fitting));
    }

    let mut x = Vec::new();
    let mut y = Vec::new();
    for curve in curves {
        if curve.is_empty() {
            return Err(AppError::data_shape("Reduced response curve is empty.")
                .at(Stage::Fitting)
                .for_input(curve.label.clone()));
        }
        x.extend(curve.emitted());
        y.extend(curve.detected());
    }

    let labels: Vec<&str> = curves.iter().map(|c| c.label.as_str()).collect();
    fit_points(&x, &y, opts).map_err(|e| e.for_input(labels.join(", ")))
}

/// Fit the response model to raw `(emitted, detected)` arrays.
pub fn fit_points(x: &[f64], y: &[f64], opts: &FitOptions) -> Result<FittedResponseModel, AppError> {
    validate_inputs(x, y, opts).map_err(|e| e.at(Stage::Fitting))?;

    let n = x.len();
    let mut theta = [opts.initial.a.ln(), opts.initial.b.ln()];
    let mut residuals = residual_vector(x, y, params_of(theta));
    let mut sse = residuals.norm_squared();
    let mut lambda = opts.lambda_init;

    let mut iterations = 0usize;
    let mut converged = sse == 0.0;

    while !converged {
        if iterations >= opts.max_iterations {
            let p = params_of(theta);
            return Err(AppError::fit_convergence(format!(
                "No convergence after {iterations} iterations (a={:.6}, b={:.6}, SSE={sse:.6e}).",
                p.a, p.b
            ))
            .at(Stage::Fitting));
        }
        iterations += 1;

        let jacobian = log_jacobian(x, params_of(theta));
        if !jacobian.iter().all(|v| v.is_finite()) {
            let p = params_of(theta);
            return Err(AppError::fit_convergence(format!(
                "Jacobian became non-finite after {iterations} iterations (a={:.6e}, b={:.6e}).",
                p.a, p.b
            ))
            .at(Stage::Fitting));
        }
        let scale = column_scale(&jacobian);

        let Some(step) = solve_damped(&jacobian, &residuals, lambda, &scale) else {
            lambda *= 10.0;
            if lambda > MAX_LAMBDA {
                return Err(AppError::fit_convergence("Damped normal equations became singular.")
                    .at(Stage::Fitting));
            }
            continue;
        };

        let theta_norm = (theta[0] * theta[0] + theta[1] * theta[1]).sqrt();
        let small_step = step.norm() <= opts.x_tol * (theta_norm + opts.x_tol);

        let candidate = [theta[0] + step[0], theta[1] + step[1]];
        let cand_params = params_of(candidate);
        let cand_residuals = residual_vector(x, y, cand_params);
        let cand_sse = cand_residuals.norm_squared();

        debug!(iterations, lambda, sse, cand_sse, "lm step");

        if cand_sse.is_finite() && cand_params.a.is_finite() && cand_params.b.is_finite() && cand_sse < sse {
            let reduction = sse - cand_sse;
            theta = candidate;
            residuals = cand_residuals;
            sse = cand_sse;
            lambda = (lambda * 0.3).max(1e-15);

            converged = sse == 0.0 || reduction <= opts.f_tol * sse || small_step;
        } else {
            lambda *= 10.0;
            // No downhill step even at small step length: we sit at a minimum.
            converged = small_step || lambda > MAX_LAMBDA;
        }
    }

    let params = params_of(theta);
    let jacobian = param_jacobian(x, params);
    let cov = parameter_covariance(&jacobian, sse).ok_or_else(|| {
        AppError::fit_convergence(format!(
            "Parameter covariance is not positive definite (a={:.6}, b={:.6}); \
             the data do not constrain both constants (duplicate abscissae?).",
            params.a, params.b
        ))
        .at(Stage::Fitting)
    })?;
    let sigmas = marginal_sigmas(&cov);

    let rmse = (sse / n as f64).sqrt();
    debug!(
        a = params.a,
        b = params.b,
        sigma_a = sigmas[0],
        sigma_b = sigmas[1],
        n,
        iterations,
        rmse,
        "response fit converged"
    );

    Ok(FittedResponseModel {
        a: params.a,
        b: params.b,
        sigma_a: sigmas[0],
        sigma_b: sigmas[1],
        quality: Some(FitQuality {
            n,
            sse,
            rmse,
            iterations,
        }),
    })
}

fn validate_inputs(x: &[f64], y: &[f64], opts: &FitOptions) -> Result<(), AppError> {
    if x.len() != y.len() {
        return Err(AppError::data_shape(format!(
            "Mismatched fit arrays ({} emitted vs {} detected).",
            x.len(),
            y.len()
        )));
    }
    if x.is_empty() {
        return Err(AppError::data_shape("No data points to fit."));
    }
    if x.len() <= N_PARAMS {
        return Err(AppError::data_shape(format!(
            "Need more than {N_PARAMS} points to fit and estimate uncertainties, got {}.",
            x.len()
        )));
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(AppError::data_shape("Fit data contain non-finite values."));
    }
    let p0 = opts.initial;
    if !(p0.a.is_finite() && p0.b.is_finite() && p0.a > 0.0 && p0.b > 0.0) {
        return Err(AppError::config(format!(
            "Initial guess must be finite and > 0 (a={}, b={}).",
            p0.a, p0.b
        )));
    }
    if opts.max_iterations == 0 {
        return Err(AppError::config("Iteration cap must be > 0."));
    }
    Ok(())
}

fn params_of(theta: [f64; 2]) -> ResponseParams {
    ResponseParams {
        a: theta[0].exp(),
        b: theta[1].exp(),
    }
}

/// `r_i = y_i - forward(x_i)`.
fn residual_vector(x: &[f64], y: &[f64], p: ResponseParams) -> DVector<f64> {
    DVector::from_iterator(x.len(), x.iter().zip(y).map(|(&xi, &yi)| yi - forward(xi, p)))
}

/// Jacobian of the model with respect to `(a, b)`.
fn param_jacobian(x: &[f64], p: ResponseParams) -> DMatrix<f64> {
    let mut j = DMatrix::<f64>::zeros(x.len(), N_PARAMS);
    for (i, &xi) in x.iter().enumerate() {
        let [d_a, d_b] = forward_gradient(xi, p);
        j[(i, 0)] = d_a;
        j[(i, 1)] = d_b;
    }
    j
}

/// Jacobian with respect to `(ln a, ln b)`: `∂f/∂ln p = p · ∂f/∂p`.
fn log_jacobian(x: &[f64], p: ResponseParams) -> DMatrix<f64> {
    let mut j = param_jacobian(x, p);
    for v in j.column_mut(0).iter_mut() {
        *v *= p.a;
    }
    for v in j.column_mut(1).iter_mut() {
        *v *= p.b;
    }
    j
}

/// Marquardt scaling: column norms of the Jacobian.
fn column_scale(j: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(j.ncols(), j.column_iter().map(|c| c.norm().max(MIN_SCALE)))
}
