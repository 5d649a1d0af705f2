//! Saturating response of SCONE to fission gamma-ray cascades.
//!
//! ```text
//! detected(e) = a · (1 - exp(-e / b))        a, b > 0
//! emitted(d)  = -b · ln(1 - d / a)           d < a
//! ```
//!
//! Numerical notes:
//! - `1 - exp(-x)` is computed as `-expm1(-x)` and `ln(1 - u)` as `ln_1p(-u)`
//!   to keep precision at small multiplicities.
//! - `d >= a` means the measured efficiency exceeds the asymptotic saturation.
//!   That is physically inconsistent (bad data or a stale fit), so the inverse
//!   returns a domain error instead of an infinite or NaN value.

use crate::domain::ResponseParams;
use crate::error::AppError;
use crate::math::{RootOptions, find_root};

/// Mean detected multiplicity for a cascade of `emitted` gamma-rays.
pub fn forward(emitted: f64, p: ResponseParams) -> f64 {
    p.a * -(-emitted / p.b).exp_m1()
}

/// Gradient of `forward` with respect to `(a, b)`.
pub fn forward_gradient(emitted: f64, p: ResponseParams) -> [f64; 2] {
    let decay = (-emitted / p.b).exp();
    let d_a = -(-emitted / p.b).exp_m1();
    let d_b = -p.a * emitted * decay / (p.b * p.b);
    [d_a, d_b]
}

/// Closed-form inverse: emitted multiplicity for a detected multiplicity.
pub fn inverse(detected: f64, p: ResponseParams) -> Result<f64, AppError> {
    check_inverse_domain(detected, p)?;
    Ok(-p.b * (-detected / p.a).ln_1p())
}

/// Numerical inverse by root finding on `forward(e) - detected`.
///
/// Agrees with [`inverse`] to solver tolerance; the closed form is the one the
/// pipeline uses.
pub fn inverse_numeric(detected: f64, p: ResponseParams) -> Result<f64, AppError> {
    check_inverse_domain(detected, p)?;

    let f = |e: f64| forward(e, p) - detected;
    let df = |e: f64| p.a / p.b * (-e / p.b).exp();

    // `forward` is increasing with forward(0) = 0: expand away from 0 until
    // the target is bracketed.
    let (mut lo, mut hi) = if detected >= 0.0 { (0.0, p.b) } else { (-p.b, 0.0) };
    for _ in 0..1100 {
        if f(lo) <= 0.0 && f(hi) >= 0.0 {
            break;
        }
        if detected >= 0.0 {
            hi *= 2.0;
        } else {
            lo *= 2.0;
        }
    }

    find_root(f, df, lo, hi, RootOptions::default()).ok_or_else(|| {
        AppError::domain(format!(
            "Root finding did not converge for detected={detected} (a={}, b={}).",
            p.a, p.b
        ))
    })
}

/// Partial derivatives of the inverse at a detected value `g`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InversePartials {
    /// `∂e/∂a = -b·g / (a²·(1 - g/a))`
    pub d_a: f64,
    /// `∂e/∂b = -ln(1 - g/a)`
    pub d_b: f64,
    /// `∂e/∂g = b / (a·(1 - g/a))`
    pub d_g: f64,
}

pub fn inverse_partials(g: f64, p: ResponseParams) -> Result<InversePartials, AppError> {
    check_inverse_domain(g, p)?;
    let one_minus = 1.0 - g / p.a;
    Ok(InversePartials {
        d_a: -p.b * g / (p.a * p.a * one_minus),
        d_b: -(-g / p.a).ln_1p(),
        d_g: p.b / (p.a * one_minus),
    })
}

fn check_inverse_domain(detected: f64, p: ResponseParams) -> Result<(), AppError> {
    if !(p.a.is_finite() && p.b.is_finite() && p.a > 0.0 && p.b > 0.0) {
        return Err(AppError::domain(format!(
            "Response parameters must be finite and > 0 (a={}, b={}).",
            p.a, p.b
        )));
    }
    if !detected.is_finite() {
        return Err(AppError::domain(format!("Non-finite detected multiplicity {detected}.")));
    }
    if detected >= p.a {
        return Err(AppError::domain(format!(
            "Detected multiplicity {detected} is at or beyond the response asymptote a={}.",
            p.a
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const P: ResponseParams = ResponseParams { a: 20.0, b: 10.0 };

    #[test]
    fn forward_saturates_at_a() {
        assert_eq!(forward(0.0, P), 0.0);
        assert!((forward(1e4, P) - 20.0).abs() < 1e-9);
        assert!(forward(5.0, P) < forward(6.0, P));
    }

    #[test]
    fn inverse_round_trips_forward() {
        for p in [P, ResponseParams { a: 8.0, b: 3.0 }, ResponseParams { a: 19.0, b: 28.0 }] {
            for &e in &[0.0, 0.1, 1.0, 5.0, 12.5, 40.0] {
                let back = inverse(forward(e, p), p).unwrap();
                assert!((back - e).abs() < 1e-9 * (1.0 + e), "e={e} back={back}");
            }
        }
    }

    #[test]
    fn inverse_matches_closed_form_value() {
        let e = inverse(5.0, P).unwrap();
        let expected = -10.0 * (1.0_f64 - 5.0 / 20.0).ln();
        assert!((e - expected).abs() < 1e-12);
        assert!((e - 2.877).abs() < 1e-3);
    }

    #[test]
    fn inverse_at_asymptote_is_a_domain_error() {
        let err = inverse(20.0, P).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Domain);
        assert!(inverse(25.0, P).is_err());
        assert!(inverse(f64::NAN, P).is_err());
        assert!(inverse_partials(20.0, P).is_err());
    }

    #[test]
    fn numeric_inverse_agrees_with_closed_form() {
        for &d in &[-1.0, 0.0, 0.5, 5.0, 15.0, 19.9] {
            let closed = inverse(d, P).unwrap();
            let numeric = inverse_numeric(d, P).unwrap();
            assert!((closed - numeric).abs() < 1e-8 * (1.0 + closed.abs()), "d={d}");
        }
        assert!(inverse_numeric(20.0, P).is_err());
    }

    #[test]
    fn partials_match_finite_differences() {
        let g = 7.0;
        let partials = inverse_partials(g, P).unwrap();
        let h = 1e-6;

        let da = (inverse(g, ResponseParams { a: P.a + h, ..P }).unwrap()
            - inverse(g, ResponseParams { a: P.a - h, ..P }).unwrap())
            / (2.0 * h);
        let db = (inverse(g, ResponseParams { b: P.b + h, ..P }).unwrap()
            - inverse(g, ResponseParams { b: P.b - h, ..P }).unwrap())
            / (2.0 * h);
        let dg = (inverse(g + h, P).unwrap() - inverse(g - h, P).unwrap()) / (2.0 * h);

        assert!((partials.d_a - da).abs() < 1e-6);
        assert!((partials.d_b - db).abs() < 1e-6);
        assert!((partials.d_g - dg).abs() < 1e-6);
    }

    #[test]
    fn forward_gradient_matches_finite_differences() {
        let e = 6.0;
        let [ga, gb] = forward_gradient(e, P);
        let h = 1e-6;
        let fa = (forward(e, ResponseParams { a: P.a + h, ..P }) - forward(e, ResponseParams { a: P.a - h, ..P }))
            / (2.0 * h);
        let fb = (forward(e, ResponseParams { b: P.b + h, ..P }) - forward(e, ResponseParams { b: P.b - h, ..P }))
            / (2.0 * h);
        assert!((ga - fa).abs() < 1e-7);
        assert!((gb - fb).abs() < 1e-7);
    }
}
