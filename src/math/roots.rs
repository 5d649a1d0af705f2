//! Bracketed scalar root finding.
//!
//! Safeguarded Newton iteration: a Newton step is taken when it stays inside
//! the current bracket, otherwise we bisect. The bracket always shrinks, so the
//! iteration terminates for any continuous function with a sign change.

/// Tolerances for `find_root`.
#[derive(Debug, Clone, Copy)]
pub struct RootOptions {
    pub x_tol: f64,
    pub max_iterations: usize,
}

impl Default for RootOptions {
    fn default() -> Self {
        Self {
            x_tol: 1e-12,
            max_iterations: 200,
        }
    }
}

/// Find `x` in `[lo, hi]` with `f(x) = 0`, given `f` and its derivative `df`.
///
/// Returns `None` if `f(lo)` and `f(hi)` do not bracket a root or the iteration
/// cap is reached.
pub fn find_root(
    f: impl Fn(f64) -> f64,
    df: impl Fn(f64) -> f64,
    mut lo: f64,
    mut hi: f64,
    opts: RootOptions,
) -> Option<f64> {
    let mut f_lo = f(lo);
    let f_hi = f(hi);
    if !(f_lo.is_finite() && f_hi.is_finite()) {
        return None;
    }
    if f_lo == 0.0 {
        return Some(lo);
    }
    if f_hi == 0.0 {
        return Some(hi);
    }
    if f_lo.signum() == f_hi.signum() {
        return None;
    }

    let mut x = 0.5 * (lo + hi);
    for _ in 0..opts.max_iterations {
        let fx = f(x);
        if fx == 0.0 {
            return Some(x);
        }

        if fx.signum() == f_lo.signum() {
            lo = x;
            f_lo = fx;
        } else {
            hi = x;
        }

        if (hi - lo).abs() <= opts.x_tol * (1.0 + x.abs()) {
            return Some(0.5 * (lo + hi));
        }

        let slope = df(x);
        let newton = x - fx / slope;
        if newton.is_finite() && (newton - x).abs() <= opts.x_tol * (1.0 + x.abs()) {
            return Some(newton);
        }
        x = if slope.is_finite() && slope != 0.0 && newton > lo && newton < hi {
            newton
        } else {
            0.5 * (lo + hi)
        };
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_square_root_of_two() {
        let r = find_root(|x| x * x - 2.0, |x| 2.0 * x, 0.0, 2.0, RootOptions::default()).unwrap();
        assert!((r - 2.0_f64.sqrt()).abs() < 1e-10);
    }

    #[test]
    fn no_sign_change_is_none() {
        assert!(find_root(|x| x * x + 1.0, |x| 2.0 * x, -1.0, 1.0, RootOptions::default()).is_none());
    }
}
