//! Reporting utilities: per-curve residuals and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::{ReducedResponseCurve, ResponseParams};
use crate::models::response::forward;

/// Residual summary of one reference curve against the fitted model.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveResiduals {
    pub label: String,
    pub n: usize,
    pub rmse: f64,
    pub max_abs: f64,
}

/// Observed minus fitted mean detected multiplicity, per curve.
pub fn curve_residuals(curve: &ReducedResponseCurve, params: ResponseParams) -> CurveResiduals {
    let residuals: Vec<f64> = curve
        .points
        .iter()
        .map(|p| p.mean_detected - forward(p.emitted, params))
        .collect();
    let n = residuals.len();
    let sse: f64 = residuals.iter().map(|r| r * r).sum();
    CurveResiduals {
        label: curve.label.clone(),
        n,
        rmse: if n > 0 { (sse / n as f64).sqrt() } else { 0.0 },
        max_abs: residuals.iter().fold(0.0, |m, r| m.max(r.abs())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResponsePoint;

    #[test]
    fn residuals_vanish_on_model_points() {
        let params = ResponseParams { a: 20.0, b: 10.0 };
        let curve = ReducedResponseCurve {
            label: "exact".to_string(),
            points: (1..=5)
                .map(|e| ResponsePoint {
                    emitted: e as f64,
                    mean_detected: forward(e as f64, params),
                    weight: 1.0,
                })
                .collect(),
        };
        let r = curve_residuals(&curve, params);
        assert_eq!(r.n, 5);
        assert!(r.rmse < 1e-12);
        assert!(r.max_abs < 1e-12);
    }

    #[test]
    fn offset_curve_has_matching_rmse() {
        let params = ResponseParams { a: 20.0, b: 10.0 };
        let curve = ReducedResponseCurve {
            label: "offset".to_string(),
            points: (1..=4)
                .map(|e| ResponsePoint {
                    emitted: e as f64,
                    mean_detected: forward(e as f64, params) + 0.5,
                    weight: 1.0,
                })
                .collect(),
        };
        let r = curve_residuals(&curve, params);
        assert!((r.rmse - 0.5).abs() < 1e-12);
    }
}
