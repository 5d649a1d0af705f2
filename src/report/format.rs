//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the numerical code stays clean and testable
//! - output changes are localized

use crate::domain::{FittedResponseModel, ReducedResponseCurve, UnfoldedMeasurementSeries};
use crate::report::curve_residuals;
use crate::unfold::{Calibration, CalibrationOrigin};

/// Format the summary of a response fit.
pub fn format_fit_summary(curves: &[ReducedResponseCurve], fitted: &FittedResponseModel) -> String {
    let mut out = String::new();

    out.push_str("=== scone - response fit ===\n");
    out.push_str(&format!("a = {:.4} ± {:.4}\n", fitted.a, fitted.sigma_a));
    out.push_str(&format!("b = {:.4} ± {:.4}\n", fitted.b, fitted.sigma_b));
    if let Some(q) = &fitted.quality {
        out.push_str(&format!(
            "Points: n={} | SSE={:.5} | RMSE={:.5} | iterations={}\n",
            q.n, q.sse, q.rmse, q.iterations
        ));
    }

    out.push_str("\nPer-file residuals:\n");
    out.push_str(&format!("{:<32} {:>6} {:>10} {:>10}\n", "file", "n", "rmse", "max|r|"));
    out.push_str(&format!("{:-<32} {:-<6} {:-<10} {:-<10}\n", "", "", "", ""));
    for curve in curves {
        let r = curve_residuals(curve, fitted.params());
        out.push_str(&format!(
            "{:<32} {:>6} {:>10.5} {:>10.5}\n",
            truncate(&r.label, 32),
            r.n,
            r.rmse,
            r.max_abs
        ));
    }

    out
}

/// One line describing the calibration in use.
pub fn format_calibration(calibration: &Calibration) -> String {
    let r = &calibration.response;
    let origin = match &calibration.origin {
        CalibrationOrigin::Static => "static".to_string(),
        CalibrationOrigin::Fitted { references } => format!("fitted on {} file(s)", references.len()),
    };
    format!(
        "Calibration ({origin}): a={:.3}±{:.3} b={:.3}±{:.3} c={:.3}±{:.3}",
        r.a, r.sigma_a, r.b, r.sigma_b, calibration.contamination.value, calibration.contamination.sigma
    )
}

/// Unfolded multiplicities with both uncertainty channels.
///
/// Energies are shown as bin centre ± half-width.
pub fn format_unfolded_table(series: &UnfoldedMeasurementSeries, energy_half_width: f64) -> String {
    let mut out = String::new();
    out.push_str(&format!("Unfolded: {} ({} points)\n", series.label, series.len()));
    out.push_str(
        format!(
            "{:>14} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}\n",
            "E [MeV]", "M_gamma", "total", "stat", "from_a", "from_b", "from_g"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<14} {:-<10} {:-<10} {:-<10} {:-<10} {:-<10} {:-<10}\n",
            "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for p in &series.points {
        let energy = format!("{:.2}±{:.2}", p.energy, energy_half_width);
        let stat = p.stat_err.map(|s| format!("{s:.4}")).unwrap_or_else(|| "-".to_string());
        out.push_str(
            format!(
                "{:>14} {:>10.4} {:>10.4} {:>10} {:>10.4} {:>10.4} {:>10.4}\n",
                energy,
                p.multiplicity,
                p.total_err,
                stat,
                p.budget.from_a.abs(),
                p.budget.from_b.abs(),
                p.budget.from_input.abs(),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{UncertaintyBudget, UnfoldedPoint};

    #[test]
    fn unfolded_table_marks_missing_stat_error() {
        let series = UnfoldedMeasurementSeries {
            label: "meas".to_string(),
            points: vec![UnfoldedPoint {
                energy: 2.0,
                multiplicity: 7.5,
                total_err: 0.4,
                stat_err: None,
                budget: UncertaintyBudget {
                    from_a: -0.2,
                    from_b: 0.3,
                    from_input: 0.1,
                },
            }],
        };
        let text = format_unfolded_table(&series, 0.5);
        let row = text.lines().nth(3).unwrap();
        assert!(row.contains("2.00±0.50"));
        assert!(row.contains(" - "));
        assert!(row.contains("0.2000"));
    }

    #[test]
    fn truncate_marks_cut_labels() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd.");
    }
}
