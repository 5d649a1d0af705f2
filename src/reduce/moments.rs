//! Measurement histogram -> raw multiplicity series with statistical errors.
//!
//! Per incident-energy column, with `N(y)` the counts and `W = Σ N(y)`:
//!
//! ```text
//! mean     = Σ y N(y) / W
//! variance = max(Σ y² N(y) / W - mean², 0)
//! std_err  = sqrt(variance / W)
//! ```
//!
//! The floor at zero rejects tiny negative variances produced by rounding.
//! Empty columns keep their place (so energies stay index-aligned with
//! reference series) but have undefined moments.

use tracing::{debug, warn};

use crate::domain::{BinWindow, ColumnMoments, EventHistogram2D, MeasurementPoint, RawMeasurementSeries};
use crate::error::{AppError, Stage};

/// Relative tolerance when checking that two series share an energy grid.
const ENERGY_MATCH_TOL: f64 = 1e-9;

/// Conditional moments of every column, in column order.
pub fn reduce_moments(hist: &EventHistogram2D) -> Vec<ColumnMoments> {
    let y = hist.y_values();
    let counts = hist.counts();

    hist.x_values()
        .iter()
        .enumerate()
        .map(|(col, &x)| {
            let weight = hist.column_weight(col);
            if weight <= 0.0 {
                return ColumnMoments {
                    x,
                    weight,
                    mean: None,
                    variance: None,
                    std_error: None,
                };
            }

            let column = counts.column(col);
            let mut m1 = 0.0;
            let mut m2 = 0.0;
            for (&yi, &ci) in y.iter().zip(column.iter()) {
                let p = ci / weight;
                m1 += yi * p;
                m2 += yi * yi * p;
            }
            let variance = (m2 - m1 * m1).max(0.0);
            let std_error = (variance / weight).sqrt();

            ColumnMoments {
                x,
                weight,
                mean: Some(m1).filter(|v| v.is_finite()),
                variance: Some(variance).filter(|v| v.is_finite()),
                std_error: Some(std_error).filter(|v| v.is_finite()),
            }
        })
        .collect()
}

/// Reduce a measurement histogram and keep the bins selected by `window`.
///
/// Every selected bin must have a defined mean; its standard error may be
/// undefined.
pub fn measurement_series(
    hist: &EventHistogram2D,
    label: &str,
    window: BinWindow,
) -> Result<RawMeasurementSeries, AppError> {
    let moments = reduce_moments(hist);
    if window.first >= moments.len() {
        return Err(AppError::data_shape(format!(
            "Bin window starts at {} but the histogram has {} energy bins.",
            window.first,
            moments.len()
        ))
        .at(Stage::Reduction)
        .for_input(label));
    }

    let end = match window.count {
        Some(count) => (window.first + count).min(moments.len()),
        None => moments.len(),
    };
    if let Some(count) = window.count {
        if end - window.first < count {
            warn!(
                label,
                requested = count,
                available = end - window.first,
                "measurement has fewer bins than requested"
            );
        }
    }

    let mut points = Vec::with_capacity(end - window.first);
    for m in &moments[window.first..end] {
        let Some(raw_mult) = m.mean else {
            return Err(AppError::data_shape(format!(
                "Energy bin {} has zero total counts; its mean multiplicity is undefined.",
                m.x
            ))
            .at(Stage::Reduction)
            .for_input(label));
        };
        points.push(MeasurementPoint {
            energy: m.x,
            raw_mult,
            stat_err: m.std_error,
        });
    }

    debug!(label, n = points.len(), "reduced measurement series");

    Ok(RawMeasurementSeries {
        label: label.to_string(),
        points,
    })
}

/// Combine two measurements of the same energy grid.
///
/// Points `[0, split)` come from `primary`, the rest from `secondary`. This is
/// how short and long coincidence gates are merged: each gate is kept where
/// its statistics or pile-up behaviour is better.
pub fn splice(
    primary: &RawMeasurementSeries,
    secondary: &RawMeasurementSeries,
    split: usize,
) -> Result<RawMeasurementSeries, AppError> {
    if primary.len() != secondary.len() {
        return Err(AppError::data_shape(format!(
            "Cannot splice series of different lengths ({} vs {}).",
            primary.len(),
            secondary.len()
        ))
        .at(Stage::Reduction)
        .for_input(format!("{} + {}", primary.label, secondary.label)));
    }
    if split > primary.len() {
        return Err(AppError::config(format!(
            "Splice index {split} is beyond the series length {}.",
            primary.len()
        )));
    }

    for (p, s) in primary.points.iter().zip(&secondary.points) {
        let tol = ENERGY_MATCH_TOL * (1.0 + p.energy.abs());
        if (p.energy - s.energy).abs() > tol {
            return Err(AppError::data_shape(format!(
                "Energy grids differ ({} vs {}).",
                p.energy, s.energy
            ))
            .at(Stage::Reduction)
            .for_input(format!("{} + {}", primary.label, secondary.label)));
        }
    }

    let points = primary.points[..split]
        .iter()
        .chain(&secondary.points[split..])
        .copied()
        .collect();

    Ok(RawMeasurementSeries {
        label: format!("{}[..{split}] + {}[{split}..]", primary.label, secondary.label),
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HistogramEntry;
    use crate::error::ErrorKind;

    fn hist(entries: &[(f64, f64, f64)]) -> EventHistogram2D {
        let entries: Vec<HistogramEntry> = entries
            .iter()
            .map(|&(x, y, weight)| HistogramEntry { x, y, weight })
            .collect();
        EventHistogram2D::from_entries(&entries).unwrap()
    }

    fn series(label: &str, values: &[(f64, f64)]) -> RawMeasurementSeries {
        RawMeasurementSeries {
            label: label.to_string(),
            points: values
                .iter()
                .map(|&(energy, raw_mult)| MeasurementPoint {
                    energy,
                    raw_mult,
                    stat_err: Some(0.1),
                })
                .collect(),
        }
    }

    #[test]
    fn delta_columns_have_zero_variance() {
        let h = hist(&[(1.0, 2.0, 10.0), (2.0, 4.0, 10.0), (3.0, 6.0, 10.0)]);
        let m = reduce_moments(&h);
        let means: Vec<f64> = m.iter().map(|c| c.mean.unwrap()).collect();
        assert_eq!(means, vec![2.0, 4.0, 6.0]);
        for c in &m {
            assert_eq!(c.variance, Some(0.0));
            assert_eq!(c.std_error, Some(0.0));
        }
    }

    #[test]
    fn standard_error_uses_total_column_weight() {
        // y = 0 or 2 with equal counts: mean 1, variance 1, W = 4.
        let h = hist(&[(1.0, 0.0, 2.0), (1.0, 2.0, 2.0)]);
        let m = reduce_moments(&h);
        assert!((m[0].mean.unwrap() - 1.0).abs() < 1e-12);
        assert!((m[0].variance.unwrap() - 1.0).abs() < 1e-12);
        assert!((m[0].std_error.unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn empty_column_has_undefined_moments() {
        let h = hist(&[(0.0, 1.0, 0.0), (1.0, 1.0, 3.0)]);
        let m = reduce_moments(&h);
        assert_eq!(m.len(), 2);
        assert!(m[0].mean.is_none());
        assert!(m[0].std_error.is_none());
        assert!(m[1].mean.is_some());
    }

    #[test]
    fn window_skips_leading_bins_and_truncates() {
        let h = hist(&[(0.0, 1.0, 0.0), (1.0, 2.0, 1.0), (2.0, 3.0, 1.0), (3.0, 4.0, 1.0)]);
        let s = measurement_series(
            &h,
            "meas",
            BinWindow {
                first: 1,
                count: Some(2),
            },
        )
        .unwrap();
        assert_eq!(s.energies(), vec![1.0, 2.0]);

        let s = measurement_series(&h, "meas", BinWindow { first: 1, count: Some(30) }).unwrap();
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn selected_empty_bin_is_a_data_shape_error() {
        let h = hist(&[(0.0, 1.0, 0.0), (1.0, 2.0, 1.0)]);
        let err = measurement_series(&h, "meas", BinWindow { first: 0, count: None }).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataShape);
        assert_eq!(err.stage(), Some(Stage::Reduction));
        assert_eq!(err.input(), Some("meas"));
    }

    #[test]
    fn splice_takes_head_of_primary_and_tail_of_secondary() {
        let a = series("long", &[(1.0, 10.0), (2.0, 11.0), (3.0, 12.0)]);
        let b = series("short", &[(1.0, 20.0), (2.0, 21.0), (3.0, 22.0)]);
        let s = splice(&a, &b, 1).unwrap();
        let values: Vec<f64> = s.points.iter().map(|p| p.raw_mult).collect();
        assert_eq!(values, vec![10.0, 21.0, 22.0]);
    }

    #[test]
    fn splice_rejects_mismatched_grids() {
        let a = series("long", &[(1.0, 10.0), (2.0, 11.0)]);
        let b = series("short", &[(1.0, 20.0), (2.5, 21.0)]);
        assert!(splice(&a, &b, 1).is_err());

        let c = series("short", &[(1.0, 20.0)]);
        assert!(splice(&a, &c, 1).is_err());
    }
}
