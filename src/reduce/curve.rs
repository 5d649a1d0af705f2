//! Reference-simulation histogram -> mean detector response curve.
//!
//! For every emitted-multiplicity column we normalize the counts into a
//! probability mass over detected multiplicity and take its mean:
//!
//! ```text
//! mean_detected(x) = Σ_y y · N(x, y) / Σ_y N(x, y)
//! ```
//!
//! Columns with zero total weight are empty simulation bins and carry no
//! information; they are dropped before normalization.

use tracing::debug;

use crate::domain::{EventHistogram2D, MultRange, ReducedResponseCurve, ResponsePoint};

/// Reduce a simulation histogram to its conditional-mean response curve.
///
/// An empty histogram (or one where every column is empty) yields an empty
/// curve; it is up to the caller to reject it.
pub fn reduce_response(
    hist: &EventHistogram2D,
    label: &str,
    mult_range: Option<MultRange>,
) -> ReducedResponseCurve {
    let y = hist.y_values();
    let counts = hist.counts();

    let mut points = Vec::with_capacity(hist.n_columns());
    let mut dropped_empty = 0usize;

    for (col, &x) in hist.x_values().iter().enumerate() {
        let weight = hist.column_weight(col);
        if weight == 0.0 {
            dropped_empty += 1;
            continue;
        }

        let column = counts.column(col);
        let mean_detected = y
            .iter()
            .zip(column.iter())
            .map(|(&yi, &ci)| yi * (ci / weight))
            .sum::<f64>();

        if !(x.is_finite() && mean_detected.is_finite()) {
            continue;
        }
        if let Some(range) = mult_range {
            if !range.contains(x) {
                continue;
            }
        }

        points.push(ResponsePoint {
            emitted: x,
            mean_detected,
            weight,
        });
    }

    debug!(
        label,
        kept = points.len(),
        dropped_empty,
        "reduced response curve"
    );

    ReducedResponseCurve {
        label: label.to_string(),
        points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HistogramEntry;

    fn hist(entries: &[(f64, f64, f64)]) -> EventHistogram2D {
        let entries: Vec<HistogramEntry> = entries
            .iter()
            .map(|&(x, y, weight)| HistogramEntry { x, y, weight })
            .collect();
        EventHistogram2D::from_entries(&entries).unwrap()
    }

    #[test]
    fn single_column_gives_its_weighted_mean() {
        let h = hist(&[(4.0, 1.0, 2.0), (4.0, 2.0, 5.0), (4.0, 5.0, 3.0)]);
        let curve = reduce_response(&h, "single", None);
        assert_eq!(curve.len(), 1);
        let expected = (1.0 * 2.0 + 2.0 * 5.0 + 5.0 * 3.0) / 10.0;
        assert!((curve.points[0].mean_detected - expected).abs() < 1e-12);
        assert_eq!(curve.points[0].weight, 10.0);
    }

    #[test]
    fn all_zero_columns_are_dropped() {
        let h = hist(&[(1.0, 0.0, 0.0), (1.0, 1.0, 0.0), (2.0, 1.0, 4.0), (2.0, 3.0, 4.0)]);
        let curve = reduce_response(&h, "zeros", None);
        assert_eq!(curve.len(), 1);
        assert_eq!(curve.points[0].emitted, 2.0);
        assert!((curve.points[0].mean_detected - 2.0).abs() < 1e-12);
    }

    #[test]
    fn delta_columns_reduce_exactly() {
        let h = hist(&[(1.0, 2.0, 10.0), (2.0, 4.0, 10.0), (3.0, 6.0, 10.0)]);
        let curve = reduce_response(&h, "delta", None);
        assert_eq!(curve.emitted(), vec![1.0, 2.0, 3.0]);
        assert_eq!(curve.detected(), vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn mult_range_is_inclusive_on_both_ends() {
        let h = hist(&[
            (1.0, 1.0, 1.0),
            (2.0, 1.0, 1.0),
            (3.0, 2.0, 1.0),
            (4.0, 2.0, 1.0),
        ]);
        let curve = reduce_response(&h, "range", MultRange::new(2.0, 3.0));
        assert_eq!(curve.emitted(), vec![2.0, 3.0]);
    }

    #[test]
    fn empty_histogram_gives_empty_curve() {
        let h = hist(&[]);
        assert!(reduce_response(&h, "empty", None).is_empty());

        let h = hist(&[(1.0, 1.0, 0.0)]);
        assert!(reduce_response(&h, "all-empty", None).is_empty());
    }
}
