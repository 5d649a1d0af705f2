//! Dense 2D event histogram.
//!
//! Input files list occupied bins as `(x, y, weight)` triples. We pivot them
//! into a matrix whose rows are the distinct `y` values and whose columns are
//! the distinct `x` values, both sorted ascending. Unlisted cells hold zero.

use nalgebra::DMatrix;

use crate::error::AppError;

/// One occupied bin as read from disk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramEntry {
    /// Independent variable (emitted multiplicity or incident energy).
    pub x: f64,
    /// Detected multiplicity.
    pub y: f64,
    pub weight: f64,
}

/// Counts indexed by (detected row, independent-variable column).
#[derive(Debug, Clone)]
pub struct EventHistogram2D {
    x_values: Vec<f64>,
    y_values: Vec<f64>,
    counts: DMatrix<f64>,
}

impl EventHistogram2D {
    /// Pivot triples into a dense grid.
    ///
    /// Fails on non-finite coordinates, non-finite or negative weights, and on
    /// duplicated `(x, y)` pairs.
    pub fn from_entries(entries: &[HistogramEntry]) -> Result<Self, AppError> {
        for (i, e) in entries.iter().enumerate() {
            if !(e.x.is_finite() && e.y.is_finite()) {
                return Err(AppError::data_shape(format!(
                    "Entry {i} has a non-finite coordinate ({}, {}).",
                    e.x, e.y
                )));
            }
            if !e.weight.is_finite() || e.weight < 0.0 {
                return Err(AppError::data_shape(format!(
                    "Entry {i} has an invalid weight {} (must be finite and >= 0).",
                    e.weight
                )));
            }
        }

        let x_values = sorted_distinct(entries.iter().map(|e| canonical(e.x)));
        let y_values = sorted_distinct(entries.iter().map(|e| canonical(e.y)));

        let mut counts = DMatrix::<f64>::zeros(y_values.len(), x_values.len());
        let mut seen = DMatrix::<bool>::from_element(y_values.len(), x_values.len(), false);

        for e in entries {
            let col = index_of(&x_values, canonical(e.x));
            let row = index_of(&y_values, canonical(e.y));
            if seen[(row, col)] {
                return Err(AppError::data_shape(format!(
                    "Duplicate bin ({}, {}): a histogram lists each bin once.",
                    e.x, e.y
                )));
            }
            seen[(row, col)] = true;
            counts[(row, col)] = e.weight;
        }

        Ok(Self {
            x_values,
            y_values,
            counts,
        })
    }

    /// Distinct column values, ascending.
    pub fn x_values(&self) -> &[f64] {
        &self.x_values
    }

    /// Distinct row values, ascending.
    pub fn y_values(&self) -> &[f64] {
        &self.y_values
    }

    pub fn counts(&self) -> &DMatrix<f64> {
        &self.counts
    }

    pub fn n_columns(&self) -> usize {
        self.x_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x_values.is_empty()
    }

    /// Total weight of column `col`.
    pub fn column_weight(&self, col: usize) -> f64 {
        self.counts.column(col).sum()
    }
}

/// Folds `-0.0` into `0.0` so both land on the same bin.
fn canonical(v: f64) -> f64 {
    v + 0.0
}

fn sorted_distinct(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut out: Vec<f64> = values.collect();
    out.sort_by(|a, b| a.total_cmp(b));
    out.dedup_by(|a, b| a.total_cmp(b).is_eq());
    out
}

fn index_of(sorted: &[f64], v: f64) -> usize {
    // `v` comes from the same entries the axis was built from, so it is present.
    sorted
        .binary_search_by(|probe| probe.total_cmp(&v))
        .unwrap_or_else(|i| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(x: f64, y: f64, weight: f64) -> HistogramEntry {
        HistogramEntry { x, y, weight }
    }

    #[test]
    fn pivot_sorts_axes_and_fills_missing_cells_with_zero() {
        let h = EventHistogram2D::from_entries(&[
            entry(2.0, 1.0, 3.0),
            entry(1.0, 0.0, 5.0),
            entry(1.0, 1.0, 2.0),
        ])
        .unwrap();

        assert_eq!(h.x_values(), &[1.0, 2.0]);
        assert_eq!(h.y_values(), &[0.0, 1.0]);
        assert_eq!(h.counts()[(0, 0)], 5.0);
        assert_eq!(h.counts()[(1, 0)], 2.0);
        assert_eq!(h.counts()[(0, 1)], 0.0);
        assert_eq!(h.counts()[(1, 1)], 3.0);
        assert_eq!(h.column_weight(0), 7.0);
    }

    #[test]
    fn signed_zeros_share_one_bin() {
        let h = EventHistogram2D::from_entries(&[
            entry(-0.0, 1.0, 2.0),
            entry(0.0, 2.0, 3.0),
            entry(1.0, 1.0, 4.0),
        ])
        .unwrap();
        assert_eq!(h.x_values().len(), 2);
        assert_eq!(h.column_weight(0), 5.0);
        assert_eq!(h.column_weight(1), 4.0);

        let err = EventHistogram2D::from_entries(&[entry(1.0, -0.0, 1.0), entry(1.0, 0.0, 1.0)]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::DataShape);
    }

    #[test]
    fn duplicate_bins_are_rejected() {
        let err = EventHistogram2D::from_entries(&[entry(1.0, 1.0, 1.0), entry(1.0, 1.0, 2.0)])
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::DataShape);
    }

    #[test]
    fn negative_weight_is_rejected() {
        assert!(EventHistogram2D::from_entries(&[entry(1.0, 1.0, -1.0)]).is_err());
    }

    #[test]
    fn no_entries_gives_empty_histogram() {
        let h = EventHistogram2D::from_entries(&[]).unwrap();
        assert!(h.is_empty());
    }
}
