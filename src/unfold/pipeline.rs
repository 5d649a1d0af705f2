//! Unfolding of one measurement series.
//!
//! Stages, strictly in order:
//!
//! 1. correction: `g = raw - c·ν̄ + pileup(E)`
//! 2. error aggregation: contamination and statistical errors in quadrature
//! 3. inversion with the calibrated `(a, b)`
//! 4. delta-method propagation, with a separate statistical-only channel
//! 5. optional persistence as a three-column table
//!
//! The total and statistical-only channels are kept separate.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::domain::{
    CorrectedPoint, NubarSeries, RawMeasurementSeries, UncertaintyBudget, UnfoldedMeasurementSeries, UnfoldedPoint,
};
use crate::error::{AppError, Stage};
use crate::io::write_unfolded_table;
use crate::models::response::{inverse, inverse_partials};
use crate::unfold::calibration::Calibration;
use crate::unfold::corrections::{apply_corrections, correction_terms};

/// Unfolding pipeline bound to one immutable calibration context.
#[derive(Debug, Clone)]
pub struct UnfoldingPipeline<'a> {
    calibration: &'a Calibration,
    output: Option<PathBuf>,
}

impl<'a> UnfoldingPipeline<'a> {
    pub fn new(calibration: &'a Calibration) -> Self {
        Self {
            calibration,
            output: None,
        }
    }

    /// Persist the unfolded table to `path` at the end of `run`.
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn calibration(&self) -> &Calibration {
        self.calibration
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    /// Stages 1 and 2.
    pub fn correct(&self, series: &RawMeasurementSeries, nubar: &NubarSeries) -> Result<Vec<CorrectedPoint>, AppError> {
        let terms = correction_terms(series, nubar, self.calibration)?;
        Ok(apply_corrections(series, &terms))
    }

    /// Stages 3 and 4 for a single corrected point.
    pub fn unfold_point(&self, point: &CorrectedPoint) -> Result<UnfoldedPoint, AppError> {
        let response = &self.calibration.response;
        let params = response.params();
        let at_energy = || format!("E={} MeV", point.energy);

        let multiplicity = inverse(point.detected, params).map_err(|e| e.at(Stage::Inversion).for_input(at_energy()))?;
        let partials =
            inverse_partials(point.detected, params).map_err(|e| e.at(Stage::Inversion).for_input(at_energy()))?;

        let budget = UncertaintyBudget {
            from_a: partials.d_a * response.sigma_a,
            from_b: partials.d_b * response.sigma_b,
            from_input: partials.d_g * point.detected_err,
        };

        let stat_err = point
            .stat_err
            .map(|s| inverse(s, params))
            .transpose()
            .map_err(|e| e.at(Stage::Inversion).for_input(at_energy()))?;

        debug!(
            energy = point.energy,
            detected = point.detected,
            multiplicity,
            total_err = budget.total(),
            "unfolded point"
        );

        Ok(UnfoldedPoint {
            energy: point.energy,
            multiplicity,
            total_err: budget.total(),
            stat_err,
            budget,
        })
    }

    /// Run every stage on `series`, writing the table when an output is set.
    pub fn run(
        &self,
        series: &RawMeasurementSeries,
        nubar: &NubarSeries,
    ) -> Result<UnfoldedMeasurementSeries, AppError> {
        let corrected = self.correct(series, nubar)?;
        let points = corrected
            .iter()
            .map(|p| self.unfold_point(p))
            .collect::<Result<Vec<_>, _>>()?;

        let unfolded = UnfoldedMeasurementSeries {
            label: series.label.clone(),
            points,
        };
        info!(series = %unfolded.label, points = unfolded.len(), "unfolded measurement");

        if let Some(path) = &self.output {
            write_unfolded_table(path, &unfolded)?;
            info!(path = %path.display(), "wrote unfolded table");
        }

        Ok(unfolded)
    }
}
