//! Physical corrections to the raw detected multiplicity.
//!
//! ```text
//! g(E) = raw(E) - c·ν̄(E) + pileup(E)
//! ```
//!
//! Neutrons interacting in the scintillators are counted as gamma-rays; their
//! share scales with the average prompt-neutron multiplicity ν̄. Neutron-gamma
//! pile-up adds spurious coincidences that grow with incident energy.
//!
//! Independent uncertainties are combined as variances:
//!
//! ```text
//! σ_contam = sqrt((ν̄·σc)² + (c·σν̄)²)
//! σ_g      = sqrt(σ_contam² + σ_stat²)
//! ```

use tracing::warn;

use crate::domain::{CorrectedPoint, CorrectionTerms, NubarSeries, RawMeasurementSeries};
use crate::error::{AppError, Stage};
use crate::unfold::calibration::{Calibration, ContaminationConstant};

/// Neutron contamination and its 1-sigma uncertainty.
pub fn neutron_contamination(c: ContaminationConstant, nubar: f64, nubar_err: f64) -> (f64, f64) {
    let contamination = c.value * nubar;
    let sigma = quadrature(&[nubar * c.sigma, c.value * nubar_err]);
    (contamination, sigma)
}

/// Square root of the sum of squares.
pub fn quadrature(terms: &[f64]) -> f64 {
    terms.iter().map(|t| t * t).sum::<f64>().sqrt()
}

/// Per-energy correction terms. `nubar` must be index-aligned with `series`.
pub fn correction_terms(
    series: &RawMeasurementSeries,
    nubar: &NubarSeries,
    calibration: &Calibration,
) -> Result<Vec<CorrectionTerms>, AppError> {
    if nubar.values.len() != series.len() || nubar.errors.len() != series.len() {
        return Err(AppError::data_shape(format!(
            "Nubar series has {} values / {} errors but the measurement has {} energies.",
            nubar.values.len(),
            nubar.errors.len(),
            series.len()
        ))
        .at(Stage::Correction)
        .for_input(series.label.clone()));
    }

    series
        .points
        .iter()
        .zip(nubar.values.iter().zip(&nubar.errors))
        .map(|(p, (&nu, &nu_err))| {
            if !(nu.is_finite() && nu_err.is_finite() && nu_err >= 0.0) {
                return Err(AppError::data_shape(format!(
                    "Invalid nubar {nu} ± {nu_err} at E={} MeV.",
                    p.energy
                ))
                .at(Stage::Correction)
                .for_input(series.label.clone()));
            }
            let (contamination, contamination_err) = neutron_contamination(calibration.contamination, nu, nu_err);
            Ok(CorrectionTerms {
                energy: p.energy,
                contamination,
                contamination_err,
                pileup: calibration.pileup.at(p.energy),
            })
        })
        .collect()
}

/// Apply the corrections and aggregate the independent input uncertainties.
///
/// A point without a statistical error keeps the contamination term only.
pub fn apply_corrections(series: &RawMeasurementSeries, terms: &[CorrectionTerms]) -> Vec<CorrectedPoint> {
    series
        .points
        .iter()
        .zip(terms)
        .map(|(p, t)| {
            let detected_err = match p.stat_err {
                Some(stat) => quadrature(&[t.contamination_err, stat]),
                None => {
                    warn!(
                        series = %series.label,
                        energy = p.energy,
                        "statistical error undefined, propagating contamination uncertainty only"
                    );
                    t.contamination_err
                }
            };
            CorrectedPoint {
                energy: p.energy,
                detected: p.raw_mult - t.contamination + t.pileup,
                detected_err,
                stat_err: p.stat_err,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MeasurementPoint;
    use crate::unfold::calibration::{CalibrationConstants, PileUpModel};

    fn series(points: &[(f64, f64, Option<f64>)]) -> RawMeasurementSeries {
        RawMeasurementSeries {
            label: "meas".to_string(),
            points: points
                .iter()
                .map(|&(energy, raw_mult, stat_err)| MeasurementPoint {
                    energy,
                    raw_mult,
                    stat_err,
                })
                .collect(),
        }
    }

    #[test]
    fn contamination_scales_with_nubar() {
        let c = ContaminationConstant { value: 0.33, sigma: 0.01 };
        let (value, sigma) = neutron_contamination(c, 2.5, 0.02);
        assert!((value - 0.825).abs() < 1e-12);
        let expected = ((2.5_f64 * 0.01).powi(2) + (0.33_f64 * 0.02).powi(2)).sqrt();
        assert!((sigma - expected).abs() < 1e-12);
    }

    #[test]
    fn quadrature_of_three_four_is_five() {
        assert!((quadrature(&[3.0, 4.0]) - 5.0).abs() < 1e-12);
        assert_eq!(quadrature(&[]), 0.0);
    }

    #[test]
    fn corrections_subtract_contamination_and_add_pileup() {
        let cal = Calibration::from_constants(CalibrationConstants {
            pileup: PileUpModel {
                offset: 0.1,
                slope: 0.0,
                reference_energy: 1.0,
            },
            ..CalibrationConstants::default()
        })
        .unwrap();
        let s = series(&[(2.0, 6.0, Some(0.04)), (3.0, 6.5, None)]);
        let nubar = NubarSeries {
            values: vec![2.0, 3.0],
            errors: vec![0.0, 0.0],
        };

        let terms = correction_terms(&s, &nubar, &cal).unwrap();
        let corrected = apply_corrections(&s, &terms);

        assert!((corrected[0].detected - (6.0 - 0.66 + 0.1)).abs() < 1e-12);
        assert!((corrected[0].detected_err - quadrature(&[0.02, 0.04])).abs() < 1e-12);
        // No statistical error: contamination term alone.
        assert!((corrected[1].detected_err - 0.03).abs() < 1e-12);
        assert!(corrected[1].stat_err.is_none());
    }

    #[test]
    fn misaligned_nubar_is_a_data_shape_error() {
        let cal = Calibration::from_constants(CalibrationConstants::default()).unwrap();
        let s = series(&[(2.0, 6.0, Some(0.04))]);
        let nubar = NubarSeries {
            values: vec![2.0, 2.1],
            errors: vec![0.0, 0.0],
        };
        let err = correction_terms(&s, &nubar, &cal).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Correction));
    }
}
