//! Calibration context consumed by the unfolding pipeline.
//!
//! A run builds exactly one `Calibration` from a `CalibrationSource` and hands
//! it to the pipeline by reference. Nothing mutates it afterwards.
//!
//! Two sources exist:
//! - `Static`: hand-set response constants
//! - `Fitted`: response constants from a joint fit over reference simulations
//!
//! In both cases the neutron-contamination constant and the pile-up model come
//! from the constants; only the response `(a, b, σa, σb)` differs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{FittedResponseModel, MultRange};
use crate::error::{AppError, Stage};
use crate::fit::{FitOptions, fit_references};

/// Neutron contamination per unit of average neutron multiplicity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContaminationConstant {
    pub value: f64,
    pub sigma: f64,
}

/// Neutron-gamma pile-up as a linear function of incident energy.
///
/// `pileup(E) = offset + slope · (E - reference_energy)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PileUpModel {
    pub offset: f64,
    pub slope: f64,
    pub reference_energy: f64,
}

impl PileUpModel {
    pub fn at(&self, energy: f64) -> f64 {
        self.offset + self.slope * (energy - self.reference_energy)
    }
}

impl Default for PileUpModel {
    fn default() -> Self {
        // 0.15 at 1 MeV rising by 0.4 over 30 MeV.
        Self {
            offset: 0.15,
            slope: 0.4 / 30.0,
            reference_energy: 1.0,
        }
    }
}

/// Static calibration constants of the SCONE setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConstants {
    pub response: FittedResponseModel,
    pub contamination: ContaminationConstant,
    #[serde(default)]
    pub pileup: PileUpModel,
    /// Half-width of the incident-energy bins (MeV).
    pub energy_half_width: f64,
}

impl Default for CalibrationConstants {
    fn default() -> Self {
        Self {
            response: FittedResponseModel {
                a: 19.0,
                b: 28.0,
                sigma_a: 0.5,
                sigma_b: 1.0,
                quality: None,
            },
            contamination: ContaminationConstant {
                value: 0.33,
                sigma: 0.01,
            },
            pileup: PileUpModel::default(),
            energy_half_width: 0.5,
        }
    }
}

impl CalibrationConstants {
    pub fn validate(&self) -> Result<(), AppError> {
        let r = &self.response;
        if !(r.a.is_finite() && r.b.is_finite() && r.a > 0.0 && r.b > 0.0) {
            return Err(AppError::config(format!(
                "Response constants must be finite and > 0 (a={}, b={}).",
                r.a, r.b
            )));
        }
        let sigmas = [r.sigma_a, r.sigma_b, self.contamination.sigma, self.energy_half_width];
        if sigmas.iter().any(|s| !s.is_finite() || *s < 0.0) {
            return Err(AppError::config("Uncertainties and bin half-width must be finite and >= 0."));
        }
        let p = &self.pileup;
        if !(self.contamination.value.is_finite()
            && p.offset.is_finite()
            && p.slope.is_finite()
            && p.reference_energy.is_finite())
        {
            return Err(AppError::config("Contamination and pile-up constants must be finite."));
        }
        Ok(())
    }
}

/// Where the response constants come from.
#[derive(Debug, Clone)]
pub enum CalibrationSource {
    Static(CalibrationConstants),
    Fitted {
        constants: CalibrationConstants,
        references: Vec<PathBuf>,
        mult_range: Option<MultRange>,
        options: FitOptions,
    },
}

/// How a `Calibration` was obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationOrigin {
    Static,
    Fitted { references: Vec<String> },
}

/// Immutable calibration context of one run.
#[derive(Debug, Clone)]
pub struct Calibration {
    pub response: FittedResponseModel,
    pub contamination: ContaminationConstant,
    pub pileup: PileUpModel,
    pub energy_half_width: f64,
    pub origin: CalibrationOrigin,
}

impl Calibration {
    pub fn from_constants(constants: CalibrationConstants) -> Result<Self, AppError> {
        constants.validate().map_err(|e| e.at(Stage::Calibration))?;
        Ok(Self {
            response: constants.response,
            contamination: constants.contamination,
            pileup: constants.pileup,
            energy_half_width: constants.energy_half_width,
            origin: CalibrationOrigin::Static,
        })
    }
}

impl CalibrationSource {
    /// Build the calibration context. Fitted sources read and fit every
    /// reference file here, once.
    pub fn resolve(self) -> Result<Calibration, AppError> {
        match self {
            CalibrationSource::Static(constants) => {
                let calibration = Calibration::from_constants(constants)?;
                info!(
                    a = calibration.response.a,
                    b = calibration.response.b,
                    "using static response constants"
                );
                Ok(calibration)
            }
            CalibrationSource::Fitted {
                constants,
                references,
                mult_range,
                options,
            } => {
                let mut calibration = Calibration::from_constants(constants)?;
                let (_, fitted) = fit_references(&references, mult_range, &options)?;
                info!(
                    a = fitted.a,
                    sigma_a = fitted.sigma_a,
                    b = fitted.b,
                    sigma_b = fitted.sigma_b,
                    n_files = references.len(),
                    "fitted response constants"
                );
                calibration.response = fitted;
                calibration.origin = CalibrationOrigin::Fitted {
                    references: references.iter().map(|p| p.display().to_string()).collect(),
                };
                Ok(calibration)
            }
        }
    }
}
