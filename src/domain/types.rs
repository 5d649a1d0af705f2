//! Shared domain types.
//!
//! Each stage of the pipeline produces one of these and hands it, by value or
//! shared reference, to the next stage:
//!
//! - reference histograms -> `ReducedResponseCurve` -> `FittedResponseModel`
//! - measurement histogram -> `RawMeasurementSeries` -> `UnfoldedMeasurementSeries`

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Inclusive range of emitted multiplicities kept for fitting.
///
/// Very high multiplicities are rarely populated in simulations; their
/// conditional means are statistically anecdotal and are cut with this range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultRange {
    pub low: f64,
    pub high: f64,
}

impl MultRange {
    pub fn new(low: f64, high: f64) -> Option<Self> {
        if low.is_finite() && high.is_finite() && low <= high {
            Some(Self { low, high })
        } else {
            None
        }
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.low && x <= self.high
    }
}

/// One (emitted, mean detected) point of a reduced response curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponsePoint {
    pub emitted: f64,
    pub mean_detected: f64,
    /// Total column weight (number of simulated events in this emitted bin).
    pub weight: f64,
}

/// Conditional-mean response curve of one reference simulation.
///
/// Emitted values are strictly increasing and every value is finite.
#[derive(Debug, Clone, Default)]
pub struct ReducedResponseCurve {
    pub label: String,
    pub points: Vec<ResponsePoint>,
}

impl ReducedResponseCurve {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn emitted(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.emitted).collect()
    }

    pub fn detected(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.mean_detected).collect()
    }
}

/// Saturation constants of the response model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResponseParams {
    /// Horizontal asymptote (maximum mean detected multiplicity).
    pub a: f64,
    /// Curvature scale.
    pub b: f64,
}

/// Response model parameters with their 1-sigma uncertainties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedResponseModel {
    pub a: f64,
    pub b: f64,
    pub sigma_a: f64,
    pub sigma_b: f64,
    /// Fit diagnostics. Absent for hand-set constants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<FitQuality>,
}

impl FittedResponseModel {
    pub fn params(&self) -> ResponseParams {
        ResponseParams { a: self.a, b: self.b }
    }
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    pub n: usize,
    pub sse: f64,
    pub rmse: f64,
    pub iterations: usize,
}

/// First and second conditional moments of one histogram column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnMoments {
    pub x: f64,
    pub weight: f64,
    /// Undefined when the column weight is zero.
    pub mean: Option<f64>,
    /// Floored at zero. Undefined when the column weight is zero.
    pub variance: Option<f64>,
    /// Standard error of the mean, `sqrt(variance / weight)`.
    pub std_error: Option<f64>,
}

/// Contiguous window of measurement bins (by column index).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinWindow {
    pub first: usize,
    /// `None` keeps every bin from `first` on.
    pub count: Option<usize>,
}

impl Default for BinWindow {
    fn default() -> Self {
        // The first energy bin sits below the fission threshold; 30 bins cover 1-30 MeV.
        Self {
            first: 1,
            count: Some(30),
        }
    }
}

/// One raw measured point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementPoint {
    /// Incident neutron energy (MeV).
    pub energy: f64,
    /// Mean detected gamma multiplicity.
    pub raw_mult: f64,
    /// Standard error of `raw_mult`, when defined.
    pub stat_err: Option<f64>,
}

/// Raw measured multiplicities, ordered by energy.
#[derive(Debug, Clone, Default)]
pub struct RawMeasurementSeries {
    pub label: String,
    pub points: Vec<MeasurementPoint>,
}

impl RawMeasurementSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn energies(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.energy).collect()
    }
}

/// Average prompt-neutron multiplicity, index-aligned with a measurement series.
#[derive(Debug, Clone, Default)]
pub struct NubarSeries {
    pub values: Vec<f64>,
    pub errors: Vec<f64>,
}

/// Per-energy physical corrections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionTerms {
    pub energy: f64,
    /// Neutron counts misattributed to gamma-rays (subtracted).
    pub contamination: f64,
    pub contamination_err: f64,
    /// Neutron-gamma pile-up multiplicity (added).
    pub pileup: f64,
}

/// A corrected point, still folded with the detector response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectedPoint {
    pub energy: f64,
    pub detected: f64,
    /// Quadrature sum of every independent input uncertainty.
    pub detected_err: f64,
    pub stat_err: Option<f64>,
}

/// Contributions to the unfolded variance, each already as a 1-sigma term.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UncertaintyBudget {
    pub from_a: f64,
    pub from_b: f64,
    pub from_input: f64,
}

impl UncertaintyBudget {
    pub fn total(&self) -> f64 {
        (self.from_a.powi(2) + self.from_b.powi(2) + self.from_input.powi(2)).sqrt()
    }
}

/// One unfolded point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnfoldedPoint {
    pub energy: f64,
    pub multiplicity: f64,
    /// Total 1-sigma uncertainty (response model + corrections + statistics).
    pub total_err: f64,
    /// Statistical error alone, passed through the inverse at fixed (a, b).
    pub stat_err: Option<f64>,
    pub budget: UncertaintyBudget,
}

/// Unfolded multiplicities, ordered by energy.
#[derive(Debug, Clone, Default)]
pub struct UnfoldedMeasurementSeries {
    pub label: String,
    pub points: Vec<UnfoldedPoint>,
}

impl UnfoldedMeasurementSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Configuration of a `scone fit` run.
#[derive(Debug, Clone)]
pub struct FitRunConfig {
    pub references: Vec<PathBuf>,
    pub mult_range: Option<MultRange>,
    /// Overrides the fitter's default iteration cap.
    pub max_iterations: Option<usize>,
    pub export_calibration: Option<PathBuf>,
    /// Constants carried into the exported calibration file.
    pub constants_path: Option<PathBuf>,
}

/// Configuration of a `scone unfold` run.
#[derive(Debug, Clone)]
pub struct UnfoldRunConfig {
    pub measurement: PathBuf,
    /// Optional second measurement of the same energy grid, spliced at `split`.
    pub secondary: Option<PathBuf>,
    pub split: usize,
    pub window: BinWindow,
    pub nubar: PathBuf,
    /// Static constants (JSON). Defaults are used when absent.
    pub calibration: Option<PathBuf>,
    /// Reference histograms; when non-empty the response is fitted from them.
    pub references: Vec<PathBuf>,
    pub mult_range: Option<MultRange>,
    pub max_iterations: Option<usize>,
    pub output: Option<PathBuf>,
}
