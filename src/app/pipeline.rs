//! Shared workflows behind the CLI subcommands.
//!
//! Keeping these in one place avoids duplicating the core sequence:
//! - fit: reference files -> curves -> joint fit -> optional calibration export
//! - unfold: calibration source -> calibration, measurement -> raw series,
//!   nubar table -> corrections -> inversion -> optional table
//!
//! The CLI front-end only adds printing.

use std::path::Path;

use tracing::info;

use crate::data::{SyntheticConfig, generate_reference_histogram};
use crate::domain::{
    FitRunConfig, FittedResponseModel, RawMeasurementSeries, ReducedResponseCurve, UnfoldRunConfig,
    UnfoldedMeasurementSeries,
};
use crate::error::AppError;
use crate::fit::{FitOptions, fit_references};
use crate::io::{
    CalibrationFile, Provenance, file_label, read_calibration_json, read_histogram, read_nubar,
    write_calibration_json, write_histogram,
};
use crate::reduce::{measurement_series, splice};
use crate::unfold::{Calibration, CalibrationConstants, CalibrationSource, UnfoldingPipeline};

/// All computed outputs of a `scone fit` run.
#[derive(Debug, Clone)]
pub struct FitRun {
    pub curves: Vec<ReducedResponseCurve>,
    pub fitted: FittedResponseModel,
}

/// All computed outputs of a `scone unfold` run.
#[derive(Debug, Clone)]
pub struct UnfoldRun {
    pub calibration: Calibration,
    pub raw: RawMeasurementSeries,
    pub unfolded: UnfoldedMeasurementSeries,
}

/// Fit the response constants and optionally export a calibration file.
pub fn run_fit(config: &FitRunConfig) -> Result<FitRun, AppError> {
    let constants = load_constants(config.constants_path.as_deref())?;
    let opts = fit_options(config.references.len(), config.max_iterations);
    let (curves, fitted) = fit_references(&config.references, config.mult_range, &opts)?;
    info!(a = fitted.a, sigma_a = fitted.sigma_a, b = fitted.b, sigma_b = fitted.sigma_b, "response fit");

    if let Some(path) = &config.export_calibration {
        let file = CalibrationFile::new(
            CalibrationConstants {
                response: fitted.clone(),
                ..constants
            },
            Some(Provenance {
                references: config.references.iter().map(|p| p.display().to_string()).collect(),
                mult_range: config.mult_range,
            }),
        );
        write_calibration_json(path, &file)?;
        info!(path = %path.display(), "wrote calibration");
    }

    Ok(FitRun { curves, fitted })
}

/// Resolve the calibration, reduce the measurement and unfold it.
pub fn run_unfold(config: &UnfoldRunConfig) -> Result<UnfoldRun, AppError> {
    let constants = load_constants(config.calibration.as_deref())?;
    let source = if config.references.is_empty() {
        CalibrationSource::Static(constants)
    } else {
        CalibrationSource::Fitted {
            constants,
            references: config.references.clone(),
            mult_range: config.mult_range,
            options: fit_options(config.references.len(), config.max_iterations),
        }
    };
    let calibration = source.resolve()?;

    let raw = load_measurement(config)?;
    let nubar = read_nubar(&config.nubar)?;

    let mut pipeline = UnfoldingPipeline::new(&calibration);
    if let Some(path) = &config.output {
        pipeline = pipeline.with_output(path);
    }
    let unfolded = pipeline.run(&raw, &nubar)?;

    Ok(UnfoldRun {
        calibration,
        raw,
        unfolded,
    })
}

/// Draw a synthetic reference histogram and write it to `out`.
pub fn run_simulate(config: &SyntheticConfig, out: &Path) -> Result<usize, AppError> {
    let entries = generate_reference_histogram(config)?;
    write_histogram(out, &entries)?;
    info!(path = %out.display(), entries = entries.len(), seed = config.seed, "wrote synthetic histogram");
    Ok(entries.len())
}

/// Static constants from a calibration file, or the built-in defaults.
pub fn load_constants(path: Option<&Path>) -> Result<CalibrationConstants, AppError> {
    match path {
        Some(path) => Ok(read_calibration_json(path)?.constants),
        None => Ok(CalibrationConstants::default()),
    }
}

/// Single or joint fit settings, with an optional iteration cap override.
pub fn fit_options(n_references: usize, max_iterations: Option<usize>) -> FitOptions {
    let mut opts = if n_references > 1 {
        FitOptions::joint()
    } else {
        FitOptions::single()
    };
    if let Some(cap) = max_iterations {
        opts.max_iterations = cap;
    }
    opts
}

fn load_measurement(config: &UnfoldRunConfig) -> Result<RawMeasurementSeries, AppError> {
    let primary = measurement_series(
        &read_histogram(&config.measurement)?,
        &file_label(&config.measurement),
        config.window,
    )?;

    match &config.secondary {
        Some(path) => {
            let secondary = measurement_series(&read_histogram(path)?, &file_label(path), config.window)?;
            let spliced = splice(&primary, &secondary, config.split)?;
            info!(series = %spliced.label, points = spliced.len(), "spliced measurements");
            Ok(spliced)
        }
        None => Ok(primary),
    }
}
