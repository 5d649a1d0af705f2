//! Reference simulations -> response curves -> fitted constants.
//!
//! Shared by `scone fit` and by fitted calibration sources, so the workflow
//! (read, reduce, reject empty curves, joint fit) exists once.

use std::path::Path;

use tracing::info;

use crate::domain::{FittedResponseModel, MultRange, ReducedResponseCurve};
use crate::error::{AppError, Stage};
use crate::fit::fitter::{FitOptions, fit_response, fit_response_joint};
use crate::io::{file_label, read_histogram};
use crate::reduce::reduce_response;

/// Read and reduce every reference file.
///
/// A file that reduces to an empty curve is an error naming that file.
pub fn load_reference_curves(
    paths: &[impl AsRef<Path>],
    mult_range: Option<MultRange>,
) -> Result<Vec<ReducedResponseCurve>, AppError> {
    let mut curves = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        let label = file_label(path);
        let hist = read_histogram(path)?;
        let curve = reduce_response(&hist, &label, mult_range);
        if curve.is_empty() {
            return Err(AppError::data_shape(
                "No usable emitted-multiplicity columns (all empty, non-finite or outside the range).",
            )
            .at(Stage::Reduction)
            .for_input(label));
        }
        info!(file = %label, points = curve.len(), "reference curve");
        curves.push(curve);
    }
    Ok(curves)
}

/// Fit the response constants on one or several reference files.
///
/// A single file uses `opts` as given; several files are pooled into one
/// joint fit.
pub fn fit_references(
    paths: &[impl AsRef<Path>],
    mult_range: Option<MultRange>,
    opts: &FitOptions,
) -> Result<(Vec<ReducedResponseCurve>, FittedResponseModel), AppError> {
    if paths.is_empty() {
        return Err(AppError::config("At least one reference histogram is required.").at(Stage::Fitting));
    }
    let curves = load_reference_curves(paths, mult_range)?;
    let fitted = match curves.as_slice() {
        [single] => fit_response(single, opts)?,
        many => fit_response_joint(many, opts)?,
    };
    Ok((curves, fitted))
}
