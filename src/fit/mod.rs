//! Response-model fitting.
//!
//! Responsibilities:
//!
//! - bounded Levenberg-Marquardt fit of `(a, b)` on one curve
//! - joint fit over several pooled reference curves
//! - covariance-derived 1-sigma uncertainties
//! - reference-file workflow shared by CLI and calibration

pub mod fitter;
pub mod references;

pub use fitter::*;
pub use references::*;
