//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the pivoted event histogram (`EventHistogram2D`)
//! - reduced curves, measurement series and unfolded outputs (`types`)
//! - run configuration (`FitRunConfig`, `UnfoldRunConfig`)

pub mod histogram;
pub mod types;

pub use histogram::*;
pub use types::*;
