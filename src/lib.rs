//! `scone-unfold` library crate.
//!
//! The binary (`scone`) is a thin wrapper around this library so that:
//!
//! - the numerical core is testable without spawning processes
//! - reduction, fitting and unfolding are reusable from other analyses

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod reduce;
pub mod report;
pub mod unfold;
