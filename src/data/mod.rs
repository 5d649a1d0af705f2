//! Synthetic input data.
//!
//! - seeded reference histograms drawn from the response model (`synthetic`)

pub mod synthetic;

pub use synthetic::*;
