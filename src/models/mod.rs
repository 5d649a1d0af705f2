//! Detector response model.
//!
//! The model is implemented as small, pure functions so that the fitter and
//! the unfolding pipeline can share it without carrying state.

pub mod response;

pub use response::*;
