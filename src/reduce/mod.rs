//! Histogram reduction.
//!
//! Responsibilities:
//!
//! - simulation side: conditional-mean response curves (`curve`)
//! - measurement side: conditional mean + standard error per energy (`moments`)

pub mod curve;
pub mod moments;

pub use curve::*;
pub use moments::*;
