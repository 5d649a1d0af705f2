//! Unfolding of measured multiplicities.
//!
//! Responsibilities:
//!
//! - calibration context: static constants or fitted from reference files
//! - physical corrections (neutron contamination, pile-up) and error aggregation
//! - inversion through the response model with delta-method propagation

pub mod calibration;
pub mod corrections;
pub mod pipeline;

pub use calibration::*;
pub use corrections::*;
pub use pipeline::*;
