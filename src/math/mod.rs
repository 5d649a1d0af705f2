//! Mathematical utilities: least squares, covariance and root finding.

pub mod covariance;
pub mod ols;
pub mod roots;

pub use covariance::*;
pub use ols::*;
pub use roots::*;
