//! Input/output helpers.
//!
//! - whitespace histogram ingest (`ingest`)
//! - schema-mapped reference tables, nubar (`table`)
//! - unfolded-table export (`export`)
//! - calibration JSON read/write (`calibration`)

pub mod calibration;
pub mod export;
pub mod ingest;
pub mod table;

pub use calibration::*;
pub use export::*;
pub use ingest::*;
pub use table::*;
