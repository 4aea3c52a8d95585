//! Spectral data model.
//!
//! - `table`: format-agnostic text table (columns of cells + metadata)
//! - `spectral`: validated energy/flux data, unit conversion and merging

pub mod spectral;
pub mod table;

pub use spectral::*;
pub use table::*;
