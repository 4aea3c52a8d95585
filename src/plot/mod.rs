//! Plot outputs.
//!
//! - SVG diagnostics written next to the results (`svg`)
//! - a terminal SED preview (`ascii`)

pub mod ascii;
pub mod svg;

pub use ascii::*;
pub use svg::*;
