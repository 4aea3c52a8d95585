//! Numerical utilities: log-log quadrature, log grids, and sample statistics.

pub mod integrate;
pub mod stats;

pub use integrate::*;
pub use stats::*;
