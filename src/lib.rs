//! `sed-mcmc` library crate.
//!
//! The binary (`sedfit`) is a thin wrapper around this library so that:
//!
//! - the model, sampler and I/O are testable without spawning processes
//! - the radiative models can be reused on their own

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod units;

#[cfg(test)]
pub(crate) mod test_support;
