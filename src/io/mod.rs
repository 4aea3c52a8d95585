//! Input/output helpers.
//!
//! - IPAC / ECSV table readers (`ingest`)
//! - run configuration JSON (`config`)
//! - sampler state persistence (`sampler_file`)
//! - results table export (`export`)

pub mod config;
pub mod export;
pub mod ingest;
pub mod sampler_file;

pub use config::*;
pub use export::*;
pub use ingest::*;
pub use sampler_file::*;
