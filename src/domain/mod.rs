//! Domain types used throughout the pipeline.
//!
//! This module defines the run configuration (`RunConfig`) and its parts:
//!
//! - fit starting point (`ParamSeeds`)
//! - sampler settings (`SamplerSettings`)
//! - fixed model settings (`ModelSettings`, `SeedFieldSpec`)
//! - diagnostic output settings (`PlotSettings`)

pub mod types;

pub use types::*;
