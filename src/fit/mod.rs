//! Bayesian fitting.
//!
//! Responsibilities:
//!
//! - priors and the asymmetric-error likelihood (`prior`, `likelihood`)
//! - starting-point heuristics (`estimate`)
//! - the ensemble sampler and its chain (`sampler`, `chain`)

pub mod chain;
pub mod estimate;
pub mod likelihood;
pub mod prior;
pub mod sampler;

pub use chain::*;
pub use estimate::*;
pub use likelihood::*;
pub use prior::*;
pub use sampler::*;
