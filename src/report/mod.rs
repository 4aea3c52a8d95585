//! Reporting utilities: posterior summaries and formatted terminal output.

pub mod format;

pub use format::*;

use serde::Serialize;

use crate::domain::log10_argument;
use crate::fit::SamplerState;
use crate::math::percentiles;

/// Label of the electron-energy blob in summaries.
pub const ELECTRON_ENERGY_LABEL: &str = "We";

/// Median and 68% interval of one quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSummary {
    pub label: String,
    pub median: f64,
    /// `median - p16`.
    pub unc_lo: f64,
    /// `p84 - median`.
    pub unc_hi: f64,
}

impl ParameterSummary {
    pub fn from_samples(label: impl Into<String>, samples: &[f64]) -> Self {
        let p = percentiles(samples, &[16.0, 50.0, 84.0]);
        Self {
            label: label.into(),
            median: p[1],
            unc_lo: p[1] - p[0],
            unc_hi: p[2] - p[1],
        }
    }
}

/// Summaries of every parameter in the chain, in label order.
///
/// With `convert_log`, `log10(x)` parameters are summarized as `x` in linear
/// space. With `include_blobs`, the total electron energy (erg) is appended.
pub fn summarize_parameters(state: &SamplerState, convert_log: bool, include_blobs: bool) -> Vec<ParameterSummary> {
    let mut out: Vec<ParameterSummary> = state
        .labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let samples = state.chain.param_samples(i);
            match log10_argument(label).filter(|_| convert_log) {
                Some(inner) => {
                    let linear: Vec<f64> = samples.iter().map(|v| 10f64.powf(*v)).collect();
                    ParameterSummary::from_samples(inner, &linear)
                }
                None => ParameterSummary::from_samples(label.as_str(), &samples),
            }
        })
        .collect();

    if include_blobs {
        let energies: Vec<f64> = state
            .chain
            .flat_blobs()
            .into_iter()
            .flatten()
            .map(|b| b.total_energy)
            .collect();
        if !energies.is_empty() {
            out.push(ParameterSummary::from_samples(ELECTRON_ENERGY_LABEL, &energies));
        }
    }
    out
}
