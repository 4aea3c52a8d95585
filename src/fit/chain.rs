//! Storage for the production chain and its diagnostics.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::math::median;
use crate::models::ModelOutput;

/// Minimum number of steps for an autocorrelation estimate.
const MIN_AUTOCORR_STEPS: usize = 10;
const MAX_AUTOCORR_LAG: usize = 100;

/// Walker positions, log-probabilities and blobs for every recorded step.
///
/// Each step holds a `n_walkers × n_params` position matrix. Flattened views
/// are step-major: all walkers of step 0, then all walkers of step 1, and so on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    positions: Vec<DMatrix<f64>>,
    ln_probs: Vec<DVector<f64>>,
    blobs: Vec<Vec<Option<ModelOutput>>>,
}

/// The highest-probability sample in a chain.
#[derive(Debug, Clone)]
pub struct MaxLikelihood<'a> {
    pub ln_prob: f64,
    pub params: Vec<f64>,
    pub blob: Option<&'a ModelOutput>,
    pub step: usize,
    pub walker: usize,
}

impl Chain {
    pub fn push(&mut self, positions: DMatrix<f64>, ln_probs: DVector<f64>, blobs: Vec<Option<ModelOutput>>) {
        self.positions.push(positions);
        self.ln_probs.push(ln_probs);
        self.blobs.push(blobs);
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn n_walkers(&self) -> usize {
        self.positions.first().map(|p| p.nrows()).unwrap_or(0)
    }

    pub fn n_params(&self) -> usize {
        self.positions.first().map(|p| p.ncols()).unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.ln_probs.clear();
        self.blobs.clear();
    }

    /// Positions at one step (`n_walkers × n_params`).
    pub fn step(&self, step: usize) -> Option<&DMatrix<f64>> {
        self.positions.get(step)
    }

    /// All samples as a `(len · n_walkers) × n_params` matrix.
    pub fn flat_samples(&self) -> DMatrix<f64> {
        let (n_walkers, n_params) = (self.n_walkers(), self.n_params());
        DMatrix::from_fn(self.len() * n_walkers, n_params, |r, c| {
            self.positions[r / n_walkers][(r % n_walkers, c)]
        })
    }

    pub fn flat_ln_probs(&self) -> Vec<f64> {
        self.ln_probs.iter().flat_map(|lp| lp.iter().copied()).collect()
    }

    pub fn flat_blobs(&self) -> Vec<Option<&ModelOutput>> {
        self.blobs.iter().flat_map(|step| step.iter().map(Option::as_ref)).collect()
    }

    /// Every sample of one parameter, step-major.
    pub fn param_samples(&self, param: usize) -> Vec<f64> {
        self.positions
            .iter()
            .flat_map(|p| p.column(param).iter().copied().collect::<Vec<_>>())
            .collect()
    }

    /// One walker's trace of one parameter.
    pub fn walker_trace(&self, walker: usize, param: usize) -> Vec<f64> {
        self.positions.iter().map(|p| p[(walker, param)]).collect()
    }

    /// The sample with the largest finite log-probability.
    pub fn max_ln_prob(&self) -> Option<MaxLikelihood<'_>> {
        let mut best: Option<(usize, usize, f64)> = None;
        for (step, lps) in self.ln_probs.iter().enumerate() {
            for (walker, &lp) in lps.iter().enumerate() {
                if lp.is_finite() && best.is_none_or(|(_, _, b)| lp > b) {
                    best = Some((step, walker, lp));
                }
            }
        }
        let (step, walker, ln_prob) = best?;
        Some(MaxLikelihood {
            ln_prob,
            params: self.positions[step].row(walker).iter().copied().collect(),
            blob: self.blobs[step][walker].as_ref(),
            step,
            walker,
        })
    }

    /// Per-parameter median over all samples.
    pub fn median(&self) -> Vec<f64> {
        (0..self.n_params()).map(|i| median(&self.param_samples(i))).collect()
    }

    /// Integrated autocorrelation time `τ = 1 + 2 Σ ρ(k)` per parameter.
    ///
    /// `ρ` is averaged over walkers and summed up to its first non-positive
    /// lag (at most 100, at most half the chain). Empty when fewer than 10
    /// steps are recorded.
    pub fn autocorr_time(&self) -> Vec<f64> {
        let n = self.len();
        if n < MIN_AUTOCORR_STEPS {
            return Vec::new();
        }
        let n_walkers = self.n_walkers();
        let max_lag = (n / 2).min(MAX_AUTOCORR_LAG);

        (0..self.n_params())
            .map(|param| {
                let mut mean_rho = vec![0.0; max_lag];
                for walker in 0..n_walkers {
                    let rho = autocorrelation(&self.walker_trace(walker, param), max_lag);
                    for (acc, r) in mean_rho.iter_mut().zip(rho) {
                        *acc += r / n_walkers as f64;
                    }
                }
                let sum: f64 = mean_rho.iter().take_while(|&&r| r > 0.0).sum();
                1.0 + 2.0 * sum
            })
            .collect()
    }
}

/// Normalized autocorrelation at lags `1..=max_lag`. A constant trace has
/// zero autocorrelation at every lag.
fn autocorrelation(trace: &[f64], max_lag: usize) -> Vec<f64> {
    let n = trace.len();
    let mean = trace.iter().sum::<f64>() / n as f64;
    let variance = trace.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
    if variance == 0.0 {
        return vec![0.0; max_lag];
    }
    (1..=max_lag)
        .map(|lag| {
            if lag >= n {
                return 0.0;
            }
            let cov = (0..n - lag)
                .map(|i| (trace[i] - mean) * (trace[i + lag] - mean))
                .sum::<f64>()
                / (n - lag) as f64;
            cov / variance
        })
        .collect()
}
