//! Gaussian log-likelihood with asymmetric errors and upper limits, and the
//! log-posterior the sampler explores.

use log::debug;

use crate::data::SpectralTable;
use crate::error::AppError;
use crate::fit::prior::Prior;
use crate::models::{Model, ModelOutput};

/// Log-likelihood of `model_flux` (one value per row, in the data's flux unit).
///
/// Measurements contribute `-(m - f)² / 2σ²`, with `σ` the lower error when
/// the model is at or below the data and the upper error otherwise. Each
/// violated upper limit contributes `ln(1 - cl)`.
pub fn ln_likelihood(model_flux: &[f64], data: &SpectralTable) -> f64 {
    let mut total = 0.0;
    let mut violated = 0usize;
    for (row, &model) in data.rows().iter().zip(model_flux) {
        if row.ul {
            if model > row.flux {
                violated += 1;
            }
            continue;
        }
        let diff = model - row.flux;
        let sigma = if diff > 0.0 { row.flux_error_hi } else { row.flux_error_lo };
        total -= diff * diff / (2.0 * sigma * sigma);
    }
    if violated > 0 {
        total += violated as f64 * (1.0 - data.cl()).ln();
    }
    total
}

/// `ln p(θ | data)` up to a constant: prior plus likelihood, with the model
/// output kept as the sample's blob.
pub struct LnPosterior<'a> {
    pub model: &'a dyn Model,
    pub prior: &'a dyn Prior,
    pub data: &'a SpectralTable,
}

impl LnPosterior<'_> {
    /// Returns `(ln_prob, blob)`.
    ///
    /// A disallowed prior short-circuits to `(-inf, None)` without evaluating
    /// the model. Any other non-finite total is reported as `-inf`.
    pub fn evaluate(&self, params: &[f64]) -> Result<(f64, Option<ModelOutput>), AppError> {
        let lp = self.prior.ln_prior(params);
        if !lp.is_finite() {
            return Ok((f64::NEG_INFINITY, None));
        }

        let output = self.model.evaluate(params, self.data)?;
        if output.flux.len() != self.data.len() {
            return Err(AppError::new(
                4,
                format!(
                    "Model returned {} fluxes for {} data points",
                    output.flux.len(),
                    self.data.len()
                ),
            ));
        }

        let total = lp + ln_likelihood(&output.flux, self.data);
        if total.is_finite() {
            Ok((total, Some(output)))
        } else {
            debug!("Non-finite log-probability at {params:?}");
            Ok((f64::NEG_INFINITY, Some(output)))
        }
    }
}
