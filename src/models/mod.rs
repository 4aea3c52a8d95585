//! Radiative models.
//!
//! - particle distributions (`particle`)
//! - the electron Lorentz-factor grid (`electron`)
//! - synchrotron and inverse-Compton emission (`synchrotron`, `inverse_compton`)
//! - the fitted synchrotron + IC evaluator (`electron_ic`)
//!
//! Every model is a pure function of its parameters: no caching, no I/O, safe
//! to call concurrently from the sampler's worker pool.

pub mod electron;
pub mod electron_ic;
pub mod inverse_compton;
pub mod particle;
pub mod synchrotron;

pub use electron::*;
pub use electron_ic::*;
pub use inverse_compton::*;
pub use particle::*;
pub use synchrotron::*;

use serde::{Deserialize, Serialize};

use crate::data::SpectralTable;
use crate::error::AppError;
use crate::units::{FluxUnit, Length, Quantity};

/// Electron distribution on the model's energy grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectronSpectrum {
    /// Electron energies (eV).
    pub energy: Vec<f64>,
    /// Particles per unit energy (1/eV).
    pub density: Vec<f64>,
}

/// Everything one model evaluation produces. The first field is compared to
/// the data; the rest is kept alongside the chain for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    /// One value per input energy bin, in the data's flux unit and form.
    pub flux: Vec<f64>,
    pub electrons: ElectronSpectrum,
    /// Total energy in electrons (erg).
    pub total_energy: f64,
}

/// A parametric spectral model.
pub trait Model: Send + Sync {
    /// Evaluate at arbitrary photon energies (eV), returning fluxes in `flux_unit`.
    fn evaluate_at(
        &self,
        params: &[f64],
        energies_ev: &[f64],
        flux_unit: &FluxUnit,
    ) -> Result<ModelOutput, AppError>;

    /// Evaluate at the energies of `data`, in its flux unit.
    fn evaluate(&self, params: &[f64], data: &SpectralTable) -> Result<ModelOutput, AppError> {
        self.evaluate_at(params, &data.energies_ev(), data.flux_unit())
    }
}

/// Divide a luminosity spectrum (1/(s eV)) by `4π d²`. A zero distance
/// returns the spectrum unchanged.
pub fn flux_at_distance(mut spectrum: Vec<f64>, distance: Quantity<Length>) -> Vec<f64> {
    let d = distance.base();
    if d == 0.0 {
        return spectrum;
    }
    let area = 4.0 * std::f64::consts::PI * d * d;
    spectrum.iter_mut().for_each(|v| *v /= area);
    spectrum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_is_identity() {
        let s = vec![1.0, 2.0];
        assert_eq!(flux_at_distance(s.clone(), Quantity::from_base(0.0)), s);
        let f = flux_at_distance(s, Quantity::from_base(1.0));
        assert!((f[0] * 4.0 * std::f64::consts::PI - 1.0).abs() < 1e-15);
    }
}
