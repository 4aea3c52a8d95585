//! Particle energy distributions.

use serde::{Deserialize, Serialize};

use crate::units::{Energy, InverseEnergy, Quantity};

/// Number of particles per unit energy, as a function of energy.
pub trait ParticleDistribution: Send + Sync {
    /// dN/dE in 1/eV at `energy_ev`.
    fn density(&self, energy_ev: f64) -> f64;
}

/// `A (E/E0)^-α`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerLaw {
    pub amplitude: Quantity<InverseEnergy>,
    pub e_0: Quantity<Energy>,
    pub alpha: f64,
}

impl ParticleDistribution for PowerLaw {
    fn density(&self, energy_ev: f64) -> f64 {
        self.amplitude.base() * (energy_ev / self.e_0.base()).powf(-self.alpha)
    }
}

/// `A (E/E0)^-α exp(-(E/Ec)^β)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExponentialCutoffPowerLaw {
    pub amplitude: Quantity<InverseEnergy>,
    pub e_0: Quantity<Energy>,
    pub alpha: f64,
    pub e_cutoff: Quantity<Energy>,
    pub beta: f64,
}

impl ExponentialCutoffPowerLaw {
    /// Cutoff sharpness `β = 1`.
    pub fn new(
        amplitude: Quantity<InverseEnergy>,
        e_0: Quantity<Energy>,
        alpha: f64,
        e_cutoff: Quantity<Energy>,
    ) -> Self {
        Self {
            amplitude,
            e_0,
            alpha,
            e_cutoff,
            beta: 1.0,
        }
    }
}

impl ParticleDistribution for ExponentialCutoffPowerLaw {
    fn density(&self, energy_ev: f64) -> f64 {
        let cutoff = (-(energy_ev / self.e_cutoff.base()).powf(self.beta)).exp();
        self.amplitude.base() * (energy_ev / self.e_0.base()).powf(-self.alpha) * cutoff
    }
}
