//! Electron Lorentz-factor grid shared by the radiative channels.
//!
//! The distribution is sampled once per model evaluation on a log grid in
//! `γ = E / m_e c²`; synchrotron and IC both integrate over this grid.

use serde::{Deserialize, Serialize};

use crate::math::{log_space_per_decade, trapz_loglog};
use crate::models::particle::ParticleDistribution;
use crate::units::constants::{ERG_PER_EV, MEC2_EV};
use crate::units::{Energy, Quantity, Unit};

/// Extent and density of the electron grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElectronGridSettings {
    pub e_min: Quantity<Energy>,
    pub e_max: Quantity<Energy>,
    pub per_decade: f64,
}

impl Default for ElectronGridSettings {
    fn default() -> Self {
        Self {
            e_min: Quantity::new(1.0, &Unit::gev()),
            e_max: Quantity::from_base(1e9 * MEC2_EV),
            per_decade: 100.0,
        }
    }
}

/// `n(γ)`: particles per unit Lorentz factor on a log grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ElectronGrid {
    gamma: Vec<f64>,
    nelec: Vec<f64>,
}

impl ElectronGrid {
    pub fn new(distribution: &dyn ParticleDistribution, settings: &ElectronGridSettings) -> Self {
        let gamma = lorentz_factors(settings);
        let nelec = gamma
            .iter()
            .map(|&g| distribution.density(g * MEC2_EV) * MEC2_EV)
            .collect();
        Self { gamma, nelec }
    }

    pub fn gamma(&self) -> &[f64] {
        &self.gamma
    }

    pub fn nelec(&self) -> &[f64] {
        &self.nelec
    }

    pub fn len(&self) -> usize {
        self.gamma.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gamma.is_empty()
    }

    /// Electron energies `γ m_e c²` in eV.
    pub fn energies_ev(&self) -> Vec<f64> {
        self.gamma.iter().map(|g| g * MEC2_EV).collect()
    }

    /// Particles per unit energy (1/eV).
    pub fn density_per_ev(&self) -> Vec<f64> {
        self.nelec.iter().map(|n| n / MEC2_EV).collect()
    }

    /// Total energy in electrons, `∫ E N(E) dE`, in erg.
    pub fn total_energy_erg(&self) -> f64 {
        let weighted: Vec<f64> = self
            .gamma
            .iter()
            .zip(&self.nelec)
            .map(|(g, n)| g * n)
            .collect();
        trapz_loglog(&weighted, &self.energies_ev()) * ERG_PER_EV
    }
}

/// The Lorentz-factor grid for `settings` (independent of the distribution).
pub fn lorentz_factors(settings: &ElectronGridSettings) -> Vec<f64> {
    log_space_per_decade(
        settings.e_min.base() / MEC2_EV,
        settings.e_max.base() / MEC2_EV,
        settings.per_decade,
    )
}
