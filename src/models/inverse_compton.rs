//! Inverse-Compton scattering of isotropic blackbody photon fields.
//!
//! The angle-integrated rate on a Planck distribution uses the analytic
//! approximation of Khangulyan, Aharonian & Kelner (2014), eq. 14, valid in
//! both the Thomson and Klein-Nishina regimes. A grey-body field (energy
//! density different from `a T⁴`) is handled by rescaling.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::math::trapz_loglog_with;
use crate::models::electron::ElectronGrid;
use crate::models::flux_at_distance;
use crate::units::constants::{ERG_PER_EV, IC_BLACKBODY_RATE, KELVIN_TO_MEC2, MEC2_EV, RADIATION_CONSTANT_CGS};
use crate::units::{EnergyDensity, Length, Quantity, Temperature, Unit};

/// A thermal seed photon population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedPhotonField {
    pub name: String,
    pub temperature: Quantity<Temperature>,
    pub energy_density: Quantity<EnergyDensity>,
}

impl SeedPhotonField {
    pub fn new(name: impl Into<String>, temperature_k: f64, energy_density_ev_cm3: f64) -> Self {
        Self {
            name: name.into(),
            temperature: Quantity::new(temperature_k, &Unit::kelvin()),
            energy_density: Quantity::new(energy_density_ev_cm3, &Unit::ev_per_cm3()),
        }
    }

    /// Cosmic microwave background.
    pub fn cmb() -> Self {
        Self::new("CMB", 2.72548, 0.261)
    }

    /// Galactic far-infrared dust emission.
    pub fn fir() -> Self {
        Self::new("FIR", 30.0, 0.5)
    }

    /// Galactic near-infrared stellar emission.
    pub fn nir() -> Self {
        Self::new("NIR", 3000.0, 1.0)
    }

    /// One of the named fields (`CMB`, `FIR`, `NIR`).
    pub fn named(name: &str) -> Result<Self, AppError> {
        match name {
            "CMB" => Ok(Self::cmb()),
            "FIR" => Ok(Self::fir()),
            "NIR" => Ok(Self::nir()),
            other => Err(AppError::input(format!(
                "Unknown seed photon field '{other}' (expected CMB, FIR or NIR, or give T and u)"
            ))),
        }
    }

    /// `u / (a T⁴)`: 1 for a true blackbody.
    pub fn dilution(&self) -> f64 {
        let t = self.temperature.base();
        let u_erg = self.energy_density.base() * ERG_PER_EV;
        u_erg / (RADIATION_CONSTANT_CGS * t.powi(4))
    }
}

fn g34(x: f64, coeffs: &[f64; 5]) -> f64 {
    let [alpha, a, beta, b, c] = *coeffs;
    let pi2_6 = PI * PI / 6.0;
    let big_g = pi2_6 * (1.0 + c * x) / (1.0 + pi2_6 * c * x) * (-x).exp();
    if big_g == 0.0 {
        // x^alpha / x^beta may be inf/inf here.
        return 0.0;
    }
    let g = 1.0 / (a * x.powf(alpha) / (1.0 + b * x.powf(beta)) + 1.0);
    big_g * g
}

const A3: [f64; 5] = [0.606, 0.443, 1.481, 0.540, 0.319];
const A4: [f64; 5] = [0.461, 0.726, 1.457, 0.382, 6.620];

/// Scattering rate per unit photon energy for one electron of Lorentz factor
/// `gamma` on a blackbody of temperature `temperature_k`; `photon_energy` is
/// in units of `m_e c²`. Zero when the photon would carry more than the
/// electron energy or the electron is not relativistic.
pub fn iso_ic_on_planck(gamma: f64, temperature_k: f64, photon_energy: f64) -> f64 {
    if !(photon_energy < gamma && gamma > 1.0) {
        return 0.0;
    }
    let t = temperature_k * KELVIN_TO_MEC2;
    let z = photon_energy / gamma;
    let x = z / (1.0 - z) / (4.0 * gamma * t);
    let cross_section = z * z / (2.0 * (1.0 - z)) * g34(x, &A3) + g34(x, &A4);
    (t / gamma).powi(2) * IC_BLACKBODY_RATE * cross_section
}

#[derive(Debug, Clone, PartialEq)]
pub struct InverseCompton {
    pub seed_fields: Vec<SeedPhotonField>,
}

impl InverseCompton {
    pub fn new(seed_fields: Vec<SeedPhotonField>) -> Self {
        Self { seed_fields }
    }

    /// Photon production rate dN/dE in 1/(s eV), summed over seed fields.
    pub fn spectrum(&self, electrons: &ElectronGrid, photon_energies_ev: &[f64]) -> Vec<f64> {
        let gamma = electrons.gamma();
        let nelec = electrons.nelec();
        photon_energies_ev
            .iter()
            .map(|&e_ev| {
                let eph = e_ev / MEC2_EV;
                self.seed_fields
                    .iter()
                    .map(|field| {
                        let t = field.temperature.base();
                        let integral =
                            trapz_loglog_with(gamma, |i, g| nelec[i] * iso_ic_on_planck(g, t, eph));
                        field.dilution() * integral / MEC2_EV
                    })
                    .sum()
            })
            .collect()
    }

    /// Photon flux dN/dE in 1/(cm2 s eV) at `distance`.
    pub fn flux(
        &self,
        electrons: &ElectronGrid,
        photon_energies_ev: &[f64],
        distance: Quantity<Length>,
    ) -> Vec<f64> {
        flux_at_distance(self.spectrum(electrons, photon_energies_ev), distance)
    }
}
