//! Physical constants (CODATA 2018, cgs where a unit system matters).

/// Electron rest energy `m_e c²` in eV.
pub const MEC2_EV: f64 = 510_998.950_00;

/// One electronvolt in erg.
pub const ERG_PER_EV: f64 = 1.602_176_634e-12;

/// One erg in eV.
pub const EV_PER_ERG: f64 = 1.0 / ERG_PER_EV;

/// Electron rest energy `m_e c²` in erg.
pub const MEC2_ERG: f64 = MEC2_EV * ERG_PER_EV;

/// Elementary charge in esu (Gaussian units).
pub const ELECTRON_CHARGE_ESU: f64 = 4.803_204_712_570_263e-10;

/// Reduced Planck constant in erg·s.
pub const HBAR_CGS: f64 = 1.054_571_817e-27;

/// Speed of light in cm/s.
pub const SPEED_OF_LIGHT_CGS: f64 = 2.997_924_58e10;

/// Electron mass in g.
pub const ELECTRON_MASS_G: f64 = 9.109_383_701_5e-28;

/// One parsec in cm.
pub const PARSEC_CM: f64 = 3.085_677_581_491_367e18;

/// Radiation constant `a = 4σ/c` in erg cm⁻³ K⁻⁴.
pub const RADIATION_CONSTANT_CGS: f64 = 7.565_733_250_033_928e-15;

/// Boltzmann constant in eV/K.
pub const BOLTZMANN_EV: f64 = 8.617_333_262e-5;

/// Boltzmann constant expressed in units of `m_e c²` per kelvin.
pub const KELVIN_TO_MEC2: f64 = BOLTZMANN_EV / MEC2_EV;

/// `2 r_0² m_e³ c⁴ / (π ħ³)` in s⁻¹: prefactor of the isotropic IC rate on a
/// blackbody when energies are expressed in units of `m_e c²`.
pub const IC_BLACKBODY_RATE: f64 = 2.631_873_574_380_910_4e16;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kelvin_to_mec2_matches_boltzmann_over_rest_energy() {
        // k_B / m_e c² from the CODATA 2018 values.
        assert!((KELVIN_TO_MEC2 / 1.686_370_052_6e-10 - 1.0).abs() < 1e-9);
        assert!((KELVIN_TO_MEC2 * MEC2_EV / BOLTZMANN_EV - 1.0).abs() < 1e-15);
    }

    #[test]
    fn radiation_constant_from_stefan_boltzmann() {
        let sigma_sb = 5.670_374_419e-5;
        let a = 4.0 * sigma_sb / SPEED_OF_LIGHT_CGS;
        assert!((a / RADIATION_CONSTANT_CGS - 1.0).abs() < 1e-9);
    }
}
