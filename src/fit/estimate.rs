//! Starting-point heuristics: magnetic field from the X-ray / VHE luminosity
//! ratio, and amplitude rescaling to the data's energy flux.

use log::{info, warn};

use crate::data::SpectralTable;
use crate::domain::log10_argument;
use crate::error::AppError;
use crate::fit::prior::Prior;
use crate::math::{trapz, trapz_loglog};
use crate::models::Model;
use crate::units::{EnergyDensity, MagneticField, Quantity, Unit};

/// Parameter labels recognised as an amplitude by [`guess_normalization`].
const NORM_NAMES: [&str; 6] = ["norm", "Norm", "ampl", "Ampl", "amplitude", "Amplitude"];

/// Energy flux `∫ E dN/dE dE` of a table, in eV/(cm2 s).
fn energy_flux(table: &SpectralTable) -> f64 {
    let energies = table.energies_ev();
    let e_dnde: Vec<f64> = table
        .differential_flux_base()
        .iter()
        .zip(&energies)
        .map(|(f, e)| f * e)
        .collect();
    trapz_loglog(&e_dnde, &energies)
}

/// Estimate the field for which synchrotron and IC cooling reproduce the
/// observed luminosity ratio: `B = sqrt(8π u_ph L_x / L_γ)`.
pub fn estimate_b(
    xray: &SpectralTable,
    vhe: &SpectralTable,
    photon_energy_density: Quantity<EnergyDensity>,
) -> Result<Quantity<MagneticField>, AppError> {
    let l_x = energy_flux(xray);
    let l_vhe = energy_flux(vhe);
    let u_erg = photon_energy_density.value_in(&Unit::erg_per_cm3());
    let b_gauss = (l_x / l_vhe * 8.0 * std::f64::consts::PI * u_erg).sqrt();
    if !(b_gauss.is_finite() && b_gauss > 0.0) {
        return Err(AppError::new(
            4,
            format!("Cannot estimate B from energy fluxes {l_x:.3e} and {l_vhe:.3e} eV/(cm2 s)"),
        ));
    }
    Ok(Quantity::new(b_gauss, &Unit::gauss()))
}

/// `true` for `norm`-like labels and their `log10(...)` forms.
pub fn is_normalization_label(label: &str) -> bool {
    NORM_NAMES.contains(&log10_argument(label).unwrap_or(label))
}

/// Rescale the first parameter so the model's energy flux over the data
/// matches the data's.
///
/// Only applies when `labels[0]` names an amplitude and `p0` is allowed by the
/// prior. Log-amplitudes are shifted by `log10(ratio)`, linear ones scaled.
pub fn guess_normalization(
    p0: &[f64],
    labels: &[String],
    model: &dyn Model,
    prior: &dyn Prior,
    data: &SpectralTable,
) -> Result<Vec<f64>, AppError> {
    let mut guess = p0.to_vec();
    let Some(label) = labels.first() else {
        return Ok(guess);
    };
    if guess.is_empty() || !is_normalization_label(label) {
        return Ok(guess);
    }
    if !prior.ln_prior(p0).is_finite() {
        warn!("Initial parameters are outside the prior; skipping normalization guess");
        return Ok(guess);
    }

    let model_flux = model.evaluate(p0, data)?.flux;
    if model_flux.len() != data.len() {
        return Err(AppError::new(
            4,
            format!("Model returned {} fluxes for {} data points", model_flux.len(), data.len()),
        ));
    }
    let mut order: Vec<usize> = (0..data.len()).collect();
    order.sort_by(|&a, &b| data.rows()[a].energy.base().total_cmp(&data.rows()[b].energy.base()));

    let energies: Vec<f64> = order.iter().map(|&i| data.rows()[i].energy.base()).collect();
    let e2 = |flux: &[f64]| -> Vec<f64> {
        order
            .iter()
            .map(|&i| {
                let e = data.rows()[i].energy.base();
                data.flux_unit().to_differential_base(flux[i], e) * e * e
            })
            .collect()
    };
    let data_flux = trapz(&e2(&data.fluxes()), &energies);
    let current = trapz(&e2(&model_flux), &energies);
    let ratio = data_flux / current;
    if !(ratio.is_finite() && ratio > 0.0) {
        warn!("Model energy flux is {current:.3e}; skipping normalization guess");
        return Ok(guess);
    }

    if log10_argument(label).is_some() {
        guess[0] += ratio.log10();
    } else {
        guess[0] *= ratio;
    }
    info!("Normalization guess: {label} {} -> {}", p0[0], guess[0]);
    Ok(guess)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::{Column, Table};
    use crate::models::{ElectronSpectrum, ModelOutput};
    use crate::units::constants::ERG_PER_EV;
    use crate::units::FluxUnit;

    fn power_law(energies: &[f64], unit: &str, norm: f64, index: f64) -> SpectralTable {
        let cells = |v: Vec<f64>| v.iter().map(|x| x.to_string()).collect::<Vec<_>>();
        let flux: Vec<f64> = energies.iter().map(|e| norm * e.powf(-index)).collect();
        let errors: Vec<f64> = flux.iter().map(|f| f * 0.1).collect();
        let t = Table {
            columns: vec![
                Column {
                    name: "energy".into(),
                    unit: Some(unit.into()),
                    cells: cells(energies.to_vec()),
                },
                Column {
                    name: "flux".into(),
                    unit: Some(format!("1/(cm2 s {unit})")),
                    cells: cells(flux),
                },
                Column {
                    name: "flux_error".into(),
                    unit: Some(format!("1/(cm2 s {unit})")),
                    cells: cells(errors),
                },
            ],
            meta: BTreeMap::new(),
        };
        SpectralTable::from_table(&t).unwrap()
    }

    #[test]
    fn equal_luminosities_give_the_energy_density_field() {
        // Same shape in both bands, so L_x / L_γ = 1 and B = sqrt(8π u).
        let x = power_law(&[1.0, 10.0, 100.0], "keV", 1.0, 2.5);
        let g = power_law(&[1.0, 10.0, 100.0], "keV", 1.0, 2.5);
        let u = Quantity::new(0.261, &Unit::ev_per_cm3());
        let b = estimate_b(&x, &g, u).unwrap();
        let expected = (8.0 * std::f64::consts::PI * 0.261 * ERG_PER_EV).sqrt();
        assert!((b.value_in(&Unit::gauss()) / expected - 1.0).abs() < 1e-9);
    }

    #[test]
    fn field_scales_with_root_of_luminosity_ratio() {
        let u = Quantity::new(0.261, &Unit::ev_per_cm3());
        let g = power_law(&[1.0, 10.0], "TeV", 1.0, 2.0);
        let x1 = power_law(&[1.0, 10.0], "keV", 1.0, 2.0);
        let x4 = power_law(&[1.0, 10.0], "keV", 4.0, 2.0);
        let b1 = estimate_b(&x1, &g, u).unwrap().base();
        let b4 = estimate_b(&x4, &g, u).unwrap().base();
        assert!((b4 / b1 - 2.0).abs() < 1e-9);
    }

    #[test]
    fn non_positive_density_is_an_error() {
        let x = power_law(&[1.0, 10.0], "keV", 1.0, 2.0);
        let u = Quantity::new(0.0, &Unit::ev_per_cm3());
        assert_eq!(estimate_b(&x, &x, u).unwrap_err().exit_code(), 4);
    }

    #[test]
    fn normalization_labels() {
        for l in ["norm", "Amplitude", "log10(norm)", "log10(Ampl)"] {
            assert!(is_normalization_label(l), "{l}");
        }
        for l in ["index", "log10(cutoff)", "normalization", "log10(norm"] {
            assert!(!is_normalization_label(l), "{l}");
        }
    }

    /// dN/dE = p0 · E^-2 (E in the data's energy unit).
    struct Scaled;

    impl Model for Scaled {
        fn evaluate_at(
            &self,
            params: &[f64],
            energies_ev: &[f64],
            flux_unit: &FluxUnit,
        ) -> Result<ModelOutput, AppError> {
            let kev = Unit::kev().scale();
            Ok(ModelOutput {
                flux: energies_ev
                    .iter()
                    .map(|&e| {
                        let base = params[0] * (e / kev).powi(-2) / kev;
                        flux_unit.from_differential_base(base, e)
                    })
                    .collect(),
                electrons: ElectronSpectrum {
                    energy: vec![],
                    density: vec![],
                },
                total_energy: 0.0,
            })
        }
    }

    struct Open;

    impl Prior for Open {
        fn ln_prior(&self, _: &[f64]) -> f64 {
            0.0
        }
    }

    #[test]
    fn linear_and_log_amplitudes_are_rescaled() {
        let data = power_law(&[1.0, 3.0, 10.0, 30.0], "keV", 6.0, 2.0);
        let labels = |l: &str| vec![l.to_string(), "index".to_string()];

        let linear = guess_normalization(&[2.0, 0.0], &labels("norm"), &Scaled, &Open, &data).unwrap();
        assert!((linear[0] - 6.0).abs() < 1e-9);
        assert_eq!(linear[1], 0.0);

        // The model reads params[0] linearly; only the shift matters here.
        let log = guess_normalization(&[2.0, 0.0], &labels("log10(norm)"), &Scaled, &Open, &data).unwrap();
        assert!((log[0] - (2.0 + 3f64.log10())).abs() < 1e-9);
    }

    #[test]
    fn other_labels_and_disallowed_starts_are_left_alone() {
        let data = power_law(&[1.0, 10.0], "keV", 6.0, 2.0);
        let p0 = [2.0, 0.0];
        let out = guess_normalization(&p0, &["index".to_string()], &Scaled, &Open, &data).unwrap();
        assert_eq!(out, p0);

        let out = guess_normalization(
            &[-1.0, 2.0, 0.0, 1.0],
            &["norm".to_string()],
            &Scaled,
            &crate::fit::prior::ElectronIcPrior,
            &data,
        )
        .unwrap();
        assert_eq!(out, vec![-1.0, 2.0, 0.0, 1.0]);
    }

    /// Drops the last bin.
    struct Short;

    impl Model for Short {
        fn evaluate_at(
            &self,
            params: &[f64],
            energies_ev: &[f64],
            flux_unit: &FluxUnit,
        ) -> Result<ModelOutput, AppError> {
            let mut out = Scaled.evaluate_at(params, energies_ev, flux_unit)?;
            out.flux.pop();
            Ok(out)
        }
    }

    #[test]
    fn short_model_output_is_a_numeric_error() {
        let data = power_law(&[1.0, 3.0, 10.0], "keV", 6.0, 2.0);
        let err = guess_normalization(&[2.0, 0.0], &["norm".to_string()], &Short, &Open, &data).unwrap_err();
        assert_eq!(err.exit_code(), 4);
        assert!(err.message().contains("2 fluxes for 3"));
    }
}
