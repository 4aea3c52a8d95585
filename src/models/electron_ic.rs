//! Synchrotron + inverse-Compton model of an ECPL electron population.
//!
//! Parameters (in order): amplitude (1/eV at the reference energy), spectral
//! index, log10 of the cutoff energy in TeV, magnetic field in µG.
//!
//! The two channels are evaluated on disjoint sets of bins: energies below the
//! partition energy (1 MeV by default) get synchrotron, all others get IC.
//! Neither channel is computed where it would be negligible.

use crate::domain::{ModelSettings, SeedFieldSpec};
use crate::error::AppError;
use crate::models::electron::{ElectronGrid, ElectronGridSettings};
use crate::models::inverse_compton::{InverseCompton, SeedPhotonField};
use crate::models::particle::ExponentialCutoffPowerLaw;
use crate::models::synchrotron::Synchrotron;
use crate::models::{ElectronSpectrum, Model, ModelOutput};
use crate::units::constants::MEC2_EV;
use crate::units::{Energy, FluxUnit, Length, Quantity, Unit};

pub const ELECTRON_IC_N_PARAMS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct ElectronIc {
    distance: Quantity<Length>,
    reference_energy: Quantity<Energy>,
    partition: Quantity<Energy>,
    grid: ElectronGridSettings,
    ic: InverseCompton,
}

impl Default for ElectronIc {
    fn default() -> Self {
        Self {
            distance: Quantity::new(2.0, &Unit::kpc()),
            reference_energy: Quantity::new(10.0, &Unit::tev()),
            partition: Quantity::new(1.0, &Unit::mev()),
            grid: ElectronGridSettings::default(),
            ic: InverseCompton::new(vec![SeedPhotonField::cmb()]),
        }
    }
}

impl ElectronIc {
    pub fn from_settings(settings: &ModelSettings) -> Result<Self, AppError> {
        let positive = [
            ("distance_kpc", settings.distance_kpc, true),
            ("reference_energy_tev", settings.reference_energy_tev, false),
            ("partition_mev", settings.partition_mev, false),
            ("electron_e_min_gev", settings.electron_e_min_gev, false),
            ("electron_e_max_mec2", settings.electron_e_max_mec2, false),
            ("electron_points_per_decade", settings.electron_points_per_decade, false),
        ];
        for (name, value, zero_ok) in positive {
            let ok = value.is_finite() && (value > 0.0 || (zero_ok && value == 0.0));
            if !ok {
                return Err(AppError::input(format!("Model setting {name} must be positive, got {value}")));
            }
        }
        let grid = ElectronGridSettings {
            e_min: Quantity::new(settings.electron_e_min_gev, &Unit::gev()),
            e_max: Quantity::from_base(settings.electron_e_max_mec2 * MEC2_EV),
            per_decade: settings.electron_points_per_decade,
        };
        if grid.e_max.base() <= grid.e_min.base() {
            return Err(AppError::input("Electron grid upper bound must exceed its lower bound"));
        }

        let seed_fields = settings
            .seed_fields
            .iter()
            .map(|spec| match spec {
                SeedFieldSpec::Named(name) => SeedPhotonField::named(name),
                SeedFieldSpec::Custom {
                    name,
                    temperature_k,
                    energy_density_ev_cm3,
                } => Ok(SeedPhotonField::new(name.clone(), *temperature_k, *energy_density_ev_cm3)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        if seed_fields.is_empty() {
            return Err(AppError::input("At least one seed photon field is required"));
        }

        Ok(Self {
            distance: Quantity::new(settings.distance_kpc, &Unit::kpc()),
            reference_energy: Quantity::new(settings.reference_energy_tev, &Unit::tev()),
            partition: Quantity::new(settings.partition_mev, &Unit::mev()),
            grid,
            ic: InverseCompton::new(seed_fields),
        })
    }

    pub fn partition_energy(&self) -> Quantity<Energy> {
        self.partition
    }

    pub fn seed_fields(&self) -> &[SeedPhotonField] {
        &self.ic.seed_fields
    }

    fn particle_distribution(&self, params: &[f64]) -> ExponentialCutoffPowerLaw {
        ExponentialCutoffPowerLaw::new(
            Quantity::new(params[0], &Unit::per_ev()),
            self.reference_energy,
            params[1],
            Quantity::new(10f64.powf(params[2]), &Unit::tev()),
        )
    }
}

/// Split bin indices into `(below, at_or_above)` the threshold energy.
pub fn partition_bins(energies_ev: &[f64], threshold_ev: f64) -> (Vec<usize>, Vec<usize>) {
    (0..energies_ev.len()).partition(|&i| energies_ev[i] < threshold_ev)
}

impl Model for ElectronIc {
    fn evaluate_at(
        &self,
        params: &[f64],
        energies_ev: &[f64],
        flux_unit: &FluxUnit,
    ) -> Result<ModelOutput, AppError> {
        if params.len() != ELECTRON_IC_N_PARAMS {
            return Err(AppError::input(format!(
                "Synchrotron + IC model takes {ELECTRON_IC_N_PARAMS} parameters, got {}",
                params.len()
            )));
        }

        let electrons = ElectronGrid::new(&self.particle_distribution(params), &self.grid);
        let (sync_bins, ic_bins) = partition_bins(energies_ev, self.partition.base());
        let pick = |bins: &[usize]| -> Vec<f64> { bins.iter().map(|&i| energies_ev[i]).collect() };

        let mut flux = vec![0.0; energies_ev.len()];
        if !sync_bins.is_empty() {
            let syn = Synchrotron::new(Quantity::new(params[3], &Unit::microgauss()));
            let values = syn.flux(&electrons, &pick(&sync_bins), self.distance);
            for (&i, v) in sync_bins.iter().zip(values) {
                flux[i] = v;
            }
        }
        if !ic_bins.is_empty() {
            let values = self.ic.flux(&electrons, &pick(&ic_bins), self.distance);
            for (&i, v) in ic_bins.iter().zip(values) {
                flux[i] = v;
            }
        }

        for (value, &e) in flux.iter_mut().zip(energies_ev) {
            *value = flux_unit.from_differential_base(*value, e);
        }

        Ok(ModelOutput {
            flux,
            electrons: ElectronSpectrum {
                energy: electrons.energies_ev(),
                density: electrons.density_per_ev(),
            },
            total_energy: electrons.total_energy_erg(),
        })
    }
}
