//! Shared domain types.
//!
//! These types are plain serializable data so a run can be:
//!
//! - described by a JSON config file (`sedfit fit --config run.json`)
//! - printed as defaults (`sedfit config`)
//! - recorded alongside the persisted sampler state

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Parameter labels of the synchrotron + IC model, in vector order.
pub const ELECTRON_IC_LABELS: [&str; 4] = ["norm", "index", "log10(cutoff)", "B"];

/// `Some("x")` for a label of the form `log10(x)`.
pub fn log10_argument(label: &str) -> Option<&str> {
    label.strip_prefix("log10(")?.strip_suffix(')')
}

/// Starting point of the fit.
///
/// `b_microgauss = None` means "estimate from the X-ray / VHE luminosity
/// ratio" (see `fit::estimate_b`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamSeeds {
    /// Electron amplitude at the reference energy (1/eV).
    pub norm: f64,
    pub index: f64,
    /// log10 of the cutoff energy in TeV.
    pub log10_cutoff: f64,
    pub b_microgauss: Option<f64>,
    /// Seed photon energy density used by the field estimate (eV/cm3).
    pub photon_energy_density_ev_cm3: f64,
}

impl Default for ParamSeeds {
    fn default() -> Self {
        Self {
            norm: 4.9,
            index: 3.3,
            log10_cutoff: 48.0f64.log10(),
            b_microgauss: None,
            photon_energy_density_ev_cm3: 0.261,
        }
    }
}

impl ParamSeeds {
    pub fn to_vec(&self, b_microgauss: f64) -> Vec<f64> {
        vec![self.norm, self.index, self.log10_cutoff, b_microgauss]
    }
}

/// Ensemble sampler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerSettings {
    pub n_walkers: usize,
    pub n_burn: usize,
    pub n_run: usize,
    /// Worker threads used to evaluate walker log-probabilities.
    pub threads: usize,
    /// Fit the data in SED form (E²dN/dE) instead of differential form.
    pub data_sed: bool,
    /// Rescale the amplitude seed so the model matches the data energy flux.
    pub guess_normalization: bool,
    pub seed: u64,
    /// Stretch-move scale `a` (> 1).
    pub stretch_scale: f64,
    /// Relative spread of the initial walker ball.
    pub initial_spread: f64,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            n_walkers: 50,
            n_burn: 50,
            n_run: 10,
            threads: 4,
            data_sed: false,
            guess_normalization: true,
            seed: 42,
            stretch_scale: 2.0,
            initial_spread: 0.1,
        }
    }
}

/// A seed photon field: one of the named fields or a custom blackbody.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeedFieldSpec {
    Named(String),
    Custom {
        name: String,
        temperature_k: f64,
        energy_density_ev_cm3: f64,
    },
}

/// Fixed (non-fitted) model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub distance_kpc: f64,
    /// Reference energy of the electron power law (TeV).
    pub reference_energy_tev: f64,
    /// Bins below this energy get synchrotron, the rest IC (MeV).
    pub partition_mev: f64,
    pub seed_fields: Vec<SeedFieldSpec>,
    pub electron_e_min_gev: f64,
    /// Upper end of the electron grid in units of `m_e c²`.
    pub electron_e_max_mec2: f64,
    pub electron_points_per_decade: f64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            distance_kpc: 2.0,
            reference_energy_tev: 10.0,
            partition_mev: 1.0,
            seed_fields: vec![SeedFieldSpec::Named("CMB".to_string())],
            electron_e_min_gev: 1.0,
            electron_e_max_mec2: 1e9,
            electron_points_per_decade: 100.0,
        }
    }
}

/// Diagnostic output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotSettings {
    /// Write the SVG diagnostic plots.
    pub enabled: bool,
    /// Plot the model in SED form (E²dN/dE).
    pub sed: bool,
    /// Posterior samples drawn for the model confidence band.
    pub n_samples: usize,
    /// Print an ASCII SED preview in the terminal.
    pub ascii: bool,
    pub ascii_width: usize,
    pub ascii_height: usize,
}

impl Default for PlotSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            sed: true,
            n_samples: 100,
            ascii: false,
            ascii_width: 72,
            ascii_height: 20,
        }
    }
}

/// A full run's configuration.
///
/// `Default` reproduces the Crab Nebula synchrotron + IC fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Prefix of every output file.
    pub label: String,
    pub xray_path: PathBuf,
    pub vhe_path: PathBuf,
    pub output_dir: PathBuf,
    pub params: ParamSeeds,
    pub sampler: SamplerSettings,
    pub model: ModelSettings,
    pub plots: PlotSettings,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            label: "CrabNebula_SynIC".to_string(),
            xray_path: PathBuf::from("data/CrabNebula_Fake_Xray.dat"),
            vhe_path: PathBuf::from("data/CrabNebula_HESS_2006_ipac.dat"),
            output_dir: PathBuf::from("."),
            params: ParamSeeds::default(),
            sampler: SamplerSettings::default(),
            model: ModelSettings::default(),
            plots: PlotSettings::default(),
        }
    }
}
