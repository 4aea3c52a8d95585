//! The fit pipeline shared by `sedfit fit` and the tests.
//!
//! data files -> model + starting point -> ensemble sampler -> persisted
//! sampler, results table, plots
//!
//! The front-end only decides what to print.

use std::path::PathBuf;

use log::info;

use crate::data::SpectralTable;
use crate::domain::{ELECTRON_IC_LABELS, RunConfig};
use crate::error::AppError;
use crate::fit::{ElectronIcPrior, SamplerState, estimate_b, run_sampler};
use crate::io::{read_spectral_table, sampler_path, save_results_table, save_sampler, write_config_json};
use crate::math::log_space;
use crate::models::{ElectronIc, Model};
use crate::plot::{render_ascii_sed, save_diagnostic_plots};
use crate::report::ParameterSummary;
use crate::units::{FluxUnit, Quantity, Unit};

/// Everything a `sedfit fit` run produced.
#[derive(Debug)]
pub struct RunArtifacts {
    pub state: SamplerState,
    pub sampler_path: PathBuf,
    pub config_path: PathBuf,
    pub results_path: PathBuf,
    pub summary: Vec<ParameterSummary>,
    pub plots: Vec<PathBuf>,
    pub ascii: Option<String>,
}

/// Run the full fit described by `config`.
pub fn run(config: &RunConfig) -> Result<RunArtifacts, AppError> {
    let xray = read_spectral_table(&config.xray_path).map_err(|e| e.context("X-ray data"))?;
    let vhe = read_spectral_table(&config.vhe_path).map_err(|e| e.context("VHE data"))?;
    info!("Loaded {} X-ray and {} VHE points", xray.len(), vhe.len());

    let model = ElectronIc::from_settings(&config.model)?;

    let b_microgauss = match config.params.b_microgauss {
        Some(b) => b,
        None => {
            let u = Quantity::new(config.params.photon_energy_density_ev_cm3, &Unit::ev_per_cm3());
            let b = estimate_b(&xray, &vhe, u)?.value_in(&Unit::microgauss());
            info!("Estimated B = {b:.3} uG from the X-ray / VHE energy flux ratio");
            b
        }
    };
    let p0 = config.params.to_vec(b_microgauss);
    let labels: Vec<String> = ELECTRON_IC_LABELS.iter().map(|s| s.to_string()).collect();

    let (mut state, _) = run_sampler(&[xray, vhe], &p0, &labels, &model, &ElectronIcPrior, &config.sampler)?;

    let dir = &config.output_dir;
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::output(format!("Failed to create output dir '{}': {e}", dir.display())))?;

    let sampler_path = sampler_path(dir, &config.label);
    save_sampler(&sampler_path, &mut state)?;

    let config_path = dir.join(format!("{}_config.json", config.label));
    write_config_json(&config_path, config)?;

    let (results_path, summary) = save_results_table(dir, &config.label, &state, true, true)?;

    let plots = if config.plots.enabled {
        save_diagnostic_plots(dir, &config.label, &state, &model, &config.plots)?
    } else {
        Vec::new()
    };

    let ascii = if config.plots.ascii {
        Some(ascii_preview(&state, &model, config.plots.ascii_width, config.plots.ascii_height)?)
    } else {
        None
    };

    Ok(RunArtifacts {
        state,
        sampler_path,
        config_path,
        results_path,
        summary,
        plots,
        ascii,
    })
}

/// Data plus the maximum-likelihood model as an ASCII SED.
pub fn ascii_preview(state: &SamplerState, model: &dyn Model, width: usize, height: usize) -> Result<String, AppError> {
    let curve = match state.chain.max_ln_prob() {
        Some(ml) => ml_sed_curve(&state.data, model, &ml.params)?,
        None => Vec::new(),
    };
    Ok(render_ascii_sed(&state.data, &curve, width, height))
}

/// `(E eV, E²dN/dE erg/(cm2 s))` over the data's energy range.
fn ml_sed_curve(data: &SpectralTable, model: &dyn Model, params: &[f64]) -> Result<Vec<(f64, f64)>, AppError> {
    let energies = data.energies_ev();
    let lo = energies.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = energies.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(lo.is_finite() && hi.is_finite() && lo > 0.0) {
        return Ok(Vec::new());
    }
    let grid = log_space(lo, hi, 200);
    let out = model.evaluate_at(params, &grid, &FluxUnit::Sed(Unit::erg_per_cm2_s()))?;
    Ok(grid.into_iter().zip(out.flux).collect())
}
