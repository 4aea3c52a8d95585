//! Export the posterior summary as an ECSV table.
//!
//! The table has one row per parameter (`label median unc_lo unc_hi`); the
//! YAML header carries the run metadata so the file stands on its own.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use log::info;
use serde::Serialize;

use crate::error::AppError;
use crate::fit::SamplerState;
use crate::report::{ParameterSummary, summarize_parameters};

#[derive(Debug, Serialize)]
struct EcsvColumn {
    name: &'static str,
    datatype: &'static str,
}

/// Run metadata stored in the ECSV header.
#[derive(Debug, Serialize)]
struct ResultsMeta {
    n_walkers: usize,
    n_burn: usize,
    n_run: usize,
    seed: u64,
    p0: Vec<f64>,
    p0_burn_median: Vec<f64>,
    labels: Vec<String>,
    ml_params: Option<Vec<f64>>,
    max_ln_likelihood: Option<f64>,
    acceptance_fraction: f64,
    autocorr_time: Vec<f64>,
    electron_energy_unit: &'static str,
    created: String,
}

#[derive(Debug, Serialize)]
struct EcsvHeader {
    datatype: Vec<EcsvColumn>,
    meta: ResultsMeta,
}

/// `<output_dir>/<label>_results.ecsv`.
pub fn results_path(output_dir: &Path, label: &str) -> PathBuf {
    output_dir.join(format!("{label}_results.ecsv"))
}

/// Summarize the chain and write `<label>_results.ecsv` into `output_dir`.
pub fn save_results_table(
    output_dir: &Path,
    label: &str,
    state: &SamplerState,
    convert_log: bool,
    include_blobs: bool,
) -> Result<(PathBuf, Vec<ParameterSummary>), AppError> {
    let rows = summarize_parameters(state, convert_log, include_blobs);
    let path = results_path(output_dir, label);
    write_results_ecsv(&path, state, &rows)?;
    info!("Wrote results table {}", path.display());
    Ok((path, rows))
}

/// Write summary rows plus run metadata as ECSV.
pub fn write_results_ecsv(path: &Path, state: &SamplerState, rows: &[ParameterSummary]) -> Result<(), AppError> {
    let ml = state.chain.max_ln_prob();
    let header = EcsvHeader {
        datatype: vec![
            EcsvColumn {
                name: "label",
                datatype: "string",
            },
            EcsvColumn {
                name: "median",
                datatype: "float64",
            },
            EcsvColumn {
                name: "unc_lo",
                datatype: "float64",
            },
            EcsvColumn {
                name: "unc_hi",
                datatype: "float64",
            },
        ],
        meta: ResultsMeta {
            n_walkers: state.info.n_walkers,
            n_burn: state.info.n_burn,
            n_run: state.info.n_run,
            seed: state.info.seed,
            p0: state.info.p0.clone(),
            p0_burn_median: state.info.p0_burn_median.clone(),
            labels: state.labels.clone(),
            ml_params: ml.as_ref().map(|m| m.params.clone()),
            max_ln_likelihood: ml.as_ref().map(|m| m.ln_prob),
            acceptance_fraction: state.mean_acceptance_fraction(),
            autocorr_time: state.chain.autocorr_time(),
            electron_energy_unit: "erg",
            created: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        },
    };
    let yaml = serde_yaml::to_string(&header)
        .map_err(|e| AppError::output(format!("Failed to serialize results header: {e}")))?;

    let file = File::create(path)
        .map_err(|e| AppError::output(format!("Failed to create results table '{}': {e}", path.display())))?;
    let mut w = BufWriter::new(file);
    let write_err = |e: std::io::Error| AppError::output(format!("Failed to write results table: {e}"));

    writeln!(w, "# %ECSV 1.0").map_err(write_err)?;
    writeln!(w, "# ---").map_err(write_err)?;
    for line in yaml.lines() {
        writeln!(w, "# {line}").map_err(write_err)?;
    }
    writeln!(w, "label median unc_lo unc_hi").map_err(write_err)?;
    for r in rows {
        writeln!(w, "{} {:e} {:e} {:e}", r.label, r.median, r.unc_lo, r.unc_hi).map_err(write_err)?;
    }
    w.flush().map_err(write_err)?;
    Ok(())
}
