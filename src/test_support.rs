//! Fixtures shared by unit tests across modules.

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use nalgebra::{DMatrix, DVector};

use crate::data::{Column, SpectralTable, Table};
use crate::error::AppError;
use crate::fit::{RunInfo, SamplerState};
use crate::models::{ElectronSpectrum, Model, ModelOutput};
use crate::units::FluxUnit;

/// One-point VHE table at 1 TeV.
pub fn one_point_table() -> SpectralTable {
    let cell = |v: &str| vec![v.to_string()];
    let table = Table {
        columns: vec![
            Column {
                name: "energy".into(),
                unit: Some("TeV".into()),
                cells: cell("1"),
            },
            Column {
                name: "flux".into(),
                unit: Some("1/(cm2 s TeV)".into()),
                cells: cell("1e-11"),
            },
            Column {
                name: "flux_error".into(),
                unit: Some("1/(cm2 s TeV)".into()),
                cells: cell("1e-12"),
            },
        ],
        meta: BTreeMap::new(),
    };
    SpectralTable::from_table(&table).unwrap()
}

pub fn blob(total_energy: f64) -> Option<ModelOutput> {
    Some(ModelOutput {
        flux: vec![1e-11],
        electrons: ElectronSpectrum {
            energy: vec![1e9, 1e12, 1e15],
            density: vec![1e40, 1e33, 1e20],
        },
        total_energy,
    })
}

/// Two walkers over `norm` and `log10(cutoff)`.
///
/// Walker 0 walks `norm = 1, 2, 3, ...` at `log10(cutoff) = 1` with
/// `ln p = -norm` and blob energy `norm · 1e48`; walker 1 sits at `(100, 2)`
/// with `ln p = -50` and no blob. Half of walker 0's proposals were accepted.
pub fn toy_state(n_steps: usize) -> SamplerState {
    let when = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let info = RunInfo {
        n_walkers: 2,
        n_burn: 5,
        n_run: n_steps,
        threads: 1,
        seed: 42,
        data_sed: false,
        p0: vec![1.0, 1.0],
        p0_burn_median: vec![1.5, 1.0],
        started: when,
        finished: when,
    };
    let mut state = SamplerState::new(
        vec!["norm".into(), "log10(cutoff)".into()],
        one_point_table(),
        DMatrix::zeros(2, 2),
        DVector::zeros(2),
        vec![None, None],
        info,
    );
    for s in 0..n_steps {
        let x = (s + 1) as f64;
        state.chain.push(
            DMatrix::from_row_slice(2, 2, &[x, 1.0, 100.0, 2.0]),
            DVector::from_vec(vec![-x, -50.0]),
            vec![blob(x * 1e48), None],
        );
    }
    state.n_accepted = vec![n_steps / 2, 0];
    state.n_proposed = vec![n_steps, n_steps];
    state
}

/// `norm · 1e-23 (E / TeV)^-2 exp(-E / 10^lc TeV)` per (cm2 s eV) with a fixed
/// electron spectrum; parameters `[norm, lc]`.
pub struct ToyModel;

impl Model for ToyModel {
    fn evaluate_at(&self, params: &[f64], energies_ev: &[f64], flux_unit: &FluxUnit) -> Result<ModelOutput, AppError> {
        let [norm, lc] = params else {
            return Err(AppError::new(4, "ToyModel takes two parameters"));
        };
        let cutoff = 10f64.powf(*lc) * 1e12;
        let flux = energies_ev
            .iter()
            .map(|&e| {
                let dnde = norm * 1e-23 * (e / 1e12).powi(-2) * (-e / cutoff).exp();
                flux_unit.from_differential_base(dnde, e)
            })
            .collect();
        let mut out = blob(norm * 1e48).ok_or_else(|| AppError::new(4, "no blob"))?;
        out.flux = flux;
        Ok(out)
    }
}
