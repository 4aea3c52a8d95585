//! Affine-invariant ensemble sampler (Goodman & Weare stretch move).
//!
//! Execution model:
//!
//! - one seeded `StdRng` draws the initial ball, every proposal and every
//!   accept/reject decision, in a fixed order
//! - the log-probabilities of a half-ensemble's proposals are evaluated in
//!   parallel on a rayon pool
//!
//! so a run is reproducible for a given seed regardless of the thread count.

use std::ops::Range;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::data::SpectralTable;
use crate::domain::SamplerSettings;
use crate::error::AppError;
use crate::fit::chain::Chain;
use crate::fit::estimate::guess_normalization;
use crate::fit::likelihood::LnPosterior;
use crate::fit::prior::Prior;
use crate::math::median;
use crate::models::{Model, ModelOutput};

/// Stretch-move proposal with scale `a`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchMove {
    a: f64,
}

impl Default for StretchMove {
    fn default() -> Self {
        Self { a: 2.0 }
    }
}

impl StretchMove {
    pub fn new(a: f64) -> Result<Self, AppError> {
        if !(a > 1.0 && a.is_finite()) {
            return Err(AppError::input(format!("Stretch scale must be > 1, got {a}")));
        }
        Ok(Self { a })
    }

    pub fn scale(&self) -> f64 {
        self.a
    }

    /// Draw `z` from `g(z) ∝ 1/√z` on `[1/a, a]`.
    pub fn sample_z<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let u: f64 = rng.r#gen();
        ((self.a - 1.0) * u + 1.0).powi(2) / self.a
    }

    /// `min(1, z^(d-1) exp(lp_new - lp_old))`; 0 when the proposal is disallowed.
    pub fn acceptance_probability(&self, z: f64, n_params: usize, lp_old: f64, lp_new: f64) -> f64 {
        if !lp_new.is_finite() {
            return 0.0;
        }
        let log_ratio = (n_params as f64 - 1.0) * z.ln() + (lp_new - lp_old);
        log_ratio.exp().min(1.0)
    }

    /// `y = c + z (x - c)` with `c` drawn uniformly from `complementary`.
    pub fn propose<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        current: &DVector<f64>,
        complementary: &[DVector<f64>],
    ) -> (DVector<f64>, f64) {
        let z = self.sample_z(rng);
        let c = &complementary[rng.gen_range(0..complementary.len())];
        (c + (current - c) * z, z)
    }
}

/// Bookkeeping of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub n_walkers: usize,
    pub n_burn: usize,
    pub n_run: usize,
    pub threads: usize,
    pub seed: u64,
    pub data_sed: bool,
    /// Starting point after the optional normalization guess.
    pub p0: Vec<f64>,
    /// Median walker position at the end of burn-in.
    pub p0_burn_median: Vec<f64>,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
}

/// Everything a run produces. Serializable except for the worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerState {
    pub labels: Vec<String>,
    /// The merged data the chain was fitted to.
    pub data: SpectralTable,
    pub chain: Chain,
    /// Current walker positions (`n_walkers × n_params`).
    pub positions: DMatrix<f64>,
    pub ln_probs: DVector<f64>,
    pub blobs: Vec<Option<ModelOutput>>,
    pub n_accepted: Vec<usize>,
    pub n_proposed: Vec<usize>,
    pub info: RunInfo,
    #[serde(skip)]
    pool: Option<Arc<ThreadPool>>,
}

impl SamplerState {
    /// A state with an empty chain, zeroed counters and no worker pool.
    pub fn new(
        labels: Vec<String>,
        data: SpectralTable,
        positions: DMatrix<f64>,
        ln_probs: DVector<f64>,
        blobs: Vec<Option<ModelOutput>>,
        info: RunInfo,
    ) -> Self {
        let n_walkers = positions.nrows();
        Self {
            labels,
            data,
            chain: Chain::default(),
            positions,
            ln_probs,
            blobs,
            n_accepted: vec![0; n_walkers],
            n_proposed: vec![0; n_walkers],
            info,
            pool: None,
        }
    }

    pub fn n_walkers(&self) -> usize {
        self.positions.nrows()
    }

    pub fn n_params(&self) -> usize {
        self.positions.ncols()
    }

    /// Per-walker fraction of accepted proposals since the last reset.
    pub fn acceptance_fraction(&self) -> Vec<f64> {
        self.n_accepted
            .iter()
            .zip(&self.n_proposed)
            .map(|(&a, &p)| if p == 0 { 0.0 } else { a as f64 / p as f64 })
            .collect()
    }

    pub fn mean_acceptance_fraction(&self) -> f64 {
        let total: usize = self.n_proposed.iter().sum();
        if total == 0 {
            return 0.0;
        }
        self.n_accepted.iter().sum::<usize>() as f64 / total as f64
    }

    pub fn has_pool(&self) -> bool {
        self.pool.is_some()
    }

    /// Drop the worker pool reference so the state can be persisted.
    pub fn detach_pool(&mut self) {
        self.pool = None;
    }

    fn reset(&mut self) {
        self.chain.clear();
        self.n_accepted.iter_mut().for_each(|n| *n = 0);
        self.n_proposed.iter_mut().for_each(|n| *n = 0);
    }
}

/// Fit `model` to the merged `tables`, starting near `p0`.
///
/// Returns the final state (production chain only) and the final walker
/// positions.
pub fn run_sampler(
    tables: &[SpectralTable],
    p0: &[f64],
    labels: &[String],
    model: &dyn Model,
    prior: &dyn Prior,
    settings: &SamplerSettings,
) -> Result<(SamplerState, DMatrix<f64>), AppError> {
    validate(p0, labels, settings)?;
    let stretch = StretchMove::new(settings.stretch_scale)?;
    let started = Utc::now();

    let data = SpectralTable::merge(tables, settings.data_sed)?;
    info!(
        "Fitting {} points ({} upper limits) in {} form",
        data.len(),
        data.rows().iter().filter(|r| r.ul).count(),
        if data.is_sed() { "SED" } else { "differential" }
    );

    let p0 = if settings.guess_normalization {
        guess_normalization(p0, labels, model, prior, &data)?
    } else {
        p0.to_vec()
    };

    let pool = ThreadPoolBuilder::new()
        .num_threads(settings.threads)
        .build()
        .map_err(|e| AppError::new(4, format!("Failed to start {} worker threads: {e}", settings.threads)))?;
    let pool = Arc::new(pool);

    let mut rng = StdRng::seed_from_u64(settings.seed);
    let positions = initial_ball(&p0, settings.n_walkers, settings.initial_spread, &mut rng);

    let posterior = LnPosterior {
        model,
        prior,
        data: &data,
    };
    let walkers: Vec<DVector<f64>> = rows(&positions);
    let initial = evaluate_batch(&pool, &posterior, &walkers)?;
    let outside = initial.iter().filter(|(lp, _)| !lp.is_finite()).count();
    if outside > 0 {
        warn!("{outside} of {} initial walkers have zero posterior probability", settings.n_walkers);
    }
    let (ln_probs, blobs): (Vec<f64>, Vec<Option<ModelOutput>>) = initial.into_iter().unzip();

    let info = RunInfo {
        n_walkers: settings.n_walkers,
        n_burn: settings.n_burn,
        n_run: settings.n_run,
        threads: settings.threads,
        seed: settings.seed,
        data_sed: settings.data_sed,
        p0: p0.clone(),
        p0_burn_median: p0.clone(),
        started,
        finished: started,
    };
    let mut state = SamplerState::new(
        labels.to_vec(),
        data.clone(),
        positions,
        DVector::from_vec(ln_probs),
        blobs,
        info,
    );
    state.pool = Some(Arc::clone(&pool));

    info!("Burning in the {} walkers with {} steps", settings.n_walkers, settings.n_burn);
    run_steps(&mut state, &stretch, &posterior, &pool, &mut rng, settings.n_burn, false)?;
    state.info.p0_burn_median = (0..state.n_params())
        .map(|c| median(&state.positions.column(c).iter().copied().collect::<Vec<_>>()))
        .collect();
    info!("Median after burn-in: {:?}", state.info.p0_burn_median);
    state.reset();

    info!("Walking the {} walkers with {} steps", settings.n_walkers, settings.n_run);
    run_steps(&mut state, &stretch, &posterior, &pool, &mut rng, settings.n_run, true)?;
    state.info.finished = Utc::now();
    info!(
        "Sampling done; mean acceptance fraction {:.3}",
        state.mean_acceptance_fraction()
    );

    let last = state.positions.clone();
    Ok((state, last))
}

fn validate(p0: &[f64], labels: &[String], settings: &SamplerSettings) -> Result<(), AppError> {
    let ndim = p0.len();
    if ndim == 0 {
        return Err(AppError::input("At least one parameter is required"));
    }
    if labels.len() != ndim {
        return Err(AppError::input(format!(
            "Got {} labels for {ndim} parameters",
            labels.len()
        )));
    }
    if settings.n_walkers % 2 != 0 {
        return Err(AppError::input(format!(
            "Number of walkers must be even, got {}",
            settings.n_walkers
        )));
    }
    if settings.n_walkers < 2 * ndim {
        return Err(AppError::input(format!(
            "Need at least {} walkers for {ndim} parameters, got {}",
            2 * ndim,
            settings.n_walkers
        )));
    }
    if settings.threads == 0 {
        return Err(AppError::input("Thread count must be at least 1"));
    }
    if !(settings.initial_spread.is_finite() && settings.initial_spread > 0.0) {
        return Err(AppError::input(format!(
            "Initial spread must be positive, got {}",
            settings.initial_spread
        )));
    }
    if let Some(bad) = p0.iter().position(|v| !v.is_finite()) {
        return Err(AppError::input(format!(
            "Initial value of {} is not finite",
            labels[bad]
        )));
    }
    Ok(())
}

/// Gaussian ball around `p0` with relative width `spread` (absolute width
/// `spread` for zero entries).
fn initial_ball(p0: &[f64], n_walkers: usize, spread: f64, rng: &mut StdRng) -> DMatrix<f64> {
    let sigma: Vec<f64> = p0
        .iter()
        .map(|&p| if p == 0.0 { spread } else { spread * p.abs() })
        .collect();
    let mut positions = DMatrix::zeros(n_walkers, p0.len());
    for w in 0..n_walkers {
        for (i, (&p, &s)) in p0.iter().zip(&sigma).enumerate() {
            let n: f64 = StandardNormal.sample(rng);
            positions[(w, i)] = p + s * n;
        }
    }
    positions
}

fn rows(m: &DMatrix<f64>) -> Vec<DVector<f64>> {
    m.row_iter().map(|r| r.transpose()).collect()
}

fn evaluate_batch(
    pool: &ThreadPool,
    posterior: &LnPosterior<'_>,
    points: &[DVector<f64>],
) -> Result<Vec<(f64, Option<ModelOutput>)>, AppError> {
    pool.install(|| {
        points
            .par_iter()
            .map(|p| posterior.evaluate(p.as_slice()))
            .collect()
    })
}

fn run_steps(
    state: &mut SamplerState,
    stretch: &StretchMove,
    posterior: &LnPosterior<'_>,
    pool: &ThreadPool,
    rng: &mut StdRng,
    n_steps: usize,
    record: bool,
) -> Result<(), AppError> {
    let n_walkers = state.n_walkers();
    let half = n_walkers / 2;
    let report_every = (n_steps / 10).max(1);

    for step in 0..n_steps {
        update_group(state, stretch, posterior, pool, rng, 0..half, half..n_walkers)?;
        update_group(state, stretch, posterior, pool, rng, half..n_walkers, 0..half)?;

        if record {
            state
                .chain
                .push(state.positions.clone(), state.ln_probs.clone(), state.blobs.clone());
        }

        let done = step + 1;
        let finite: Vec<f64> = state.ln_probs.iter().copied().filter(|v| v.is_finite()).collect();
        if done % report_every == 0 || done == n_steps {
            info!(
                "  step {done}/{n_steps}: acceptance {:.3}, median ln p {:.3}",
                state.mean_acceptance_fraction(),
                median(&finite)
            );
        } else {
            debug!("  step {done}/{n_steps}");
        }
    }
    Ok(())
}

fn update_group(
    state: &mut SamplerState,
    stretch: &StretchMove,
    posterior: &LnPosterior<'_>,
    pool: &ThreadPool,
    rng: &mut StdRng,
    active: Range<usize>,
    complementary: Range<usize>,
) -> Result<(), AppError> {
    let others: Vec<DVector<f64>> = complementary
        .map(|j| state.positions.row(j).transpose())
        .collect();

    let proposals: Vec<(DVector<f64>, f64)> = active
        .clone()
        .map(|i| stretch.propose(rng, &state.positions.row(i).transpose(), &others))
        .collect();
    let points: Vec<DVector<f64>> = proposals.iter().map(|(p, _)| p.clone()).collect();
    let evaluated = evaluate_batch(pool, posterior, &points)?;

    let n_params = state.n_params();
    for (i, ((proposal, z), (lp_new, blob))) in active.zip(proposals.into_iter().zip(evaluated)) {
        let p = stretch.acceptance_probability(z, n_params, state.ln_probs[i], lp_new);
        state.n_proposed[i] += 1;
        if rng.r#gen::<f64>() < p {
            state.positions.set_row(i, &proposal.transpose());
            state.ln_probs[i] = lp_new;
            state.blobs[i] = blob;
            state.n_accepted[i] += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::{Column, Table};
    use crate::fit::prior::uniform_prior;
    use crate::models::ElectronSpectrum;
    use crate::units::FluxUnit;

    /// `dN/dE = a · (E / 1 keV)^(-b)` in the data's flux unit.
    struct PowerLawModel;

    impl Model for PowerLawModel {
        fn evaluate_at(
            &self,
            params: &[f64],
            energies_ev: &[f64],
            _flux_unit: &FluxUnit,
        ) -> Result<ModelOutput, AppError> {
            Ok(ModelOutput {
                flux: energies_ev
                    .iter()
                    .map(|e| params[0] * (e / 1e3).powf(-params[1]))
                    .collect(),
                electrons: ElectronSpectrum {
                    energy: vec![1.0],
                    density: vec![params[0]],
                },
                total_energy: params[0],
            })
        }
    }

    struct PositiveAmplitude;

    impl Prior for PositiveAmplitude {
        fn ln_prior(&self, params: &[f64]) -> f64 {
            uniform_prior(params[0], 0.0, f64::INFINITY)
        }
    }

    fn table(energies_kev: &[f64], unit: &str) -> SpectralTable {
        let cells = |v: Vec<f64>| v.iter().map(|x| x.to_string()).collect::<Vec<_>>();
        let flux: Vec<f64> = energies_kev.iter().map(|e| 3.0 * e.powf(-2.0)).collect();
        let errors: Vec<f64> = flux.iter().map(|f| f * 0.1).collect();
        let t = Table {
            columns: vec![
                Column {
                    name: "energy".into(),
                    unit: Some("keV".into()),
                    cells: cells(energies_kev.to_vec()),
                },
                Column {
                    name: "flux".into(),
                    unit: Some(unit.into()),
                    cells: cells(flux),
                },
                Column {
                    name: "flux_error".into(),
                    unit: Some(unit.into()),
                    cells: cells(errors),
                },
            ],
            meta: BTreeMap::new(),
        };
        SpectralTable::from_table(&t).unwrap()
    }

    fn tables() -> Vec<SpectralTable> {
        vec![
            table(&[1.0, 2.0, 5.0], "1/(cm2 s keV)"),
            table(&[10.0, 20.0, 50.0], "1/(cm2 s keV)"),
        ]
    }

    fn labels() -> Vec<String> {
        vec!["norm".to_string(), "index".to_string()]
    }

    fn settings(threads: usize, seed: u64) -> SamplerSettings {
        SamplerSettings {
            n_walkers: 8,
            n_burn: 20,
            n_run: 15,
            threads,
            seed,
            guess_normalization: false,
            ..SamplerSettings::default()
        }
    }

    #[test]
    fn stretch_scale_must_exceed_one() {
        assert!(StretchMove::new(1.0).is_err());
        assert!(StretchMove::new(0.5).is_err());
        assert!(StretchMove::new(f64::NAN).is_err());
        assert_eq!(StretchMove::new(2.0).unwrap(), StretchMove::default());
    }

    #[test]
    fn z_stays_in_range() {
        let stretch = StretchMove::new(2.0).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let z = stretch.sample_z(&mut rng);
            assert!((0.5..=2.0).contains(&z), "{z}");
        }
    }

    #[test]
    fn acceptance_probability_cases() {
        let s = StretchMove::default();
        assert_eq!(s.acceptance_probability(1.0, 4, -10.0, -5.0), 1.0);
        assert!((s.acceptance_probability(1.0, 4, -5.0, -6.0) - (-1f64).exp()).abs() < 1e-12);
        assert!((s.acceptance_probability(2.0, 2, -5.0, -6.0) - 2.0 * (-1f64).exp()).abs() < 1e-12);
        assert_eq!(s.acceptance_probability(1.0, 4, -5.0, f64::NEG_INFINITY), 0.0);
        assert_eq!(s.acceptance_probability(1.0, 4, f64::NEG_INFINITY, -5.0), 1.0);
    }

    #[test]
    fn proposal_lies_on_the_line_through_the_partner() {
        let s = StretchMove::default();
        let mut rng = StdRng::seed_from_u64(3);
        let x = DVector::from_vec(vec![1.0, 1.0]);
        let c = DVector::from_vec(vec![0.0, 0.0]);
        let (y, z) = s.propose(&mut rng, &x, std::slice::from_ref(&c));
        assert!((y[0] - z).abs() < 1e-12);
        assert!((y[1] - z).abs() < 1e-12);
    }

    #[test]
    fn chain_shape_and_counters() {
        let (state, last) = run_sampler(
            &tables(),
            &[2.0, 1.8],
            &labels(),
            &PowerLawModel,
            &PositiveAmplitude,
            &settings(2, 42),
        )
        .unwrap();
        assert_eq!(state.chain.len(), 15);
        assert_eq!(state.chain.n_walkers(), 8);
        assert_eq!(state.chain.n_params(), 2);
        assert_eq!(state.n_proposed, vec![15; 8]);
        assert!(state.n_accepted.iter().all(|&a| a <= 15));
        assert_eq!(last, state.positions);
        assert_eq!(state.data.len(), 6);
        assert_eq!(state.info.p0_burn_median.len(), 2);
        assert!(state.has_pool());
        assert!(state.chain.max_ln_prob().is_some());
        let f = state.mean_acceptance_fraction();
        assert!((0.0..=1.0).contains(&f));
    }

    #[test]
    fn same_seed_same_chain_for_any_thread_count() {
        let run = |threads, seed| {
            run_sampler(
                &tables(),
                &[2.0, 1.8],
                &labels(),
                &PowerLawModel,
                &PositiveAmplitude,
                &settings(threads, seed),
            )
            .unwrap()
            .0
        };
        let one = run(1, 42);
        let three = run(3, 42);
        assert_eq!(one.chain, three.chain);
        assert_eq!(one.n_accepted, three.n_accepted);

        let other = run(1, 43);
        assert_ne!(one.chain, other.chain);
    }

    #[test]
    fn walkers_move_towards_the_data() {
        let mut s = settings(2, 7);
        s.n_walkers = 16;
        s.n_burn = 200;
        s.n_run = 50;
        let (state, _) = run_sampler(&tables(), &[2.0, 1.8], &labels(), &PowerLawModel, &PositiveAmplitude, &s)
            .unwrap();
        let ml = state.chain.max_ln_prob().unwrap();
        assert!((ml.params[0] - 3.0).abs() < 0.5, "{:?}", ml.params);
        assert!((ml.params[1] - 2.0).abs() < 0.2, "{:?}", ml.params);
    }

    #[test]
    fn sed_merge_is_applied() {
        let mut s = settings(1, 1);
        s.data_sed = true;
        let (state, _) =
            run_sampler(&tables(), &[2.0, 1.8], &labels(), &PowerLawModel, &PositiveAmplitude, &s).unwrap();
        assert!(state.data.is_sed());
    }

    #[test]
    fn invalid_settings_are_input_errors() {
        let run = |p0: &[f64], labels: &[String], s: &SamplerSettings| {
            run_sampler(&tables(), p0, labels, &PowerLawModel, &PositiveAmplitude, s)
                .map(|_| ())
                .unwrap_err()
                .exit_code()
        };
        let base = settings(1, 1);

        let mut odd = base.clone();
        odd.n_walkers = 7;
        assert_eq!(run(&[2.0, 1.8], &labels(), &odd), 2);

        let mut few = base.clone();
        few.n_walkers = 2;
        assert_eq!(run(&[2.0, 1.8], &labels(), &few), 2);

        let mut no_threads = base.clone();
        no_threads.threads = 0;
        assert_eq!(run(&[2.0, 1.8], &labels(), &no_threads), 2);

        let mut scale = base.clone();
        scale.stretch_scale = 1.0;
        assert_eq!(run(&[2.0, 1.8], &labels(), &scale), 2);

        assert_eq!(run(&[2.0], &labels(), &base), 2);
        assert_eq!(run(&[2.0, f64::NAN], &labels(), &base), 2);
    }

    #[test]
    fn detached_state_serializes_without_the_pool() {
        let (mut state, _) = run_sampler(
            &tables(),
            &[2.0, 1.8],
            &labels(),
            &PowerLawModel,
            &PositiveAmplitude,
            &settings(1, 5),
        )
        .unwrap();
        state.detach_pool();
        assert!(!state.has_pool());
        let bytes = bincode::serialize(&state).unwrap();
        let back: SamplerState = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back.chain, state.chain);
        assert_eq!(back.info, state.info);
        assert!(!back.has_pool());
    }
}
