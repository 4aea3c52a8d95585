//! SVG diagnostic plots (plotters).
//!
//! Files written for a run labelled `L`:
//!
//! - `L_chain_<param>.svg`: walker traces and the marginal posterior
//! - `L_corner.svg`: pairwise scatter of the samples with marginal histograms
//! - `L_model0.svg`: data, ML model and the 16-84% band of posterior samples
//! - `L_model1.svg`: electron distribution `E² N(E)`
//! - `L_model2.svg`: distribution of the total electron energy `We`
//!
//! All axes are linear in `log10` of the plotted quantity where the quantity
//! spans decades.

use std::error::Error;
use std::path::{Path, PathBuf};

use log::{info, warn};
use plotters::prelude::*;
use rayon::prelude::*;

use crate::domain::PlotSettings;
use crate::error::AppError;
use crate::fit::SamplerState;
use crate::math::{histogram, log_space, percentiles};
use crate::models::{ElectronSpectrum, Model};
use crate::units::constants::ERG_PER_EV;
use crate::units::{FluxUnit, Unit};

type PlotResult = Result<(), Box<dyn Error>>;

const HIST_BINS: usize = 30;
/// Model curves extend this factor beyond the data's energy range.
const ENERGY_MARGIN: f64 = 10.0;
const MODEL_POINTS: usize = 120;

/// Write every diagnostic plot into `output_dir`; returns the written paths.
pub fn save_diagnostic_plots(
    output_dir: &Path,
    label: &str,
    state: &SamplerState,
    model: &dyn Model,
    settings: &PlotSettings,
) -> Result<Vec<PathBuf>, AppError> {
    let mut written = Vec::new();
    let fail = |path: &Path, e: Box<dyn Error>| AppError::output(format!("Failed to draw '{}': {e}", path.display()));

    for (i, name) in state.labels.iter().enumerate() {
        let path = output_dir.join(format!("{label}_chain_{}.svg", file_safe(name)));
        draw_chain(&path, state, i).map_err(|e| fail(&path, e))?;
        written.push(path);
    }

    let path = output_dir.join(format!("{label}_corner.svg"));
    draw_corner(&path, state).map_err(|e| fail(&path, e))?;
    written.push(path);

    let path = output_dir.join(format!("{label}_model0.svg"));
    draw_sed(&path, state, model, settings).map_err(|e| fail(&path, e))?;
    written.push(path);

    let path = output_dir.join(format!("{label}_model1.svg"));
    draw_electrons(&path, state, settings.n_samples).map_err(|e| fail(&path, e))?;
    written.push(path);

    let path = output_dir.join(format!("{label}_model2.svg"));
    draw_electron_energy(&path, state).map_err(|e| fail(&path, e))?;
    written.push(path);

    info!("Wrote {} diagnostic plots to {}", written.len(), output_dir.display());
    Ok(written)
}

/// `log10(cutoff)` -> `log10_cutoff`.
pub fn file_safe(name: &str) -> String {
    let mapped: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    mapped.trim_matches('_').to_string()
}

/// `(min, max)` of the finite values, widened by 5% (or by 1 when flat).
fn bounds(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !(lo.is_finite() && hi.is_finite()) {
        return (0.0, 1.0);
    }
    if hi - lo < 1e-12 {
        return (lo - 1.0, hi + 1.0);
    }
    let pad = 0.05 * (hi - lo);
    (lo - pad, hi + pad)
}

fn draw_histogram<DB: DrawingBackend>(area: &DrawingArea<DB, plotters::coord::Shift>, values: &[f64], x_desc: &str) -> PlotResult
where
    DB::ErrorType: 'static,
{
    let Some((edges, counts)) = histogram(values, HIST_BINS) else {
        return Ok(());
    };
    let (x0, x1) = (edges[0], edges[edges.len() - 1]);
    let (x0, x1) = if x1 > x0 { (x0, x1) } else { (x0 - 1.0, x1 + 1.0) };
    let top = counts.iter().copied().max().unwrap_or(1).max(1) as f64 * 1.1;

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(50)
        .build_cartesian_2d(x0..x1, 0.0..top)?;
    chart.configure_mesh().x_desc(x_desc).y_desc("count").draw()?;
    chart.draw_series(
        counts
            .iter()
            .enumerate()
            .map(|(i, &c)| Rectangle::new([(edges[i], 0.0), (edges[i + 1], c as f64)], BLUE.mix(0.5).filled())),
    )?;
    Ok(())
}

fn draw_chain(path: &Path, state: &SamplerState, param: usize) -> PlotResult {
    let name = &state.labels[param];
    let root = SVGBackend::new(path, (900, 800)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((2, 1));

    let chain = &state.chain;
    let n_steps = chain.len().max(2);
    let (y0, y1) = bounds(chain.param_samples(param));
    let mut traces = ChartBuilder::on(&panels[0])
        .caption(format!("Walkers: {name}"), ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..(n_steps - 1) as f64, y0..y1)?;
    traces.configure_mesh().x_desc("step").y_desc(name.as_str()).draw()?;
    for w in 0..chain.n_walkers() {
        let trace = chain.walker_trace(w, param);
        traces.draw_series(LineSeries::new(
            trace.into_iter().enumerate().map(|(s, v)| (s as f64, v)),
            BLACK.mix(0.3),
        ))?;
    }

    draw_histogram(&panels[1], &chain.param_samples(param), name)?;
    root.present()?;
    Ok(())
}

fn draw_corner(path: &Path, state: &SamplerState) -> PlotResult {
    let n = state.labels.len().max(1);
    let side = 260 * n as u32;
    let root = SVGBackend::new(path, (side, side)).into_drawing_area();
    root.fill(&WHITE)?;
    let cells = root.split_evenly((n, n));

    let samples: Vec<Vec<f64>> = (0..state.labels.len()).map(|i| state.chain.param_samples(i)).collect();
    for row in 0..state.labels.len() {
        for col in 0..=row {
            let area = &cells[row * n + col];
            if row == col {
                draw_histogram(area, &samples[row], &state.labels[row])?;
                continue;
            }
            let (x0, x1) = bounds(samples[col].iter().copied());
            let (y0, y1) = bounds(samples[row].iter().copied());
            let mut chart = ChartBuilder::on(area)
                .margin(10)
                .x_label_area_size(35)
                .y_label_area_size(50)
                .build_cartesian_2d(x0..x1, y0..y1)?;
            chart
                .configure_mesh()
                .x_desc(state.labels[col].as_str())
                .y_desc(state.labels[row].as_str())
                .x_labels(4)
                .y_labels(4)
                .draw()?;
            chart.draw_series(
                samples[col]
                    .iter()
                    .zip(&samples[row])
                    .filter(|(x, y)| x.is_finite() && y.is_finite())
                    .map(|(&x, &y)| Circle::new((x, y), 1, BLACK.mix(0.4).filled())),
            )?;
        }
    }
    root.present()?;
    Ok(())
}

/// Up to `n` parameter vectors spread evenly over the finite samples.
fn posterior_draws(state: &SamplerState, n: usize) -> Vec<Vec<f64>> {
    let flat = state.chain.flat_samples();
    let finite: Vec<usize> = state
        .chain
        .flat_ln_probs()
        .iter()
        .enumerate()
        .filter(|(_, lp)| lp.is_finite())
        .map(|(i, _)| i)
        .collect();
    if finite.is_empty() || n == 0 {
        return Vec::new();
    }
    let stride = (finite.len() / n).max(1);
    finite
        .iter()
        .step_by(stride)
        .take(n)
        .map(|&i| flat.row(i).iter().copied().collect())
        .collect()
}

fn draw_sed(path: &Path, state: &SamplerState, model: &dyn Model, settings: &PlotSettings) -> PlotResult {
    let data = &state.data;
    // Plot units: erg/(cm2 s) for the SED, 1/(cm2 s eV) otherwise.
    let unit = if settings.sed {
        FluxUnit::Sed(Unit::erg_per_cm2_s())
    } else {
        FluxUnit::Differential(Unit::per_energy(&Unit::ev()))
    };
    let to_plot = |value: f64, e: f64| unit.from_differential_base(data.flux_unit().to_differential_base(value, e), e);

    let energies = data.energies_ev();
    let (e_lo, e_hi) = energies
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &e| (lo.min(e), hi.max(e)));
    let grid = log_space(e_lo / ENERGY_MARGIN, e_hi * ENERGY_MARGIN, MODEL_POINTS);

    let ml_curve = match state.chain.max_ln_prob() {
        Some(ml) => model.evaluate_at(&ml.params, &grid, &unit)?.flux,
        None => {
            warn!("No finite samples; model plot shows the data only");
            Vec::new()
        }
    };
    let draws = posterior_draws(state, settings.n_samples);
    let sample_fluxes: Vec<Vec<f64>> = draws
        .par_iter()
        .map(|p| model.evaluate_at(p, &grid, &unit).map(|o| o.flux))
        .collect::<Result<_, _>>()?;
    let band: Vec<(f64, f64)> = (0..grid.len())
        .map(|i| {
            let column: Vec<f64> = sample_fluxes.iter().map(|f| f[i]).filter(|v| *v > 0.0).collect();
            let p = percentiles(&column, &[16.0, 84.0]);
            (p[0], p[1])
        })
        .collect();

    let log = |v: f64| if v > 0.0 { v.log10() } else { f64::NAN };
    let points: Vec<(f64, f64, f64, f64, bool)> = data
        .rows()
        .iter()
        .map(|r| {
            let e = r.energy.base();
            let y = to_plot(r.flux, e);
            let lo = to_plot(r.flux - r.flux_error_lo, e);
            let hi = to_plot(r.flux + r.flux_error_hi, e);
            (e.log10(), log(y), log(lo), log(hi), r.ul)
        })
        .collect();

    let (x0, x1) = bounds(grid.iter().map(|e| e.log10()));
    let y_values = points
        .iter()
        .flat_map(|p| [p.1, p.3])
        .chain(ml_curve.iter().map(|&v| log(v)))
        .chain(band.iter().map(|b| log(b.1)));
    let (y0, y1) = bounds(y_values);
    // Keep the falling model tails from flattening the data.
    let y0 = y0.max(y1 - 8.0);

    let root = SVGBackend::new(path, (1000, 700)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{} model", state.labels.join(", ")), ("sans-serif", 20))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(x0..x1, y0..y1)?;
    chart
        .configure_mesh()
        .x_desc("log10(E / eV)")
        .y_desc(if settings.sed {
            "log10(E² dN/dE / erg cm⁻² s⁻¹)"
        } else {
            "log10(dN/dE / cm⁻² s⁻¹ eV⁻¹)"
        })
        .draw()?;

    let band_upper: Vec<(f64, f64)> = grid
        .iter()
        .zip(&band)
        .filter(|(_, b)| b.0 > 0.0 && b.1 > 0.0)
        .map(|(e, b)| (e.log10(), b.1.log10().clamp(y0, y1)))
        .collect();
    let band_lower: Vec<(f64, f64)> = grid
        .iter()
        .zip(&band)
        .filter(|(_, b)| b.0 > 0.0 && b.1 > 0.0)
        .map(|(e, b)| (e.log10(), b.0.log10().clamp(y0, y1)))
        .rev()
        .collect();
    if band_upper.len() > 1 {
        let outline: Vec<(f64, f64)> = band_upper.into_iter().chain(band_lower).collect();
        chart.draw_series(std::iter::once(Polygon::new(outline, BLUE.mix(0.2).filled())))?;
    }

    let ml_points: Vec<(f64, f64)> = grid
        .iter()
        .zip(&ml_curve)
        .filter(|(_, v)| **v > 0.0 && v.log10() >= y0)
        .map(|(e, v)| (e.log10(), v.log10()))
        .collect();
    chart.draw_series(LineSeries::new(ml_points, BLUE.stroke_width(2)))?;

    for &(x, y, lo, hi, ul) in &points {
        if !y.is_finite() {
            continue;
        }
        if ul {
            let arrow = 0.03 * (y1 - y0);
            chart.draw_series(std::iter::once(PathElement::new(vec![(x, y), (x, y - 3.0 * arrow)], RED)))?;
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(x - 0.02, y - 2.0 * arrow), (x, y - 3.0 * arrow), (x + 0.02, y - 2.0 * arrow)],
                RED,
            )))?;
            continue;
        }
        let lo = if lo.is_finite() { lo.max(y0) } else { y0 };
        if hi.is_finite() {
            chart.draw_series(std::iter::once(PathElement::new(vec![(x, lo), (x, hi)], BLACK)))?;
        }
        chart.draw_series(std::iter::once(Circle::new((x, y), 3, BLACK.filled())))?;
    }

    root.present()?;
    Ok(())
}

/// `(log10 E/eV, log10 E²N(E)/erg)` of an electron spectrum.
fn electron_curve(spectrum: &ElectronSpectrum) -> Vec<(f64, f64)> {
    spectrum
        .energy
        .iter()
        .zip(&spectrum.density)
        .map(|(&e, &n)| (e, e * e * n * ERG_PER_EV))
        .filter(|&(e, v)| e > 0.0 && v > 0.0 && v.is_finite())
        .map(|(e, v)| (e.log10(), v.log10()))
        .collect()
}

fn draw_electrons(path: &Path, state: &SamplerState, n_samples: usize) -> PlotResult {
    let ml_blob = state.chain.max_ln_prob().and_then(|ml| ml.blob);
    let blobs: Vec<_> = state.chain.flat_blobs().into_iter().flatten().collect();
    let stride = (blobs.len() / n_samples.max(1)).max(1);
    let samples: Vec<Vec<(f64, f64)>> = blobs
        .iter()
        .step_by(stride)
        .take(n_samples)
        .map(|b| electron_curve(&b.electrons))
        .collect();
    let ml = ml_blob.map(|b| electron_curve(&b.electrons)).unwrap_or_default();

    let all = || samples.iter().flatten().chain(ml.iter());
    let (x0, x1) = bounds(all().map(|p| p.0));
    let (y0, y1) = bounds(all().map(|p| p.1));
    let y0 = y0.max(y1 - 10.0);

    let root = SVGBackend::new(path, (1000, 700)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Electron distribution", ("sans-serif", 20))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(x0..x1, y0..y1)?;
    chart
        .configure_mesh()
        .x_desc("log10(E / eV)")
        .y_desc("log10(E² N(E) / erg)")
        .draw()?;
    for curve in &samples {
        chart.draw_series(LineSeries::new(
            curve.iter().copied().filter(|p| p.1 >= y0),
            BLACK.mix(0.1),
        ))?;
    }
    chart.draw_series(LineSeries::new(ml.into_iter().filter(|p| p.1 >= y0), BLUE.stroke_width(2)))?;
    root.present()?;
    Ok(())
}

fn draw_electron_energy(path: &Path, state: &SamplerState) -> PlotResult {
    let we: Vec<f64> = state
        .chain
        .flat_blobs()
        .into_iter()
        .flatten()
        .map(|b| b.total_energy)
        .filter(|v| *v > 0.0)
        .map(f64::log10)
        .collect();
    let root = SVGBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    draw_histogram(&root, &we, "log10(We / erg)")?;
    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ToyModel, toy_state};

    #[test]
    fn parameter_names_become_file_names() {
        assert_eq!(file_safe("log10(cutoff)"), "log10_cutoff");
        assert_eq!(file_safe("B"), "B");
        assert_eq!(file_safe("a b/c"), "a_b_c");
    }

    #[test]
    fn bounds_pad_and_handle_flat_input() {
        assert_eq!(bounds([1.0, 1.0]), (0.0, 2.0));
        assert_eq!(bounds([f64::NAN]), (0.0, 1.0));
        let (lo, hi) = bounds([0.0, 10.0, f64::INFINITY]);
        assert!((lo + 0.5).abs() < 1e-12 && (hi - 10.5).abs() < 1e-12);
    }

    #[test]
    fn posterior_draws_skip_non_finite_samples() {
        let mut state = toy_state(4);
        state.chain.push(
            nalgebra::DMatrix::from_row_slice(2, 2, &[7.0, 7.0, 8.0, 8.0]),
            nalgebra::DVector::from_vec(vec![f64::NEG_INFINITY, f64::NEG_INFINITY]),
            vec![None, None],
        );
        let draws = posterior_draws(&state, 100);
        assert_eq!(draws.len(), 8);
        assert!(draws.iter().all(|d| d[0] != 7.0 && d[0] != 8.0));
        assert_eq!(posterior_draws(&state, 3).len(), 3);
    }

    #[test]
    fn writes_every_diagnostic_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = toy_state(12);
        let settings = PlotSettings {
            n_samples: 5,
            ..PlotSettings::default()
        };
        let written = save_diagnostic_plots(dir.path(), "toy", &state, &ToyModel, &settings).unwrap();
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "toy_chain_norm.svg",
                "toy_chain_log10_cutoff.svg",
                "toy_corner.svg",
                "toy_model0.svg",
                "toy_model1.svg",
                "toy_model2.svg",
            ]
        );
        for path in &written {
            let text = std::fs::read_to_string(path).unwrap();
            assert!(text.contains("<svg"), "{}", path.display());
        }
    }

    #[test]
    fn differential_model_plot_also_works() {
        let dir = tempfile::tempdir().unwrap();
        let settings = PlotSettings {
            sed: false,
            n_samples: 3,
            ..PlotSettings::default()
        };
        let path = dir.path().join("m.svg");
        draw_sed(&path, &toy_state(3), &ToyModel, &settings).unwrap();
        assert!(path.exists());
    }
}
