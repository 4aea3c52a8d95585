//! ASCII SED preview for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid, log-log axes), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - measurements: `o`
//! - upper limits: `v`
//! - model curve: `-` line

use crate::data::SpectralTable;
use crate::units::constants::ERG_PER_EV;

/// Render data (and optionally a model curve) as `E²dN/dE` in erg/(cm2 s)
/// against photon energy in eV.
///
/// `model` points are `(energy_ev, sed_erg_cm2_s)`; non-positive values are
/// skipped.
pub fn render_ascii_sed(data: &SpectralTable, model: &[(f64, f64)], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let points: Vec<(f64, f64, bool)> = data
        .rows()
        .iter()
        .map(|r| {
            let e = r.energy.base();
            let sed = data.flux_unit().to_differential_base(r.flux, e) * e * e * ERG_PER_EV;
            (e, sed, r.ul)
        })
        .filter(|&(e, v, _)| e > 0.0 && v > 0.0)
        .map(|(e, v, ul)| (e.log10(), v.log10(), ul))
        .collect();
    let curve: Vec<(f64, f64)> = model
        .iter()
        .filter(|&&(e, v)| e > 0.0 && v > 0.0 && v.is_finite())
        .map(|&(e, v)| (e.log10(), v.log10()))
        .collect();

    let xs = points.iter().map(|p| p.0).chain(curve.iter().map(|c| c.0));
    let ys = points.iter().map(|p| p.1).chain(curve.iter().map(|c| c.1));
    let (x_min, x_max) = range(xs).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = range(ys).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Draw curve first (so points can overlay).
    draw_curve(&mut grid, &curve, x_min, x_max, y_min, y_max);

    for &(x, y, ul) in &points {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][col] = if ul { 'v' } else { 'o' };
    }

    let mut out = String::new();
    out.push_str(&format!(
        "SED: E=[{:.3e}, {:.3e}] eV | E2dN/dE=[{:.3e}, {:.3e}] erg/(cm2 s)\n",
        10f64.powf(x_min),
        10f64.powf(x_max),
        10f64.powf(y_min),
        10f64.powf(y_max)
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if min.is_finite() && max.is_finite() && max > min {
        Some((min, max))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        match prev {
            Some((c0, r0)) => draw_line(grid, c0, r0, col, row, '-'),
            None => grid[row][col] = '-',
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::{Column, Table};

    fn sed_table() -> SpectralTable {
        let col = |name: &str, unit: Option<&str>, cells: &[&str]| Column {
            name: name.into(),
            unit: unit.map(str::to_string),
            cells: cells.iter().map(|c| c.to_string()).collect(),
        };
        let table = Table {
            columns: vec![
                col("energy", Some("eV"), &["1", "1000", "10000"]),
                col("flux", Some("erg/(cm2 s)"), &["1e-10", "1e-9", "1e-8"]),
                col("flux_error", Some("erg/(cm2 s)"), &["1e-11", "1e-10", "0"]),
                col("ul", None, &["0", "0", "1"]),
            ],
            meta: BTreeMap::new(),
        };
        SpectralTable::from_table(&table).unwrap()
    }

    #[test]
    fn sed_golden_snapshot_small() {
        let model = [(1.0, 1e-10), (1e4, 1e-10)];
        let txt = render_ascii_sed(&sed_table(), &model, 10, 5);
        let expected = concat!(
            "SED: E=[1.000e0, 1.000e4] eV | E2dN/dE=[7.943e-11, 1.259e-8] erg/(cm2 s)\n",
            "         v\n",
            "          \n",
            "       o  \n",
            "          \n",
            "o---------\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn differential_data_is_converted_to_sed() {
        // 1/(cm2 s eV) at 1 eV equals eV/(cm2 s); the grid shape matches an
        // SED table holding the same values in erg.
        let table = Table {
            columns: vec![
                Column {
                    name: "energy".into(),
                    unit: Some("eV".into()),
                    cells: vec!["1".into(), "10".into()],
                },
                Column {
                    name: "flux".into(),
                    unit: Some("1/(cm2 s eV)".into()),
                    cells: vec!["1".into(), "1".into()],
                },
                Column {
                    name: "flux_error".into(),
                    unit: Some("1/(cm2 s eV)".into()),
                    cells: vec!["0.1".into(), "0.1".into()],
                },
            ],
            meta: BTreeMap::new(),
        };
        let data = SpectralTable::from_table(&table).unwrap();
        let txt = render_ascii_sed(&data, &[], 10, 5);
        let rows: Vec<&str> = txt.lines().collect();
        // E² rises by 100 over one decade: bottom-left to top-right.
        assert_eq!(rows[1], "         o");
        assert_eq!(rows[5], "o         ");
    }

    #[test]
    fn empty_inputs_do_not_panic() {
        let txt = render_ascii_sed(&sed_table(), &[(0.0, -1.0)], 3, 1);
        assert_eq!(txt.lines().count(), 6);
    }
}
