//! Quadrature and grid helpers for spectra.
//!
//! Radiative spectra span many decades in both axes, so the workhorse here is a
//! trapezoid rule in log-log space: on each interval the integrand is treated
//! as a power law `y ∝ x^b` and integrated exactly.

/// Below this distance from `-1` the local power-law index uses the log form.
const INDEX_EPS: f64 = 1e-10;

/// Integral of a single log-log interval.
fn loglog_interval(x1: f64, x2: f64, y1: f64, y2: f64) -> f64 {
    if y1 == 0.0 || y2 == 0.0 || x1 == x2 {
        return 0.0;
    }
    let ratio = x2 / x1;
    let b = (y2 / y1).log10() / ratio.log10();
    if b.is_nan() {
        return f64::NAN;
    }
    if (b + 1.0).abs() > INDEX_EPS {
        y1 * (x2 * ratio.powf(b) - x1) / (b + 1.0)
    } else {
        x1 * y1 * ratio.ln()
    }
}

/// Integrate `y(x)` assuming piecewise power-law behaviour between samples.
///
/// Intervals with a zero endpoint or zero width contribute nothing. Mixed-sign
/// intervals have no power-law form and make the result NaN.
pub fn trapz_loglog(y: &[f64], x: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| loglog_interval(xs[0], xs[1], ys[0], ys[1]))
        .sum()
}

/// Same as [`trapz_loglog`] for an integrand given as a closure over the grid.
pub fn trapz_loglog_with(x: &[f64], mut f: impl FnMut(usize, f64) -> f64) -> f64 {
    let mut total = 0.0;
    let mut prev: Option<(f64, f64)> = None;
    for (i, &xi) in x.iter().enumerate() {
        let yi = f(i, xi);
        if let Some((xp, yp)) = prev {
            total += loglog_interval(xp, xi, yp, yi);
        }
        prev = Some((xi, yi));
    }
    total
}

/// Linear trapezoid rule.
pub fn trapz(y: &[f64], x: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| 0.5 * (ys[0] + ys[1]) * (xs[1] - xs[0]))
        .sum()
}

/// `n` logarithmically spaced points from `min` to `max` (inclusive).
pub fn log_space(min: f64, max: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let (lo, hi) = (min.log10(), max.log10());
            let step = (hi - lo) / (n - 1) as f64;
            (0..n).map(|i| 10f64.powf(lo + step * i as f64)).collect()
        }
    }
}

/// Log grid with a given density of points per decade.
///
/// The point count is `⌊per_decade · log10(max/min)⌋`, matching the usual
/// `nEd`-style grid definitions in radiative codes.
pub fn log_space_per_decade(min: f64, max: f64, per_decade: f64) -> Vec<f64> {
    let n = (per_decade * (max.log10() - min.log10())).floor();
    if !n.is_finite() || n < 1.0 {
        return Vec::new();
    }
    log_space(min, max, n as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(a: f64, b: f64) -> f64 {
        ((a - b) / b).abs()
    }

    #[test]
    fn loglog_is_exact_for_power_laws() {
        let x = log_space(1.0, 1e4, 9);
        let y: Vec<f64> = x.iter().map(|v| v.powf(-2.5)).collect();
        // ∫ x^-2.5 dx from 1 to 1e4 = (1 - 1e4^-1.5) / 1.5
        let expected = (1.0 - 1e4f64.powf(-1.5)) / 1.5;
        assert!(rel(trapz_loglog(&y, &x), expected) < 1e-10);
    }

    #[test]
    fn loglog_index_minus_one_uses_log_form() {
        let x = [1.0, 10.0, 100.0];
        let y = [1.0, 0.1, 0.01];
        assert!(rel(trapz_loglog(&y, &x), 100f64.ln()) < 1e-12);
    }

    #[test]
    fn zero_endpoints_and_widths_contribute_nothing() {
        let x = [1.0, 2.0, 2.0, 4.0];
        let y = [0.0, 1.0, 1.0, 0.0];
        assert_eq!(trapz_loglog(&y, &x), 0.0);
    }

    #[test]
    fn sign_change_gives_nan_not_panic() {
        let x = [1.0, 2.0];
        let y = [1.0, -1.0];
        assert!(trapz_loglog(&y, &x).is_nan());
    }

    #[test]
    fn closure_form_matches_slice_form() {
        let x = log_space(1e-3, 1e3, 50);
        let y: Vec<f64> = x.iter().map(|v| v * (-v).exp()).collect();
        let a = trapz_loglog(&y, &x);
        let b = trapz_loglog_with(&x, |_, v| v * (-v).exp());
        assert!(rel(a, b) < 1e-14);
    }

    #[test]
    fn linear_trapezoid() {
        let x = [0.0, 1.0, 2.0];
        let y = [0.0, 1.0, 2.0];
        assert!((trapz(&y, &x) - 2.0).abs() < 1e-15);
    }

    #[test]
    fn log_grids() {
        let g = log_space(1.0, 1000.0, 4);
        assert_eq!(g.len(), 4);
        assert!(rel(g[1], 10.0) < 1e-12);
        assert!(rel(g[3], 1000.0) < 1e-12);

        let d = log_space_per_decade(1.0, 1e3, 10.5);
        assert_eq!(d.len(), 31);
        assert!(log_space_per_decade(10.0, 1.0, 100.0).is_empty());
    }
}
