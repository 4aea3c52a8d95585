//! Order statistics and histograms over posterior samples.

/// Percentile `q` (0–100) with linear interpolation between order statistics.
///
/// Non-finite values are ignored; returns NaN when nothing finite remains.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(f64::total_cmp);
    percentile_sorted(&sorted, q)
}

/// Several percentiles at once (one sort).
pub fn percentiles(values: &[f64], qs: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return vec![f64::NAN; qs.len()];
    }
    sorted.sort_by(f64::total_cmp);
    qs.iter().map(|&q| percentile_sorted(&sorted, q)).collect()
}

fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    let q = q.clamp(0.0, 100.0) / 100.0;
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Equal-width histogram over the finite values.
///
/// Returns `(bin_edges, counts)` with `bins + 1` edges, or `None` when there is
/// no finite data.
pub fn histogram(values: &[f64], bins: usize) -> Option<(Vec<f64>, Vec<usize>)> {
    let bins = bins.max(1);
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return None;
    }
    let (min, max) = if max > min {
        (min, max)
    } else {
        (min - 0.5, max + 0.5)
    };
    let width = (max - min) / bins as f64;
    let edges = (0..=bins).map(|i| min + width * i as f64).collect();
    let mut counts = vec![0usize; bins];
    for v in finite {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    Some((edges, counts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentiles_interpolate_linearly() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&v, 50.0), 3.0);
        assert_eq!(percentile(&v, 25.0), 2.0);
        assert!((percentile(&v, 16.0) - 1.64).abs() < 1e-12);
        assert!((percentile(&v, 84.0) - 4.36).abs() < 1e-12);
        assert_eq!(percentiles(&v, &[0.0, 100.0]), vec![1.0, 5.0]);
    }

    #[test]
    fn order_of_input_does_not_matter() {
        assert_eq!(median(&[5.0, 1.0, 4.0, 2.0]), 3.0);
    }

    #[test]
    fn non_finite_values_are_skipped() {
        assert_eq!(median(&[f64::NAN, 1.0, f64::NEG_INFINITY, 3.0]), 2.0);
        assert!(median(&[f64::NAN]).is_nan());
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn histogram_counts_every_finite_value() {
        let v = [0.0, 0.1, 0.5, 0.9, 1.0, f64::NAN];
        let (edges, counts) = histogram(&v, 2).unwrap();
        assert_eq!(edges, vec![0.0, 0.5, 1.0]);
        assert_eq!(counts, vec![2, 3]);
        assert!(histogram(&[f64::NAN], 4).is_none());
    }

    #[test]
    fn histogram_of_constant_values() {
        let (edges, counts) = histogram(&[2.0, 2.0], 1).unwrap();
        assert_eq!(edges, vec![1.5, 2.5]);
        assert_eq!(counts, vec![2]);
    }
}
