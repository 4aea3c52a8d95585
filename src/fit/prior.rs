//! Log-prior functions.

/// Log of an (unnormalized) uniform prior: 0 inside the open interval
/// `(low, high)`, `-inf` outside. Bounds may be infinite.
pub fn uniform_prior(value: f64, low: f64, high: f64) -> f64 {
    if low < value && value < high {
        0.0
    } else {
        f64::NEG_INFINITY
    }
}

/// A log-prior over the parameter vector.
pub trait Prior: Send + Sync {
    fn ln_prior(&self, params: &[f64]) -> f64;
}

/// Prior of the synchrotron + IC model: positive amplitude, index in
/// `(-1, 5)`, positive field. The cutoff is left free.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElectronIcPrior;

impl Prior for ElectronIcPrior {
    fn ln_prior(&self, params: &[f64]) -> f64 {
        let [norm, index, _, b] = params else {
            return f64::NEG_INFINITY;
        };
        uniform_prior(*norm, 0.0, f64::INFINITY)
            + uniform_prior(*index, -1.0, 5.0)
            + uniform_prior(*b, 0.0, f64::INFINITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_prior_is_strict() {
        assert_eq!(uniform_prior(0.5, 0.0, 1.0), 0.0);
        assert_eq!(uniform_prior(0.0, 0.0, 1.0), f64::NEG_INFINITY);
        assert_eq!(uniform_prior(1.0, 0.0, 1.0), f64::NEG_INFINITY);
        assert_eq!(uniform_prior(1e300, 0.0, f64::INFINITY), 0.0);
        assert_eq!(uniform_prior(f64::NAN, 0.0, 1.0), f64::NEG_INFINITY);
    }

    #[test]
    fn electron_ic_prior_scenarios() {
        let p = ElectronIcPrior;
        assert!(p.ln_prior(&[1.0, 2.0, 1.5, 0.5]).is_finite());
        assert_eq!(p.ln_prior(&[-1.0, 2.0, 1.5, 0.5]), f64::NEG_INFINITY);
        assert_eq!(p.ln_prior(&[1.0, 6.0, 1.5, 0.5]), f64::NEG_INFINITY);
        assert_eq!(p.ln_prior(&[1.0, 2.0, 1.5, 0.0]), f64::NEG_INFINITY);
        assert_eq!(p.ln_prior(&[0.0, 2.0, 1.5, 0.5]), f64::NEG_INFINITY);
        assert_eq!(p.ln_prior(&[1.0, -1.0, 1.5, 0.5]), f64::NEG_INFINITY);
    }

    #[test]
    fn cutoff_is_unconstrained() {
        let p = ElectronIcPrior;
        for cutoff in [-50.0, 0.0, 1.5, 300.0] {
            assert_eq!(p.ln_prior(&[1.0, 2.0, cutoff, 0.5]), 0.0);
        }
    }

    #[test]
    fn wrong_length_is_disallowed() {
        assert_eq!(ElectronIcPrior.ln_prior(&[1.0, 2.0, 0.5]), f64::NEG_INFINITY);
    }
}
