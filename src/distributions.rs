//! Parameter records for the Normal and Beta distributions.
//!
//! | Distribution | Parameters | Mean | Variance |
//! |---|---|---|---|
//! | [`Normal`] | μ, σ | μ | σ² |
//! | [`Beta`] | α, β | α/(α+β) | αβ/((α+β)²(α+β+1)) |
//!
//! Both types are immutable values. Updating a prior (see
//! [`bayes`](crate::bayes)) produces a new record.

use rand::Rng;

use crate::error::{Result, StatError};
use crate::{random, special};

// ============================================================================
// Normal
// ============================================================================

/// Normal distribution N(μ, σ²).
///
/// # Examples
/// ```
/// use u_statkit::distributions::Normal;
/// let n = Normal::new(100.0, 15.0).unwrap();
/// assert!((n.cdf(100.0) - 0.5).abs() < 1e-12);
/// assert!(Normal::new(0.0, -1.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Normal {
    pub(crate) mean: f64,
    pub(crate) std_dev: f64,
}

impl Normal {
    /// # Errors
    /// `InvalidParameter` unless `mean` is finite and `std_dev` is finite
    /// and positive.
    pub fn new(mean: f64, std_dev: f64) -> Result<Self> {
        if !mean.is_finite() {
            return Err(StatError::invalid("mean", mean, "must be finite"));
        }
        if !std_dev.is_finite() || std_dev <= 0.0 {
            return Err(StatError::invalid("std_dev", std_dev, "must be finite and > 0"));
        }
        Ok(Self { mean, std_dev })
    }

    /// N(0, 1).
    pub fn standard() -> Self {
        Self {
            mean: 0.0,
            std_dev: 1.0,
        }
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    pub fn variance(&self) -> f64 {
        self.std_dev * self.std_dev
    }

    pub fn pdf(&self, x: f64) -> f64 {
        special::standard_normal_pdf((x - self.mean) / self.std_dev) / self.std_dev
    }

    pub fn cdf(&self, x: f64) -> f64 {
        special::standard_normal_cdf((x - self.mean) / self.std_dev)
    }

    /// One Box-Muller draw.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        random::normal(rng, self.mean, self.std_dev)
    }

    /// `n` independent draws.
    pub fn sample_n<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<f64> {
        (0..n).map(|_| self.sample(rng)).collect()
    }
}

// ============================================================================
// Beta
// ============================================================================

/// Beta distribution on `[0, 1]`.
///
/// The density is evaluated in log space through the Lanczos ln Γ, so large
/// posterior parameters (thousands of coin flips) do not overflow.
///
/// # Examples
/// ```
/// use u_statkit::distributions::Beta;
/// let uniform = Beta::new(1.0, 1.0).unwrap();
/// assert!((uniform.pdf(0.3) - 1.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Beta {
    pub(crate) alpha: f64,
    pub(crate) beta: f64,
}

impl Beta {
    /// # Errors
    /// `InvalidParameter` unless both shape parameters are finite and > 0.
    pub fn new(alpha: f64, beta: f64) -> Result<Self> {
        if !alpha.is_finite() || alpha <= 0.0 {
            return Err(StatError::invalid("alpha", alpha, "must be finite and > 0"));
        }
        if !beta.is_finite() || beta <= 0.0 {
            return Err(StatError::invalid("beta", beta, "must be finite and > 0"));
        }
        Ok(Self { alpha, beta })
    }

    /// Beta(1, 1).
    pub fn uniform() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }

    pub fn variance(&self) -> f64 {
        let s = self.alpha + self.beta;
        self.alpha * self.beta / (s * s * (s + 1.0))
    }

    /// Interior mode `(α−1)/(α+β−2)`; `None` when α ≤ 1 or β ≤ 1 (the
    /// density then peaks at a boundary or is flat).
    pub fn mode(&self) -> Option<f64> {
        (self.alpha > 1.0 && self.beta > 1.0)
            .then(|| (self.alpha - 1.0) / (self.alpha + self.beta - 2.0))
    }

    /// Log density; `-inf` outside the support.
    pub fn ln_pdf(&self, x: f64) -> f64 {
        if !(0.0..=1.0).contains(&x) {
            return f64::NEG_INFINITY;
        }
        let a_term = if self.alpha == 1.0 { 0.0 } else { (self.alpha - 1.0) * x.ln() };
        let b_term = if self.beta == 1.0 { 0.0 } else { (self.beta - 1.0) * (1.0 - x).ln() };
        a_term + b_term - special::ln_beta(self.alpha, self.beta)
    }

    /// Density `x^(α−1)(1−x)^(β−1) / B(α, β)`.
    pub fn pdf(&self, x: f64) -> f64 {
        self.ln_pdf(x).exp()
    }

    /// CDF, the regularized incomplete beta I_x(α, β).
    pub fn cdf(&self, x: f64) -> f64 {
        special::regularized_incomplete_beta(x, self.alpha, self.beta)
    }

    /// Inverse CDF by bisection.
    ///
    /// # Returns
    /// - `None` if `p ∉ [0, 1]`.
    pub fn quantile(&self, p: f64) -> Option<f64> {
        if !(0.0..=1.0).contains(&p) {
            return None;
        }
        if p == 0.0 {
            return Some(0.0);
        }
        if p == 1.0 {
            return Some(1.0);
        }
        let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
        for _ in 0..100 {
            let mid = 0.5 * (lo + hi);
            if self.cdf(mid) < p {
                lo = mid;
            } else {
                hi = mid;
            }
            if hi - lo < 1e-14 {
                break;
            }
        }
        Some(0.5 * (lo + hi))
    }

    /// Equal-tailed credible interval holding `level` of the mass.
    ///
    /// # Errors
    /// `InvalidParameter` unless `0 < level < 1`.
    pub fn credible_interval(&self, level: f64) -> Result<(f64, f64)> {
        if !(level > 0.0 && level < 1.0) {
            return Err(StatError::invalid("level", level, "must lie in (0, 1)"));
        }
        let tail = (1.0 - level) / 2.0;
        let lower = self.quantile(tail).unwrap_or(0.0);
        let upper = self.quantile(1.0 - tail).unwrap_or(1.0);
        Ok((lower, upper))
    }

    /// Evaluates the density on `points` evenly spaced abscissae in `[0, 1]`.
    ///
    /// Endpoints are nudged inward when the density is unbounded there.
    pub fn density_curve(&self, points: usize) -> Vec<(f64, f64)> {
        if points < 2 {
            return Vec::new();
        }
        let step = 1.0 / (points - 1) as f64;
        (0..points)
            .map(|i| {
                let x = (i as f64 * step).clamp(1e-6, 1.0 - 1e-6);
                (x, self.pdf(x))
            })
            .collect()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn beta_cdf_monotonic(a in 0.5_f64..30.0, b in 0.5_f64..30.0, x1 in 0.0_f64..1.0, x2 in 0.0_f64..1.0) {
            let d = Beta::new(a, b).unwrap();
            let (lo, hi) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
            prop_assert!(d.cdf(lo) <= d.cdf(hi) + 1e-12);
        }

        #[test]
        fn normal_cdf_in_unit_interval(mu in -100.0_f64..100.0, sd in 0.01_f64..50.0, x in -500.0_f64..500.0) {
            let c = Normal::new(mu, sd).unwrap().cdf(x);
            prop_assert!((0.0..=1.0).contains(&c));
        }
    }
}
