//! Conjugate Bayesian updating.
//!
//! Priors are immutable values; each update returns the posterior as a new
//! value so a caller can keep the whole history (prior, after 10 flips,
//! after 20 flips, ...) and redraw any of it.
//!
//! | Model | Prior | Likelihood | Posterior |
//! |---|---|---|---|
//! | Beta-Binomial | Beta(α, β) | Bernoulli | Beta(α + heads, β + tails) |
//! | Normal-Normal | N(μ₀, τ₀²) on the mean | N(μ, σ²), σ known | N(μₙ, τₙ²) |

use rand::Rng;
use tracing::trace;

use crate::distributions::{Beta, Normal};
use crate::error::{require_finite, Result, StatError};

// ============================================================================
// Beta-Binomial
// ============================================================================

impl Beta {
    /// Posterior after `heads` successes and `tails` failures.
    ///
    /// # Examples
    /// ```
    /// use u_statkit::distributions::Beta;
    /// let post = Beta::uniform().update(7, 3);
    /// assert_eq!((post.alpha(), post.beta()), (8.0, 4.0));
    /// ```
    #[must_use]
    pub fn update(&self, heads: u64, tails: u64) -> Beta {
        trace!(heads, tails, "beta-binomial update");
        Beta {
            alpha: self.alpha + heads as f64,
            beta: self.beta + tails as f64,
        }
    }

    /// Posterior after a sequence of outcomes (`true` = success).
    #[must_use]
    pub fn update_with(&self, outcomes: &[bool]) -> Beta {
        let heads = outcomes.iter().filter(|&&o| o).count() as u64;
        self.update(heads, outcomes.len() as u64 - heads)
    }

    /// Posterior predictive probability that the next trial succeeds.
    pub fn predictive_success(&self) -> f64 {
        self.mean()
    }
}

/// `n` Bernoulli(p) trials, for driving [`Beta::update_with`].
///
/// # Errors
/// `InvalidParameter` for `p ∉ [0, 1]`.
pub fn flip_coins<R: Rng>(p: f64, n: usize, rng: &mut R) -> Result<Vec<bool>> {
    if !(0.0..=1.0).contains(&p) {
        return Err(StatError::invalid("p", p, "must lie in [0, 1]"));
    }
    Ok((0..n).map(|_| rng.random::<f64>() < p).collect())
}

// ============================================================================
// Normal-Normal
// ============================================================================

/// Normal prior on an unknown mean, with known observation noise.
///
/// # Examples
/// ```
/// use u_statkit::bayes::NormalNormal;
/// let prior = NormalNormal::new(0.0, 10.0, 1.0).unwrap();
/// let post = prior.update(&[4.8, 5.1, 5.3, 4.9]).unwrap();
/// assert!((post.posterior().mean() - 5.0).abs() < 0.05);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NormalNormal {
    mean: f64,
    std_dev: f64,
    noise_sd: f64,
}

impl NormalNormal {
    /// # Errors
    /// `InvalidParameter` unless `prior_mean` is finite and both standard
    /// deviations are finite and positive.
    pub fn new(prior_mean: f64, prior_sd: f64, noise_sd: f64) -> Result<Self> {
        let prior = Normal::new(prior_mean, prior_sd)?;
        if !noise_sd.is_finite() || noise_sd <= 0.0 {
            return Err(StatError::invalid("noise_sd", noise_sd, "must be finite and > 0"));
        }
        Ok(Self {
            mean: prior.mean(),
            std_dev: prior.std_dev(),
            noise_sd,
        })
    }

    /// Posterior after `observations`.
    ///
    /// Precision adds: 1/τₙ² = 1/τ₀² + n/σ², and the mean is the
    /// precision-weighted average of μ₀ and x̄.
    ///
    /// # Errors
    /// `NonFinite` for NaN/Inf observations.
    pub fn update(&self, observations: &[f64]) -> Result<NormalNormal> {
        require_finite(observations)?;
        if observations.is_empty() {
            return Ok(*self);
        }
        let n = observations.len() as f64;
        let sum: f64 = observations.iter().sum();

        let prior_precision = 1.0 / (self.std_dev * self.std_dev);
        let noise_precision = 1.0 / (self.noise_sd * self.noise_sd);
        let precision = prior_precision + n * noise_precision;
        let mean = (self.mean * prior_precision + sum * noise_precision) / precision;

        Ok(NormalNormal {
            mean,
            std_dev: precision.recip().sqrt(),
            noise_sd: self.noise_sd,
        })
    }

    /// Current belief about the mean.
    pub fn posterior(&self) -> Normal {
        Normal {
            mean: self.mean,
            std_dev: self.std_dev,
        }
    }

    /// Distribution of the next observation.
    pub fn predictive(&self) -> Normal {
        Normal {
            mean: self.mean,
            std_dev: self.std_dev.hypot(self.noise_sd),
        }
    }

    pub fn noise_sd(&self) -> f64 {
        self.noise_sd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;

    #[test]
    fn test_uniform_prior_seven_three() {
        let post = Beta::uniform().update(7, 3);
        assert_eq!(post, Beta::new(8.0, 4.0).unwrap());
    }

    #[test]
    fn test_update_with_matches_counts() {
        let outcomes = [true, false, true, true, false];
        let prior = Beta::new(2.0, 2.0).unwrap();
        assert_eq!(prior.update_with(&outcomes), prior.update(3, 2));
        assert_eq!(prior.update_with(&[]), prior);
    }

    #[test]
    fn test_sequential_equals_batch() {
        let prior = Beta::uniform();
        let step = prior.update(4, 1).update(3, 2);
        assert_eq!(step, prior.update(7, 3));
    }

    #[test]
    fn test_posterior_concentrates() {
        let mut rng = create_rng(12);
        let flips = flip_coins(0.3, 5_000, &mut rng).unwrap();
        let post = Beta::uniform().update_with(&flips);
        assert!((post.predictive_success() - 0.3).abs() < 0.02);
        let (lo, hi) = post.credible_interval(0.95).unwrap();
        assert!(hi - lo < 0.03);
    }

    #[test]
    fn test_flip_coins_edges() {
        let mut rng = create_rng(1);
        assert!(flip_coins(0.0, 50, &mut rng).unwrap().iter().all(|&f| !f));
        assert!(flip_coins(1.0, 50, &mut rng).unwrap().iter().all(|&f| f));
        assert!(flip_coins(1.1, 5, &mut rng).is_err());
    }

    #[test]
    fn test_normal_normal_closed_form() {
        // τ₀ = σ = 1, one observation at 2: mean 1, variance ½
        let post = NormalNormal::new(0.0, 1.0, 1.0).unwrap().update(&[2.0]).unwrap();
        assert!((post.posterior().mean() - 1.0).abs() < 1e-15);
        assert!((post.posterior().variance() - 0.5).abs() < 1e-15);
        assert!((post.predictive().variance() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_normal_normal_sequential_equals_batch() {
        let prior = NormalNormal::new(3.0, 2.0, 0.5).unwrap();
        let batch = prior.update(&[1.0, 2.0, 4.0]).unwrap();
        let seq = prior.update(&[1.0]).unwrap().update(&[2.0, 4.0]).unwrap();
        assert!((batch.posterior().mean() - seq.posterior().mean()).abs() < 1e-12);
        assert!((batch.posterior().std_dev() - seq.posterior().std_dev()).abs() < 1e-12);
    }

    #[test]
    fn test_normal_normal_validation() {
        assert!(NormalNormal::new(0.0, 0.0, 1.0).is_err());
        assert!(NormalNormal::new(0.0, 1.0, -1.0).is_err());
        let prior = NormalNormal::new(0.0, 1.0, 1.0).unwrap();
        assert_eq!(prior.update(&[f64::NAN]), Err(StatError::NonFinite));
        assert_eq!(prior.update(&[]).unwrap(), prior);
    }
}
