//! Percentile bootstrap.
//!
//! Draws `n` observations with replacement from a sample of size `n`,
//! evaluates a statistic on each resample, and reports the empirical
//! `(1 − confidence)/2` and `(1 + confidence)/2` quantiles of the replicate
//! distribution as the interval bounds.
//!
//! Reference: Efron (1979), "Bootstrap Methods: Another Look at the
//! Jackknife", *Annals of Statistics* 7(1).

use rand::Rng;
use tracing::debug;

use crate::error::{require_finite, require_len, Result, StatError};
use crate::stats;

/// Built-in statistics for [`bootstrap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Statistic {
    #[default]
    Mean,
    Median,
    StdDev,
    Variance,
}

impl Statistic {
    pub fn compute(self, data: &[f64]) -> Option<f64> {
        match self {
            Statistic::Mean => stats::mean(data),
            Statistic::Median => stats::median(data),
            Statistic::StdDev => stats::std_dev(data),
            Statistic::Variance => stats::variance(data),
        }
    }
}

/// Resample count and interval coverage.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BootstrapConfig {
    /// Number of bootstrap replicates. Default 1000.
    pub resamples: usize,
    /// Interval coverage in `(0, 1)`. Default 0.95.
    pub confidence: f64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            resamples: 1000,
            confidence: 0.95,
        }
    }
}

impl BootstrapConfig {
    #[must_use]
    pub fn with_resamples(mut self, resamples: usize) -> Self {
        self.resamples = resamples;
        self
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// # Errors
    /// `InsufficientData` for fewer than 2 resamples, `InvalidParameter`
    /// for a confidence outside `(0, 1)`.
    pub fn validate(&self) -> Result<()> {
        require_len(self.resamples, 2)?;
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(StatError::invalid("confidence", self.confidence, "must lie in (0, 1)"));
        }
        Ok(())
    }
}

/// Bootstrap estimate with its percentile interval.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BootstrapResult {
    /// Statistic evaluated on the original sample.
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
    /// Standard deviation of the replicates.
    pub standard_error: f64,
    /// Replicate values, sorted ascending.
    pub replicates: Vec<f64>,
}

impl BootstrapResult {
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Percentile bootstrap for one of the built-in statistics.
///
/// # Errors
/// - `InsufficientData` when the sample has fewer than 2 observations or
///   fewer than 2 resamples are requested.
/// - `NonFinite` for NaN/Inf observations.
/// - `InvalidParameter` for a confidence outside `(0, 1)`.
///
/// # Examples
/// ```
/// use u_statkit::random::create_rng;
/// use u_statkit::resampling::{bootstrap, BootstrapConfig, Statistic};
///
/// let sample = [4.1, 5.3, 3.9, 6.2, 5.0, 4.7, 5.8, 4.4];
/// let mut rng = create_rng(42);
/// let r = bootstrap(&sample, Statistic::Mean, &BootstrapConfig::default(), &mut rng).unwrap();
/// assert!(r.lower <= r.estimate && r.estimate <= r.upper);
/// ```
pub fn bootstrap<R: Rng>(
    sample: &[f64],
    statistic: Statistic,
    config: &BootstrapConfig,
    rng: &mut R,
) -> Result<BootstrapResult> {
    bootstrap_with(sample, |d| statistic.compute(d), config, rng)
}

/// Percentile bootstrap for an arbitrary statistic.
///
/// Replicates where `statistic` returns `None` or a non-finite value are
/// skipped.
///
/// # Errors
/// As [`bootstrap`], plus `Degenerate` when the statistic is undefined on
/// the original sample or on all but one resample.
pub fn bootstrap_with<R, F>(
    sample: &[f64],
    statistic: F,
    config: &BootstrapConfig,
    rng: &mut R,
) -> Result<BootstrapResult>
where
    R: Rng,
    F: Fn(&[f64]) -> Option<f64>,
{
    config.validate()?;
    require_len(sample.len(), 2)?;
    require_finite(sample)?;

    let estimate = statistic(sample)
        .filter(|v| v.is_finite())
        .ok_or(StatError::Degenerate("statistic is undefined for the sample"))?;

    let n = sample.len();
    let mut scratch = vec![0.0; n];
    let mut replicates = Vec::with_capacity(config.resamples);
    for _ in 0..config.resamples {
        for slot in scratch.iter_mut() {
            *slot = sample[rng.random_range(0..n)];
        }
        if let Some(value) = statistic(&scratch).filter(|v| v.is_finite()) {
            replicates.push(value);
        }
    }
    if replicates.len() < 2 {
        return Err(StatError::Degenerate("statistic is undefined on the resamples"));
    }
    let replicates = stats::sorted_copy(&replicates);

    let alpha = 1.0 - config.confidence;
    let bounds = stats::quantile_sorted(&replicates, alpha / 2.0)
        .zip(stats::quantile_sorted(&replicates, 1.0 - alpha / 2.0));
    let (lower, upper) = bounds.ok_or(StatError::NonFinite)?;
    let standard_error = stats::std_dev(&replicates).unwrap_or(0.0);

    debug!(
        resamples = replicates.len(),
        estimate,
        lower,
        upper,
        "bootstrap interval"
    );
    Ok(BootstrapResult {
        estimate,
        lower,
        upper,
        standard_error,
        replicates,
    })
}
