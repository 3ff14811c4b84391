//! Regression and likelihood estimation.
//!
//! # Algorithms
//!
//! - **Linear**: closed-form ordinary least squares on centered sums.
//! - **Polynomial**: normal equations in a centered and scaled abscissa
//!   `u = (x − x̄)/s`, solved by Gaussian elimination with partial pivoting,
//!   then expanded back to powers of `x`.
//! - **Logistic**: Newton-Raphson on the log-likelihood (equivalently
//!   iteratively reweighted least squares).
//!   Reference: McCullagh & Nelder (1989), *Generalized Linear Models*, §4.4.
//! - **Model selection**: AIC = n ln(RSS/n) + 2p, BIC = n ln(RSS/n) + p ln n
//!   for Gaussian residuals with p = degree + 1 parameters.

use std::cmp::Ordering;

use tracing::{debug, trace, warn};

use crate::error::{require_finite, require_len, Result, StatError};
use crate::point::{require_finite_points, Point};

// ============================================================================
// Linear regression
// ============================================================================

/// Fitted line `y = slope·x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinearModel {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination. 1 when every `y` is equal.
    pub r_squared: f64,
}

impl LinearModel {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// `y − ŷ` for each point.
    pub fn residuals(&self, points: &[Point]) -> Vec<f64> {
        points.iter().map(|p| p.y - self.predict(p.x)).collect()
    }

    /// Residual sum of squares.
    pub fn rss(&self, points: &[Point]) -> f64 {
        self.residuals(points).iter().map(|r| r * r).sum()
    }
}

/// Least-squares line through `points`.
///
/// slope = Σ(x−x̄)(y−ȳ) / Σ(x−x̄)², algebraically identical to
/// (nΣxy − ΣxΣy)/(nΣx² − (Σx)²) but without the cancellation.
///
/// # Errors
/// - `InsufficientData` for fewer than 2 points.
/// - `NonFinite` for NaN/Inf coordinates.
/// - `Degenerate` when every x is equal.
///
/// # Examples
/// ```
/// use u_statkit::point::Point;
/// use u_statkit::regression::fit_linear;
/// let pts: Vec<Point> = (0..5).map(|i| Point::new(i as f64, 3.0 * i as f64 - 1.0)).collect();
/// let m = fit_linear(&pts).unwrap();
/// assert!((m.slope - 3.0).abs() < 1e-12);
/// assert!((m.intercept + 1.0).abs() < 1e-12);
/// ```
pub fn fit_linear(points: &[Point]) -> Result<LinearModel> {
    require_len(points.len(), 2)?;
    require_finite_points(points)?;

    let n = points.len() as f64;
    let x_mean = points.iter().map(|p| p.x).sum::<f64>() / n;
    let y_mean = points.iter().map(|p| p.y).sum::<f64>() / n;

    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for p in points {
        let dx = p.x - x_mean;
        let dy = p.y - y_mean;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if sxx == 0.0 {
        return Err(StatError::Degenerate("all x values are equal"));
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let mut model = LinearModel {
        slope,
        intercept,
        r_squared: 1.0,
    };
    if syy > 0.0 {
        model.r_squared = (1.0 - model.rss(points) / syy).clamp(0.0, 1.0);
    }
    Ok(model)
}

// ============================================================================
// Polynomial regression
// ============================================================================

/// Polynomial with `coefficients[k]` multiplying `x^k`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PolynomialModel {
    pub coefficients: Vec<f64>,
}

impl PolynomialModel {
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Horner evaluation.
    pub fn predict(&self, x: f64) -> f64 {
        self.coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }

    pub fn rss(&self, points: &[Point]) -> f64 {
        points
            .iter()
            .map(|p| {
                let r = p.y - self.predict(p.x);
                r * r
            })
            .sum()
    }
}

/// Least-squares polynomial of the given degree.
///
/// # Errors
/// - `InsufficientData` unless there are more points than `degree`.
/// - `NonFinite` for NaN/Inf coordinates.
/// - `Degenerate` when the normal equations are singular (fewer distinct
///   x values than coefficients).
///
/// # Complexity
/// O(n·d + d³) for n points and degree d.
///
/// # Examples
/// ```
/// use u_statkit::point::Point;
/// use u_statkit::regression::fit_polynomial;
/// let pts: Vec<Point> = (-3..=3)
///     .map(|i| { let x = i as f64; Point::new(x, 1.0 - 2.0 * x + 0.5 * x * x) })
///     .collect();
/// let m = fit_polynomial(&pts, 2).unwrap();
/// assert!((m.coefficients[2] - 0.5).abs() < 1e-9);
/// ```
pub fn fit_polynomial(points: &[Point], degree: usize) -> Result<PolynomialModel> {
    require_len(points.len(), degree + 1)?;
    require_finite_points(points)?;

    let n = points.len() as f64;
    let center = points.iter().map(|p| p.x).sum::<f64>() / n;
    let spread = points
        .iter()
        .map(|p| (p.x - center).abs())
        .fold(0.0_f64, f64::max);
    let scale = if spread > 0.0 { spread } else { 1.0 };

    let m = degree + 1;
    // power sums Σ u^k for k in 0..=2d, and Σ u^k y for k in 0..=d
    let mut power_sums = vec![0.0; 2 * degree + 1];
    let mut rhs = vec![0.0; m];
    for p in points {
        let u = (p.x - center) / scale;
        let mut pow = 1.0;
        for (k, sum) in power_sums.iter_mut().enumerate() {
            *sum += pow;
            if k < m {
                rhs[k] += pow * p.y;
            }
            pow *= u;
        }
    }
    let normal: Vec<Vec<f64>> = (0..m)
        .map(|i| power_sums[i..i + m].to_vec())
        .collect();

    let scaled = gaussian_elimination(normal, rhs, n)
        .ok_or(StatError::Degenerate("normal equations are singular"))?;
    Ok(PolynomialModel {
        coefficients: expand_shifted(&scaled, center, scale),
    })
}

/// Solves `a·x = b` with partial pivoting. `None` when a pivot falls below
/// `1e-12 · magnitude`.
fn gaussian_elimination(mut a: Vec<Vec<f64>>, mut b: Vec<f64>, magnitude: f64) -> Option<Vec<f64>> {
    let n = b.len();
    let eps = 1e-12 * magnitude.max(1.0);

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| {
            a[i][col]
                .abs()
                .partial_cmp(&a[j][col].abs())
                .unwrap_or(Ordering::Equal)
        })?;
        let pivot_abs = a[pivot][col].abs();
        if pivot_abs.is_nan() || pivot_abs <= eps {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        let pivot_row = a[col].clone();
        let pivot_rhs = b[col];
        for row in col + 1..n {
            let factor = a[row][col] / pivot_row[col];
            if factor == 0.0 {
                continue;
            }
            for (cell, p) in a[row][col..].iter_mut().zip(&pivot_row[col..]) {
                *cell -= factor * p;
            }
            b[row] -= factor * pivot_rhs;
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = a[row][row + 1..]
            .iter()
            .zip(&x[row + 1..])
            .map(|(c, v)| c * v)
            .sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

/// Rewrites Σ aₖ((x − c)/s)ᵏ as Σ bⱼ xʲ.
fn expand_shifted(a: &[f64], center: f64, scale: f64) -> Vec<f64> {
    let mut out = vec![0.0; a.len()];
    let mut basis = vec![1.0];
    for (k, &ak) in a.iter().enumerate() {
        for (o, b) in out.iter_mut().zip(&basis) {
            *o += ak * b;
        }
        if k + 1 < a.len() {
            let mut next = vec![0.0; basis.len() + 1];
            for (j, &b) in basis.iter().enumerate() {
                next[j + 1] += b / scale;
                next[j] -= b * center / scale;
            }
            basis = next;
        }
    }
    out
}

// ============================================================================
// Model selection
// ============================================================================

/// One row of a [`degree_scan`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DegreeFit {
    pub degree: usize,
    pub rss: f64,
    /// `-inf` for an exact fit.
    pub aic: f64,
    /// `-inf` for an exact fit.
    pub bic: f64,
    pub model: PolynomialModel,
}

/// Information criterion used to rank a [`degree_scan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Criterion {
    Aic,
    #[default]
    Bic,
}

/// Fits every degree in `0..=max_degree` and reports RSS, AIC and BIC.
///
/// # Errors
/// As [`fit_polynomial`] for `max_degree`.
pub fn degree_scan(points: &[Point], max_degree: usize) -> Result<Vec<DegreeFit>> {
    require_len(points.len(), max_degree + 1)?;
    let n = points.len() as f64;

    (0..=max_degree)
        .map(|degree| {
            let model = fit_polynomial(points, degree)?;
            let rss = model.rss(points);
            let params = (degree + 1) as f64;
            let ll_term = n * (rss / n).ln();
            trace!(degree, rss, "degree scan");
            Ok(DegreeFit {
                degree,
                rss,
                aic: ll_term + 2.0 * params,
                bic: ll_term + params * n.ln(),
                model,
            })
        })
        .collect()
}

/// Degree with the lowest criterion value; `None` for an empty scan.
pub fn best_degree(fits: &[DegreeFit], criterion: Criterion) -> Option<usize> {
    let score = |f: &DegreeFit| match criterion {
        Criterion::Aic => f.aic,
        Criterion::Bic => f.bic,
    };
    fits.iter()
        .min_by(|a, b| score(a).partial_cmp(&score(b)).unwrap_or(Ordering::Equal))
        .map(|f| f.degree)
}

// ============================================================================
// Binomial likelihood
// ============================================================================

fn check_counts(successes: u64, trials: u64) -> Result<()> {
    if successes > trials {
        return Err(StatError::invalid("successes", successes, "must not exceed trials"));
    }
    Ok(())
}

/// Maximum-likelihood estimate of a Bernoulli probability, `successes / trials`.
///
/// # Errors
/// - `InsufficientData` when `trials == 0`.
/// - `InvalidParameter` when `successes > trials`.
pub fn bernoulli_mle(successes: u64, trials: u64) -> Result<f64> {
    if trials == 0 {
        return Err(StatError::InsufficientData { needed: 1, got: 0 });
    }
    check_counts(successes, trials)?;
    Ok(successes as f64 / trials as f64)
}

/// Binomial log-likelihood `k ln p + (n − k) ln(1 − p)` without the
/// constant `ln C(n, k)`.
///
/// At `p = 0` or `p = 1` a term whose count is zero contributes 0 rather
/// than `0 · ln 0`; data that are impossible under `p` give `-inf`.
///
/// # Errors
/// `InvalidParameter` for `p ∉ [0, 1]` or `successes > trials`.
///
/// # Examples
/// ```
/// use u_statkit::regression::binomial_log_likelihood;
/// assert_eq!(binomial_log_likelihood(1.0, 5, 5).unwrap(), 0.0);
/// assert_eq!(binomial_log_likelihood(0.0, 5, 1).unwrap(), f64::NEG_INFINITY);
/// ```
pub fn binomial_log_likelihood(p: f64, trials: u64, successes: u64) -> Result<f64> {
    if !(0.0..=1.0).contains(&p) {
        return Err(StatError::invalid("p", p, "must lie in [0, 1]"));
    }
    check_counts(successes, trials)?;

    let k = successes as f64;
    let failures = (trials - successes) as f64;
    let term = |count: f64, prob: f64| {
        if count == 0.0 {
            0.0
        } else if prob == 0.0 {
            f64::NEG_INFINITY
        } else {
            count * prob.ln()
        }
    };
    Ok(term(k, p) + term(failures, 1.0 - p))
}

/// Log-likelihood evaluated at `points` evenly spaced p in `[0, 1]`.
///
/// # Errors
/// `InvalidParameter` for `points < 2`, otherwise as
/// [`binomial_log_likelihood`].
pub fn log_likelihood_curve(trials: u64, successes: u64, points: usize) -> Result<Vec<(f64, f64)>> {
    if points < 2 {
        return Err(StatError::invalid("points", points, "must be >= 2"));
    }
    let step = 1.0 / (points - 1) as f64;
    (0..points)
        .map(|i| {
            let p = (i as f64 * step).min(1.0);
            Ok((p, binomial_log_likelihood(p, trials, successes)?))
        })
        .collect()
}

// ============================================================================
// Logistic regression
// ============================================================================

/// Settings for [`fit_logistic`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogisticConfig {
    /// Newton iteration budget.
    pub max_iter: usize,
    /// Stop when the largest parameter update is below this.
    pub tolerance: f64,
    /// L2 penalty on the slope. Makes separable data fit to a finite slope.
    pub ridge: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            max_iter: 50,
            tolerance: 1e-10,
            ridge: 0.0,
        }
    }
}

impl LogisticConfig {
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn with_ridge(mut self, ridge: f64) -> Self {
        self.ridge = ridge;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iter == 0 {
            return Err(StatError::invalid("max_iter", self.max_iter, "must be >= 1"));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(StatError::invalid("tolerance", self.tolerance, "must be finite and > 0"));
        }
        if !self.ridge.is_finite() || self.ridge < 0.0 {
            return Err(StatError::invalid("ridge", self.ridge, "must be finite and >= 0"));
        }
        Ok(())
    }
}

/// One-feature logistic model P(y = 1 | x) = σ(intercept + slope·x).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogisticModel {
    pub intercept: f64,
    pub slope: f64,
    /// Newton iterations performed.
    pub iterations: usize,
    /// Whether the update fell below the tolerance within the budget.
    pub converged: bool,
}

impl LogisticModel {
    /// σ(intercept + slope·x).
    pub fn probability(&self, x: f64) -> f64 {
        sigmoid(self.intercept + self.slope * x)
    }

    /// The x where the probability crosses ½; `None` for a flat model.
    pub fn decision_boundary(&self) -> Option<f64> {
        (self.slope != 0.0).then(|| -self.intercept / self.slope)
    }

    pub fn predict(&self, x: f64) -> bool {
        self.probability(x) >= 0.5
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Fits a one-feature logistic regression by Newton-Raphson.
///
/// Separable data has no finite maximum: the fitted probabilities saturate
/// and the Hessian collapses. That case, like running out of iterations, is
/// not an error. The last finite iterate is returned with
/// `converged == false` and a `warn!` event is emitted.
///
/// # Errors
/// - `DimensionMismatch` if `xs` and `labels` differ in length.
/// - `InsufficientData` for fewer than 2 observations.
/// - `Degenerate` when only one class is present or the Hessian is
///   singular at the starting point (all x equal).
/// - `InvalidParameter` for an invalid config.
///
/// # Examples
/// ```
/// use u_statkit::regression::{fit_logistic, LogisticConfig};
/// let xs = [-3.0, -2.0, -1.0, 1.0, 2.0, 3.0];
/// let ys = [false, false, true, false, true, true];
/// let m = fit_logistic(&xs, &ys, &LogisticConfig::default()).unwrap();
/// assert!(m.converged);
/// assert!(m.decision_boundary().unwrap().abs() < 1e-8);
/// ```
pub fn fit_logistic(xs: &[f64], labels: &[bool], config: &LogisticConfig) -> Result<LogisticModel> {
    config.validate()?;
    if xs.len() != labels.len() {
        return Err(StatError::DimensionMismatch {
            expected: xs.len(),
            got: labels.len(),
        });
    }
    require_len(xs.len(), 2)?;
    require_finite(xs)?;
    if labels.iter().all(|&l| l) || labels.iter().all(|&l| !l) {
        return Err(StatError::Degenerate("labels contain a single class"));
    }

    let (mut b0, mut b1) = (0.0_f64, 0.0_f64);
    let mut iterations = 0;
    for iteration in 1..=config.max_iter {
        // gradient g and negative Hessian h of the penalised log-likelihood
        let (mut g0, mut g1) = (0.0, -config.ridge * b1);
        let (mut h00, mut h01, mut h11) = (0.0, 0.0, config.ridge);
        for (&x, &label) in xs.iter().zip(labels) {
            let p = sigmoid(b0 + b1 * x);
            let residual = if label { 1.0 - p } else { -p };
            let w = p * (1.0 - p);
            g0 += residual;
            g1 += residual * x;
            h00 += w;
            h01 += w * x;
            h11 += w * x * x;
        }

        let det = h00 * h11 - h01 * h01;
        let singular = !det.is_finite() || det <= 1e-14 * (h00 * h11).max(f64::MIN_POSITIVE);
        if singular && iteration == 1 {
            // p = 1/2 everywhere, so only constant x can make this singular
            return Err(StatError::Degenerate("logistic Hessian is singular"));
        }
        let d0 = (h11 * g0 - h01 * g1) / det;
        let d1 = (h00 * g1 - h01 * g0) / det;
        if singular || !d0.is_finite() || !d1.is_finite() {
            debug!(iteration, b0, b1, "logistic probabilities saturated");
            break;
        }
        iterations = iteration;
        b0 += d0;
        b1 += d1;
        trace!(iteration, b0, b1, "logistic newton step");

        if d0.abs().max(d1.abs()) < config.tolerance {
            debug!(iterations = iteration, intercept = b0, slope = b1, "logistic fit converged");
            return Ok(LogisticModel {
                intercept: b0,
                slope: b1,
                iterations: iteration,
                converged: true,
            });
        }
    }

    warn!(
        iterations,
        max_iter = config.max_iter,
        "logistic fit did not converge; data may be separable"
    );
    Ok(LogisticModel {
        intercept: b0,
        slope: b1,
        iterations,
        converged: false,
    })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn linear_fit_recovers_exact_line(m in -50.0_f64..50.0, b in -50.0_f64..50.0, n in 2_usize..40) {
            let pts: Vec<Point> = (0..n).map(|i| Point::new(i as f64, m * i as f64 + b)).collect();
            let fit = fit_linear(&pts).unwrap();
            prop_assert!((fit.slope - m).abs() < 1e-8);
            prop_assert!((fit.intercept - b).abs() < 1e-7);
        }

        #[test]
        fn log_likelihood_never_positive(p in 0.0_f64..=1.0, n in 0_u64..50, k_frac in 0.0_f64..=1.0) {
            let k = (n as f64 * k_frac).floor() as u64;
            let ll = binomial_log_likelihood(p, n, k).unwrap();
            prop_assert!(ll <= 0.0);
        }
    }
}
