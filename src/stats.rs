//! Descriptive statistics.
//!
//! These helpers return `Option`: `None` means the quantity does not exist
//! for the input (empty slice, a single observation where a spread is
//! needed, NaN/Inf present). Higher-level modules lift `None` into a
//! [`StatError`](crate::StatError).
//!
//! Variance and covariance use Bessel's correction (`n − 1`) everywhere.
//!
//! # Algorithms
//!
//! - **Mean**: Neumaier compensated summation.
//! - **Variance**: Welford's online update.
//!   Reference: Welford (1962), *Technometrics* 4(3).
//! - **Quantile**: R-7 linear interpolation.
//!   Reference: Hyndman & Fan (1996), *The American Statistician* 50(4).

use std::cmp::Ordering;

/// Arithmetic mean.
///
/// # Returns
/// - `None` if `data` is empty or contains NaN/Inf.
///
/// # Examples
/// ```
/// use u_statkit::stats::mean;
/// assert_eq!(mean(&[1.0, 2.0, 3.0, 4.0]), Some(2.5));
/// ```
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() || !data.iter().all(|x| x.is_finite()) {
        return None;
    }
    Some(kahan_sum(data) / data.len() as f64)
}

/// Sample variance (denominator `n − 1`).
///
/// Always `>= 0`, and exactly `0` for constant input.
///
/// # Returns
/// - `None` if `data.len() < 2` or contains NaN/Inf.
///
/// # Examples
/// ```
/// use u_statkit::stats::variance;
/// let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
/// assert!((variance(&v).unwrap() - 32.0 / 7.0).abs() < 1e-12);
/// assert_eq!(variance(&[10.0, 10.0, 10.0]), Some(0.0));
/// ```
pub fn variance(data: &[f64]) -> Option<f64> {
    if data.len() < 2 || !data.iter().all(|x| x.is_finite()) {
        return None;
    }
    let mut acc = WelfordAccumulator::new();
    data.iter().for_each(|&x| acc.update(x));
    acc.sample_variance()
}

/// Sample standard deviation, `sqrt(variance)`.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    variance(data).map(f64::sqrt)
}

/// Sample covariance `Σ(xᵢ − x̄)(yᵢ − ȳ) / (n − 1)`.
///
/// # Returns
/// - `None` if lengths differ, `n < 2`, or any value is NaN/Inf.
pub fn covariance(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len();
    if n != y.len() || n < 2 {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;
    let s: f64 = x.iter().zip(y).map(|(&a, &b)| (a - mx) * (b - my)).sum();
    Some(s / (n - 1) as f64)
}

/// Pearson correlation coefficient.
///
/// # Returns
/// - `None` under the same conditions as [`covariance`], or when either
///   input has zero variance (correlation undefined).
///
/// # Examples
/// ```
/// use u_statkit::stats::correlation;
/// let r = correlation(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap();
/// assert!((r + 1.0).abs() < 1e-12);
/// assert_eq!(correlation(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]), None);
/// ```
pub fn correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    let cov = covariance(x, y)?;
    let vx = variance(x)?;
    let vy = variance(y)?;
    if vx <= 0.0 || vy <= 0.0 {
        return None;
    }
    Some((cov / (vx * vy).sqrt()).clamp(-1.0, 1.0))
}

/// Median; averages the two middle values for even lengths.
///
/// # Returns
/// - `None` if `data` is empty or contains NaN.
pub fn median(data: &[f64]) -> Option<f64> {
    quantile(data, 0.5)
}

/// `p`-th quantile by R-7 linear interpolation.
///
/// # Returns
/// - `None` if `data` is empty, `p ∉ [0, 1]`, or data contains NaN.
///
/// # Examples
/// ```
/// use u_statkit::stats::quantile;
/// let data = [1.0, 2.0, 3.0, 4.0];
/// assert!((quantile(&data, 0.25).unwrap() - 1.75).abs() < 1e-15);
/// ```
pub fn quantile(data: &[f64], p: f64) -> Option<f64> {
    if data.iter().any(|x| x.is_nan()) {
        return None;
    }
    let sorted = sorted_copy(data);
    quantile_sorted(&sorted, p)
}

/// [`quantile`] on data already sorted in non-decreasing order.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 || !(0.0..=1.0).contains(&p) {
        return None;
    }
    let h = (n - 1) as f64 * p;
    let j = h.floor() as usize;
    if j + 1 >= n {
        return Some(sorted[n - 1]);
    }
    let g = h - j as f64;
    Some((1.0 - g) * sorted[j] + g * sorted[j + 1])
}

/// Average ranks (1-based), ties share the mean of their positions.
///
/// The result is in the original order of `data`. NaN values compare equal
/// to everything and should be filtered by the caller.
///
/// # Examples
/// ```
/// use u_statkit::stats::ranks;
/// assert_eq!(ranks(&[30.0, 10.0, 20.0, 10.0]), vec![4.0, 1.5, 3.0, 1.5]);
/// ```
pub fn ranks(data: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..data.len()).collect();
    order.sort_by(|&a, &b| data[a].partial_cmp(&data[b]).unwrap_or(Ordering::Equal));

    let mut out = vec![0.0; data.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() && data[order[j]] == data[order[i]] {
            j += 1;
        }
        // positions i..j (0-based) share rank ((i+1) + j) / 2
        let rank = (i + 1 + j) as f64 / 2.0;
        for &idx in &order[i..j] {
            out[idx] = rank;
        }
        i = j;
    }
    out
}

/// Sizes of the groups of tied values in `data` (only groups larger than one).
pub fn tie_groups(data: &[f64]) -> Vec<usize> {
    let sorted = sorted_copy(data);
    let mut groups = Vec::new();
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i + 1;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        if j - i > 1 {
            groups.push(j - i);
        }
        i = j;
    }
    groups
}

pub(crate) fn sorted_copy(data: &[f64]) -> Vec<f64> {
    let mut v = data.to_vec();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    v
}

/// Neumaier compensated summation.
///
/// Reference: Neumaier (1974), *ZAMM* 54(1).
pub fn kahan_sum(data: &[f64]) -> f64 {
    let mut sum = 0.0_f64;
    let mut c = 0.0_f64;
    for &x in data {
        let t = sum + x;
        if sum.abs() >= x.abs() {
            c += (sum - t) + x;
        } else {
            c += (x - t) + sum;
        }
        sum = t;
    }
    sum + c
}

/// Streaming mean and variance.
///
/// Callers that accumulate draws across repeated invocations (a "flip 10
/// more coins" button, say) hold one of these instead of the raw history.
///
/// # Examples
/// ```
/// use u_statkit::stats::WelfordAccumulator;
/// let mut acc = WelfordAccumulator::new();
/// for x in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
///     acc.update(x);
/// }
/// assert_eq!(acc.mean(), Some(5.0));
/// assert!((acc.sample_variance().unwrap() - 32.0 / 7.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WelfordAccumulator {
    count: u64,
    mean: f64,
    m2: f64,
}

impl WelfordAccumulator {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one observation.
    pub fn update(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// Returns a copy with `values` folded in, leaving `self` untouched.
    #[must_use]
    pub fn extended(&self, values: &[f64]) -> Self {
        let mut next = self.clone();
        values.iter().for_each(|&v| next.update(v));
        next
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// `None` until two observations have been seen.
    pub fn sample_variance(&self) -> Option<f64> {
        (self.count > 1).then(|| self.m2 / (self.count - 1) as f64)
    }

    pub fn sample_std_dev(&self) -> Option<f64> {
        self.sample_variance().map(f64::sqrt)
    }

    /// Combines two accumulators (Chan, Golub & LeVeque 1979).
    pub fn merge(&mut self, other: &WelfordAccumulator) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }
        let na = self.count as f64;
        let nb = other.count as f64;
        let n = na + nb;
        let delta = other.mean - self.mean;
        self.mean += delta * nb / n;
        self.m2 += other.m2 + delta * delta * na * nb / n;
        self.count += other.count;
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn finite_vec(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
        proptest::collection::vec(-1e6_f64..1e6, min_len..=max_len)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn variance_non_negative(data in finite_vec(2, 100)) {
            prop_assert!(variance(&data).unwrap() >= 0.0);
        }

        #[test]
        fn variance_zero_for_constant(value in -1e6_f64..1e6, n in 2_usize..50) {
            prop_assert_eq!(variance(&vec![value; n]), Some(0.0));
        }

        #[test]
        fn quantiles_are_monotonic(data in finite_vec(1, 80), p1 in 0.0_f64..=1.0, p2 in 0.0_f64..=1.0) {
            let (lo, hi) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
            prop_assert!(quantile(&data, lo).unwrap() <= quantile(&data, hi).unwrap() + 1e-9);
        }

        #[test]
        fn ranks_sum_to_triangular_number(data in finite_vec(0, 60)) {
            let n = data.len() as f64;
            let total: f64 = ranks(&data).iter().sum();
            prop_assert!((total - n * (n + 1.0) / 2.0).abs() < 1e-9);
        }

        #[test]
        fn covariance_is_symmetric(x in finite_vec(2, 40), y in finite_vec(2, 40)) {
            let n = x.len().min(y.len());
            let a = covariance(&x[..n], &y[..n]).unwrap();
            let b = covariance(&y[..n], &x[..n]).unwrap();
            prop_assert!((a - b).abs() <= 1e-9 * a.abs().max(1.0));
        }
    }
}
