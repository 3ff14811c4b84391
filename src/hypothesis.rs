//! Hypothesis tests.
//!
//! Parametric and rank-based tests that reduce one or more samples to a
//! statistic and a p-value. Every p-value comes from an exact distribution
//! function in [`special`](crate::special); no critical-value tables are
//! involved.
//!
//! # Examples
//!
//! ```
//! use u_statkit::hypothesis::welch_t_test;
//!
//! let a = [5.1, 4.9, 5.2, 5.0, 4.8];
//! let b = [7.1, 6.9, 7.2, 7.0, 6.8];
//! let r = welch_t_test(&a, &b).unwrap();
//! assert!(r.p_value < 0.01);
//! ```

use std::fmt;
use std::str::FromStr;

use tracing::trace;

use crate::error::{require_finite, require_len, Result, StatError};
use crate::{special, stats};

/// Outcome of a hypothesis test.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TestResult {
    /// Test statistic (t, F, χ², H, Q, U, T⁺ or D depending on the test).
    pub statistic: f64,
    /// Two-sided p-value.
    pub p_value: f64,
    /// Degrees of freedom (fractional for Welch). `None` for tests
    /// without one.
    pub df: Option<f64>,
    /// Denominator degrees of freedom for F-based tests.
    pub df2: Option<f64>,
}

impl TestResult {
    fn new(statistic: f64, p_value: f64) -> Self {
        Self {
            statistic,
            p_value: p_value.clamp(0.0, 1.0),
            df: None,
            df2: None,
        }
    }

    fn with_df(mut self, df: f64) -> Self {
        self.df = Some(df);
        self
    }

    fn with_df2(mut self, df2: f64) -> Self {
        self.df2 = Some(df2);
        self
    }

    /// `true` when `p_value < alpha`.
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

fn check_sample(data: &[f64]) -> Result<()> {
    require_len(data.len(), 2)?;
    require_finite(data)
}

fn check_groups(groups: &[&[f64]]) -> Result<()> {
    require_len(groups.len(), 2)?;
    groups.iter().try_for_each(|g| check_sample(g))
}

fn check_paired(x: &[f64], y: &[f64]) -> Result<()> {
    if x.len() != y.len() {
        return Err(StatError::DimensionMismatch {
            expected: x.len(),
            got: y.len(),
        });
    }
    check_sample(x)?;
    check_sample(y)
}

/// Mean and sample variance of a slice already validated by `check_sample`.
fn moments(data: &[f64]) -> Result<(f64, f64)> {
    let m = stats::mean(data).ok_or(StatError::NonFinite)?;
    let v = stats::variance(data).ok_or(StatError::NonFinite)?;
    Ok((m, v))
}

/// Σ (t³ − t) over tie groups.
fn tie_sum(data: &[f64]) -> f64 {
    stats::tie_groups(data)
        .into_iter()
        .map(|t| {
            let t = t as f64;
            t * t * t - t
        })
        .sum()
}

// ---------------------------------------------------------------------------
// t-tests
// ---------------------------------------------------------------------------

/// Result for two zero-variance samples: equal means give `t = 0, p = 1`,
/// distinct means have no finite statistic.
fn constant_samples(m1: f64, m2: f64, df: f64) -> Result<TestResult> {
    if m1 == m2 {
        Ok(TestResult::new(0.0, 1.0).with_df(df))
    } else {
        Err(StatError::Degenerate("both samples are constant with different means"))
    }
}

/// Welch's unequal-variance t-test: H₀: μ₁ = μ₂.
///
/// # Algorithm
///
/// t = (x̄₁ − x̄₂) / √(s₁²/n₁ + s₂²/n₂), df by Welch-Satterthwaite.
///
/// Two identical constant samples yield `t = 0, p = 1`.
///
/// # Errors
///
/// - `InsufficientData` if either sample has fewer than 2 observations.
/// - `NonFinite` on NaN/Inf input.
/// - `Degenerate` if both samples are constant with different means.
///
/// # References
///
/// Welch (1947), "The generalization of Student's problem when several
/// different population variances are involved", *Biometrika* 34.
///
/// # Examples
///
/// ```
/// use u_statkit::hypothesis::welch_t_test;
/// let r = welch_t_test(&[1.0, 2.0, 3.0, 4.0, 5.0], &[6.0, 7.0, 8.0, 9.0, 10.0]).unwrap();
/// assert_eq!(r.statistic, -5.0);
/// assert_eq!(r.df, Some(8.0));
/// ```
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Result<TestResult> {
    check_sample(a)?;
    check_sample(b)?;
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let (m1, v1) = moments(a)?;
    let (m2, v2) = moments(b)?;

    let (q1, q2) = (v1 / n1, v2 / n2);
    let se_sq = q1 + q2;
    if se_sq == 0.0 {
        return constant_samples(m1, m2, n1 + n2 - 2.0);
    }

    let t = (m1 - m2) / se_sq.sqrt();
    let df = se_sq * se_sq / (q1 * q1 / (n1 - 1.0) + q2 * q2 / (n2 - 1.0));
    Ok(TestResult::new(t, special::t_two_sided_p(t, df)).with_df(df))
}

/// Student's pooled-variance t-test: H₀: μ₁ = μ₂ assuming σ₁ = σ₂.
///
/// df = n₁ + n₂ − 2. Same edge-case policy as [`welch_t_test`].
///
/// # Errors
///
/// As [`welch_t_test`].
pub fn student_t_test(a: &[f64], b: &[f64]) -> Result<TestResult> {
    check_sample(a)?;
    check_sample(b)?;
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let (m1, v1) = moments(a)?;
    let (m2, v2) = moments(b)?;

    let df = n1 + n2 - 2.0;
    let pooled = ((n1 - 1.0) * v1 + (n2 - 1.0) * v2) / df;
    if pooled == 0.0 {
        return constant_samples(m1, m2, df);
    }

    let t = (m1 - m2) / (pooled * (1.0 / n1 + 1.0 / n2)).sqrt();
    Ok(TestResult::new(t, special::t_two_sided_p(t, df)).with_df(df))
}

/// One-sample t-test: H₀: μ = μ₀.
///
/// t = (x̄ − μ₀) / (s / √n), df = n − 1.
///
/// # Errors
///
/// - `InsufficientData` for fewer than 2 observations.
/// - `NonFinite` if `data` or `mu0` is NaN/Inf.
/// - `Degenerate` if the sample has zero variance.
///
/// # Examples
///
/// ```
/// use u_statkit::hypothesis::one_sample_t_test;
/// let r = one_sample_t_test(&[2.0, 4.0, 6.0, 8.0, 10.0], 6.0).unwrap();
/// assert_eq!(r.statistic, 0.0);
/// assert!((r.p_value - 1.0).abs() < 1e-12);
/// ```
pub fn one_sample_t_test(data: &[f64], mu0: f64) -> Result<TestResult> {
    check_sample(data)?;
    if !mu0.is_finite() {
        return Err(StatError::NonFinite);
    }
    let n = data.len() as f64;
    let (m, v) = moments(data)?;
    if v == 0.0 {
        return Err(StatError::Degenerate("sample has zero variance"));
    }
    let t = (m - mu0) / (v / n).sqrt();
    let df = n - 1.0;
    Ok(TestResult::new(t, special::t_two_sided_p(t, df)).with_df(df))
}

/// Paired t-test: one-sample t-test on `x[i] − y[i]` against zero.
///
/// # Errors
///
/// `DimensionMismatch` when the slices differ in length, otherwise as
/// [`one_sample_t_test`].
pub fn paired_t_test(x: &[f64], y: &[f64]) -> Result<TestResult> {
    check_paired(x, y)?;
    let diffs: Vec<f64> = x.iter().zip(y).map(|(a, b)| a - b).collect();
    one_sample_t_test(&diffs, 0.0)
}

// ---------------------------------------------------------------------------
// Variance tests
// ---------------------------------------------------------------------------

/// Two-sided F-test for equal variances: F = s₁² / s₂².
///
/// df = (n₁ − 1, n₂ − 1), p = 2·min(P(F ≤ f), P(F ≥ f)).
///
/// # Errors
///
/// - `InsufficientData` / `NonFinite` as for the t-tests.
/// - `Degenerate` if the second sample has zero variance.
///
/// # Examples
///
/// ```
/// use u_statkit::hypothesis::f_test;
/// let r = f_test(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 4.0, 6.0, 8.0, 10.0]).unwrap();
/// assert_eq!(r.statistic, 0.25);
/// assert!((r.p_value - 0.208).abs() < 1e-9);
/// ```
pub fn f_test(a: &[f64], b: &[f64]) -> Result<TestResult> {
    check_sample(a)?;
    check_sample(b)?;
    let (_, v1) = moments(a)?;
    let (_, v2) = moments(b)?;
    if v2 == 0.0 {
        return Err(StatError::Degenerate("second sample has zero variance"));
    }

    let f = v1 / v2;
    let (df1, df2) = ((a.len() - 1) as f64, (b.len() - 1) as f64);
    let lower = special::f_cdf(f, df1, df2);
    let upper = special::f_sf(f, df1, df2);
    let p = (2.0 * lower.min(upper)).min(1.0);
    Ok(TestResult::new(f, p).with_df(df1).with_df2(df2))
}

/// Levene's test for equal variances, Brown-Forsythe (median) variant.
///
/// One-way ANOVA on `|x − median(group)|`.
///
/// # Errors
///
/// As [`one_way_anova`]; `Degenerate` when every absolute deviation is the
/// same within each group.
///
/// # References
///
/// Brown & Forsythe (1974), "Robust tests for the equality of variances",
/// *JASA* 69(346).
pub fn levene(groups: &[&[f64]]) -> Result<TestResult> {
    check_groups(groups)?;
    let deviations: Vec<Vec<f64>> = groups
        .iter()
        .map(|g| {
            let median = stats::median(g).unwrap_or(0.0);
            g.iter().map(|x| (x - median).abs()).collect()
        })
        .collect();
    let refs: Vec<&[f64]> = deviations.iter().map(Vec::as_slice).collect();
    Ok(one_way_anova(&refs)?.to_test_result())
}

/// Bartlett's test for equal variances.
///
/// T = ((N−k) ln s²ₚ − Σ(nᵢ−1) ln sᵢ²) / C, df = k − 1.
///
/// # Errors
///
/// `Degenerate` if any group has zero variance.
///
/// # References
///
/// Bartlett (1937), "Properties of sufficiency and statistical tests",
/// *Proc. Royal Society A* 160(901).
pub fn bartlett(groups: &[&[f64]]) -> Result<TestResult> {
    check_groups(groups)?;
    let k = groups.len() as f64;

    let mut sizes = Vec::with_capacity(groups.len());
    let mut vars = Vec::with_capacity(groups.len());
    for g in groups {
        let (_, v) = moments(g)?;
        if v == 0.0 {
            return Err(StatError::Degenerate("group has zero variance"));
        }
        sizes.push(g.len() as f64);
        vars.push(v);
    }

    let n_total: f64 = sizes.iter().sum();
    let nk = n_total - k;
    let pooled = sizes
        .iter()
        .zip(&vars)
        .map(|(n, v)| (n - 1.0) * v)
        .sum::<f64>()
        / nk;
    let numerator = nk * pooled.ln()
        - sizes
            .iter()
            .zip(&vars)
            .map(|(n, v)| (n - 1.0) * v.ln())
            .sum::<f64>();
    let inv_sum: f64 = sizes.iter().map(|n| 1.0 / (n - 1.0)).sum();
    let c = 1.0 + (inv_sum - 1.0 / nk) / (3.0 * (k - 1.0));

    let statistic = numerator / c;
    let df = k - 1.0;
    Ok(TestResult::new(statistic, special::chi_squared_sf(statistic, df)).with_df(df))
}

// ---------------------------------------------------------------------------
// ANOVA
// ---------------------------------------------------------------------------

/// Full one-way ANOVA table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnovaTable {
    pub ss_between: f64,
    pub ss_within: f64,
    pub df_between: f64,
    pub df_within: f64,
    pub ms_between: f64,
    pub ms_within: f64,
    pub f_statistic: f64,
    pub p_value: f64,
    pub grand_mean: f64,
    pub group_means: Vec<f64>,
}

impl AnovaTable {
    /// Collapses the table to `(F, p, df_between, df_within)`.
    pub fn to_test_result(&self) -> TestResult {
        TestResult::new(self.f_statistic, self.p_value)
            .with_df(self.df_between)
            .with_df2(self.df_within)
    }
}

/// One-way analysis of variance: H₀: all group means are equal.
///
/// # Algorithm
///
/// SS_between = Σ nᵢ(x̄ᵢ − x̄)², SS_within = Σ Σ (xᵢⱼ − x̄ᵢ)²,
/// F = (SS_between / (k−1)) / (SS_within / (N−k)).
///
/// # Errors
///
/// - `InsufficientData` for fewer than 2 groups or a group with fewer than
///   2 observations.
/// - `Degenerate` when SS_within is zero.
///
/// # Examples
///
/// ```
/// use u_statkit::hypothesis::one_way_anova;
/// let t = one_way_anova(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0], &[7.0, 8.0, 9.0]]).unwrap();
/// assert_eq!(t.f_statistic, 27.0);
/// ```
pub fn one_way_anova(groups: &[&[f64]]) -> Result<AnovaTable> {
    check_groups(groups)?;
    let k = groups.len() as f64;
    let n_total: usize = groups.iter().map(|g| g.len()).sum();
    let n = n_total as f64;

    let group_means = groups
        .iter()
        .map(|g| stats::mean(g).ok_or(StatError::NonFinite))
        .collect::<Result<Vec<f64>>>()?;
    let grand_mean = groups
        .iter()
        .zip(&group_means)
        .map(|(g, m)| g.len() as f64 * m)
        .sum::<f64>()
        / n;

    let ss_between: f64 = groups
        .iter()
        .zip(&group_means)
        .map(|(g, m)| g.len() as f64 * (m - grand_mean).powi(2))
        .sum();
    let ss_within: f64 = groups
        .iter()
        .zip(&group_means)
        .map(|(g, m)| g.iter().map(|x| (x - m).powi(2)).sum::<f64>())
        .sum();
    if ss_within == 0.0 {
        return Err(StatError::Degenerate("within-group sum of squares is zero"));
    }

    let df_between = k - 1.0;
    let df_within = n - k;
    let ms_between = ss_between / df_between;
    let ms_within = ss_within / df_within;
    let f_statistic = ms_between / ms_within;

    Ok(AnovaTable {
        ss_between,
        ss_within,
        df_between,
        df_within,
        ms_between,
        ms_within,
        f_statistic,
        p_value: special::f_sf(f_statistic, df_between, df_within),
        grand_mean,
        group_means,
    })
}

// ---------------------------------------------------------------------------
// Chi-squared tests
// ---------------------------------------------------------------------------

/// Chi-squared test of independence on an r × c contingency table.
///
/// Eᵢⱼ = rowᵢ · colⱼ / N, χ² = Σ (O − E)² / E, df = (r−1)(c−1).
///
/// # Errors
///
/// - `InsufficientData` for fewer than 2 rows or columns.
/// - `DimensionMismatch` for ragged rows.
/// - `InvalidParameter` for negative counts.
/// - `Degenerate` when a row or column total is zero.
///
/// # Examples
///
/// ```
/// use u_statkit::hypothesis::chi_squared_independence;
/// let r = chi_squared_independence(&[&[10.0, 20.0], &[20.0, 10.0]]).unwrap();
/// assert!((r.statistic - 20.0 / 3.0).abs() < 1e-12);
/// assert_eq!(r.df, Some(1.0));
/// ```
pub fn chi_squared_independence(table: &[&[f64]]) -> Result<TestResult> {
    require_len(table.len(), 2)?;
    let cols = table[0].len();
    require_len(cols, 2)?;
    for row in table {
        if row.len() != cols {
            return Err(StatError::DimensionMismatch {
                expected: cols,
                got: row.len(),
            });
        }
        require_finite(row)?;
        require_counts(row)?;
    }

    let row_totals: Vec<f64> = table.iter().map(|r| r.iter().sum()).collect();
    let col_totals: Vec<f64> = (0..cols).map(|j| table.iter().map(|r| r[j]).sum()).collect();
    if row_totals.iter().chain(&col_totals).any(|&t| t == 0.0) {
        return Err(StatError::Degenerate("zero row or column total"));
    }
    let total: f64 = row_totals.iter().sum();

    let mut chi2 = 0.0;
    for (row, rt) in table.iter().zip(&row_totals) {
        for (obs, ct) in row.iter().zip(&col_totals) {
            let expected = rt * ct / total;
            chi2 += (obs - expected).powi(2) / expected;
        }
    }

    let df = ((table.len() - 1) * (cols - 1)) as f64;
    Ok(TestResult::new(chi2, special::chi_squared_sf(chi2, df)).with_df(df))
}

fn require_counts(counts: &[f64]) -> Result<()> {
    match counts.iter().find(|&&c| c < 0.0) {
        Some(&bad) => Err(StatError::invalid("count", bad, "must be >= 0")),
        None => Ok(()),
    }
}

/// Chi-squared goodness-of-fit test, df = k − 1.
///
/// # Errors
///
/// - `DimensionMismatch` if the slices differ in length.
/// - `InsufficientData` for fewer than 2 categories.
/// - `InvalidParameter` for negative observed counts.
/// - `Degenerate` if any expected frequency is not positive.
pub fn chi_squared_goodness_of_fit(observed: &[f64], expected: &[f64]) -> Result<TestResult> {
    check_paired(observed, expected)?;
    require_counts(observed)?;
    if expected.iter().any(|&e| e <= 0.0) {
        return Err(StatError::Degenerate("expected frequency must be positive"));
    }
    let chi2: f64 = observed
        .iter()
        .zip(expected)
        .map(|(o, e)| (o - e).powi(2) / e)
        .sum();
    let df = (observed.len() - 1) as f64;
    Ok(TestResult::new(chi2, special::chi_squared_sf(chi2, df)).with_df(df))
}

// ---------------------------------------------------------------------------
// Rank tests
// ---------------------------------------------------------------------------

/// Kruskal-Wallis H test: H₀: all groups come from the same distribution.
///
/// H = 12/(N(N+1)) Σ Rᵢ²/nᵢ − 3(N+1), divided by the tie correction
/// 1 − Σ(t³−t)/(N³−N). Compared against χ²(k−1).
///
/// # Errors
///
/// `Degenerate` if every observation is tied.
///
/// # References
///
/// Kruskal & Wallis (1952), "Use of ranks in one-criterion variance
/// analysis", *JASA* 47(260).
pub fn kruskal_wallis(groups: &[&[f64]]) -> Result<TestResult> {
    check_groups(groups)?;
    let pooled: Vec<f64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
    let n = pooled.len() as f64;
    let pooled_ranks = stats::ranks(&pooled);

    let mut offset = 0;
    let mut h = 0.0;
    for g in groups {
        let r: f64 = pooled_ranks[offset..offset + g.len()].iter().sum();
        h += r * r / g.len() as f64;
        offset += g.len();
    }
    h = 12.0 / (n * (n + 1.0)) * h - 3.0 * (n + 1.0);

    let correction = 1.0 - tie_sum(&pooled) / (n * n * n - n);
    if correction <= 0.0 {
        return Err(StatError::Degenerate("all observations are tied"));
    }
    h /= correction;

    let df = groups.len() as f64 - 1.0;
    Ok(TestResult::new(h, special::chi_squared_sf(h, df)).with_df(df))
}

/// Friedman test for k treatments measured on n blocks.
///
/// Each element of `blocks` is one block (subject) holding its k
/// treatment values. Values are ranked within blocks and
/// Q = 12/(nk(k+1)) Σ Rⱼ² − 3n(k+1), tie-corrected and compared against
/// χ²(k−1).
///
/// # Errors
///
/// - `InsufficientData` for fewer than 2 blocks or treatments.
/// - `DimensionMismatch` if blocks differ in length.
/// - `Degenerate` if every block is entirely tied.
///
/// # References
///
/// Friedman (1937), "The use of ranks to avoid the assumption of normality
/// implicit in the analysis of variance", *JASA* 32(200).
///
/// # Examples
///
/// ```
/// use u_statkit::hypothesis::friedman;
/// let b: &[f64] = &[1.0, 2.0, 3.0];
/// let r = friedman(&[b, b, b]).unwrap();
/// assert!((r.statistic - 6.0).abs() < 1e-12);
/// ```
pub fn friedman(blocks: &[&[f64]]) -> Result<TestResult> {
    require_len(blocks.len(), 2)?;
    let k = blocks[0].len();
    require_len(k, 2)?;

    let mut rank_sums = vec![0.0; k];
    let mut ties = 0.0;
    for block in blocks {
        if block.len() != k {
            return Err(StatError::DimensionMismatch {
                expected: k,
                got: block.len(),
            });
        }
        require_finite(block)?;
        for (sum, r) in rank_sums.iter_mut().zip(stats::ranks(block)) {
            *sum += r;
        }
        ties += tie_sum(block);
    }

    let (n, kf) = (blocks.len() as f64, k as f64);
    let q = 12.0 / (n * kf * (kf + 1.0)) * rank_sums.iter().map(|r| r * r).sum::<f64>()
        - 3.0 * n * (kf + 1.0);
    let correction = 1.0 - ties / (n * (kf * kf * kf - kf));
    if correction <= 0.0 {
        return Err(StatError::Degenerate("every block is entirely tied"));
    }
    let q = q / correction;

    let df = kf - 1.0;
    Ok(TestResult::new(q, special::chi_squared_sf(q, df)).with_df(df))
}

/// Mann-Whitney U test: H₀: P(A > B) = ½.
///
/// Reports U for sample `a`. The p-value uses the normal approximation
/// with variance n₁n₂/12 · ((N+1) − Σ(t³−t)/(N(N−1))).
///
/// # Errors
///
/// `Degenerate` if every observation is tied.
///
/// # References
///
/// Mann & Whitney (1947), *Annals of Mathematical Statistics* 18(1).
///
/// # Examples
///
/// ```
/// use u_statkit::hypothesis::mann_whitney_u;
/// let r = mann_whitney_u(&[1.0, 2.0, 3.0, 4.0, 5.0], &[6.0, 7.0, 8.0, 9.0, 10.0]).unwrap();
/// assert_eq!(r.statistic, 0.0);
/// assert!(r.p_value < 0.01);
/// ```
pub fn mann_whitney_u(a: &[f64], b: &[f64]) -> Result<TestResult> {
    check_sample(a)?;
    check_sample(b)?;
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let n = n1 + n2;

    let pooled: Vec<f64> = a.iter().chain(b).copied().collect();
    let r1: f64 = stats::ranks(&pooled)[..a.len()].iter().sum();
    let u1 = r1 - n1 * (n1 + 1.0) / 2.0;

    let mu = n1 * n2 / 2.0;
    let sigma_sq = n1 * n2 / 12.0 * ((n + 1.0) - tie_sum(&pooled) / (n * (n - 1.0)));
    if sigma_sq <= 0.0 {
        return Err(StatError::Degenerate("all observations are tied"));
    }

    let z = (u1 - mu) / sigma_sq.sqrt();
    Ok(TestResult::new(u1, special::normal_two_sided_p(z)))
}

/// Wilcoxon signed-rank test on paired samples: H₀: median(x − y) = 0.
///
/// Zero differences are dropped. T⁺ is the rank sum of positive
/// differences; the p-value uses the normal approximation with variance
/// n(n+1)(2n+1)/24 − Σ(t³−t)/48.
///
/// # Errors
///
/// - `DimensionMismatch` if the slices differ in length.
/// - `InsufficientData` if fewer than 2 differences are non-zero.
///
/// # References
///
/// Wilcoxon (1945), "Individual comparisons by ranking methods",
/// *Biometrics Bulletin* 1(6).
pub fn wilcoxon_signed_rank(x: &[f64], y: &[f64]) -> Result<TestResult> {
    check_paired(x, y)?;
    let diffs: Vec<f64> = x
        .iter()
        .zip(y)
        .map(|(a, b)| a - b)
        .filter(|d| *d != 0.0)
        .collect();
    require_len(diffs.len(), 2)?;
    let n = diffs.len() as f64;

    let abs: Vec<f64> = diffs.iter().map(|d| d.abs()).collect();
    let t_plus: f64 = stats::ranks(&abs)
        .iter()
        .zip(&diffs)
        .filter(|(_, d)| **d > 0.0)
        .map(|(r, _)| r)
        .sum();

    let mu = n * (n + 1.0) / 4.0;
    let sigma_sq = n * (n + 1.0) * (2.0 * n + 1.0) / 24.0 - tie_sum(&abs) / 48.0;
    if sigma_sq <= 0.0 {
        return Err(StatError::Degenerate("signed-rank variance is zero"));
    }

    let z = (t_plus - mu) / sigma_sq.sqrt();
    Ok(TestResult::new(t_plus, special::normal_two_sided_p(z)))
}

/// Two-sample Kolmogorov-Smirnov test.
///
/// D = sup |F₁(x) − F₂(x)| over the pooled sample. The p-value is the
/// Kolmogorov survival function at λ = √(n₁n₂/(n₁+n₂)) · D.
///
/// # Examples
///
/// ```
/// use u_statkit::hypothesis::kolmogorov_smirnov;
/// let r = kolmogorov_smirnov(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
/// assert_eq!(r.statistic, 0.0);
/// assert_eq!(r.p_value, 1.0);
/// ```
pub fn kolmogorov_smirnov(a: &[f64], b: &[f64]) -> Result<TestResult> {
    check_sample(a)?;
    check_sample(b)?;
    let a = stats::sorted_copy(a);
    let b = stats::sorted_copy(b);
    let (n1, n2) = (a.len() as f64, b.len() as f64);

    let (mut i, mut j) = (0, 0);
    let mut d: f64 = 0.0;
    while i < a.len() && j < b.len() {
        let (x1, x2) = (a[i], b[j]);
        if x1 <= x2 {
            while i < a.len() && a[i] == x1 {
                i += 1;
            }
        }
        if x2 <= x1 {
            while j < b.len() && b[j] == x2 {
                j += 1;
            }
        }
        d = d.max((i as f64 / n1 - j as f64 / n2).abs());
    }

    let effective_n = n1 * n2 / (n1 + n2);
    let p = special::kolmogorov_sf(effective_n.sqrt() * d);
    Ok(TestResult::new(d, p))
}

// ---------------------------------------------------------------------------
// Dispatch by name
// ---------------------------------------------------------------------------

/// Closed set of tests that can be selected by name and run on groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TestKind {
    WelchT,
    StudentT,
    PairedT,
    FTest,
    ChiSquaredIndependence,
    Anova,
    KruskalWallis,
    Friedman,
    Levene,
    Bartlett,
    MannWhitneyU,
    WilcoxonSignedRank,
    KolmogorovSmirnov,
}

impl TestKind {
    pub const ALL: [TestKind; 13] = [
        TestKind::WelchT,
        TestKind::StudentT,
        TestKind::PairedT,
        TestKind::FTest,
        TestKind::ChiSquaredIndependence,
        TestKind::Anova,
        TestKind::KruskalWallis,
        TestKind::Friedman,
        TestKind::Levene,
        TestKind::Bartlett,
        TestKind::MannWhitneyU,
        TestKind::WilcoxonSignedRank,
        TestKind::KolmogorovSmirnov,
    ];

    /// Canonical kebab-case name, accepted by `FromStr`.
    pub fn name(self) -> &'static str {
        match self {
            TestKind::WelchT => "welch-t",
            TestKind::StudentT => "student-t",
            TestKind::PairedT => "paired-t",
            TestKind::FTest => "f-test",
            TestKind::ChiSquaredIndependence => "chi-squared",
            TestKind::Anova => "anova",
            TestKind::KruskalWallis => "kruskal-wallis",
            TestKind::Friedman => "friedman",
            TestKind::Levene => "levene",
            TestKind::Bartlett => "bartlett",
            TestKind::MannWhitneyU => "mann-whitney",
            TestKind::WilcoxonSignedRank => "wilcoxon",
            TestKind::KolmogorovSmirnov => "kolmogorov-smirnov",
        }
    }

    /// `true` for tests that compare exactly two samples.
    pub fn is_two_sample(self) -> bool {
        matches!(
            self,
            TestKind::WelchT
                | TestKind::StudentT
                | TestKind::PairedT
                | TestKind::FTest
                | TestKind::MannWhitneyU
                | TestKind::WilcoxonSignedRank
                | TestKind::KolmogorovSmirnov
        )
    }

    /// Runs the test on `groups`.
    ///
    /// Two-sample tests require exactly two groups. For
    /// [`ChiSquaredIndependence`](TestKind::ChiSquaredIndependence) the
    /// groups are the table rows; for [`Friedman`](TestKind::Friedman) they
    /// are the blocks.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` when a two-sample test receives a different
    /// number of groups, otherwise whatever the test itself reports.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_statkit::hypothesis::TestKind;
    /// let kind: TestKind = "mann-whitney".parse().unwrap();
    /// let r = kind.run(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]).unwrap();
    /// assert_eq!(r.statistic, 0.0);
    /// ```
    pub fn run(self, groups: &[&[f64]]) -> Result<TestResult> {
        trace!(test = self.name(), groups = groups.len(), "running hypothesis test");
        if self.is_two_sample() {
            if groups.len() != 2 {
                return Err(StatError::DimensionMismatch {
                    expected: 2,
                    got: groups.len(),
                });
            }
            let (a, b) = (groups[0], groups[1]);
            return match self {
                TestKind::WelchT => welch_t_test(a, b),
                TestKind::StudentT => student_t_test(a, b),
                TestKind::PairedT => paired_t_test(a, b),
                TestKind::FTest => f_test(a, b),
                TestKind::MannWhitneyU => mann_whitney_u(a, b),
                TestKind::WilcoxonSignedRank => wilcoxon_signed_rank(a, b),
                _ => kolmogorov_smirnov(a, b),
            };
        }
        match self {
            TestKind::ChiSquaredIndependence => chi_squared_independence(groups),
            TestKind::Anova => Ok(one_way_anova(groups)?.to_test_result()),
            TestKind::KruskalWallis => kruskal_wallis(groups),
            TestKind::Friedman => friedman(groups),
            TestKind::Levene => levene(groups),
            _ => bartlett(groups),
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TestKind {
    type Err = StatError;

    /// Case-insensitive; `-`, `_` and spaces are ignored, and a few common
    /// abbreviations (`t`, `ks`, `chi2`, `u`) are accepted.
    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        let kind = match key.as_str() {
            "welcht" | "welch" | "t" | "ttest" => TestKind::WelchT,
            "studentt" | "student" | "pooledt" => TestKind::StudentT,
            "pairedt" | "paired" => TestKind::PairedT,
            "ftest" | "f" => TestKind::FTest,
            "chisquared" | "chi2" | "chisquare" => TestKind::ChiSquaredIndependence,
            "anova" => TestKind::Anova,
            "kruskalwallis" | "kruskal" => TestKind::KruskalWallis,
            "friedman" => TestKind::Friedman,
            "levene" => TestKind::Levene,
            "bartlett" => TestKind::Bartlett,
            "mannwhitney" | "mannwhitneyu" | "u" => TestKind::MannWhitneyU,
            "wilcoxon" | "signedrank" => TestKind::WilcoxonSignedRank,
            "kolmogorovsmirnov" | "ks" => TestKind::KolmogorovSmirnov,
            _ => return Err(StatError::invalid("test", s, "unknown test name")),
        };
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOW: [f64; 5] = [1.0, 2.0, 3.0, 4.0, 5.0];
    const HIGH: [f64; 5] = [6.0, 7.0, 8.0, 9.0, 10.0];

    #[test]
    fn test_welch_known_value() {
        let r = welch_t_test(&LOW, &HIGH).unwrap();
        assert_eq!(r.statistic, -5.0);
        assert!((r.df.unwrap() - 8.0).abs() < 1e-12);
        // scipy.stats.ttest_ind(equal_var=False)
        assert!((r.p_value - 0.001052825793366539).abs() < 1e-8, "p = {}", r.p_value);
    }

    #[test]
    fn test_student_matches_welch_for_equal_designs() {
        let w = welch_t_test(&LOW, &HIGH).unwrap();
        let s = student_t_test(&LOW, &HIGH).unwrap();
        assert!((w.statistic - s.statistic).abs() < 1e-12);
        assert!((w.p_value - s.p_value).abs() < 1e-12);
    }

    #[test]
    fn test_t_antisymmetry() {
        let a = [2.1, 3.4, 1.9, 5.0, 4.4, 3.3];
        let b = [6.2, 4.8, 5.5, 7.1];
        let ab = welch_t_test(&a, &b).unwrap();
        let ba = welch_t_test(&b, &a).unwrap();
        assert!((ab.statistic + ba.statistic).abs() < 1e-12);
        assert!((ab.p_value - ba.p_value).abs() < 1e-12);
    }

    #[test]
    fn test_identical_constant_samples() {
        let a = [10.0; 4];
        let r = welch_t_test(&a, &a).unwrap();
        assert_eq!((r.statistic, r.p_value), (0.0, 1.0));
        let r = student_t_test(&a, &a).unwrap();
        assert_eq!((r.statistic, r.p_value), (0.0, 1.0));
        assert!(matches!(f_test(&a, &a), Err(StatError::Degenerate(_))));
    }

    #[test]
    fn test_distinct_constant_samples() {
        assert!(matches!(
            welch_t_test(&[1.0, 1.0], &[2.0, 2.0]),
            Err(StatError::Degenerate(_))
        ));
    }

    #[test]
    fn test_insufficient_and_nonfinite() {
        assert_eq!(
            welch_t_test(&[1.0], &LOW),
            Err(StatError::InsufficientData { needed: 2, got: 1 })
        );
        assert_eq!(welch_t_test(&[1.0, f64::NAN], &LOW), Err(StatError::NonFinite));
        assert_eq!(one_sample_t_test(&LOW, f64::INFINITY), Err(StatError::NonFinite));
    }

    #[test]
    fn test_one_sample_and_paired() {
        let r = one_sample_t_test(&[2.0, 4.0, 6.0, 8.0, 10.0], 6.0).unwrap();
        assert_eq!(r.statistic, 0.0);
        assert_eq!(r.df, Some(4.0));

        // differences [1, 2, 3, 4, 5] → same as one-sample on them
        let x = [2.0, 4.0, 6.0, 8.0, 10.0];
        let y = [1.0, 2.0, 3.0, 4.0, 5.0];
        let p = paired_t_test(&x, &y).unwrap();
        let o = one_sample_t_test(&y, 0.0).unwrap();
        assert_eq!(p, o);

        assert_eq!(
            paired_t_test(&x, &y[..3]),
            Err(StatError::DimensionMismatch { expected: 5, got: 3 })
        );
    }

    #[test]
    fn test_f_test_exact() {
        // F(4,4) at 0.25: I_0.2(2,2) = 3(0.2)² − 2(0.2)³ = 0.104
        let r = f_test(&LOW, &[2.0, 4.0, 6.0, 8.0, 10.0]).unwrap();
        assert_eq!(r.statistic, 0.25);
        assert_eq!((r.df, r.df2), (Some(4.0), Some(4.0)));
        assert!((r.p_value - 0.208).abs() < 1e-9);
    }

    #[test]
    fn test_anova_exact() {
        let t = one_way_anova(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0], &[7.0, 8.0, 9.0]]).unwrap();
        assert_eq!(t.ss_between, 54.0);
        assert_eq!(t.ss_within, 6.0);
        assert_eq!((t.df_between, t.df_within), (2.0, 6.0));
        assert_eq!(t.grand_mean, 5.0);
        assert_eq!(t.group_means, vec![2.0, 5.0, 8.0]);
        assert_eq!(t.f_statistic, 27.0);
        // F(2, d) tail: (1 + 2x/d)^(−d/2) = 10⁻³
        assert!((t.p_value - 1e-3).abs() < 1e-10);
    }

    #[test]
    fn test_anova_zero_within() {
        assert!(matches!(
            one_way_anova(&[&[1.0, 1.0], &[2.0, 2.0]]),
            Err(StatError::Degenerate(_))
        ));
        assert!(matches!(
            one_way_anova(&[&LOW]),
            Err(StatError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_chi_squared_independence() {
        let r = chi_squared_independence(&[&[10.0, 20.0], &[20.0, 10.0]]).unwrap();
        assert!((r.statistic - 20.0 / 3.0).abs() < 1e-12);
        assert!(r.p_value > 0.009 && r.p_value < 0.011, "p = {}", r.p_value);

        assert!(matches!(
            chi_squared_independence(&[&[1.0, 2.0], &[3.0]]),
            Err(StatError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            chi_squared_independence(&[&[0.0, 0.0], &[3.0, 4.0]]),
            Err(StatError::Degenerate(_))
        ));
        assert!(matches!(
            chi_squared_independence(&[&[-1.0, 2.0], &[3.0, 4.0]]),
            Err(StatError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_goodness_of_fit() {
        let r = chi_squared_goodness_of_fit(&[10.0, 10.0, 10.0], &[10.0, 10.0, 10.0]).unwrap();
        assert_eq!(r.statistic, 0.0);
        assert_eq!(r.p_value, 1.0);
        assert!(chi_squared_goodness_of_fit(&[1.0, 2.0], &[0.0, 3.0]).is_err());
    }

    #[test]
    fn test_goodness_of_fit_rejects_negative_counts() {
        assert!(matches!(
            chi_squared_goodness_of_fit(&[-5.0, 20.0, 15.0], &[10.0, 10.0, 10.0]),
            Err(StatError::InvalidParameter { name: "count", .. })
        ));
    }

    #[test]
    fn test_kruskal_wallis_exact() {
        let r = kruskal_wallis(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0], &[7.0, 8.0, 9.0]]).unwrap();
        assert!((r.statistic - 7.2).abs() < 1e-12);
        // χ²(2) tail is exp(−x/2)
        assert!((r.p_value - (-3.6f64).exp()).abs() < 1e-10);
        assert!(kruskal_wallis(&[&[1.0, 1.0], &[1.0, 1.0]]).is_err());
    }

    #[test]
    fn test_friedman_exact() {
        let b: &[f64] = &[1.0, 2.0, 3.0];
        let r = friedman(&[b, b, b]).unwrap();
        assert!((r.statistic - 6.0).abs() < 1e-12);
        assert!((r.p_value - (-3.0f64).exp()).abs() < 1e-10);

        let tied: &[f64] = &[4.0, 4.0, 4.0];
        assert!(matches!(friedman(&[tied, tied]), Err(StatError::Degenerate(_))));
        assert!(matches!(
            friedman(&[b, &[1.0, 2.0]]),
            Err(StatError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_levene_and_bartlett() {
        let tight = [4.9, 5.0, 5.0, 5.1, 5.0];
        let wide = [0.0, 3.0, 5.0, 7.0, 10.0];
        let l = levene(&[&tight, &wide]).unwrap();
        assert!(l.p_value < 0.05);
        assert_eq!((l.df, l.df2), (Some(1.0), Some(8.0)));

        let b = bartlett(&[&[2.0, 3.0, 4.0, 5.0, 6.0], &[10.0, 20.0, 30.0, 40.0, 50.0]]).unwrap();
        assert!(b.p_value < 0.01);
        assert!(matches!(
            bartlett(&[&[1.0, 1.0], &LOW]),
            Err(StatError::Degenerate(_))
        ));
    }

    #[test]
    fn test_mann_whitney() {
        let r = mann_whitney_u(&LOW, &HIGH).unwrap();
        assert_eq!(r.statistic, 0.0);
        // z = −12.5 / √(25·11/12)
        let z = -12.5 / (25.0 * 11.0 / 12.0_f64).sqrt();
        assert!((r.p_value - special::normal_two_sided_p(z)).abs() < 1e-12);
        assert!(r.p_value > 0.008 && r.p_value < 0.01);
        assert!(mann_whitney_u(&[2.0, 2.0], &[2.0, 2.0]).is_err());
    }

    #[test]
    fn test_wilcoxon_with_ties() {
        let before = [5.0, 6.0, 7.0, 8.0, 9.0];
        let after = [6.0, 7.5, 8.0, 9.5, 11.0];
        let r = wilcoxon_signed_rank(&after, &before).unwrap();
        assert_eq!(r.statistic, 15.0);
        let z = 7.5 / 13.5_f64.sqrt();
        assert!((r.p_value - special::normal_two_sided_p(z)).abs() < 1e-12);

        assert_eq!(
            wilcoxon_signed_rank(&before, &before),
            Err(StatError::InsufficientData { needed: 2, got: 0 })
        );
    }

    #[test]
    fn test_kolmogorov_smirnov() {
        let r = kolmogorov_smirnov(&LOW, &HIGH).unwrap();
        assert_eq!(r.statistic, 1.0);
        assert!(r.p_value < 0.01);

        let r = kolmogorov_smirnov(&[1.0, 2.0, 2.0, 3.0], &[2.0, 2.0, 3.0, 1.0]).unwrap();
        assert_eq!(r.statistic, 0.0);
        assert_eq!(r.p_value, 1.0);

        let r = kolmogorov_smirnov(&[1.0, 2.0, 3.0, 4.0], &[3.0, 4.0, 5.0, 6.0]).unwrap();
        assert!((r.statistic - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_kind_names_roundtrip() {
        for kind in TestKind::ALL {
            assert_eq!(kind.name().parse::<TestKind>().unwrap(), kind);
            assert_eq!(kind.to_string(), kind.name());
        }
        assert_eq!("Mann Whitney U".parse::<TestKind>().unwrap(), TestKind::MannWhitneyU);
        assert_eq!("KS".parse::<TestKind>().unwrap(), TestKind::KolmogorovSmirnov);
        assert!(matches!(
            "shapiro".parse::<TestKind>(),
            Err(StatError::InvalidParameter { name: "test", .. })
        ));
    }

    #[test]
    fn test_kind_dispatch() {
        let groups: [&[f64]; 2] = [&LOW, &HIGH];
        assert_eq!(TestKind::WelchT.run(&groups).unwrap(), welch_t_test(&LOW, &HIGH).unwrap());
        assert_eq!(
            TestKind::Anova.run(&groups).unwrap(),
            one_way_anova(&groups).unwrap().to_test_result()
        );
        assert_eq!(
            TestKind::FTest.run(&[&LOW]),
            Err(StatError::DimensionMismatch { expected: 2, got: 1 })
        );
    }

    #[test]
    fn test_is_significant() {
        let r = welch_t_test(&LOW, &HIGH).unwrap();
        assert!(r.is_significant(0.05));
        assert!(!r.is_significant(0.001));
    }
}
