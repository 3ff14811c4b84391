//! Random variate generation.
//!
//! Every function takes the generator explicitly, so callers decide between a
//! seeded [`create_rng`] (reproducible widgets and tests) and an entropy
//! source. Nothing in the crate keeps hidden RNG state.
//!
//! # Normal variates
//!
//! Normal draws use the Box-Muller transform. The uniform feeding the
//! logarithm is drawn from the open interval `(0, 1)` so `ln(0)` never occurs.
//!
//! Reference: Box & Muller (1958), "A Note on the Generation of Random Normal
//! Deviates", *Annals of Mathematical Statistics* 29(2).

use rand::Rng;
use std::f64::consts::TAU;

/// Creates a seeded `SmallRng`.
///
/// The sequence is deterministic for a given seed on the same platform.
///
/// # Examples
/// ```
/// use rand::Rng;
/// use u_statkit::random::create_rng;
/// let mut a = create_rng(7);
/// let mut b = create_rng(7);
/// assert_eq!(a.random::<u64>(), b.random::<u64>());
/// ```
pub fn create_rng(seed: u64) -> rand::rngs::SmallRng {
    use rand::SeedableRng;
    rand::rngs::SmallRng::seed_from_u64(seed)
}

/// Uniform draw from the open interval `(0, 1)`.
///
/// `Rng::random::<f64>()` samples `[0, 1)`; an exact zero is rejected and
/// redrawn.
pub fn open_unit<R: Rng>(rng: &mut R) -> f64 {
    loop {
        let u: f64 = rng.random();
        if u > 0.0 {
            return u;
        }
    }
}

/// Both Box-Muller outputs from a single pair of uniforms.
///
/// Returns `(r·cos θ, r·sin θ)` with `r = √(−2 ln u₁)` and `θ = 2π u₂`.
/// The two values are independent standard normals.
///
/// # Examples
/// ```
/// use u_statkit::random::{create_rng, standard_normal_pair};
/// let mut rng = create_rng(1);
/// let (z1, z2) = standard_normal_pair(&mut rng);
/// assert!(z1.is_finite() && z2.is_finite());
/// ```
pub fn standard_normal_pair<R: Rng>(rng: &mut R) -> (f64, f64) {
    let u1 = open_unit(rng);
    let u2: f64 = rng.random();
    let r = (-2.0 * u1.ln()).sqrt();
    let theta = TAU * u2;
    (r * theta.cos(), r * theta.sin())
}

/// One standard normal draw (cosine branch of Box-Muller).
pub fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    standard_normal_pair(rng).0
}

/// One draw from N(mean, std_dev²).
///
/// The caller is responsible for `std_dev >= 0`; see
/// [`Normal`](crate::distributions::Normal) for a validated wrapper.
pub fn normal<R: Rng>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    mean + std_dev * standard_normal(rng)
}

/// Fisher-Yates (Durstenfeld) in-place shuffle.
///
/// Reference: Knuth (1997), *TAOCP* Vol. 2, §3.4.2, Algorithm P.
pub fn shuffle<T, R: Rng>(slice: &mut [T], rng: &mut R) {
    for i in (1..slice.len()).rev() {
        let j = rng.random_range(0..=i);
        slice.swap(i, j);
    }
}

/// Random permutation of `0..n`.
pub fn shuffled_indices<R: Rng>(n: usize, rng: &mut R) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    shuffle(&mut indices, rng);
    indices
}

/// Picks an index with probability proportional to its weight.
///
/// Non-positive weights are never chosen.
///
/// # Returns
/// - `None` if `weights` is empty or has no positive entry.
pub fn weighted_choose<R: Rng>(weights: &[f64], rng: &mut R) -> Option<usize> {
    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    if !total.is_finite() || total <= 0.0 {
        return None;
    }

    let threshold = rng.random_range(0.0..total);
    let mut cumulative = 0.0;
    let mut last_positive = None;
    for (i, &w) in weights.iter().enumerate() {
        if w > 0.0 {
            cumulative += w;
            last_positive = Some(i);
            if cumulative > threshold {
                return Some(i);
            }
        }
    }
    // rounding can leave cumulative a hair below threshold
    last_positive
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats;

    #[test]
    fn test_create_rng_deterministic() {
        let mut rng1 = create_rng(42);
        let mut rng2 = create_rng(42);
        let a: Vec<f64> = (0..10).map(|_| standard_normal(&mut rng1)).collect();
        let b: Vec<f64> = (0..10).map(|_| standard_normal(&mut rng2)).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_open_unit_bounds() {
        let mut rng = create_rng(3);
        for _ in 0..10_000 {
            let u = open_unit(&mut rng);
            assert!(u > 0.0 && u < 1.0);
        }
    }

    #[test]
    fn test_standard_normal_moments() {
        let mut rng = create_rng(2024);
        let draws: Vec<f64> = (0..20_000).map(|_| standard_normal(&mut rng)).collect();
        let m = stats::mean(&draws).unwrap();
        let v = stats::variance(&draws).unwrap();
        assert!(m.abs() < 0.03, "mean {m}");
        assert!((v - 1.0).abs() < 0.05, "variance {v}");
    }

    #[test]
    fn test_normal_shift_and_scale() {
        let mut rng = create_rng(11);
        let draws: Vec<f64> = (0..20_000).map(|_| normal(&mut rng, 50.0, 4.0)).collect();
        let m = stats::mean(&draws).unwrap();
        let sd = stats::std_dev(&draws).unwrap();
        assert!((m - 50.0).abs() < 0.15, "mean {m}");
        assert!((sd - 4.0).abs() < 0.15, "sd {sd}");
    }

    #[test]
    fn test_pair_components_uncorrelated() {
        let mut rng = create_rng(5);
        let (xs, ys): (Vec<f64>, Vec<f64>) =
            (0..20_000).map(|_| standard_normal_pair(&mut rng)).unzip();
        let r = stats::correlation(&xs, &ys).unwrap();
        assert!(r.abs() < 0.03, "correlation {r}");
    }

    #[test]
    fn test_shuffle_preserves_elements() {
        let mut v: Vec<u32> = (1..=10).collect();
        let mut rng = create_rng(123);
        shuffle(&mut v, &mut rng);
        v.sort();
        assert_eq!(v, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffle_trivial_lengths() {
        let mut rng = create_rng(0);
        let mut empty: Vec<i32> = vec![];
        shuffle(&mut empty, &mut rng);
        let mut one = vec![42];
        shuffle(&mut one, &mut rng);
        assert_eq!(one, vec![42]);
    }

    #[test]
    fn test_weighted_choose_only_positive() {
        let mut rng = create_rng(42);
        for _ in 0..100 {
            assert_eq!(weighted_choose(&[0.0, -1.0, 2.5], &mut rng), Some(2));
        }
    }

    #[test]
    fn test_weighted_choose_none() {
        let mut rng = create_rng(42);
        assert_eq!(weighted_choose(&[], &mut rng), None);
        assert_eq!(weighted_choose(&[0.0, 0.0], &mut rng), None);
    }

    #[test]
    fn test_weighted_choose_proportions() {
        let mut rng = create_rng(42);
        let mut counts = [0u32; 2];
        for _ in 0..10_000 {
            counts[weighted_choose(&[1.0, 3.0], &mut rng).unwrap()] += 1;
        }
        let ratio = counts[1] as f64 / counts[0] as f64;
        assert!((ratio - 3.0).abs() < 0.5, "ratio {ratio}");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn shuffled_indices_is_permutation(seed in 0_u64..10_000, n in 0_usize..60) {
            let mut rng = create_rng(seed);
            let mut idx = shuffled_indices(n, &mut rng);
            idx.sort();
            prop_assert_eq!(idx, (0..n).collect::<Vec<_>>());
        }

        #[test]
        fn normal_draws_are_finite(seed in 0_u64..10_000) {
            let mut rng = create_rng(seed);
            for _ in 0..50 {
                let (a, b) = standard_normal_pair(&mut rng);
                prop_assert!(a.is_finite() && b.is_finite());
            }
        }
    }
}
