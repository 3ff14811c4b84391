//! Principal component analysis of 2D point sets.
//!
//! # Algorithm
//!
//! The sample covariance matrix `[[sxx, sxy], [sxy, syy]]` (divisor `n − 1`)
//! has closed-form eigenvalues
//!
//! ```text
//! λ₁,₂ = T/2 ± √(T²/4 − D),    T = sxx + syy,  D = sxx·syy − sxy²
//! ```
//!
//! evaluated as `T/2 ± √(((sxx − syy)/2)² + sxy²)` so the radicand stays
//! non-negative under rounding. The first principal axis is the unit
//! eigenvector of `λ₁`, taken from whichever of `(λ₁ − syy, sxy)` and
//! `(sxy, λ₁ − sxx)` has the larger norm, oriented with a non-negative x
//! component.
//!
//! Reference: Jolliffe (2002), *Principal Component Analysis*, 2nd ed.,
//! Springer, ch. 1.

use tracing::debug;

use crate::error::{require_len, Result, StatError};
use crate::point::{require_finite_points, Point};

/// Principal components of a 2D sample.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PcaResult {
    /// Sample mean; projections are taken relative to it.
    pub mean: Point,
    /// Covariance eigenvalues, largest first.
    pub eigenvalues: [f64; 2],
    /// Unit vector along the first principal component.
    pub axis: Point,
    /// Share of total variance along `axis`, `λ₁ / (λ₁ + λ₂)`.
    pub explained_variance_ratio: f64,
}

impl PcaResult {
    /// Unit vector along the second component, perpendicular to `axis`.
    pub fn secondary_axis(&self) -> Point {
        Point::new(-self.axis.y, self.axis.x)
    }

    /// Score of `p` on the first component.
    pub fn project(&self, p: Point) -> f64 {
        let d = p - self.mean;
        d.x * self.axis.x + d.y * self.axis.y
    }

    pub fn project_all(&self, points: &[Point]) -> Vec<f64> {
        points.iter().map(|&p| self.project(p)).collect()
    }

    /// Point on the first principal line with the given score.
    pub fn reconstruct(&self, score: f64) -> Point {
        Point::new(
            self.mean.x + score * self.axis.x,
            self.mean.y + score * self.axis.y,
        )
    }
}

/// Computes the principal components of `points`.
///
/// # Errors
/// - `InsufficientData` for fewer than 2 points.
/// - `NonFinite` for NaN/Inf coordinates.
/// - `Degenerate` when every point is identical (zero total variance).
///
/// # Examples
/// ```
/// use u_statkit::pca::pca;
/// use u_statkit::point::Point;
///
/// let pts: Vec<Point> = (0..5).map(|i| Point::new(i as f64, 2.0 * i as f64)).collect();
/// let r = pca(&pts).unwrap();
/// assert!((r.explained_variance_ratio - 1.0).abs() < 1e-12);
/// assert!((r.axis.y / r.axis.x - 2.0).abs() < 1e-9);
/// ```
pub fn pca(points: &[Point]) -> Result<PcaResult> {
    require_len(points.len(), 2)?;
    require_finite_points(points)?;

    let mean = Point::centroid(points).ok_or(StatError::InsufficientData { needed: 2, got: 0 })?;
    let denom = (points.len() - 1) as f64;
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for p in points {
        let d = *p - mean;
        sxx += d.x * d.x;
        syy += d.y * d.y;
        sxy += d.x * d.y;
    }
    sxx /= denom;
    syy /= denom;
    sxy /= denom;

    let trace = sxx + syy;
    if trace <= 0.0 {
        return Err(StatError::Degenerate("zero total variance"));
    }
    let half_gap = (sxx - syy) / 2.0;
    let disc = half_gap.hypot(sxy);
    let l1 = trace / 2.0 + disc;
    let l2 = (trace / 2.0 - disc).max(0.0);

    let axis = principal_axis(sxx, syy, sxy, l1);
    let result = PcaResult {
        mean,
        eigenvalues: [l1, l2],
        axis,
        explained_variance_ratio: (l1 / trace).min(1.0),
    };
    debug!(
        points = points.len(),
        lambda1 = l1,
        lambda2 = l2,
        ratio = result.explained_variance_ratio,
        "pca finished"
    );
    Ok(result)
}

fn principal_axis(sxx: f64, syy: f64, sxy: f64, l1: f64) -> Point {
    let a = Point::new(l1 - syy, sxy);
    let b = Point::new(sxy, l1 - sxx);
    let origin = Point::default();
    let v = if a.distance_squared(&origin) >= b.distance_squared(&origin) { a } else { b };
    let norm = v.distance(&origin);
    // isotropic spread: every direction is principal
    if norm <= f64::EPSILON * l1 {
        return Point::new(1.0, 0.0);
    }
    let (mut x, mut y) = (v.x / norm, v.y / norm);
    if x < 0.0 || (x == 0.0 && y < 0.0) {
        x = -x;
        y = -y;
    }
    Point::new(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_on_a_line() {
        let pts: Vec<Point> = (0..6).map(|i| Point::new(i as f64, 2.0 * i as f64 + 1.0)).collect();
        let r = pca(&pts).unwrap();
        let s5 = 5.0_f64.sqrt();
        assert!((r.axis.x - 1.0 / s5).abs() < 1e-12);
        assert!((r.axis.y - 2.0 / s5).abs() < 1e-12);
        assert!((r.explained_variance_ratio - 1.0).abs() < 1e-12);
        assert!(r.eigenvalues[1].abs() < 1e-12);
        assert_eq!(r.mean, Point::new(2.5, 6.0));
    }

    #[test]
    fn test_axis_aligned_spread() {
        let pts = [
            Point::new(-3.0, 0.0),
            Point::new(3.0, 0.0),
            Point::new(0.0, -1.0),
            Point::new(0.0, 1.0),
        ];
        let r = pca(&pts).unwrap();
        assert_eq!(r.axis, Point::new(1.0, 0.0));
        // variances 6 and 2/3 with divisor 3
        assert!((r.eigenvalues[0] - 6.0).abs() < 1e-12);
        assert!((r.eigenvalues[1] - 2.0 / 3.0).abs() < 1e-12);
        assert!((r.explained_variance_ratio - 0.9).abs() < 1e-12);

        let vertical: Vec<Point> = pts.iter().map(|p| Point::new(p.y, p.x)).collect();
        let r = pca(&vertical).unwrap();
        assert_eq!(r.axis, Point::new(0.0, 1.0));
    }

    #[test]
    fn test_negative_slope_orientation() {
        let pts: Vec<Point> = (0..5).map(|i| Point::new(i as f64, -(i as f64))).collect();
        let r = pca(&pts).unwrap();
        let h = std::f64::consts::FRAC_1_SQRT_2;
        assert!((r.axis.x - h).abs() < 1e-12);
        assert!((r.axis.y + h).abs() < 1e-12);
    }

    #[test]
    fn test_isotropic() {
        let pts = [
            Point::new(1.0, 0.0),
            Point::new(-1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(0.0, -1.0),
        ];
        let r = pca(&pts).unwrap();
        assert_eq!(r.axis, Point::new(1.0, 0.0));
        assert!((r.explained_variance_ratio - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_project_and_reconstruct() {
        let pts: Vec<Point> = (0..5).map(|i| Point::new(i as f64, i as f64)).collect();
        let r = pca(&pts).unwrap();
        let scores = r.project_all(&pts);
        assert!((scores.iter().sum::<f64>()).abs() < 1e-12);
        for (p, s) in pts.iter().zip(&scores) {
            let back = r.reconstruct(*s);
            assert!(back.distance(p) < 1e-12);
        }
        let perp = r.secondary_axis();
        assert!((perp.x * r.axis.x + perp.y * r.axis.y).abs() < 1e-15);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            pca(&[Point::new(1.0, 1.0)]),
            Err(StatError::InsufficientData { needed: 2, got: 1 })
        ));
        assert!(matches!(
            pca(&[Point::new(1.0, 1.0); 4]),
            Err(StatError::Degenerate(_))
        ));
        assert!(matches!(
            pca(&[Point::new(1.0, f64::INFINITY), Point::new(0.0, 0.0)]),
            Err(StatError::NonFinite)
        ));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn axis_is_unit_and_ratio_bounded(
            raw in proptest::collection::vec((-50.0_f64..50.0, -50.0_f64..50.0), 2..40),
        ) {
            let pts: Vec<Point> = raw.into_iter().map(Point::from).collect();
            if let Ok(r) = pca(&pts) {
                let len = r.axis.x.hypot(r.axis.y);
                prop_assert!((len - 1.0).abs() < 1e-9);
                prop_assert!(r.explained_variance_ratio >= 0.5 - 1e-12);
                prop_assert!(r.explained_variance_ratio <= 1.0);
                prop_assert!(r.eigenvalues[0] >= r.eigenvalues[1]);
            }
        }
    }
}
