//! Two-dimensional observations shared by regression, clustering and PCA.

use std::ops::{Add, Sub};

/// A point in the plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance. Cheaper than [`distance`](Self::distance)
    /// when only comparisons are needed.
    pub fn distance_squared(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance.
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Arithmetic mean of `points`; `None` when empty.
    ///
    /// # Examples
    /// ```
    /// use u_statkit::point::Point;
    /// let c = Point::centroid(&[Point::new(0.0, 0.0), Point::new(2.0, 4.0)]).unwrap();
    /// assert_eq!(c, Point::new(1.0, 2.0));
    /// ```
    pub fn centroid(points: &[Point]) -> Option<Point> {
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let (sx, sy) = points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Some(Point::new(sx / n, sy / n))
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point::new(x, y)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// `NonFinite` unless every coordinate is finite.
pub(crate) fn require_finite_points(points: &[Point]) -> crate::Result<()> {
    if points.iter().all(Point::is_finite) {
        Ok(())
    } else {
        Err(crate::StatError::NonFinite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(a.distance_squared(&b), 25.0);
    }

    #[test]
    fn test_centroid_empty() {
        assert_eq!(Point::centroid(&[]), None);
    }

    #[test]
    fn test_ops_and_from() {
        let p: Point = (1.0, 2.0).into();
        assert_eq!(p + Point::new(1.0, 1.0), Point::new(2.0, 3.0));
        assert_eq!(p - p, Point::default());
    }

    #[test]
    fn test_require_finite_points() {
        assert!(require_finite_points(&[Point::new(1.0, 2.0)]).is_ok());
        assert!(require_finite_points(&[Point::new(f64::NAN, 2.0)]).is_err());
    }
}
