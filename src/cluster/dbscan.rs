//! DBSCAN density-based clustering.
//!
//! # Algorithm
//!
//! 1. A point is a **core point** when at least `min_pts − 1` other points
//!    lie within `epsilon` of it (so its closed neighbourhood, counting
//!    itself, holds `min_pts` points).
//! 2. Scanning points in input order, each unassigned core point seeds a new
//!    cluster, grown breadth-first through neighbouring core points.
//! 3. A non-core point within `epsilon` of a core point joins the first
//!    cluster whose expansion reaches it (a border point).
//! 4. Everything else is noise.
//!
//! The result depends only on `(epsilon, min_pts)` and the input order.
//!
//! Reference: Ester, Kriegel, Sander & Xu (1996), "A Density-Based
//! Algorithm for Discovering Clusters in Large Spatial Databases with
//! Noise", *KDD*.

use std::collections::VecDeque;

use tracing::debug;

use crate::error::{Result, StatError};
use crate::point::{require_finite_points, Point};

/// Cluster membership of one point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Label {
    /// Member of the cluster with this 0-based id.
    Cluster(usize),
    Noise,
}

impl Label {
    pub fn cluster(self) -> Option<usize> {
        match self {
            Label::Cluster(c) => Some(c),
            Label::Noise => None,
        }
    }

    pub fn is_noise(self) -> bool {
        self == Label::Noise
    }
}

/// Settings for [`dbscan`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DbscanConfig {
    /// Neighbourhood radius (inclusive).
    pub epsilon: f64,
    /// Closed-neighbourhood size that makes a point core.
    pub min_pts: usize,
}

impl DbscanConfig {
    #[must_use]
    pub fn new(epsilon: f64, min_pts: usize) -> Self {
        Self { epsilon, min_pts }
    }

    #[must_use]
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    #[must_use]
    pub fn with_min_pts(mut self, min_pts: usize) -> Self {
        self.min_pts = min_pts;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(StatError::invalid("epsilon", self.epsilon, "must be finite and > 0"));
        }
        if self.min_pts == 0 {
            return Err(StatError::invalid("min_pts", self.min_pts, "must be >= 1"));
        }
        Ok(())
    }
}

impl Default for DbscanConfig {
    fn default() -> Self {
        Self::new(1.0, 3)
    }
}

/// Outcome of a DBSCAN run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DbscanResult {
    pub labels: Vec<Label>,
    pub n_clusters: usize,
    /// `core[i]` is true when point `i` is a core point.
    pub core: Vec<bool>,
}

impl DbscanResult {
    pub fn noise_count(&self) -> usize {
        self.labels.iter().filter(|l| l.is_noise()).count()
    }

    /// Number of points in each cluster.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for c in self.labels.iter().filter_map(|l| l.cluster()) {
            sizes[c] += 1;
        }
        sizes
    }

    /// Indices of the points in cluster `c`.
    pub fn members(&self, c: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, l)| **l == Label::Cluster(c))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Neighbours of every point within `epsilon`, excluding the point itself.
fn neighbourhoods(points: &[Point], epsilon: f64) -> Vec<Vec<usize>> {
    let eps2 = epsilon * epsilon;
    let n = points.len();
    let mut out = vec![Vec::new(); n];
    for i in 0..n {
        for j in i + 1..n {
            if points[i].distance_squared(&points[j]) <= eps2 {
                out[i].push(j);
                out[j].push(i);
            }
        }
    }
    out
}

/// Clusters `points` by density.
///
/// # Errors
/// - `InvalidParameter` for a non-positive `epsilon` or `min_pts == 0`.
/// - `NonFinite` for NaN/Inf coordinates.
///
/// # Complexity
/// O(n²) time and up to O(n²) memory for the neighbour lists.
///
/// # Examples
/// ```
/// use u_statkit::cluster::{dbscan, DbscanConfig, Label};
/// use u_statkit::point::Point;
///
/// let pts = [
///     Point::new(1.0, 1.0), Point::new(1.2, 1.1), Point::new(1.1, 1.2),
///     Point::new(5.0, 5.0), Point::new(5.1, 5.2), Point::new(5.2, 5.1),
///     Point::new(10.0, 10.0),
/// ];
/// let r = dbscan(&pts, &DbscanConfig::new(0.5, 2)).unwrap();
/// assert_eq!(r.n_clusters, 2);
/// assert_eq!(r.labels[6], Label::Noise);
/// ```
pub fn dbscan(points: &[Point], config: &DbscanConfig) -> Result<DbscanResult> {
    config.validate()?;
    require_finite_points(points)?;

    let neighbours = neighbourhoods(points, config.epsilon);
    let core: Vec<bool> = neighbours
        .iter()
        .map(|nb| nb.len() + 1 >= config.min_pts)
        .collect();

    let mut assigned: Vec<Option<usize>> = vec![None; points.len()];
    let mut n_clusters = 0;
    let mut queue = VecDeque::new();
    for seed in 0..points.len() {
        if assigned[seed].is_some() || !core[seed] {
            continue;
        }
        let cluster = n_clusters;
        n_clusters += 1;
        assigned[seed] = Some(cluster);
        queue.push_back(seed);

        while let Some(q) = queue.pop_front() {
            for &j in &neighbours[q] {
                if assigned[j].is_none() {
                    assigned[j] = Some(cluster);
                    if core[j] {
                        queue.push_back(j);
                    }
                }
            }
        }
    }

    let labels: Vec<Label> = assigned
        .into_iter()
        .map(|a| a.map_or(Label::Noise, Label::Cluster))
        .collect();
    let result = DbscanResult {
        labels,
        n_clusters,
        core,
    };
    debug!(
        points = points.len(),
        clusters = result.n_clusters,
        noise = result.noise_count(),
        "dbscan finished"
    );
    Ok(result)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn every_cluster_has_a_core_point(
            raw in proptest::collection::vec((-10.0_f64..10.0, -10.0_f64..10.0), 0..60),
            eps in 0.2_f64..3.0,
            min_pts in 1_usize..6,
        ) {
            let pts: Vec<Point> = raw.into_iter().map(Point::from).collect();
            let r = dbscan(&pts, &DbscanConfig::new(eps, min_pts)).unwrap();
            for c in 0..r.n_clusters {
                prop_assert!(r.members(c).iter().any(|&i| r.core[i]));
            }
            for (i, l) in r.labels.iter().enumerate() {
                if r.core[i] {
                    prop_assert!(!l.is_noise());
                }
            }
        }
    }
}
