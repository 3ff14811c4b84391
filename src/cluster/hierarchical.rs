//! Agglomerative hierarchical clustering.
//!
//! # Algorithm
//!
//! Start from `n` singleton clusters and a full Euclidean distance matrix.
//! Repeatedly merge the closest pair and update the distances from the new
//! cluster with the Lance-Williams recurrence:
//!
//! | Linkage  | d(i ∪ j, k)                                  |
//! |----------|----------------------------------------------|
//! | Single   | min(d(i,k), d(j,k))                          |
//! | Complete | max(d(i,k), d(j,k))                          |
//! | Average  | (nᵢ·d(i,k) + nⱼ·d(j,k)) / (nᵢ + nⱼ)          |
//!
//! All three are monotone, so merge heights never decrease and the first
//! `n − k` merges always leave exactly `k` clusters.
//!
//! Cluster ids follow the SciPy linkage convention: leaves are `0..n` and
//! the cluster created by merge `s` is `n + s`.
//!
//! Reference: Lance & Williams (1967), "A General Theory of Classificatory
//! Sorting Strategies", *The Computer Journal* 9(4).

use tracing::debug;

use crate::collections::UnionFind;
use crate::error::{require_len, Result, StatError};
use crate::point::{require_finite_points, Point};

/// Inter-cluster distance rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Linkage {
    /// Nearest members.
    Single,
    /// Farthest members.
    Complete,
    /// Mean pairwise distance (UPGMA).
    #[default]
    Average,
}

/// One agglomeration step.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Merge {
    /// Smaller of the two merged cluster ids.
    pub left: usize,
    /// Larger of the two merged cluster ids.
    pub right: usize,
    /// Linkage distance at which the merge happened.
    pub distance: f64,
    /// Number of leaves in the new cluster.
    pub size: usize,
}

/// Full merge history of an agglomerative clustering.
///
/// Deserialization goes through [`Dendrogram::from_merges`], so a decoded
/// tree satisfies the same invariants as one built by [`agglomerative`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "DendrogramRecord"))]
pub struct Dendrogram {
    n_points: usize,
    merges: Vec<Merge>,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct DendrogramRecord {
    n_points: usize,
    merges: Vec<Merge>,
}

#[cfg(feature = "serde")]
impl TryFrom<DendrogramRecord> for Dendrogram {
    type Error = StatError;

    fn try_from(record: DendrogramRecord) -> Result<Self> {
        Dendrogram::from_merges(record.n_points, record.merges)
    }
}

impl Dendrogram {
    /// Rebuilds a dendrogram from a stored merge history.
    ///
    /// Merge `s` must join two distinct clusters that exist before it
    /// (`left < right < n_points + s`), each used at most once, with `size`
    /// equal to the sum of their sizes and a non-negative distance that is
    /// not below the previous one.
    ///
    /// # Errors
    /// - `InsufficientData` when `n_points == 0`.
    /// - `DimensionMismatch` unless there are exactly `n_points − 1` merges.
    /// - `InvalidParameter` for the first merge that breaks the rules above.
    pub fn from_merges(n_points: usize, merges: Vec<Merge>) -> Result<Self> {
        require_len(n_points, 1)?;
        if merges.len() != n_points - 1 {
            return Err(StatError::DimensionMismatch {
                expected: n_points - 1,
                got: merges.len(),
            });
        }

        let mut sizes = vec![1_usize; n_points];
        let mut used = vec![false; 2 * n_points - 1];
        let mut previous = 0.0_f64;
        for (step, m) in merges.iter().enumerate() {
            let next_id = n_points + step;
            if m.left >= m.right || m.right >= next_id {
                return Err(StatError::invalid("merges", step, "cluster ids out of order or range"));
            }
            if used[m.left] || used[m.right] {
                return Err(StatError::invalid("merges", step, "cluster merged twice"));
            }
            if m.size != sizes[m.left] + sizes[m.right] {
                return Err(StatError::invalid("merges", step, "size does not match merged clusters"));
            }
            // average linkage may round one ulp below the previous height
            if m.distance.is_nan() || m.distance < previous * (1.0 - 1e-12) {
                return Err(StatError::invalid("merges", step, "distances must be non-negative and non-decreasing"));
            }
            used[m.left] = true;
            used[m.right] = true;
            sizes.push(m.size);
            previous = m.distance;
        }
        Ok(Dendrogram { n_points, merges })
    }

    pub fn n_points(&self) -> usize {
        self.n_points
    }

    /// Merges in the order they were performed (`n − 1` of them).
    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    pub fn len(&self) -> usize {
        self.merges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merges.is_empty()
    }

    /// Flat labels for exactly `k` clusters, numbered by first appearance.
    ///
    /// # Errors
    /// `InvalidParameter` unless `1 ≤ k ≤ n_points`.
    pub fn cut(&self, k: usize) -> Result<Vec<usize>> {
        if k == 0 || k > self.n_points {
            return Err(StatError::invalid("k", k, "must be in 1..=n_points"));
        }
        Ok(self.replay(self.n_points - k))
    }

    /// Flat labels after applying every merge at or below `height`.
    pub fn cut_at_distance(&self, height: f64) -> Vec<usize> {
        let applied = self
            .merges
            .iter()
            .take_while(|m| m.distance <= height)
            .count();
        self.replay(applied)
    }

    /// Unions the leaves joined by the first `count` merges.
    fn replay(&self, count: usize) -> Vec<usize> {
        let n = self.n_points;
        // any leaf of each merged cluster stands in for the whole cluster
        let mut representative = Vec::with_capacity(self.merges.len());
        let leaf = |id: usize, reps: &[usize]| if id < n { id } else { reps[id - n] };

        let mut uf = UnionFind::new(n);
        for m in &self.merges[..count] {
            let a = leaf(m.left, &representative);
            let b = leaf(m.right, &representative);
            uf.union(a, b);
            representative.push(a);
        }
        uf.labels()
    }
}

/// Builds the full dendrogram of `points` under `linkage`.
///
/// Ties between equally close pairs go to the pair found first in row-major
/// order over the active clusters.
///
/// # Errors
/// - `InsufficientData` for an empty input.
/// - `NonFinite` for NaN/Inf coordinates.
///
/// # Complexity
/// O(n³) time, O(n²) memory.
///
/// # Examples
/// ```
/// use u_statkit::cluster::{agglomerative, Linkage};
/// use u_statkit::point::Point;
///
/// let pts = [
///     Point::new(0.0, 0.0), Point::new(0.0, 1.0),
///     Point::new(5.0, 0.0), Point::new(5.0, 1.0),
/// ];
/// let tree = agglomerative(&pts, Linkage::Single).unwrap();
/// assert_eq!(tree.merges().len(), 3);
/// assert_eq!(tree.cut(2).unwrap(), vec![0, 0, 1, 1]);
/// ```
pub fn agglomerative(points: &[Point], linkage: Linkage) -> Result<Dendrogram> {
    require_len(points.len(), 1)?;
    require_finite_points(points)?;

    let n = points.len();
    let mut dist = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i + 1..n {
            let d = points[i].distance(&points[j]);
            dist[i][j] = d;
            dist[j][i] = d;
        }
    }

    // slot i holds cluster `ids[i]` with `sizes[i]` leaves while `active[i]`
    let mut ids: Vec<usize> = (0..n).collect();
    let mut sizes = vec![1_usize; n];
    let mut active = vec![true; n];
    let mut merges = Vec::with_capacity(n.saturating_sub(1));

    for step in 0..n.saturating_sub(1) {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in 0..n {
            if !active[i] {
                continue;
            }
            for j in i + 1..n {
                if !active[j] {
                    continue;
                }
                let closer = match best {
                    Some((_, _, d)) => dist[i][j] < d,
                    None => true,
                };
                if closer {
                    best = Some((i, j, dist[i][j]));
                }
            }
        }
        let Some((i, j, d)) = best else { break };

        let (si, sj) = (sizes[i] as f64, sizes[j] as f64);
        for k in 0..n {
            if !active[k] || k == i || k == j {
                continue;
            }
            let updated = match linkage {
                Linkage::Single => dist[i][k].min(dist[j][k]),
                Linkage::Complete => dist[i][k].max(dist[j][k]),
                Linkage::Average => (si * dist[i][k] + sj * dist[j][k]) / (si + sj),
            };
            dist[i][k] = updated;
            dist[k][i] = updated;
        }

        let size = sizes[i] + sizes[j];
        merges.push(Merge {
            left: ids[i].min(ids[j]),
            right: ids[i].max(ids[j]),
            distance: d,
            size,
        });
        ids[i] = n + step;
        sizes[i] = size;
        active[j] = false;
    }

    debug!(points = n, ?linkage, "agglomerative clustering finished");
    Ok(Dendrogram {
        n_points: n,
        merges,
    })
}
