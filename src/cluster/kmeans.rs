//! K-means clustering (Lloyd's algorithm).
//!
//! # Algorithm
//!
//! 1. Pick k initial centroids ([`KMeansInit`]).
//! 2. Assign every point to its nearest centroid.
//! 3. Move each centroid to the mean of its points. A centroid with no
//!    points keeps its position.
//! 4. Stop when no centroid moves further than `tolerance`, or after
//!    `max_iter` updates.
//!
//! References:
//! - Lloyd (1982), "Least squares quantization in PCM", *IEEE Trans. Inf.
//!   Theory* 28(2).
//! - Arthur & Vassilvitskii (2007), "k-means++: The Advantages of Careful
//!   Seeding", *SODA*.

use rand::Rng;
use tracing::{debug, trace, warn};

use crate::error::{require_len, Result, StatError};
use crate::point::{require_finite_points, Point};
use crate::random;

/// How the initial centroids are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KMeansInit {
    /// The first k points, in input order. Deterministic.
    #[default]
    FirstK,
    /// k distinct points chosen uniformly at random.
    Random,
    /// k-means++ D² seeding.
    PlusPlus,
}

/// Settings for [`kmeans`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KMeansConfig {
    pub k: usize,
    /// Maximum number of update steps. Default 10.
    pub max_iter: usize,
    /// Largest centroid shift still counted as converged. Default 1e-6.
    pub tolerance: f64,
    pub init: KMeansInit,
}

impl KMeansConfig {
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: 10,
            tolerance: 1e-6,
            init: KMeansInit::FirstK,
        }
    }

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
    pub fn with_init(mut self, init: KMeansInit) -> Self {
        self.init = init;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(StatError::invalid("k", self.k, "must be >= 1"));
        }
        if self.max_iter == 0 {
            return Err(StatError::invalid("max_iter", self.max_iter, "must be >= 1"));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(StatError::invalid("tolerance", self.tolerance, "must be finite and >= 0"));
        }
        Ok(())
    }
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Outcome of a k-means run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KMeansResult {
    pub centroids: Vec<Point>,
    /// Index into `centroids` for every input point.
    pub labels: Vec<usize>,
    /// Update steps performed.
    pub iterations: usize,
    pub converged: bool,
    /// Sum of squared distances from each point to its centroid.
    pub inertia: f64,
}

impl KMeansResult {
    /// Index of the centroid nearest to `p`.
    pub fn predict(&self, p: &Point) -> usize {
        nearest(&self.centroids, p)
    }

    /// Number of points per cluster.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centroids.len()];
        for &l in &self.labels {
            sizes[l] += 1;
        }
        sizes
    }
}

/// One assign-and-update pass.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LloydStep {
    /// Assignment made against the incoming centroids.
    pub labels: Vec<usize>,
    /// Updated centroids.
    pub centroids: Vec<Point>,
    /// Largest distance any centroid moved.
    pub shift: f64,
}

/// Nearest centroid; ties go to the lower index.
fn nearest(centroids: &[Point], p: &Point) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = p.distance_squared(c);
        if d < best_d {
            best_d = d;
            best = i;
        }
    }
    best
}

fn require_centroids(centroids: &[Point]) -> Result<()> {
    if centroids.is_empty() {
        return Err(StatError::InsufficientData { needed: 1, got: 0 });
    }
    require_finite_points(centroids)
}

/// Assigns each point to its nearest centroid.
///
/// # Errors
/// - `InsufficientData` when `centroids` is empty.
/// - `NonFinite` for NaN/Inf centroid coordinates.
pub fn assign(points: &[Point], centroids: &[Point]) -> Result<Vec<usize>> {
    require_centroids(centroids)?;
    Ok(points.iter().map(|p| nearest(centroids, p)).collect())
}

/// Performs a single Lloyd iteration from `centroids`.
///
/// Exposed so an animation can step the algorithm one frame at a time.
///
/// # Errors
/// As [`assign`].
///
/// # Examples
/// ```
/// use u_statkit::cluster::lloyd_step;
/// use u_statkit::point::Point;
/// let pts = [Point::new(0.0, 0.0), Point::new(2.0, 0.0), Point::new(10.0, 0.0)];
/// let step = lloyd_step(&pts, &[Point::new(0.0, 0.0), Point::new(10.0, 0.0)]).unwrap();
/// assert_eq!(step.labels, vec![0, 0, 1]);
/// assert_eq!(step.centroids[0], Point::new(1.0, 0.0));
/// ```
pub fn lloyd_step(points: &[Point], centroids: &[Point]) -> Result<LloydStep> {
    let labels = assign(points, centroids)?;

    let k = centroids.len();
    let mut sums = vec![(0.0, 0.0); k];
    let mut counts = vec![0usize; k];
    for (p, &l) in points.iter().zip(&labels) {
        sums[l].0 += p.x;
        sums[l].1 += p.y;
        counts[l] += 1;
    }

    let mut shift = 0.0_f64;
    let updated: Vec<Point> = centroids
        .iter()
        .zip(sums.iter().zip(&counts))
        .map(|(old, (&(sx, sy), &count))| {
            if count == 0 {
                return *old;
            }
            let new = Point::new(sx / count as f64, sy / count as f64);
            shift = shift.max(old.distance(&new));
            new
        })
        .collect();

    Ok(LloydStep {
        labels,
        centroids: updated,
        shift,
    })
}

fn initial_centroids<R: Rng>(points: &[Point], config: &KMeansConfig, rng: &mut R) -> Vec<Point> {
    let k = config.k;
    match config.init {
        KMeansInit::FirstK => points[..k].to_vec(),
        KMeansInit::Random => random::shuffled_indices(points.len(), rng)
            .into_iter()
            .take(k)
            .map(|i| points[i])
            .collect(),
        KMeansInit::PlusPlus => {
            let mut centroids = Vec::with_capacity(k);
            centroids.push(points[rng.random_range(0..points.len())]);
            let mut d2: Vec<f64> = points
                .iter()
                .map(|p| p.distance_squared(&centroids[0]))
                .collect();
            while centroids.len() < k {
                // all remaining mass zero means duplicates; fall back to uniform
                let idx = random::weighted_choose(&d2, rng)
                    .unwrap_or_else(|| rng.random_range(0..points.len()));
                let chosen = points[idx];
                centroids.push(chosen);
                for (d, p) in d2.iter_mut().zip(points) {
                    *d = d.min(p.distance_squared(&chosen));
                }
            }
            centroids
        }
    }
}

/// Clusters `points` into `config.k` groups.
///
/// The run converges once the largest centroid shift is within
/// `tolerance` or the assignment to the updated centroids repeats the
/// previous one (a fixed point). Running out of iterations is not an error;
/// the result reports `converged == false`. The returned labels are always
/// the assignment to the returned centroids.
///
/// # Errors
/// - `InvalidParameter` for an invalid config.
/// - `InsufficientData` for fewer points than `k`.
/// - `NonFinite` for NaN/Inf coordinates.
///
/// # Complexity
/// O(n·k·iterations).
///
/// # Examples
/// ```
/// use u_statkit::cluster::{kmeans, KMeansConfig};
/// use u_statkit::point::Point;
/// use u_statkit::random::create_rng;
///
/// let pts = [
///     Point::new(1.0, 1.0), Point::new(9.0, 9.0),
///     Point::new(1.2, 0.8), Point::new(8.8, 9.1),
/// ];
/// let r = kmeans(&pts, &KMeansConfig::new(2), &mut create_rng(0)).unwrap();
/// assert!(r.converged);
/// assert_eq!(r.labels, vec![0, 1, 0, 1]);
/// ```
pub fn kmeans<R: Rng>(points: &[Point], config: &KMeansConfig, rng: &mut R) -> Result<KMeansResult> {
    config.validate()?;
    require_len(points.len(), config.k)?;
    require_finite_points(points)?;

    let mut centroids = initial_centroids(points, config, rng);
    let mut labels = assign(points, &centroids)?;
    let mut iterations = 0;
    let mut converged = false;
    while iterations < config.max_iter {
        let step = lloyd_step(points, &centroids)?;
        iterations += 1;
        centroids = step.centroids;
        labels = assign(points, &centroids)?;
        trace!(iteration = iterations, shift = step.shift, "lloyd step");
        if step.shift <= config.tolerance || labels == step.labels {
            converged = true;
            break;
        }
    }
    let inertia = points
        .iter()
        .zip(&labels)
        .map(|(p, &l)| p.distance_squared(&centroids[l]))
        .sum();

    if converged {
        debug!(k = config.k, iterations, inertia, "k-means converged");
    } else {
        warn!(k = config.k, max_iter = config.max_iter, inertia, "k-means hit iteration budget");
    }
    Ok(KMeansResult {
        centroids,
        labels,
        iterations,
        converged,
        inertia,
    })
}
