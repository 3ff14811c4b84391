//! Clustering of 2D points.
//!
//! - [`kmeans`]: Lloyd's algorithm with first-k, random or k-means++ seeding
//! - [`dbscan`]: density-based clustering with explicit noise
//! - [`agglomerative`]: hierarchical clustering with single, complete or
//!   average linkage, cut into flat labels via [`Dendrogram::cut`]

mod dbscan;
mod hierarchical;
mod kmeans;

pub use dbscan::{dbscan, DbscanConfig, DbscanResult, Label};
pub use hierarchical::{agglomerative, Dendrogram, Linkage, Merge};
pub use kmeans::{assign, kmeans, lloyd_step, KMeansConfig, KMeansInit, KMeansResult, LloydStep};
