//! # u-statkit
//!
//! Statistics and machine-learning primitives behind interactive teaching
//! visualizations: descriptive statistics, classical hypothesis tests,
//! regression fits, resampling, Bayesian updating, Markov chain samplers,
//! clustering and PCA.
//!
//! Every function is a pure computation over caller-supplied data. The crate
//! knows nothing about rendering, animation or user input; randomised
//! routines take an explicit `&mut impl Rng` so a seeded generator
//! reproduces a run exactly.
//!
//! ## Modules
//!
//! - [`stats`]: descriptive statistics with Welford/Kahan accumulation
//! - [`special`]: gamma, beta, error functions and the t/F/χ²/normal CDFs
//! - [`distributions`]: Normal and Beta distributions
//! - [`random`]: seeded generators, normal sampling, shuffling
//! - [`hypothesis`]: t, F, ANOVA, χ² and rank-based tests with exact p-values
//! - [`regression`]: linear, polynomial and logistic fits; Bernoulli MLE
//! - [`resampling`]: percentile bootstrap confidence intervals
//! - [`bayes`]: Beta-Binomial and Normal-Normal conjugate updating
//! - [`mcmc`]: Metropolis-Hastings and Gibbs sampling in two dimensions
//! - [`point`]: the 2D point type shared by clustering and PCA
//! - [`cluster`]: k-means, DBSCAN and agglomerative clustering
//! - [`pca`]: principal components of 2D samples
//! - [`collections`]: union-find used to cut dendrograms
//!
//! ## Conventions
//!
//! - Descriptive statistics return `Option` and yield `None` on empty or
//!   non-finite input. Everything else returns [`Result`] with a
//!   [`StatError`] naming the failure.
//! - p-values are always clamped to `[0, 1]`.
//! - With the `serde` feature, public result and config types implement
//!   `Serialize`/`Deserialize`.

pub mod bayes;
pub mod cluster;
pub mod collections;
pub mod distributions;
pub mod error;
pub mod hypothesis;
pub mod mcmc;
pub mod pca;
pub mod point;
pub mod random;
pub mod regression;
pub mod resampling;
pub mod special;
pub mod stats;

pub use error::{Result, StatError};
