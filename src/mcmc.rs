//! Markov chain Monte Carlo samplers on the plane.
//!
//! A [`Chain`] is an accumulator the caller owns. Each sampler consumes a
//! chain, appends steps and hands it back, so "run 100 more steps" is just
//! another call with the returned chain.
//!
//! # Algorithms
//!
//! - **Random-walk Metropolis**: symmetric normal proposal, accept with
//!   probability min(1, f(p)/f(c)).
//!   Reference: Metropolis et al. (1953), *J. Chem. Phys.* 21(6);
//!   Hastings (1970), *Biometrika* 57(1).
//! - **Gibbs** for a standard bivariate normal with correlation ρ:
//!   x | y ~ N(ρy, 1 − ρ²), then y | x ~ N(ρx, 1 − ρ²).
//!   Reference: Geman & Geman (1984), *IEEE PAMI* 6(6).

use rand::Rng;
use tracing::{debug, warn};

use crate::error::{Result, StatError};
use crate::point::Point;
use crate::random;

/// One transition of a chain.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChainStep {
    /// Candidate drawn at this step.
    pub proposal: Point,
    /// State after the step.
    pub state: Point,
    pub accepted: bool,
}

/// Ordered history of a sampler run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Chain {
    start: Point,
    steps: Vec<ChainStep>,
}

impl Chain {
    /// Empty chain whose first state is `start`.
    pub fn new(start: Point) -> Self {
        Self {
            start,
            steps: Vec::new(),
        }
    }

    pub fn start(&self) -> Point {
        self.start
    }

    /// Latest state, or the start for an empty chain.
    pub fn current(&self) -> Point {
        self.steps.last().map_or(self.start, |s| s.state)
    }

    pub fn steps(&self) -> &[ChainStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Fraction of accepted proposals; `None` for an empty chain.
    pub fn acceptance_rate(&self) -> Option<f64> {
        if self.steps.is_empty() {
            return None;
        }
        let accepted = self.steps.iter().filter(|s| s.accepted).count();
        Some(accepted as f64 / self.steps.len() as f64)
    }

    /// The last `k` steps (all of them when `k >= len`).
    pub fn tail(&self, k: usize) -> &[ChainStep] {
        &self.steps[self.steps.len().saturating_sub(k)..]
    }

    /// States after dropping the first `burn_in` steps.
    pub fn states(&self, burn_in: usize) -> Vec<Point> {
        self.steps.iter().skip(burn_in).map(|s| s.state).collect()
    }

    /// Mean state after dropping the first `burn_in` steps.
    pub fn mean_state(&self, burn_in: usize) -> Option<Point> {
        Point::centroid(&self.states(burn_in))
    }

    fn push(&mut self, step: ChainStep) {
        self.steps.push(step);
    }
}

/// Settings for [`metropolis_hastings`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetropolisConfig {
    /// Standard deviation of the normal proposal in each coordinate.
    pub proposal_sd: f64,
    /// Steps to append.
    pub steps: usize,
}

impl Default for MetropolisConfig {
    fn default() -> Self {
        Self {
            proposal_sd: 0.5,
            steps: 100,
        }
    }
}

impl MetropolisConfig {
    #[must_use]
    pub fn with_proposal_sd(mut self, proposal_sd: f64) -> Self {
        self.proposal_sd = proposal_sd;
        self
    }

    #[must_use]
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.proposal_sd.is_finite() || self.proposal_sd <= 0.0 {
            return Err(StatError::invalid(
                "proposal_sd",
                self.proposal_sd,
                "must be finite and > 0",
            ));
        }
        Ok(())
    }
}

/// Negative and NaN densities count as zero.
fn density<F: Fn(Point) -> f64>(target: &F, p: Point) -> f64 {
    let f = target(p);
    if f > 0.0 {
        f
    } else {
        0.0
    }
}

/// Extends `chain` by `config.steps` random-walk Metropolis steps.
///
/// `target` is an unnormalised density. When the current state has zero
/// density the proposal is always accepted so the walk can leave regions
/// of zero mass.
///
/// # Errors
/// `InvalidParameter` for a non-positive `proposal_sd`.
///
/// # Examples
/// ```
/// use u_statkit::mcmc::{metropolis_hastings, Chain, MetropolisConfig};
/// use u_statkit::point::Point;
/// use u_statkit::random::create_rng;
///
/// let target = |p: Point| (-(p.x * p.x + p.y * p.y) / 2.0).exp();
/// let cfg = MetropolisConfig::default().with_steps(500);
/// let chain = metropolis_hastings(&target, Chain::new(Point::new(0.0, 0.0)), &cfg, &mut create_rng(1)).unwrap();
/// assert_eq!(chain.len(), 500);
/// ```
pub fn metropolis_hastings<F, R>(
    target: &F,
    mut chain: Chain,
    config: &MetropolisConfig,
    rng: &mut R,
) -> Result<Chain>
where
    F: Fn(Point) -> f64,
    R: Rng,
{
    config.validate()?;
    chain.steps.reserve(config.steps);

    let mut current = chain.current();
    let mut f_current = density(target, current);
    for _ in 0..config.steps {
        let (dx, dy) = random::standard_normal_pair(rng);
        let proposal = Point::new(
            current.x + config.proposal_sd * dx,
            current.y + config.proposal_sd * dy,
        );
        let f_proposal = density(target, proposal);

        let accepted = if f_current == 0.0 {
            true
        } else {
            let ratio = f_proposal / f_current;
            ratio >= 1.0 || rng.random::<f64>() < ratio
        };
        if accepted {
            current = proposal;
            f_current = f_proposal;
        }
        chain.push(ChainStep {
            proposal,
            state: current,
            accepted,
        });
    }

    if let Some(rate) = chain.acceptance_rate() {
        debug!(steps = chain.len(), acceptance_rate = rate, "metropolis-hastings run");
        if rate < 0.05 {
            warn!(acceptance_rate = rate, "very low acceptance; proposal_sd may be too large");
        }
    }
    Ok(chain)
}

/// Extends `chain` by `steps` Gibbs sweeps for a standard bivariate normal
/// with correlation `rho`.
///
/// Each sweep updates x from its conditional given y, then y given the new
/// x. Every step is recorded as accepted; `proposal` equals `state`.
///
/// # Errors
/// `InvalidParameter` unless `|rho| < 1`.
pub fn gibbs_bivariate_normal<R: Rng>(
    rho: f64,
    mut chain: Chain,
    steps: usize,
    rng: &mut R,
) -> Result<Chain> {
    if rho.is_nan() || rho.abs() >= 1.0 {
        return Err(StatError::invalid("rho", rho, "must satisfy |rho| < 1"));
    }
    let cond_sd = (1.0 - rho * rho).sqrt();
    chain.steps.reserve(steps);

    let mut current = chain.current();
    for _ in 0..steps {
        let (zx, zy) = random::standard_normal_pair(rng);
        let x = rho * current.y + cond_sd * zx;
        let y = rho * x + cond_sd * zy;
        current = Point::new(x, y);
        chain.push(ChainStep {
            proposal: current,
            state: current,
            accepted: true,
        });
    }
    debug!(steps = chain.len(), rho, "gibbs run");
    Ok(chain)
}
