//! Error type shared by every fallible operation in the crate.
//!
//! Failures are local and reported through the return value. Nothing here
//! is retried or treated as fatal.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, StatError>;

/// Reasons a statistic, fit, or algorithm could not produce a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatError {
    /// Too few observations for the requested computation.
    #[error("insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData {
        /// Minimum number of observations required.
        needed: usize,
        /// Number of observations supplied.
        got: usize,
    },

    /// The input is well-formed but the quantity is undefined for it
    /// (zero variance, identical x values, zero expected frequency, ...).
    #[error("degenerate input: {0}")]
    Degenerate(&'static str),

    /// A parameter lies outside its valid domain.
    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        /// Parameter name as it appears in the API.
        name: &'static str,
        /// The rejected value, formatted.
        value: String,
        /// Constraint the value violates.
        reason: &'static str,
    },

    /// The input contains NaN or infinite values.
    #[error("input contains NaN or infinite values")]
    NonFinite,

    /// Paired inputs have incompatible lengths or shapes.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Expected length.
        expected: usize,
        /// Actual length.
        got: usize,
    },
}

impl StatError {
    pub(crate) fn invalid(
        name: &'static str,
        value: impl std::fmt::Display,
        reason: &'static str,
    ) -> Self {
        StatError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }
}

/// Returns `InsufficientData` unless `got >= needed`.
pub(crate) fn require_len(got: usize, needed: usize) -> Result<()> {
    if got < needed {
        Err(StatError::InsufficientData { needed, got })
    } else {
        Ok(())
    }
}

/// Returns `NonFinite` if any value is NaN or infinite.
pub(crate) fn require_finite(data: &[f64]) -> Result<()> {
    if data.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(StatError::NonFinite)
    }
}
