//! Error types for the palletizer engine.

use crate::oracle::OracleError;
use thiserror::Error;

/// Result type alias for palletizer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during load planning.
///
/// Feasibility rejections (overlap, support, load capacity, bin weight) are
/// not errors: a rejected candidate is counted and the search continues. Only
/// conditions that make a run unusable surface here.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid item record (non-positive dimension, negative weight, ...).
    #[error("Invalid item: {0}")]
    InvalidItem(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// The LP oracle failed in a way the caller chose not to absorb.
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// Computation cancelled.
    #[error("Computation cancelled")]
    Cancelled,

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
