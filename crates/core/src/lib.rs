//! # Palletizer Core
//!
//! Shared foundation for the palletizer load-planning engine.
//!
//! This crate holds the types the placement engine and its callers agree on:
//!
//! - **Errors**: [`Error`], [`Result`]
//! - **Configuration**: [`PackConfig`] with every toggle, tolerance and
//!   search limit recognized by the engine
//! - **LP oracle contract**: [`LpOracle`] plus the master/layout model
//!   descriptions — the engine builds rows and columns and reads back duals
//!   and primals, it never reimplements a solver
//! - **Manifests**: [`Placement`], [`BinManifest`], [`PackResult`],
//!   [`RunSummary`], [`RejectionCounters`]
//!
//! ## Feature Flags
//!
//! - `serde`: enable serialization/deserialization support

pub mod config;
pub mod error;
pub mod oracle;
pub mod placement;
pub mod result;

// Re-exports
pub use config::{PackConfig, PlacementStrategy, RectHeuristic};
pub use error::{Error, Result};
pub use oracle::{
    ConstraintSpec, LayoutProblem, LayoutSolution, LinExpr, LpOracle, MasterColumn, MasterProblem,
    MasterSolution, OracleError, Relation, Sense, VarId, VarKind,
};
pub use placement::{BinManifest, ItemId, Placement};
pub use result::{PackResult, RejectionCounters, RunSummary};
