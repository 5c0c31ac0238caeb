//! # Palletizer Engine
//!
//! Layer-based 3D pallet loading planner.
//!
//! Rectangular items are packed into fixed-size bins minimizing bin count,
//! under geometric non-overlap, a per-bin weight cap, physical support and
//! load-bearing rules between stacked items, and optional preservation of a
//! load sequence.
//!
//! ## Pipeline
//!
//! Items → super-items/height groups → 2D layer construction (MaxRects) →
//! layer spacing (LP) → column-generation layer selection → bottom-up bin
//! assembly with extreme-point leftover placement → placement manifests.
//!
//! ```no_run
//! use palletizer_engine::{ItemSpec, PalletSolver};
//! use palletizer_core::PackConfig;
//!
//! let config = PackConfig::new()
//!     .with_bin(610.0, 820.0, 2200.0)
//!     .with_max_bin_weight(Some(1_500_000.0));
//! let items = vec![
//!     ItemSpec::boxed(300.0, 400.0, 250.0, 8_000.0)
//!         .with_load_capacity(120.0)
//!         .with_repetition(24),
//! ];
//! let solver = PalletSolver::new(config);
//! let result = solver.solve(&items).expect("planning failed");
//! println!("{} bins, {} unplaced", result.summary.bin_count, result.unplaced.len());
//! ```
//!
//! ## Feature Flags
//!
//! - `milp` (default): the `good_lp`/HiGHS oracle backend. Without it the
//!   engine still runs, degrading to its heuristic-only behavior.
//! - `serde`: serialization support on public data types.

pub mod bin;
pub mod colgen;
pub mod extreme_point;
pub mod feasibility;
pub mod item;
pub mod layer;
pub mod lp;
pub mod maxrects;
pub mod overlap;
pub mod spacing;
pub mod superitem;
pub mod support;

mod solver;

// Re-exports
pub use bin::{Bin, PlacedBox};
pub use extreme_point::{ExtremePoint, ExtremePointSet};
pub use item::{Catalog, Item, ItemSpec, PackPiece, SupportShape};
pub use layer::{Layer, LayerAtom};
pub use lp::{default_oracle, NullOracle};
pub use solver::PalletSolver;
pub use support::{SupportLedger, SupportUpdate};

#[cfg(feature = "milp")]
pub use lp::HighsOracle;

pub use palletizer_core::{
    BinManifest, Error, ItemId, LpOracle, PackConfig, PackResult, Placement, PlacementStrategy,
    RectHeuristic, RejectionCounters, Result, RunSummary,
};
