//! Solver configuration.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 2D rectangle packing heuristic used by the layer builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RectHeuristic {
    /// Place where the rectangle touches the most occupied perimeter.
    ContactPoint,
    /// Minimize the longer leftover side of the chosen free rectangle.
    BestLongSideFit,
    /// Minimize the shorter leftover side of the chosen free rectangle.
    BestShortSideFit,
    /// Minimize the leftover area of the chosen free rectangle.
    BestAreaFit,
    /// Tetris-style: lowest y, then lowest x.
    BottomLeft,
    /// Try every heuristic and keep each resulting layer.
    #[default]
    All,
}

impl RectHeuristic {
    /// The concrete heuristics expanded from this selection.
    pub fn expand(self) -> &'static [RectHeuristic] {
        match self {
            RectHeuristic::All => &[
                RectHeuristic::ContactPoint,
                RectHeuristic::BestLongSideFit,
                RectHeuristic::BestShortSideFit,
                RectHeuristic::BestAreaFit,
                RectHeuristic::BottomLeft,
            ],
            RectHeuristic::ContactPoint => &[RectHeuristic::ContactPoint],
            RectHeuristic::BestLongSideFit => &[RectHeuristic::BestLongSideFit],
            RectHeuristic::BestShortSideFit => &[RectHeuristic::BestShortSideFit],
            RectHeuristic::BestAreaFit => &[RectHeuristic::BestAreaFit],
            RectHeuristic::BottomLeft => &[RectHeuristic::BottomLeft],
        }
    }
}

/// How leftover items are matched to extreme-point anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PlacementStrategy {
    /// Accept the first feasible (item, anchor, orientation, corner) hit.
    /// Anchors are pre-sorted by (z, x, y) so the first hit is already the
    /// preferred one.
    #[default]
    FirstFeasible,
    /// Score every feasible hit with the merit function and keep the best.
    MeritRanked,
}

/// Configuration for a packing run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PackConfig {
    /// Bin (pallet/container) width, the x extent.
    pub bin_width: f64,
    /// Bin depth, the y extent.
    pub bin_depth: f64,
    /// Bin height, the z extent.
    pub bin_height: f64,

    /// Layers are stacked until the bin height exceeds
    /// `target_fill_ratio * bin_height`; the rest is leftover territory.
    pub target_fill_ratio: f64,

    /// Maximum total item weight per bin. `None` disables the cap.
    pub max_bin_weight: Option<f64>,

    /// Enforce per-item load capacities through the support graph.
    pub enforce_load_capacity: bool,
    /// Enforce the minimum vertical support ratio for items above the floor.
    pub enforce_vertical_support: bool,
    /// Honor item support shapes (edges/corners). When off every item
    /// supports across its full footprint.
    pub support_shapes_enabled: bool,
    /// Honor per-item edge-reduce margins when computing support surfaces.
    pub edge_reduce_enabled: bool,
    /// Keep the load sequence: one open bin at a time, stragglers accepted as
    /// unplaced instead of opening extra bins.
    pub preserve_sequence: bool,

    /// Minimum bottom-support percentage (0-100) when not all four corners
    /// are covered.
    pub min_support_pct: f64,
    /// Thickness of structural edge/corner zones.
    pub edge_support_thickness: f64,
    /// Items whose heights differ by at most this much share a layer, and a
    /// supporter's top may sit this far below a candidate's bottom.
    pub layer_height_tolerance: f64,
    /// Width ratio tolerance for stacking one item onto another.
    pub super_item_width_tolerance: f64,
    /// Depth ratio tolerance for stacking one item onto another.
    pub super_item_depth_tolerance: f64,
    /// Minimum matched-edge length ratio for fusing items side by side.
    pub min_edge_ratio: f64,
    /// Coordinate stride for extreme-point generation.
    pub ep_stride: f64,

    /// Number of items planned per batch.
    pub batch_size: usize,
    /// Column generation stops after this many rounds without improvement.
    pub improvement_limit: u32,
    /// Wall-clock budget for one column-generation loop, in milliseconds.
    pub colgen_time_limit_ms: u64,
    /// Time limit handed to the oracle for a single solve, in milliseconds.
    pub oracle_time_limit_ms: u64,
    /// Batches smaller than this skip column generation entirely.
    pub min_colgen_items: usize,
    /// Maximum number of items stacked vertically in a super-item.
    pub max_super_item_stack: usize,
    /// Maximum height of a vertical super-item stack.
    pub max_super_item_height: f64,

    /// Layers below this occupancy percentage are discarded.
    pub min_layer_occupancy: f64,
    /// An empty bin only accepts a layer at or above this occupancy.
    pub first_layer_occupancy: f64,
    /// Layer spacing via the oracle only runs for bins wider than this.
    pub spacing_width_threshold: f64,

    /// 2D packing heuristic selection.
    pub rect_heuristic: RectHeuristic,
    /// Leftover placement strategy.
    pub placement_strategy: PlacementStrategy,

    /// Seed for the layer-shuffling RNG. `None` draws from the OS.
    pub seed: Option<u64>,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            bin_width: 610.0,
            bin_depth: 820.0,
            bin_height: 2200.0,
            target_fill_ratio: 0.8,
            max_bin_weight: Some(1_500_000.0),
            enforce_load_capacity: true,
            enforce_vertical_support: true,
            support_shapes_enabled: false,
            edge_reduce_enabled: false,
            preserve_sequence: true,
            min_support_pct: 60.0,
            edge_support_thickness: 27.0,
            layer_height_tolerance: 8.0,
            super_item_width_tolerance: 0.6,
            super_item_depth_tolerance: 0.6,
            min_edge_ratio: 0.8,
            ep_stride: 50.0,
            batch_size: 200,
            improvement_limit: 15,
            colgen_time_limit_ms: 1_200_000,
            oracle_time_limit_ms: 900_000,
            min_colgen_items: 10,
            max_super_item_stack: 2,
            max_super_item_height: 700.0,
            min_layer_occupancy: 40.0,
            first_layer_occupancy: 60.0,
            spacing_width_threshold: 700.0,
            rect_heuristic: RectHeuristic::default(),
            placement_strategy: PlacementStrategy::default(),
            seed: None,
        }
    }
}

impl PackConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bin dimensions.
    pub fn with_bin(mut self, width: f64, depth: f64, height: f64) -> Self {
        self.bin_width = width;
        self.bin_depth = depth;
        self.bin_height = height;
        self
    }

    /// Sets the maximum bin weight. `None` disables the cap.
    pub fn with_max_bin_weight(mut self, weight: Option<f64>) -> Self {
        self.max_bin_weight = weight;
        self
    }

    /// Enables or disables load-capacity enforcement.
    pub fn with_load_capacity(mut self, enabled: bool) -> Self {
        self.enforce_load_capacity = enabled;
        self
    }

    /// Enables or disables vertical-support enforcement.
    pub fn with_vertical_support(mut self, enabled: bool) -> Self {
        self.enforce_vertical_support = enabled;
        self
    }

    /// Enables or disables item support shapes.
    pub fn with_support_shapes(mut self, enabled: bool) -> Self {
        self.support_shapes_enabled = enabled;
        self
    }

    /// Enables or disables load-sequence preservation.
    pub fn with_sequence(mut self, enabled: bool) -> Self {
        self.preserve_sequence = enabled;
        self
    }

    /// Sets the minimum bottom-support percentage (0-100).
    pub fn with_min_support_pct(mut self, pct: f64) -> Self {
        self.min_support_pct = pct.clamp(0.0, 100.0);
        self
    }

    /// Sets the layer height tolerance.
    pub fn with_layer_height_tolerance(mut self, tol: f64) -> Self {
        self.layer_height_tolerance = tol.max(0.0);
        self
    }

    /// Sets the extreme-point stride.
    pub fn with_ep_stride(mut self, stride: f64) -> Self {
        self.ep_stride = stride;
        self
    }

    /// Sets the batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Sets the no-improvement round limit.
    pub fn with_improvement_limit(mut self, limit: u32) -> Self {
        self.improvement_limit = limit;
        self
    }

    /// Sets the column-generation wall-clock budget in milliseconds.
    pub fn with_colgen_time_limit(mut self, ms: u64) -> Self {
        self.colgen_time_limit_ms = ms;
        self
    }

    /// Sets the per-solve oracle time limit in milliseconds.
    pub fn with_oracle_time_limit(mut self, ms: u64) -> Self {
        self.oracle_time_limit_ms = ms;
        self
    }

    /// Sets the 2D packing heuristic.
    pub fn with_rect_heuristic(mut self, heuristic: RectHeuristic) -> Self {
        self.rect_heuristic = heuristic;
        self
    }

    /// Sets the leftover placement strategy.
    pub fn with_placement_strategy(mut self, strategy: PlacementStrategy) -> Self {
        self.placement_strategy = strategy;
        self
    }

    /// Sets the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// The bin height at which a bin is considered filled with layers.
    pub fn layer_fill_height(&self) -> f64 {
        self.target_fill_ratio * self.bin_height
    }

    /// The bin footprint area.
    pub fn bin_footprint(&self) -> f64 {
        self.bin_width * self.bin_depth
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.bin_width <= 0.0 || self.bin_depth <= 0.0 || self.bin_height <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "bin dimensions must be positive, got {}x{}x{}",
                self.bin_width, self.bin_depth, self.bin_height
            )));
        }
        if !(0.0..=1.0).contains(&self.target_fill_ratio) {
            return Err(Error::InvalidConfig(format!(
                "target fill ratio must be in [0, 1], got {}",
                self.target_fill_ratio
            )));
        }
        if let Some(w) = self.max_bin_weight {
            if w <= 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "bin weight cap must be positive, got {w}"
                )));
            }
        }
        if self.ep_stride <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "extreme-point stride must be positive, got {}",
                self.ep_stride
            )));
        }
        if self.max_super_item_stack < 1 {
            return Err(Error::InvalidConfig(
                "super-item stack limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
