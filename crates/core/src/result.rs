//! Run results and rejection accounting.

use crate::placement::{BinManifest, ItemId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Counters for rejected placement candidates, by cause.
///
/// Every feasibility failure increments exactly one counter; nothing is
/// silently dropped. The counts feed constraint tuning, not control flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RejectionCounters {
    /// 3D overlap with an already placed box.
    pub geometric: u64,
    /// Support area below the minimum percentage.
    pub area_support: u64,
    /// All four corners covered but overlap below the relaxed edge ratio.
    pub corner_support: u64,
    /// Propagated weight exceeded an ancestor's load capacity.
    pub load_capacity: u64,
    /// Bin weight cap exceeded.
    pub bin_weight: u64,
    /// Oracle solve failed (timeout/infeasible/unavailable).
    pub oracle: u64,
}

impl RejectionCounters {
    /// Total number of rejections.
    pub fn total(&self) -> u64 {
        self.geometric
            + self.area_support
            + self.corner_support
            + self.load_capacity
            + self.bin_weight
            + self.oracle
    }

    /// Adds another counter set into this one.
    pub fn absorb(&mut self, other: &RejectionCounters) {
        self.geometric += other.geometric;
        self.area_support += other.area_support;
        self.corner_support += other.corner_support;
        self.load_capacity += other.load_capacity;
        self.bin_weight += other.bin_weight;
        self.oracle += other.oracle;
    }
}

/// Summary statistics of one packing run.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunSummary {
    /// Number of atomic items in the catalog.
    pub item_count: usize,
    /// Wall-clock time of the run in milliseconds.
    pub elapsed_ms: u64,
    /// Number of finished bins.
    pub bin_count: usize,
    /// Number of candidate layers generated across all batches.
    pub layer_count: usize,
    /// Items placed individually through the extreme-point path.
    pub leftover_count: usize,
    /// Items that could not be placed at all.
    pub unplaced_count: usize,
    /// Rejection counters by cause.
    pub rejections: RejectionCounters,
}

/// Result of a packing run: one manifest per finished bin plus the summary.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PackResult {
    /// Finished bins in construction order.
    pub bins: Vec<BinManifest>,
    /// Items that could not be placed.
    pub unplaced: Vec<ItemId>,
    /// Run statistics.
    pub summary: RunSummary,
}

impl PackResult {
    /// True if every item was placed.
    pub fn all_placed(&self) -> bool {
        self.unplaced.is_empty()
    }

    /// Total number of placed items across all bins.
    pub fn placed_count(&self) -> usize {
        self.bins.iter().map(|b| b.item_count()).sum()
    }

    /// Volume utilization across all used bins given the bin volume.
    pub fn utilization(&self, bin_volume: f64) -> f64 {
        if self.bins.is_empty() || bin_volume <= 0.0 {
            return 0.0;
        }
        let placed: f64 = self
            .bins
            .iter()
            .flat_map(|b| b.placements.iter())
            .map(|p| p.width * p.depth * p.height)
            .sum();
        placed / (bin_volume * self.bins.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::Placement;

    #[test]
    fn counters_absorb() {
        let mut a = RejectionCounters {
            geometric: 1,
            bin_weight: 2,
            ..Default::default()
        };
        let b = RejectionCounters {
            area_support: 3,
            ..Default::default()
        };
        a.absorb(&b);
        assert_eq!(a.total(), 6);
        assert_eq!(a.area_support, 3);
    }

    #[test]
    fn utilization() {
        let mut result = PackResult::default();
        let mut bin = BinManifest::default();
        bin.placements
            .push(Placement::new(0, 0.0, 0.0, 0.0, 10.0, 10.0, 10.0));
        result.bins.push(bin);
        let util = result.utilization(2000.0);
        assert!((util - 0.5).abs() < 1e-9);
        assert_eq!(result.placed_count(), 1);
    }

    #[test]
    fn empty_result() {
        let result = PackResult::default();
        assert!(result.all_placed());
        assert_eq!(result.utilization(1000.0), 0.0);
    }
}
