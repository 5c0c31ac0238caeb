//! Extreme-point anchor sets.
//!
//! A bin owns a live set of candidate anchors for single-item placement.
//! Every insertion removes the anchors swallowed by the new box and spawns
//! fresh ones along its back edge, right edge and top face at a fixed
//! coordinate stride. Anchors are only spawned where the remaining bin space
//! could still hold the smallest known item, so pruning never discards a
//! feasible anchor.

use nalgebra::Vector3;
use std::cmp::Ordering;

const EPS: f64 = 1e-9;

/// A candidate anchor coordinate, front-bottom-left convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtremePoint {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl ExtremePoint {
    /// Creates an anchor.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Ascending (z, x, y) order: floor first, then left-to-right, front-to-back.
fn anchor_order(a: &ExtremePoint, b: &ExtremePoint) -> Ordering {
    a.z.partial_cmp(&b.z)
        .unwrap_or(Ordering::Equal)
        .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
        .then(a.y.partial_cmp(&b.y).unwrap_or(Ordering::Equal))
}

/// Live anchor set of one bin.
#[derive(Debug, Clone)]
pub struct ExtremePointSet {
    points: Vec<ExtremePoint>,
    bin: Vector3<f64>,
    stride: f64,
    /// Shortest width/depth across the catalog: smaller gaps fit nothing.
    min_footprint_dim: f64,
    /// Shortest item height across the catalog.
    min_height: f64,
}

impl ExtremePointSet {
    /// Creates an empty set for a bin of the given dimensions.
    pub fn new(
        bin_width: f64,
        bin_depth: f64,
        bin_height: f64,
        stride: f64,
        min_footprint_dim: f64,
        min_height: f64,
    ) -> Self {
        Self {
            points: Vec::new(),
            bin: Vector3::new(bin_width, bin_depth, bin_height),
            stride,
            min_footprint_dim,
            min_height,
        }
    }

    /// Number of anchors currently alive.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if no anchor is alive.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The anchors in their current order.
    pub fn points(&self) -> &[ExtremePoint] {
        &self.points
    }

    /// Seeds a grid of anchors over the whole footprint at height `z`.
    pub fn seed_surface(&mut self, z: f64) {
        let mut x = 0.0;
        while x < self.bin.x - EPS {
            let mut y = 0.0;
            while y < self.bin.y - EPS {
                self.points.push(ExtremePoint::new(x, y, z));
                y += self.stride;
            }
            x += self.stride;
        }
    }

    /// Updates the set for a newly inserted box.
    pub fn insert_box(&mut self, x: f64, y: f64, z: f64, width: f64, depth: f64, height: f64) {
        // Back-edge row: anchors along the top of the box's footprint.
        if self.bin.y - (y + depth) >= self.min_footprint_dim {
            let mut w = 0.0;
            while w <= width + EPS {
                self.points.push(ExtremePoint::new(x + w, y + depth, z));
                w += self.stride;
            }
        }
        // Right-edge column.
        if self.bin.x - (x + width) >= self.min_footprint_dim {
            let mut d = 0.0;
            while d <= depth + EPS {
                self.points.push(ExtremePoint::new(x + width, y + d, z));
                d += self.stride;
            }
        }

        // Anchors strictly inside the new box are unreachable now.
        self.points.retain(|ep| {
            !(x <= ep.x + EPS
                && x + width > ep.x + EPS
                && y <= ep.y + EPS
                && y + depth > ep.y + EPS
                && z <= ep.z + EPS
                && z + height > ep.z + EPS)
        });

        // Top-face grid, pruned by headroom and remaining footprint space.
        if self.bin.z - (z + height) >= self.min_height
            && (self.bin.y - (y + depth) >= self.min_footprint_dim
                || self.bin.x - (x + width) >= self.min_footprint_dim)
        {
            let mut w = 0.0;
            while w <= width + EPS {
                let mut d = 0.0;
                while d <= depth + EPS {
                    self.points.push(ExtremePoint::new(x + w, y + d, z + height));
                    d += self.stride;
                }
                w += self.stride;
            }
        }
    }

    /// Sorts anchors ascending by (z, x, y).
    pub fn sort(&mut self) {
        self.points.sort_by(anchor_order);
    }

    /// Drops every anchor strictly below `z`.
    pub fn retain_at_or_above(&mut self, z: f64) {
        self.points.retain(|ep| ep.z >= z - EPS);
    }

    /// Drops all anchors.
    pub fn clear(&mut self) {
        self.points.clear();
    }
}
