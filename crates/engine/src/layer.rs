//! Layers: height-homogeneous slices of a bin footprint.
//!
//! A layer is the 2D packing of one height group. The builder drives the
//! MaxRects packer, skipping pieces already present by identity and recording
//! each placed orientation. During optimization rounds a fresh layer is only
//! kept when its reduced cost (height minus the covered duals) is negative.

use crate::item::PackPiece;
use crate::maxrects::MaxRects;
use palletizer_core::{ItemId, PackConfig, RectHeuristic};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// One piece placed in a layer.
#[derive(Debug, Clone)]
pub struct LayerPiece {
    /// The placed piece.
    pub piece: PackPiece,
    /// X coordinate of the front-left corner in the layer plane.
    pub x: f64,
    /// Y coordinate of the front-left corner in the layer plane.
    pub y: f64,
    /// True if the piece was turned in the width-depth plane.
    pub rotated: bool,
}

impl LayerPiece {
    /// Placed width (after rotation).
    pub fn width(&self) -> f64 {
        if self.rotated {
            self.piece.depth
        } else {
            self.piece.width
        }
    }

    /// Placed depth (after rotation).
    pub fn depth(&self) -> f64 {
        if self.rotated {
            self.piece.width
        } else {
            self.piece.depth
        }
    }
}

/// One atomic item of an unpacked layer, in layer-local coordinates.
#[derive(Debug, Clone)]
pub struct LayerAtom {
    /// Catalog id.
    pub item: ItemId,
    /// X coordinate inside the layer.
    pub x: f64,
    /// Y coordinate inside the layer.
    pub y: f64,
    /// Height offset inside the layer.
    pub z: f64,
    /// Placed width.
    pub width: f64,
    /// Placed depth.
    pub depth: f64,
    /// Placed height.
    pub height: f64,
}

/// A packed footprint slice.
#[derive(Debug, Clone, Default)]
pub struct Layer {
    /// Placed pieces.
    pub pieces: Vec<LayerPiece>,
    /// Height of the layer: the tallest placed piece.
    pub height: f64,
    /// Covered top-surface share of the bin footprint, in percent.
    pub occupancy: f64,
    /// Total weight of the layer.
    pub weight: f64,
}

impl Layer {
    /// A layer holding a single piece at the origin.
    pub fn singleton(piece: PackPiece) -> Self {
        let mut layer = Layer {
            height: piece.height,
            weight: piece.weight,
            ..Default::default()
        };
        layer.pieces.push(LayerPiece {
            piece,
            x: 0.0,
            y: 0.0,
            rotated: false,
        });
        layer
    }

    /// True if the layer holds no pieces.
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Catalog ids covered by the layer.
    pub fn covered_items(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self
            .pieces
            .iter()
            .flat_map(|p| p.piece.covers())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// True if the layer covers any item marked in `covered`.
    pub fn covers_any(&self, covered: &[bool]) -> bool {
        self.pieces
            .iter()
            .flat_map(|p| p.piece.covers())
            .any(|id| covered[id])
    }

    /// Recomputes occupancy and weight from the current pieces.
    pub fn refresh(&mut self, config: &PackConfig) {
        let covered: f64 = self
            .pieces
            .iter()
            .map(|p| p.piece.top_surface_area)
            .sum();
        self.occupancy = covered * 100.0 / config.bin_footprint();
        self.weight = self.pieces.iter().map(|p| p.piece.weight).sum();
        self.height = self
            .pieces
            .iter()
            .map(|p| p.piece.height)
            .fold(0.0, f64::max);
    }

    /// Removes every piece that covers an already-covered item.
    pub fn remove_covered(&mut self, covered: &[bool]) {
        self.pieces
            .retain(|p| !p.piece.covers().any(|id| covered[id]));
    }

    /// Unpacks the layer into atomic items in layer-local coordinates.
    ///
    /// A rotated piece re-lays its atoms with the transposition
    /// `(x, y, w, d) -> (y, x, d, w)` so the children stay inside the rotated
    /// bounding box.
    pub fn unpack(&self) -> Vec<LayerAtom> {
        let mut atoms = Vec::new();
        for placed in &self.pieces {
            for atom in &placed.piece.atoms {
                let (ax, ay, aw, ad) = if placed.rotated {
                    (atom.y, atom.x, atom.depth, atom.width)
                } else {
                    (atom.x, atom.y, atom.width, atom.depth)
                };
                atoms.push(LayerAtom {
                    item: atom.item,
                    x: placed.x + ax,
                    y: placed.y + ay,
                    z: atom.z,
                    width: aw,
                    depth: ad,
                    height: atom.height,
                });
            }
        }
        atoms
    }

    /// Structural equality for deduplication: same piece ids at the same
    /// coordinates.
    fn same_as(&self, other: &Layer) -> bool {
        if self.pieces.len() != other.pieces.len() {
            return false;
        }
        self.pieces.iter().zip(other.pieces.iter()).all(|(a, b)| {
            a.piece.id == b.piece.id
                && (a.x - b.x).abs() < 1e-9
                && (a.y - b.y).abs() < 1e-9
        })
    }
}

/// Removes structurally duplicate layers.
pub fn dedup_layers(layers: &mut Vec<Layer>) {
    let mut i = 0;
    while i < layers.len() {
        let mut j = i + 1;
        while j < layers.len() {
            if layers[i].same_as(&layers[j]) {
                layers.swap_remove(j);
            } else {
                j += 1;
            }
        }
        i += 1;
    }
}

/// Packs one height group into a candidate layer.
///
/// `round` 1 keeps any non-empty layer; later rounds keep the layer only if
/// its reduced cost is negative, and pieces with a negative dual are not even
/// offered to the packer.
pub fn build_layer(
    group: &[PackPiece],
    round: u32,
    heuristic: RectHeuristic,
    duals: &[f64],
    config: &PackConfig,
) -> Option<Layer> {
    let mut packer = MaxRects::new(config.bin_width, config.bin_depth);
    let mut layer = Layer::default();
    let mut covered_duals = 0.0;

    for piece in group {
        if round > 1 && piece.dual(duals) < 0.0 {
            continue;
        }
        // Identity skip: an item may appear in a layer only once, including
        // through super-item membership.
        if layer
            .pieces
            .iter()
            .any(|placed| placed.piece.shares_item(piece))
        {
            continue;
        }

        let Some(rect) = packer.insert(piece.width, piece.depth, heuristic) else {
            continue;
        };
        let rotated = (rect.width - piece.width).abs() > 1e-9;
        covered_duals += piece.dual(duals);
        if piece.height > layer.height {
            layer.height = piece.height;
        }
        layer.pieces.push(LayerPiece {
            piece: piece.clone(),
            x: rect.x,
            y: rect.y,
            rotated,
        });
    }

    if layer.is_empty() {
        return None;
    }
    layer.refresh(config);

    let reduced_cost = layer.height - covered_duals;
    if round == 1 || reduced_cost < 0.0 {
        Some(layer)
    } else {
        None
    }
}

/// Seeds the layer pool for round 1: each group packed as sorted, reversed,
/// and in ten random shuffles, under every selected heuristic.
pub fn generate_initial_layers(
    groups: &[Vec<PackPiece>],
    config: &PackConfig,
    rng: &mut StdRng,
    layers: &mut Vec<Layer>,
) {
    let duals = vec![0.0; 0];
    let heuristics = config.rect_heuristic.expand();

    for group in groups {
        for &heuristic in heuristics {
            if let Some(layer) = build_layer(group, 1, heuristic, &duals, config) {
                layers.push(layer);
            }
        }

        let mut shuffled: Vec<PackPiece> = group.clone();
        shuffled.reverse();
        for &heuristic in heuristics {
            if let Some(layer) = build_layer(&shuffled, 1, heuristic, &duals, config) {
                layers.push(layer);
            }
        }

        for _ in 0..10 {
            shuffled.shuffle(rng);
            for &heuristic in heuristics {
                if let Some(layer) = build_layer(&shuffled, 1, heuristic, &duals, config) {
                    layers.push(layer);
                }
            }
        }
    }
}

/// Regenerates layers in a later round, biased toward unfavorable items:
/// groups are re-sorted by descending dual per footprint area before packing.
/// Returns true if at least one layer with negative reduced cost was added.
pub fn generate_layers(
    groups: &[Vec<PackPiece>],
    duals: &[f64],
    config: &PackConfig,
    layers: &mut Vec<Layer>,
) -> bool {
    let heuristics = config.rect_heuristic.expand();
    let mut added = false;

    for group in groups {
        let mut ordered: Vec<PackPiece> = group.clone();
        ordered.sort_by(|a, b| {
            let da = a.dual(duals) / a.footprint();
            let db = b.dual(duals) / b.footprint();
            db.partial_cmp(&da).unwrap_or(std::cmp::Ordering::Equal)
        });

        for &heuristic in heuristics {
            if let Some(layer) = build_layer(&ordered, 2, heuristic, duals, config) {
                layers.push(layer);
                added = true;
            }
        }
    }

    added
}
