//! Item catalog and the pack-piece view used by the layer builder.

use palletizer_core::{Error, ItemId, PackConfig, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Structural load-bearing zone of an item's footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SupportShape {
    /// The whole top surface bears load.
    #[default]
    Full,
    /// A ring of fixed thickness along all four edges.
    AllEdges,
    /// Two strips along the two short edges.
    ShortEdges,
    /// Two strips along the two long edges.
    LongEdges,
    /// Four fixed squares in the corners.
    Corners,
}

impl SupportShape {
    /// Parses a catalog tag into a shape. Unknown tags fall back to corners,
    /// the most conservative zone.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "FULL" => SupportShape::Full,
            "ALL_EDGES" => SupportShape::AllEdges,
            "SHORT_EDGES" => SupportShape::ShortEdges,
            "LONG_EDGES" => SupportShape::LongEdges,
            _ => SupportShape::Corners,
        }
    }
}

/// Tabular item record as produced by an external catalog parser.
///
/// `repetition` expands into that many catalog items sharing the physical
/// parameters but with distinct ids.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ItemSpec {
    /// Width (x extent).
    pub width: f64,
    /// Depth (y extent).
    pub depth: f64,
    /// Height (z extent).
    pub height: f64,
    /// Weight of one item.
    pub weight: f64,
    /// Load capacity per unit of footprint area.
    pub load_capacity_per_area: f64,
    /// Edge-reduce margin in the width direction.
    pub edge_reduce_width: f64,
    /// Edge-reduce margin in the depth direction.
    pub edge_reduce_depth: f64,
    /// Support shape tag (`FULL`, `ALL_EDGES`, ...).
    pub shape: SupportShape,
    /// Number of identical items.
    pub repetition: usize,
    /// Load sequence number; higher loads later.
    pub sequence: u32,
}

impl ItemSpec {
    /// A full-support item with the given dimensions and weight.
    pub fn boxed(width: f64, depth: f64, height: f64, weight: f64) -> Self {
        Self {
            width,
            depth,
            height,
            weight,
            load_capacity_per_area: 0.0,
            edge_reduce_width: 0.0,
            edge_reduce_depth: 0.0,
            shape: SupportShape::Full,
            repetition: 1,
            sequence: 0,
        }
    }

    /// Sets the load capacity per unit of footprint area.
    pub fn with_load_capacity(mut self, per_area: f64) -> Self {
        self.load_capacity_per_area = per_area;
        self
    }

    /// Sets the support shape.
    pub fn with_shape(mut self, shape: SupportShape) -> Self {
        self.shape = shape;
        self
    }

    /// Sets the repetition count.
    pub fn with_repetition(mut self, count: usize) -> Self {
        self.repetition = count.max(1);
        self
    }

    /// Sets the load sequence number.
    pub fn with_sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence;
        self
    }
}

/// One atomic item of the catalog.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Item {
    /// Catalog id, the index into the arena.
    pub id: ItemId,
    /// Load sequence number.
    pub sequence: u32,
    /// Width (x extent).
    pub width: f64,
    /// Depth (y extent).
    pub depth: f64,
    /// Height (z extent).
    pub height: f64,
    /// Weight.
    pub weight: f64,
    /// Effective load capacity, already adjusted for the support shape's
    /// surface ratio.
    pub load_cap: f64,
    /// Edge-reduce margin in the width direction.
    pub edge_reduce_width: f64,
    /// Edge-reduce margin in the depth direction.
    pub edge_reduce_depth: f64,
    /// Support shape.
    pub shape: SupportShape,
    /// Usable top surface area under the support shape.
    pub top_surface_area: f64,
}

impl Item {
    fn from_spec(id: ItemId, spec: &ItemSpec, config: &PackConfig) -> Result<Self> {
        if spec.width <= 0.0 || spec.depth <= 0.0 || spec.height <= 0.0 {
            return Err(Error::InvalidItem(format!(
                "item {id} has non-positive dimensions {}x{}x{}",
                spec.width, spec.depth, spec.height
            )));
        }
        if spec.weight < 0.0 {
            return Err(Error::InvalidItem(format!(
                "item {id} has negative weight {}",
                spec.weight
            )));
        }

        let shape = if config.support_shapes_enabled {
            spec.shape
        } else {
            SupportShape::Full
        };
        let (edge_reduce_width, edge_reduce_depth) = if config.edge_reduce_enabled {
            (spec.edge_reduce_width, spec.edge_reduce_depth)
        } else {
            (0.0, 0.0)
        };

        let footprint = spec.width * spec.depth;
        // Capacity per area scaled onto the footprint; disabled enforcement
        // gets an effectively unbounded cap.
        let raw_cap = if config.enforce_load_capacity {
            spec.load_capacity_per_area * footprint / 200.0
        } else {
            1e12
        };

        let t = config.edge_support_thickness;
        let (top_surface_area, load_cap) = match shape {
            SupportShape::Full => {
                let surface =
                    (spec.width - 2.0 * edge_reduce_width) * (spec.depth - 2.0 * edge_reduce_depth);
                (surface.max(0.0), raw_cap)
            }
            SupportShape::AllEdges => {
                let surface = 2.0 * t * (spec.width + spec.depth - 2.0 * t);
                (surface, raw_cap * footprint / surface)
            }
            SupportShape::ShortEdges => {
                let surface = 2.0 * t * spec.width.min(spec.depth);
                (surface, raw_cap * footprint / surface)
            }
            SupportShape::LongEdges => {
                let surface = 2.0 * t * spec.width.max(spec.depth);
                (surface, raw_cap * footprint / surface)
            }
            SupportShape::Corners => {
                let surface = 4.0 * t * t;
                (surface, raw_cap * footprint / surface)
            }
        };

        Ok(Self {
            id,
            sequence: spec.sequence,
            width: spec.width,
            depth: spec.depth,
            height: spec.height,
            weight: spec.weight,
            load_cap,
            edge_reduce_width,
            edge_reduce_depth,
            shape,
            top_surface_area,
        })
    }

    /// Footprint area.
    pub fn footprint(&self) -> f64 {
        self.width * self.depth
    }

    /// Volume.
    pub fn volume(&self) -> f64 {
        self.width * self.depth * self.height
    }
}

/// Arena of all items in a run. Items are parsed once and never move; every
/// other structure refers to them by [`ItemId`].
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<Item>,
    /// Shortest width/depth across all items, for anchor pruning.
    pub min_footprint_dim: f64,
    /// Shortest height across all items, for headroom pruning.
    pub min_height: f64,
    /// Total catalog volume.
    pub total_volume: f64,
}

impl Catalog {
    /// Builds the arena from item specs, expanding repetitions.
    pub fn from_specs(specs: &[ItemSpec], config: &PackConfig) -> Result<Self> {
        let mut items = Vec::new();
        let mut min_footprint_dim = f64::MAX;
        let mut min_height = f64::MAX;
        let mut total_volume = 0.0;

        for spec in specs {
            for _ in 0..spec.repetition.max(1) {
                let item = Item::from_spec(items.len(), spec, config)?;
                min_footprint_dim = min_footprint_dim.min(item.width).min(item.depth);
                min_height = min_height.min(item.height);
                total_volume += item.volume();
                items.push(item);
            }
        }

        if items.is_empty() {
            return Err(Error::InvalidItem("empty catalog".to_string()));
        }

        Ok(Self {
            items,
            min_footprint_dim,
            min_height,
            total_volume,
        })
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if no items exist.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The item with the given id.
    pub fn item(&self, id: ItemId) -> &Item {
        &self.items[id]
    }

    /// Iterates over all items.
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }
}

/// Relative placement of one atomic item inside a pack piece.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PieceAtom {
    /// Catalog id.
    pub item: ItemId,
    /// Offset from the piece's front-bottom-left corner.
    pub x: f64,
    /// Offset from the piece's front-bottom-left corner.
    pub y: f64,
    /// Offset from the piece's front-bottom-left corner.
    pub z: f64,
    /// Width inside the piece (children may be pre-rotated).
    pub width: f64,
    /// Depth inside the piece.
    pub depth: f64,
    /// Height inside the piece.
    pub height: f64,
}

/// A placement unit handled by the layer builder: either one atomic item or a
/// super-item aggregating several.
///
/// Invariants for super-items: the bounding box is the union of the atoms,
/// the weight is their sum, and the load capacity is the minimum child
/// capacity adjusted for the weight resting on it.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PackPiece {
    /// Unique piece id. Atomic items use their catalog id; super-items are
    /// numbered from `catalog.len()` upward per batch.
    pub id: usize,
    /// Bounding width.
    pub width: f64,
    /// Bounding depth.
    pub depth: f64,
    /// Bounding height.
    pub height: f64,
    /// Total weight.
    pub weight: f64,
    /// Effective load capacity of the piece's top.
    pub load_cap: f64,
    /// Usable top surface area.
    pub top_surface_area: f64,
    /// Atom layout relative to the piece corner.
    pub atoms: Vec<PieceAtom>,
    /// Number of atoms per vertical level, bottom first.
    pub levels: Vec<usize>,
    /// Number of stacked levels occupied by single items (for the stacking
    /// limit on super-item growth).
    pub stack_count: usize,
}

impl PackPiece {
    /// Wraps a single catalog item.
    pub fn single(item: &Item) -> Self {
        Self {
            id: item.id,
            width: item.width,
            depth: item.depth,
            height: item.height,
            weight: item.weight,
            load_cap: item.load_cap,
            top_surface_area: item.top_surface_area,
            atoms: vec![PieceAtom {
                item: item.id,
                x: 0.0,
                y: 0.0,
                z: 0.0,
                width: item.width,
                depth: item.depth,
                height: item.height,
            }],
            levels: vec![1],
            stack_count: 1,
        }
    }

    /// True if this piece aggregates more than one atom.
    pub fn is_super(&self) -> bool {
        self.atoms.len() > 1
    }

    /// Catalog ids covered by this piece.
    pub fn covers(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.atoms.iter().map(|a| a.item)
    }

    /// True if the two pieces share any atomic item.
    pub fn shares_item(&self, other: &PackPiece) -> bool {
        self.atoms
            .iter()
            .any(|a| other.atoms.iter().any(|b| a.item == b.item))
    }

    /// Bounding footprint area.
    pub fn footprint(&self) -> f64 {
        self.width * self.depth
    }

    /// Dual value of the piece: the item's own dual, or the sum of the
    /// children's duals for a super-item. Items without a dual yet count as
    /// zero.
    pub fn dual(&self, duals: &[f64]) -> f64 {
        self.atoms
            .iter()
            .map(|a| duals.get(a.item).copied().unwrap_or(0.0))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PackConfig {
        PackConfig::default()
            .with_support_shapes(true)
            .with_load_capacity(true)
    }

    #[test]
    fn shape_tags() {
        assert_eq!(SupportShape::from_tag("FULL"), SupportShape::Full);
        assert_eq!(SupportShape::from_tag("ALL_EDGES"), SupportShape::AllEdges);
        assert_eq!(SupportShape::from_tag("SHORT_EDGES"), SupportShape::ShortEdges);
        assert_eq!(SupportShape::from_tag("LONG_EDGES"), SupportShape::LongEdges);
        assert_eq!(SupportShape::from_tag("whatever"), SupportShape::Corners);
    }

    #[test]
    fn catalog_expands_repetitions() {
        let specs = vec![
            ItemSpec::boxed(100.0, 100.0, 50.0, 10.0).with_repetition(3),
            ItemSpec::boxed(60.0, 40.0, 30.0, 5.0),
        ];
        let catalog = Catalog::from_specs(&specs, &config()).unwrap();
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.item(2).width, 100.0);
        assert_eq!(catalog.item(3).width, 60.0);
        assert!((catalog.min_footprint_dim - 40.0).abs() < 1e-9);
        assert!((catalog.min_height - 30.0).abs() < 1e-9);
    }

    #[test]
    fn full_support_keeps_raw_capacity() {
        let specs = vec![ItemSpec::boxed(100.0, 100.0, 50.0, 10.0).with_load_capacity(200.0)];
        let catalog = Catalog::from_specs(&specs, &config()).unwrap();
        let item = catalog.item(0);
        // per_area * footprint / 200
        assert!((item.load_cap - 10_000.0).abs() < 1e-9);
        assert!((item.top_surface_area - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn corner_support_scales_capacity_up() {
        let specs = vec![ItemSpec::boxed(100.0, 100.0, 50.0, 10.0)
            .with_load_capacity(200.0)
            .with_shape(SupportShape::Corners)];
        let catalog = Catalog::from_specs(&specs, &config()).unwrap();
        let item = catalog.item(0);
        let t = config().edge_support_thickness;
        assert!((item.top_surface_area - 4.0 * t * t).abs() < 1e-9);
        let expected = 10_000.0 * 10_000.0 / (4.0 * t * t);
        assert!((item.load_cap - expected).abs() < 1e-6);
    }

    #[test]
    fn shapes_disabled_forces_full(){
        let cfg = PackConfig::default().with_support_shapes(false);
        let specs = vec![ItemSpec::boxed(100.0, 100.0, 50.0, 10.0)
            .with_shape(SupportShape::Corners)];
        let catalog = Catalog::from_specs(&specs, &cfg).unwrap();
        assert_eq!(catalog.item(0).shape, SupportShape::Full);
    }

    #[test]
    fn rejects_degenerate_item() {
        let specs = vec![ItemSpec::boxed(0.0, 100.0, 50.0, 10.0)];
        assert!(Catalog::from_specs(&specs, &config()).is_err());
    }

    #[test]
    fn piece_identity_sharing() {
        let specs = vec![
            ItemSpec::boxed(100.0, 100.0, 50.0, 10.0),
            ItemSpec::boxed(60.0, 40.0, 30.0, 5.0),
        ];
        let catalog = Catalog::from_specs(&specs, &config()).unwrap();
        let a = PackPiece::single(catalog.item(0));
        let b = PackPiece::single(catalog.item(1));
        assert!(!a.shares_item(&b));
        assert!(a.shares_item(&a.clone()));
        assert!(!a.is_super());
    }

    #[test]
    fn piece_dual_sums_children() {
        let specs = vec![
            ItemSpec::boxed(100.0, 100.0, 50.0, 10.0),
            ItemSpec::boxed(60.0, 40.0, 30.0, 5.0),
        ];
        let catalog = Catalog::from_specs(&specs, &config()).unwrap();
        let piece = PackPiece::single(catalog.item(1));
        assert!((piece.dual(&[7.0, 3.0]) - 3.0).abs() < 1e-12);
    }
}
