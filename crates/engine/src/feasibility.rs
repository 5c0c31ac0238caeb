//! Placement feasibility: overlap, support and load propagation.
//!
//! A candidate passes through the checks in a fixed order: bin weight cap,
//! 3D separating-axis overlap against every placed box, then (above the
//! floor) support gathering, the corner/area support rule, and load
//! propagation. Every rejection increments exactly one counter. A successful
//! check returns the support-delta transaction to commit; nothing shared is
//! touched until then.

use crate::bin::PlacedBox;
use crate::item::Catalog;
use crate::layer::LayerAtom;
use crate::overlap::{support_overlap, Rect2};
use crate::support::{SupportLedger, SupportUpdate};
use palletizer_core::{ItemId, PackConfig, RejectionCounters};

const EPS: f64 = 1e-9;

/// A concrete placement candidate in bin coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    /// Catalog id of the item.
    pub item: ItemId,
    /// X coordinate of the front-bottom-left corner.
    pub x: f64,
    /// Y coordinate of the front-bottom-left corner.
    pub y: f64,
    /// Z coordinate of the front-bottom-left corner.
    pub z: f64,
    /// Placed width.
    pub width: f64,
    /// Placed depth.
    pub depth: f64,
    /// Placed height.
    pub height: f64,
    /// Item weight.
    pub weight: f64,
}

/// The four corner-alignment variants of an anchor: which corner of the
/// item's footprint coincides with the anchor point.
pub const CORNERS: [u8; 4] = [3, 2, 1, 0];

/// Translates an anchor into the front-bottom-left corner for a corner
/// variant, or `None` if the box would leave the bin.
pub fn corner_origin(
    anchor_x: f64,
    anchor_y: f64,
    corner: u8,
    width: f64,
    depth: f64,
    config: &PackConfig,
) -> Option<(f64, f64)> {
    let (x, y) = match corner {
        0 => (anchor_x, anchor_y),
        1 => (anchor_x, anchor_y - depth),
        2 => (anchor_x - width, anchor_y),
        _ => (anchor_x - width, anchor_y - depth),
    };
    if x < -EPS || y < -EPS {
        return None;
    }
    if x + width > config.bin_width + EPS || y + depth > config.bin_depth + EPS {
        return None;
    }
    Some((x, y))
}

fn boxes_overlap(c: &Candidate, b: &PlacedBox) -> bool {
    let separated = c.x + c.width <= b.position.x + EPS
        || c.y + c.depth <= b.position.y + EPS
        || c.z + c.height <= b.position.z + EPS
        || c.x >= b.position.x + b.dimensions.x - EPS
        || c.y >= b.position.y + b.dimensions.y - EPS
        || c.z >= b.position.z + b.dimensions.z - EPS;
    !separated
}

/// Corner coverage flags of the candidate footprint against one supporter
/// rectangle. Order: front-left, back-left, front-right, back-right.
fn cover_corners(flags: &mut [bool; 4], cand_x: f64, cand_y: f64, w: f64, d: f64, sup: &Rect2) {
    let inside = |px: f64, py: f64| {
        px >= sup.x - EPS
            && px <= sup.x + sup.w + EPS
            && py >= sup.y - EPS
            && py <= sup.y + sup.d + EPS
    };
    if inside(cand_x, cand_y) {
        flags[0] = true;
    }
    if inside(cand_x, cand_y + d) {
        flags[1] = true;
    }
    if inside(cand_x + w, cand_y) {
        flags[2] = true;
    }
    if inside(cand_x + w, cand_y + d) {
        flags[3] = true;
    }
}

/// Applies the support rule to gathered overlap. Returns `false` and counts
/// the rejection when the candidate is insufficiently supported.
fn support_rule(
    total_overlap: f64,
    corners: &[bool; 4],
    footprint: f64,
    config: &PackConfig,
    counters: &mut RejectionCounters,
) -> bool {
    let pct = 100.0 * total_overlap / footprint;
    if !corners.iter().all(|&c| c) {
        if pct < config.min_support_pct {
            counters.area_support += 1;
            return false;
        }
    } else {
        // All four corners rest on something: the area requirement relaxes
        // to the fixed minimal edge-zone ratio.
        let t = config.edge_support_thickness;
        if pct < 100.0 * (4.0 * t * t) / footprint {
            counters.corner_support += 1;
            return false;
        }
    }
    true
}

/// Checks a candidate against a bin's current contents.
///
/// Returns the support transaction on success. The caller commits it to the
/// ledger once the placement is actually taken.
pub fn check_candidate(
    boxes: &[PlacedBox],
    bin_weight: f64,
    catalog: &Catalog,
    ledger: &SupportLedger,
    config: &PackConfig,
    cand: &Candidate,
    counters: &mut RejectionCounters,
) -> Option<SupportUpdate> {
    // Weight cap first: cheapest check, and by contract it fires before any
    // geometry is evaluated.
    if let Some(cap) = config.max_bin_weight {
        if bin_weight + cand.weight > cap {
            counters.bin_weight += 1;
            return None;
        }
    }

    for placed in boxes {
        if boxes_overlap(cand, placed) {
            counters.geometric += 1;
            return None;
        }
    }

    // On the floor the overlap test alone decides.
    if cand.z <= EPS {
        return Some(SupportUpdate::floor(cand.item));
    }

    let tol = config.layer_height_tolerance;
    let mut corners = [false; 4];
    let mut supports: Vec<(ItemId, f64)> = Vec::new();
    let mut total_overlap = 0.0;
    let top_rect = Rect2::new(cand.x, cand.y, cand.width, cand.depth);

    for placed in boxes {
        let top = placed.position.z + placed.dimensions.z;
        if cand.z < top - EPS || cand.z - top > tol {
            continue;
        }
        let below = catalog.item(placed.item);
        let bottom_rect = Rect2::new(
            placed.position.x,
            placed.position.y,
            placed.dimensions.x,
            placed.dimensions.y,
        );
        let overlap = support_overlap(
            &bottom_rect,
            &top_rect,
            below.shape,
            below.edge_reduce_width,
            below.edge_reduce_depth,
            config.edge_support_thickness,
        );
        if overlap <= 0.0 {
            continue;
        }
        cover_corners(
            &mut corners,
            cand.x,
            cand.y,
            cand.width,
            cand.depth,
            &bottom_rect,
        );
        total_overlap += overlap;
        supports.push((placed.item, overlap));
    }

    if config.enforce_vertical_support
        && !support_rule(
            total_overlap,
            &corners,
            cand.width * cand.depth,
            config,
            counters,
        )
    {
        return None;
    }

    if supports.is_empty() {
        // Nothing to distribute weight onto; with support enforcement off
        // this is a legal floating placement.
        return Some(SupportUpdate::floor(cand.item));
    }

    match ledger.propagate(catalog, cand.item, cand.weight, &supports) {
        Some(update) => Some(update),
        None => {
            counters.load_capacity += 1;
            None
        }
    }
}

/// Checks a whole layer against a bin's current top surface.
///
/// Structurally the same rules as [`check_candidate`] steps 4-6, applied to
/// every atom: atoms at the layer floor rest on bin boxes whose tops reach
/// the bin height within the tolerance; stacked atoms rest on their layer
/// neighbors below. Returns the transactions for all atoms, in the order
/// they must be committed, or `None` if any atom fails.
pub fn check_layer(
    boxes: &[PlacedBox],
    bin_height: f64,
    atoms: &[LayerAtom],
    catalog: &Catalog,
    ledger: &SupportLedger,
    config: &PackConfig,
    counters: &mut RejectionCounters,
) -> Option<Vec<SupportUpdate>> {
    let tol = config.layer_height_tolerance;
    let mut scratch = ledger.clone();
    let mut updates = Vec::with_capacity(atoms.len());

    for (idx, atom) in atoms.iter().enumerate().rev() {
        let mut corners = [false; 4];
        let mut supports: Vec<(ItemId, f64)> = Vec::new();
        let mut total_overlap = 0.0;
        let top_rect = Rect2::new(atom.x, atom.y, atom.width, atom.depth);

        if atom.z <= EPS {
            // Resting on the bin's current top surface.
            for placed in boxes {
                let top = placed.position.z + placed.dimensions.z;
                if bin_height - top > tol {
                    continue;
                }
                let below = catalog.item(placed.item);
                let bottom_rect = Rect2::new(
                    placed.position.x,
                    placed.position.y,
                    placed.dimensions.x,
                    placed.dimensions.y,
                );
                let overlap = support_overlap(
                    &bottom_rect,
                    &top_rect,
                    below.shape,
                    below.edge_reduce_width,
                    below.edge_reduce_depth,
                    config.edge_support_thickness,
                );
                if overlap <= 0.0 {
                    continue;
                }
                cover_corners(
                    &mut corners,
                    atom.x,
                    atom.y,
                    atom.width,
                    atom.depth,
                    &bottom_rect,
                );
                total_overlap += overlap;
                supports.push((placed.item, overlap));
            }
        } else {
            // Resting on layer neighbors below (super-item stacks).
            for other in atoms.iter().take(idx) {
                if atom.z - (other.z + other.height) > tol
                    || atom.z < other.z + other.height - EPS
                {
                    continue;
                }
                let below = catalog.item(other.item);
                let bottom_rect = Rect2::new(other.x, other.y, other.width, other.depth);
                let overlap = support_overlap(
                    &bottom_rect,
                    &top_rect,
                    below.shape,
                    below.edge_reduce_width,
                    below.edge_reduce_depth,
                    config.edge_support_thickness,
                );
                if overlap <= 0.0 {
                    continue;
                }
                cover_corners(
                    &mut corners,
                    atom.x,
                    atom.y,
                    atom.width,
                    atom.depth,
                    &bottom_rect,
                );
                total_overlap += overlap;
                supports.push((other.item, overlap));
            }
        }

        if config.enforce_vertical_support
            && !support_rule(
                total_overlap,
                &corners,
                atom.width * atom.depth,
                config,
                counters,
            )
        {
            return None;
        }

        let weight = catalog.item(atom.item).weight;
        let update = if supports.is_empty() {
            SupportUpdate::floor(atom.item)
        } else {
            match scratch.propagate(catalog, atom.item, weight, &supports) {
                Some(update) => update,
                None => {
                    counters.load_capacity += 1;
                    return None;
                }
            }
        };
        // Make this atom's edges visible to the atoms checked after it.
        update.clone().commit(&mut scratch);
        updates.push(update);
    }

    Some(updates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bin::PlacedBox;
    use crate::item::ItemSpec;
    use nalgebra::{Point3, Vector3};

    fn catalog() -> Catalog {
        let specs = vec![
            ItemSpec::boxed(100.0, 100.0, 50.0, 10.0).with_load_capacity(2000.0),
            ItemSpec::boxed(100.0, 100.0, 50.0, 10.0).with_load_capacity(2000.0),
            ItemSpec::boxed(100.0, 100.0, 50.0, 10.0).with_load_capacity(2000.0),
        ];
        Catalog::from_specs(&specs, &config()).unwrap()
    }

    fn config() -> PackConfig {
        PackConfig::default()
            .with_bin(600.0, 800.0, 2200.0)
            .with_min_support_pct(60.0)
    }

    fn placed(item: usize, x: f64, y: f64, z: f64) -> PlacedBox {
        PlacedBox {
            item,
            position: Point3::new(x, y, z),
            dimensions: Vector3::new(100.0, 100.0, 50.0),
        }
    }

    fn candidate(item: usize, x: f64, y: f64, z: f64) -> Candidate {
        Candidate {
            item,
            x,
            y,
            z,
            width: 100.0,
            depth: 100.0,
            height: 50.0,
            weight: 10.0,
        }
    }

    #[test]
    fn aligned_stack_is_accepted_with_full_cover() {
        let catalog = catalog();
        let ledger = SupportLedger::new(3);
        let mut counters = RejectionCounters::default();
        let boxes = vec![placed(0, 0.0, 0.0, 0.0)];

        let update = check_candidate(
            &boxes,
            10.0,
            &catalog,
            &ledger,
            &config(),
            &candidate(1, 0.0, 0.0, 50.0),
            &mut counters,
        );
        assert!(update.is_some());
        assert_eq!(counters.total(), 0);
    }

    #[test]
    fn offset_below_threshold_is_rejected() {
        let catalog = catalog();
        let ledger = SupportLedger::new(3);
        let mut counters = RejectionCounters::default();
        let boxes = vec![placed(0, 0.0, 0.0, 0.0)];

        // Offset 60 in x: overlap 4000 of 10000 = 40% < 60%.
        let update = check_candidate(
            &boxes,
            10.0,
            &catalog,
            &ledger,
            &config(),
            &candidate(1, 60.0, 0.0, 50.0),
            &mut counters,
        );
        assert!(update.is_none());
        assert_eq!(counters.area_support, 1);
    }

    #[test]
    fn weight_cap_fires_before_geometry() {
        let catalog = catalog();
        let ledger = SupportLedger::new(3);
        let mut counters = RejectionCounters::default();
        let config = config().with_max_bin_weight(Some(100.0));
        // The candidate also overlaps an existing box, but the weight check
        // must reject first: one unit over the cap.
        let boxes = vec![placed(0, 0.0, 0.0, 0.0)];
        let update = check_candidate(
            &boxes,
            91.0,
            &catalog,
            &ledger,
            &config,
            &candidate(1, 0.0, 0.0, 0.0),
            &mut counters,
        );
        assert!(update.is_none());
        assert_eq!(counters.bin_weight, 1);
        assert_eq!(counters.geometric, 0);
    }

    #[test]
    fn overlap_is_rejected_on_the_floor() {
        let catalog = catalog();
        let ledger = SupportLedger::new(3);
        let mut counters = RejectionCounters::default();
        let boxes = vec![placed(0, 0.0, 0.0, 0.0)];
        let update = check_candidate(
            &boxes,
            10.0,
            &catalog,
            &ledger,
            &config(),
            &candidate(1, 50.0, 50.0, 0.0),
            &mut counters,
        );
        assert!(update.is_none());
        assert_eq!(counters.geometric, 1);
    }

    #[test]
    fn floor_placement_skips_support_checks() {
        let catalog = catalog();
        let ledger = SupportLedger::new(3);
        let mut counters = RejectionCounters::default();
        let update = check_candidate(
            &[],
            0.0,
            &catalog,
            &ledger,
            &config(),
            &candidate(0, 0.0, 0.0, 0.0),
            &mut counters,
        );
        assert!(update.is_some());
    }

    #[test]
    fn load_capacity_overflow_is_counted() {
        let specs = vec![
            // Bottom item can carry 5 at most.
            ItemSpec::boxed(100.0, 100.0, 50.0, 10.0).with_load_capacity(0.1),
            ItemSpec::boxed(100.0, 100.0, 50.0, 10.0).with_load_capacity(2000.0),
        ];
        let catalog = Catalog::from_specs(&specs, &config()).unwrap();
        let ledger = SupportLedger::new(2);
        let mut counters = RejectionCounters::default();
        let boxes = vec![placed(0, 0.0, 0.0, 0.0)];
        let update = check_candidate(
            &boxes,
            10.0,
            &catalog,
            &ledger,
            &config(),
            &candidate(1, 0.0, 0.0, 50.0),
            &mut counters,
        );
        assert!(update.is_none());
        assert_eq!(counters.load_capacity, 1);
    }

    #[test]
    fn corner_origin_bounds() {
        let config = config();
        // Corner 0 at the far wall: out of bounds.
        assert!(corner_origin(600.0, 0.0, 0, 100.0, 100.0, &config).is_none());
        // Corner 2 shifts left of the anchor.
        let (x, y) = corner_origin(600.0, 0.0, 2, 100.0, 100.0, &config).unwrap();
        assert_eq!((x, y), (500.0, 0.0));
        // Corner 1 would go below the front wall.
        assert!(corner_origin(0.0, 50.0, 1, 100.0, 100.0, &config).is_none());
    }

    #[test]
    fn rotation_is_an_independent_candidate() {
        // A 100x40 slot on top: the unrotated 40x100 candidate fails the
        // support rule, the rotated one passes.
        let specs = vec![
            ItemSpec::boxed(100.0, 40.0, 50.0, 10.0).with_load_capacity(2000.0),
            ItemSpec::boxed(40.0, 100.0, 50.0, 5.0).with_load_capacity(2000.0),
        ];
        let catalog = Catalog::from_specs(&specs, &config()).unwrap();
        let ledger = SupportLedger::new(2);
        let mut counters = RejectionCounters::default();
        let boxes = vec![PlacedBox {
            item: 0,
            position: Point3::new(0.0, 0.0, 0.0),
            dimensions: Vector3::new(100.0, 40.0, 50.0),
        }];

        let unrotated = Candidate {
            item: 1,
            x: 0.0,
            y: 0.0,
            z: 50.0,
            width: 40.0,
            depth: 100.0,
            height: 50.0,
            weight: 5.0,
        };
        assert!(check_candidate(
            &boxes,
            10.0,
            &catalog,
            &ledger,
            &config(),
            &unrotated,
            &mut counters
        )
        .is_none());

        let rotated = Candidate {
            width: 100.0,
            depth: 40.0,
            ..unrotated
        };
        assert!(check_candidate(
            &boxes,
            10.0,
            &catalog,
            &ledger,
            &config(),
            &rotated,
            &mut counters
        )
        .is_some());
    }

    #[test]
    fn layer_on_matching_surface_is_accepted() {
        let catalog = catalog();
        let ledger = SupportLedger::new(3);
        let mut counters = RejectionCounters::default();
        // Bin top surface: two boxes at z=0..50 next to each other.
        let boxes = vec![placed(0, 0.0, 0.0, 0.0), placed(1, 100.0, 0.0, 0.0)];
        let atoms = vec![LayerAtom {
            item: 2,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            width: 100.0,
            depth: 100.0,
            height: 50.0,
        }];
        let updates = check_layer(
            &boxes,
            50.0,
            &atoms,
            &catalog,
            &ledger,
            &config(),
            &mut counters,
        );
        assert!(updates.is_some());
        assert_eq!(updates.unwrap().len(), 1);
    }

    #[test]
    fn layer_with_unsupported_atom_fails() {
        let catalog = catalog();
        let ledger = SupportLedger::new(3);
        let mut counters = RejectionCounters::default();
        let boxes = vec![placed(0, 0.0, 0.0, 0.0)];
        // Atom hanging far from the supported area.
        let atoms = vec![LayerAtom {
            item: 2,
            x: 300.0,
            y: 300.0,
            z: 0.0,
            width: 100.0,
            depth: 100.0,
            height: 50.0,
        }];
        let updates = check_layer(
            &boxes,
            50.0,
            &atoms,
            &catalog,
            &ledger,
            &config(),
            &mut counters,
        );
        assert!(updates.is_none());
        assert_eq!(counters.area_support, 1);
    }
}
