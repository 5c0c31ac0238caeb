//! Super-item generation and height grouping.
//!
//! Super-items fuse several atomic items into one placement unit so layers
//! pack denser: side-by-side pairs with matching depth edges, and vertical
//! stacks of an item (or an existing super-item) carrying a slightly larger
//! item on top. Groups collect pieces of near-equal height for the 2D layer
//! builder.

use crate::item::{Catalog, Item, PackPiece, PieceAtom};
use palletizer_core::{ItemId, PackConfig};

/// Orders items tallest first, ties broken by width then depth.
fn desc_height(a: &Item, b: &Item) -> std::cmp::Ordering {
    b.height
        .partial_cmp(&a.height)
        .unwrap_or(std::cmp::Ordering::Equal)
        .then(b.width.partial_cmp(&a.width).unwrap_or(std::cmp::Ordering::Equal))
        .then(b.depth.partial_cmp(&a.depth).unwrap_or(std::cmp::Ordering::Equal))
}

/// Fuses two items side by side along the x axis. `w1`/`d1` and `w2`/`d2`
/// carry the (possibly rotated) dimensions to use.
fn fuse_pair(
    left: &Item,
    right: &Item,
    w1: f64,
    d1: f64,
    w2: f64,
    d2: f64,
) -> PackPiece {
    PackPiece {
        id: 0, // assigned later
        width: w1 + w2,
        depth: d1.max(d2),
        height: left.height.max(right.height),
        weight: left.weight + right.weight,
        load_cap: left.load_cap + right.load_cap,
        top_surface_area: left.top_surface_area + right.top_surface_area,
        atoms: vec![
            PieceAtom {
                item: left.id,
                x: 0.0,
                y: 0.0,
                z: 0.0,
                width: w1,
                depth: d1,
                height: left.height,
            },
            PieceAtom {
                item: right.id,
                x: w1,
                y: 0.0,
                z: 0.0,
                width: w2,
                depth: d2,
                height: right.height,
            },
        ],
        levels: vec![2],
        stack_count: 1,
    }
}

/// Stacks `top` onto `base`, centering the base under the (slightly larger)
/// top footprint.
fn stack_on(base: &PackPiece, top: &Item) -> PackPiece {
    let mut atoms = base.atoms.clone();
    // Re-center the existing atoms when the base is a single item narrower
    // than the top; multi-atom bases keep their layout.
    if base.atoms.len() == 1 {
        let dx = (top.width - base.width) / 2.0;
        let dy = (top.depth - base.depth) / 2.0;
        atoms[0].x += dx;
        atoms[0].y += dy;
    }
    atoms.push(PieceAtom {
        item: top.id,
        x: 0.0,
        y: 0.0,
        z: base.height,
        width: top.width,
        depth: top.depth,
        height: top.height,
    });
    let mut levels = base.levels.clone();
    levels.push(1);

    PackPiece {
        id: 0,
        width: top.width,
        depth: top.depth,
        height: base.height + top.height,
        weight: base.weight + top.weight,
        // The stack carries what the weakest link allows: the top's own cap,
        // or whatever the base can still take under the top's weight.
        load_cap: top.load_cap.min(base.load_cap - top.weight),
        top_surface_area: top.top_surface_area,
        atoms,
        levels,
        stack_count: base.stack_count + 1,
    }
}

/// Generates the super-items for one batch.
pub fn generate_super_items(
    batch: &[ItemId],
    catalog: &Catalog,
    config: &PackConfig,
) -> Vec<PackPiece> {
    let mut supers: Vec<PackPiece> = Vec::new();
    if batch.len() < 2 {
        return supers;
    }

    let tol = config.layer_height_tolerance;
    let min_ratio = config.min_edge_ratio;

    // Side-by-side pairs, matching depth edges; each partner may be rotated.
    let mut items: Vec<&Item> = batch.iter().map(|&id| catalog.item(id)).collect();
    for i in 0..items.len() - 1 {
        let a = items[i];
        if i > 0 && a.width == items[i - 1].width && a.depth == items[i - 1].depth {
            continue;
        }
        for j in i + 1..items.len() {
            let b = items[j];
            if j > i + 1 && b.width == items[j - 1].width && b.depth == items[j - 1].depth {
                continue;
            }

            let variants: [(f64, f64, f64, f64); 3] = [
                (a.width, a.depth, b.width, b.depth),
                (a.depth, a.width, b.width, b.depth),
                (a.width, a.depth, b.depth, b.width),
            ];
            for (w1, d1, w2, d2) in variants {
                let edge_ratio = d1.min(d2) / d1.max(d2);
                if edge_ratio >= min_ratio && (a.height - b.height).abs() <= tol {
                    supers.push(fuse_pair(a, b, w1, d1, w2, d2));
                }
            }
        }
    }

    // Vertical stacks: a larger-area item below, a same-or-slightly-larger
    // footprint on top, within the width/depth tolerances and the load cap.
    items.sort_by(|a, b| {
        (b.width * b.depth)
            .partial_cmp(&(a.width * a.depth))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let width_slack = 1.0 + (1.0 - config.super_item_width_tolerance);
    let depth_slack = 1.0 + (1.0 - config.super_item_depth_tolerance);

    for i in 0..items.len() - 1 {
        let bottom = items[i];
        if i > 0 && bottom.width == items[i - 1].width && bottom.depth == items[i - 1].depth {
            continue;
        }
        for j in i + 1..items.len() {
            let top = items[j];
            if j > i + 1 && top.width == items[j - 1].width && top.depth == items[j - 1].depth {
                continue;
            }
            if top.id == bottom.id {
                continue;
            }
            if top.width < bottom.width || top.width > bottom.width * width_slack {
                continue;
            }
            if top.depth < bottom.depth || top.depth > bottom.depth * depth_slack {
                continue;
            }
            if top.height + bottom.height > config.max_super_item_height {
                continue;
            }
            if top.weight > bottom.load_cap {
                continue;
            }
            supers.push(stack_on(&PackPiece::single(bottom), top));
        }
    }

    // Grow stacks by putting one more item on existing super-items.
    items.sort_by(|a, b| desc_height(a, b));
    let mut grown = Vec::new();
    for base in &supers {
        if base.stack_count >= config.max_super_item_stack {
            continue;
        }
        for &top in &items {
            if base.atoms.iter().any(|atom| atom.item == top.id) {
                continue;
            }
            if top.width < base.width || top.depth < base.depth {
                continue;
            }
            if top.height + base.height > config.max_super_item_height {
                continue;
            }
            if top.width > width_slack * base.width || top.depth > depth_slack * base.depth {
                continue;
            }
            if top.weight > base.load_cap {
                continue;
            }
            grown.push(stack_on(base, top));
        }
    }
    supers.extend(grown);

    // Pieces that never grew past one level carry no density benefit.
    supers.retain(|s| s.levels.len() > 1 || s.levels.first().copied().unwrap_or(0) > 1);

    // Number super-items after the catalog, tallest first.
    supers.sort_by(|a, b| {
        b.height
            .partial_cmp(&a.height)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for (k, piece) in supers.iter_mut().enumerate() {
        piece.id = catalog.len() + k;
    }

    supers
}

/// Groups batch items and super-items by height for the layer builder.
///
/// A group is anchored at a distinct height and collects every piece whose
/// height fits within the layer tolerance below the anchor. Groups must have
/// more than two members, cover at least 60% of the bin footprint, and are
/// pruned of members whose load capacity falls under 90% of the group
/// average.
pub fn group_pieces(
    batch: &[ItemId],
    supers: &[PackPiece],
    catalog: &Catalog,
    config: &PackConfig,
) -> Vec<Vec<PackPiece>> {
    let tol = config.layer_height_tolerance;
    let mut anchors: Vec<f64> = Vec::new();
    let mut push_anchor = |h: f64, anchors: &mut Vec<f64>| {
        if !anchors.iter().any(|&a| (a - h).abs() < 1e-9) {
            anchors.push(h);
        }
    };
    for &id in batch {
        push_anchor(catalog.item(id).height, &mut anchors);
    }
    for piece in supers {
        push_anchor(piece.height, &mut anchors);
    }

    let bin_area = config.bin_footprint();
    let mut groups = Vec::new();

    for &anchor in &anchors {
        let mut members: Vec<PackPiece> = Vec::new();
        let mut total_area = 0.0;

        for &id in batch {
            let item = catalog.item(id);
            if anchor >= item.height && anchor - item.height <= tol {
                total_area += item.top_surface_area;
                members.push(PackPiece::single(item));
            }
        }
        for piece in supers {
            if anchor >= piece.height && anchor - piece.height <= tol {
                total_area += piece.top_surface_area;
                members.push(piece.clone());
            }
        }

        if members.len() <= 2 || total_area * 100.0 / bin_area < 60.0 {
            continue;
        }

        // Load-capacity homogeneity: drop members far below the average so a
        // layer does not mix crushable and sturdy tops.
        let avg_cap: f64 =
            members.iter().map(|m| m.load_cap).sum::<f64>() / members.len() as f64;
        members.retain(|m| m.load_cap >= 0.9 * avg_cap);

        if members.len() > 2 {
            groups.push(members);
        }
    }

    groups
}
