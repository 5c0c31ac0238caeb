//! Bins and the bottom-up assembler.
//!
//! A bin accumulates committed layers from the bottom up, then leftovers
//! placed one by one at extreme-point anchors. Layer stacking is gated by
//! weight and the layer-level support check; a bin seals once its stacked
//! height exceeds the target fill height.

use crate::extreme_point::ExtremePointSet;
use crate::feasibility::{check_candidate, check_layer, corner_origin, Candidate, CORNERS};
use crate::item::Catalog;
use crate::layer::{dedup_layers, Layer, LayerAtom};
use crate::overlap::{support_overlap, Rect2};
use crate::spacing::{maximize_support, spread_layer};
use crate::support::SupportLedger;
use nalgebra::{Point3, Vector3};
use palletizer_core::{
    BinManifest, ItemId, LpOracle, PackConfig, Placement, PlacementStrategy, RejectionCounters,
};

const EPS: f64 = 1e-9;

/// A box committed to a bin, in bin-local coordinates.
#[derive(Debug, Clone)]
pub struct PlacedBox {
    /// Catalog id.
    pub item: ItemId,
    /// Front-bottom-left corner.
    pub position: Point3<f64>,
    /// Extents after orientation.
    pub dimensions: Vector3<f64>,
}

impl PlacedBox {
    /// Top face height.
    pub fn top(&self) -> f64 {
        self.position.z + self.dimensions.z
    }
}

/// One bin under construction.
#[derive(Debug, Clone)]
pub struct Bin {
    /// Committed boxes.
    pub boxes: Vec<PlacedBox>,
    /// Live anchor set.
    pub eps: ExtremePointSet,
    /// Stacked height (top of the highest committed box or layer).
    pub height: f64,
    /// Height of the layered region; anchors below it die once an item
    /// lands above.
    pub layer_top: f64,
    /// Total item weight.
    pub weight: f64,
    /// Number of committed layers.
    pub layer_count: usize,
    /// The most recent committed layer in layer-local coordinates, kept for
    /// support maximization of the next layer.
    top_layer: Option<(Vec<LayerAtom>, f64)>,
}

impl Bin {
    /// Creates an empty bin.
    pub fn new(config: &PackConfig, catalog: &Catalog) -> Self {
        Self {
            boxes: Vec::new(),
            eps: ExtremePointSet::new(
                config.bin_width,
                config.bin_depth,
                config.bin_height,
                config.ep_stride,
                catalog.min_footprint_dim,
                catalog.min_height,
            ),
            height: 0.0,
            layer_top: 0.0,
            weight: 0.0,
            layer_count: 0,
            top_layer: None,
        }
    }

    /// Seeds anchor coverage of the current top surface and pins the layered
    /// region height.
    pub fn seed_anchors(&mut self) {
        self.eps.seed_surface(self.height);
        self.layer_top = self.height;
    }

    /// The last committed layer, if any: layer-local atoms and layer height.
    pub fn top_layer(&self) -> Option<&(Vec<LayerAtom>, f64)> {
        self.top_layer.as_ref()
    }

    fn push_box(&mut self, item: ItemId, x: f64, y: f64, z: f64, w: f64, d: f64, h: f64) {
        self.boxes.push(PlacedBox {
            item,
            position: Point3::new(x, y, z),
            dimensions: Vector3::new(w, d, h),
        });
        self.eps.insert_box(x, y, z, w, d, h);
    }

    /// Inserts a leftover item at an anchor, tracking weight and height.
    pub fn insert_at_anchor(&mut self, catalog: &Catalog, cand: &Candidate) {
        self.push_box(
            cand.item,
            cand.x,
            cand.y,
            cand.z,
            cand.width,
            cand.depth,
            cand.height,
        );
        if cand.z + cand.height > self.height {
            self.height = cand.z + cand.height;
        }
        self.weight += catalog.item(cand.item).weight;
    }

    /// Unpacks a committed layer into the bin at the current height.
    ///
    /// For the very first layer the intra-layer support edges of super-item
    /// stacks are registered in the ledger with normalized percentages; upper
    /// layers have already been through the layer-level check which commits
    /// the same information.
    pub fn unpack_layer(
        &mut self,
        layer: &Layer,
        catalog: &Catalog,
        ledger: &mut SupportLedger,
        config: &PackConfig,
    ) {
        let atoms = layer.unpack();
        let base = self.height;

        for atom in &atoms {
            self.push_box(
                atom.item,
                atom.x,
                atom.y,
                base + atom.z,
                atom.width,
                atom.depth,
                atom.height,
            );
        }

        if base <= EPS {
            // Bottom layer: register who supports the stacked atoms.
            for atom in &atoms {
                if atom.z <= EPS {
                    continue;
                }
                let top_rect = Rect2::new(atom.x, atom.y, atom.width, atom.depth);
                let mut supports: Vec<(ItemId, f64)> = Vec::new();
                for other in &atoms {
                    if other.item == atom.item {
                        continue;
                    }
                    let below = catalog.item(other.item);
                    let overlap = support_overlap(
                        &Rect2::new(other.x, other.y, other.width, other.depth),
                        &top_rect,
                        below.shape,
                        below.edge_reduce_width,
                        below.edge_reduce_depth,
                        config.edge_support_thickness,
                    );
                    if overlap > 0.0 {
                        supports.push((other.item, overlap));
                    }
                }
                let total: f64 = supports.iter().map(|(_, a)| a).sum();
                if total > 0.0 {
                    let shares = supports
                        .into_iter()
                        .map(|(id, area)| (id, area / total))
                        .collect();
                    ledger.set_supporters(atom.item, shares);
                }
            }
        }

        self.top_layer = Some((atoms, layer.height));
        self.layer_count += 1;
    }

    /// Exports the bin as a manifest.
    pub fn manifest(&self) -> BinManifest {
        BinManifest {
            placements: self
                .boxes
                .iter()
                .map(|b| {
                    Placement::new(
                        b.item,
                        b.position.x,
                        b.position.y,
                        b.position.z,
                        b.dimensions.x,
                        b.dimensions.y,
                        b.dimensions.z,
                    )
                })
                .collect(),
            layer_count: self.layer_count,
            height: self.height,
            weight: self.weight,
        }
    }
}

/// Marks every item a layer covers.
fn mark_covered(layer: &Layer, covered: &mut [bool]) {
    for id in layer.covered_items() {
        covered[id] = true;
    }
}

/// Merit of an anchor/item pairing: strongly prefers low placements, then
/// front placements, then left placements. Kept selectable next to the
/// default greedy rule.
fn merit(cand: &Candidate, config: &PackConfig) -> f64 {
    let h_span = (config.bin_height - cand.height).max(EPS);
    let d_span = (config.bin_depth - cand.depth).max(EPS);
    let w_span = (config.bin_width - cand.width).max(EPS);
    1e8 * (1.0 + (config.bin_height - (cand.z + cand.height)) / h_span)
        + 100.0 * (1.0 + (config.bin_depth - (cand.y + cand.depth)) / d_span)
        + 10.0 * (1.0 + (config.bin_width - (cand.x + cand.width)) / w_span)
}

/// Outcome of one assembly pass over a batch.
#[derive(Debug, Default)]
pub struct Assembly {
    /// Bins produced by this pass, possibly including empty ones.
    pub bins: Vec<Bin>,
    /// Items placed through the leftover path.
    pub leftover_placed: usize,
    /// Batch items still uncovered after the pass.
    pub uncovered: Vec<ItemId>,
}

/// Stacks selected layers into bins bottom-up and places leftovers.
#[allow(clippy::too_many_arguments)]
pub fn construct_bins(
    mut layers: Vec<Layer>,
    batch: &[ItemId],
    catalog: &Catalog,
    ledger: &mut SupportLedger,
    covered: &mut [bool],
    config: &PackConfig,
    oracle: &dyn LpOracle,
    counters: &mut RejectionCounters,
) -> Assembly {
    let bin_volume = config.bin_width * config.bin_depth * config.bin_height;
    let open_count = if config.preserve_sequence {
        1
    } else {
        (catalog.total_volume / bin_volume).ceil() as usize + 1
    };
    let mut open: Vec<Bin> = (0..open_count).map(|_| Bin::new(config, catalog)).collect();
    for bin in &mut open {
        bin.seed_anchors();
    }
    let mut done: Vec<Bin> = Vec::new();

    dedup_layers(&mut layers);
    for layer in layers.iter_mut() {
        layer.remove_covered(covered);
        layer.refresh(config);
    }
    layers.retain(|l| !l.is_empty() && l.occupancy >= config.min_layer_occupancy);
    layers.sort_by(|a, b| {
        b.occupancy
            .partial_cmp(&a.occupancy)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let spacing_active = config.bin_width > config.spacing_width_threshold;

    while !layers.is_empty() && !open.is_empty() {
        let mut committed: Option<(usize, usize)> = None;
        let mut filled_empty = false;

        'layer_scan: for li in 0..layers.len() {
            // Empty bins take the densest layer directly; thin layers are
            // not allowed to found a bin, and the weight cap binds from the
            // very first layer.
            let mut skip_layer = false;
            for bi in 0..open.len() {
                if open[bi].layer_count == 0 {
                    if layers[li].occupancy < config.first_layer_occupancy {
                        skip_layer = true;
                        break;
                    }
                    if let Some(cap) = config.max_bin_weight {
                        if open[bi].weight + layers[li].weight > cap {
                            counters.bin_weight += 1;
                            skip_layer = true;
                            break;
                        }
                    }
                    if spacing_active {
                        spread_layer(&mut layers[li], config, oracle);
                    }
                    let layer = layers[li].clone();
                    open[bi].unpack_layer(&layer, catalog, ledger, config);
                    open[bi].height += layer.height;
                    open[bi].weight += layer.weight;
                    mark_covered(&layer, covered);
                    layers.remove(li);
                    filled_empty = true;
                    break 'layer_scan;
                }
            }
            if skip_layer {
                continue 'layer_scan;
            }

            for bi in 0..open.len() {
                if let Some(cap) = config.max_bin_weight {
                    if open[bi].weight + layers[li].weight > cap {
                        counters.bin_weight += 1;
                        break;
                    }
                }

                let saved = layers[li].clone();
                if spacing_active {
                    if let Some((atoms, h)) = open[bi].top_layer() {
                        let (atoms, h) = (atoms.clone(), *h);
                        maximize_support(&atoms, h, &mut layers[li], config, oracle);
                    }
                }

                let atoms = layers[li].unpack();
                match check_layer(
                    &open[bi].boxes,
                    open[bi].height,
                    &atoms,
                    catalog,
                    ledger,
                    config,
                    counters,
                ) {
                    Some(updates) => {
                        for update in updates {
                            update.commit(ledger);
                        }
                        committed = Some((li, bi));
                        break 'layer_scan;
                    }
                    None => {
                        layers[li] = saved;
                    }
                }
            }
        }

        if let Some((li, bi)) = committed {
            let layer = layers.remove(li);
            open[bi].unpack_layer(&layer, catalog, ledger, config);
            open[bi].height += layer.height;
            open[bi].weight += layer.weight;
            mark_covered(&layer, covered);

            if open[bi].height > config.layer_fill_height() {
                done.push(open.remove(bi));
            }
        } else if !filled_empty {
            break;
        }

        for layer in layers.iter_mut() {
            layer.remove_covered(covered);
            layer.refresh(config);
        }
        layers.retain(|l| !l.is_empty() && l.occupancy >= config.min_layer_occupancy);
        layers.sort_by(|a, b| {
            b.occupancy
                .partial_cmp(&a.occupancy)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    done.append(&mut open);

    // Leftovers: uncovered batch items, sturdiest and largest first.
    let mut leftovers: Vec<ItemId> = batch.iter().copied().filter(|&id| !covered[id]).collect();
    leftovers.sort_by(|&a, &b| {
        let ia = catalog.item(a);
        let ib = catalog.item(b);
        ib.load_cap
            .partial_cmp(&ia.load_cap)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                ib.footprint()
                    .partial_cmp(&ia.footprint())
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(ib.height.partial_cmp(&ia.height).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut leftover_placed = 0;
    for bin in &mut done {
        if leftovers.is_empty() {
            break;
        }
        let before = leftovers.len();
        place_leftovers(bin, &mut leftovers, catalog, ledger, covered, config, counters);
        leftover_placed += before - leftovers.len();
        bin.eps.clear();
    }

    // Without sequencing, stragglers may open fresh bins of their own.
    if !config.preserve_sequence {
        while !leftovers.is_empty() {
            let mut bin = Bin::new(config, catalog);
            let before = leftovers.len();
            place_leftovers(
                &mut bin,
                &mut leftovers,
                catalog,
                ledger,
                covered,
                config,
                counters,
            );
            leftover_placed += before - leftovers.len();
            bin.eps.clear();
            let stuck = leftovers.len() == before;
            done.push(bin);
            if stuck {
                // Even an empty bin rejects these items; report them instead
                // of opening bins forever.
                break;
            }
        }
    }

    Assembly {
        bins: done,
        leftover_placed,
        uncovered: leftovers,
    }
}

/// Places leftover items into a bin one anchor at a time.
///
/// Anchors are sorted ascending by (z, x, y); items arrive pre-sorted by
/// descending load capacity and footprint. Under the greedy strategy the
/// first feasible (item, anchor, orientation, corner) combination wins; the
/// merit strategy scores every feasible hit and keeps the best one.
pub fn place_leftovers(
    bin: &mut Bin,
    leftovers: &mut Vec<ItemId>,
    catalog: &Catalog,
    ledger: &mut SupportLedger,
    covered: &mut [bool],
    config: &PackConfig,
    counters: &mut RejectionCounters,
) {
    bin.seed_anchors();

    while !leftovers.is_empty() {
        bin.eps.sort();

        let mut hit: Option<(usize, Candidate, crate::support::SupportUpdate)> = None;
        let mut best_merit = f64::NEG_INFINITY;

        'items: for (idx, &id) in leftovers.iter().enumerate() {
            let item = catalog.item(id);
            for ep in bin.eps.points() {
                if ep.z + item.height > config.bin_height + EPS {
                    continue;
                }
                for rotated in [false, true] {
                    let (w, d) = if rotated {
                        (item.depth, item.width)
                    } else {
                        (item.width, item.depth)
                    };
                    for &corner in CORNERS.iter() {
                        let Some((x, y)) = corner_origin(ep.x, ep.y, corner, w, d, config)
                        else {
                            continue;
                        };
                        let cand = Candidate {
                            item: id,
                            x,
                            y,
                            z: ep.z,
                            width: w,
                            depth: d,
                            height: item.height,
                            weight: item.weight,
                        };
                        let Some(update) = check_candidate(
                            &bin.boxes,
                            bin.weight,
                            catalog,
                            ledger,
                            config,
                            &cand,
                            counters,
                        ) else {
                            continue;
                        };

                        match config.placement_strategy {
                            PlacementStrategy::FirstFeasible => {
                                // Anchors and items are pre-sorted; the
                                // first hit is the accepted one.
                                hit = Some((idx, cand, update));
                                break 'items;
                            }
                            PlacementStrategy::MeritRanked => {
                                let score = merit(&cand, config);
                                if score > best_merit {
                                    best_merit = score;
                                    hit = Some((idx, cand, update));
                                }
                            }
                        }
                    }
                }
            }
        }

        let Some((idx, cand, update)) = hit else {
            break;
        };
        update.commit(ledger);
        bin.insert_at_anchor(catalog, &cand);
        covered[cand.item] = true;
        leftovers.remove(idx);

        // Once placement reaches the layered region's top, anchors beneath
        // it are unreachable.
        if cand.z >= bin.layer_top - EPS {
            bin.eps.retain_at_or_above(bin.layer_top);
        }
    }
}
