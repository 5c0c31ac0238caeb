//! End-to-end planning scenarios.

use palletizer_core::{PackConfig, PlacementStrategy};
use palletizer_engine::{ItemSpec, PalletSolver, SupportShape};

const EPS: f64 = 1e-9;

fn config() -> PackConfig {
    PackConfig::new()
        .with_bin(400.0, 400.0, 1000.0)
        .with_max_bin_weight(Some(1_000.0))
        .with_sequence(false)
        .with_seed(1234)
        .with_colgen_time_limit(30_000)
        .with_improvement_limit(3)
}

fn cartons(count: usize) -> Vec<ItemSpec> {
    vec![ItemSpec::boxed(200.0, 200.0, 200.0, 12.0)
        .with_load_capacity(10_000.0)
        .with_repetition(count)]
}

/// Every accepted placement stays inside the bin and overlaps nothing.
#[test]
fn placements_are_disjoint_and_in_bounds() {
    let config = config();
    let result = PalletSolver::new(config.clone())
        .solve(&cartons(12))
        .unwrap();

    assert!(result.all_placed());
    for bin in &result.bins {
        for p in &bin.placements {
            assert!(p.x >= -EPS && p.x + p.width <= config.bin_width + EPS);
            assert!(p.y >= -EPS && p.y + p.depth <= config.bin_depth + EPS);
            assert!(p.z >= -EPS && p.z + p.height <= config.bin_height + EPS);
        }
        for (i, a) in bin.placements.iter().enumerate() {
            for b in bin.placements.iter().skip(i + 1) {
                let disjoint = a.x + a.width <= b.x + EPS
                    || b.x + b.width <= a.x + EPS
                    || a.y + a.depth <= b.y + EPS
                    || b.y + b.depth <= a.y + EPS
                    || a.z + a.height <= b.z + EPS
                    || b.z + b.height <= a.z + EPS;
                assert!(disjoint, "boxes overlap in a bin");
            }
        }
    }
}

/// Every bin honors the configured weight cap.
#[test]
fn bin_weights_respect_the_cap() {
    let config = config().with_max_bin_weight(Some(50.0));
    let result = PalletSolver::new(config).solve(&cartons(10)).unwrap();

    assert!(result.all_placed());
    for bin in &result.bins {
        assert!(bin.weight <= 50.0 + EPS, "bin weight {} over cap", bin.weight);
        assert!(bin.placements.len() <= 4);
    }
}

/// Items supported only from below: no placement floats mid-air when
/// vertical support is enforced.
#[test]
fn stacked_placements_rest_on_something() {
    let config = config();
    assert!(config.enforce_vertical_support);
    let result = PalletSolver::new(config.clone())
        .solve(&cartons(12))
        .unwrap();

    for bin in &result.bins {
        for p in &bin.placements {
            if p.z <= EPS {
                continue;
            }
            let supported = bin.placements.iter().any(|q| {
                (q.z + q.height - p.z).abs() <= config.layer_height_tolerance + EPS
                    && q.x < p.x + p.width
                    && q.x + q.width > p.x
                    && q.y < p.y + p.depth
                    && q.y + q.depth > p.y
            });
            assert!(supported, "placement at z={} floats", p.z);
        }
    }
}

/// An item that fits nowhere is reported, never silently dropped.
#[test]
fn impossible_item_is_reported() {
    let mut specs = cartons(3);
    specs.push(
        ItemSpec::boxed(500.0, 500.0, 500.0, 100.0).with_load_capacity(10_000.0),
    );
    let result = PalletSolver::new(config()).solve(&specs).unwrap();

    assert_eq!(result.unplaced, vec![3]);
    assert_eq!(result.placed_count(), 3);
    assert_eq!(result.summary.unplaced_count, 1);
}

/// Crushable items refuse to carry heavy loads: with zero load capacity and
/// load enforcement on, nothing stacks on top of anything.
#[test]
fn zero_load_capacity_prevents_stacking() {
    let config = config();
    assert!(config.enforce_load_capacity);
    let specs = vec![ItemSpec::boxed(200.0, 200.0, 200.0, 12.0)
        .with_load_capacity(0.0)
        .with_repetition(6)];
    let result = PalletSolver::new(config).solve(&specs).unwrap();

    for bin in &result.bins {
        for p in &bin.placements {
            assert!(p.z <= EPS, "item stacked onto a zero-capacity item");
        }
    }
    // Four fit per floor; six items need at least two bins.
    assert!(result.summary.bin_count >= 2);
    assert!(result.all_placed());
}

/// Sequencing accepts stragglers as unplaced instead of opening extra bins.
#[test]
fn sequencing_never_opens_extra_bins_for_stragglers() {
    let config = config()
        .with_sequence(true)
        .with_max_bin_weight(Some(30.0));
    // Each batch fills one bin with two items; the rest must wait for their
    // own batch rather than overflow sideways.
    let result = PalletSolver::new(config).solve(&cartons(4)).unwrap();

    let placed = result.placed_count();
    assert_eq!(placed + result.unplaced.len(), 4);
    for bin in &result.bins {
        assert!(bin.weight <= 30.0 + EPS);
    }
}

/// The merit-ranked strategy produces a legal plan too.
#[test]
fn merit_strategy_is_equivalent_on_simple_input() {
    let config = config().with_placement_strategy(PlacementStrategy::MeritRanked);
    let result = PalletSolver::new(config).solve(&cartons(8)).unwrap();
    assert!(result.all_placed());
}

/// Support shapes restrict where stacking is possible but never corrupt the
/// placement accounting.
#[test]
fn corner_support_items_still_plan() {
    let mut config = config();
    config.support_shapes_enabled = true;
    let specs = vec![
        ItemSpec::boxed(200.0, 200.0, 200.0, 12.0)
            .with_load_capacity(10_000.0)
            .with_shape(SupportShape::Corners)
            .with_repetition(4),
        ItemSpec::boxed(200.0, 200.0, 195.0, 10.0)
            .with_load_capacity(10_000.0)
            .with_repetition(4),
    ];
    let result = PalletSolver::new(config).solve(&specs).unwrap();
    assert_eq!(
        result.placed_count() + result.unplaced.len(),
        result.summary.item_count
    );
}

/// The run summary accounts for every item and every layer generated.
#[test]
fn summary_is_consistent() {
    let result = PalletSolver::new(config()).solve(&cartons(9)).unwrap();
    let summary = &result.summary;

    assert_eq!(summary.item_count, 9);
    assert_eq!(summary.bin_count, result.bins.len());
    assert_eq!(summary.unplaced_count, result.unplaced.len());
    assert_eq!(result.placed_count() + summary.unplaced_count, 9);
    assert!(summary.leftover_count <= 9);
}
