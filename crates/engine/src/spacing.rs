//! Layer spacing via the LP oracle.
//!
//! Once the 2D packer has fixed a layer's relative ordering, items can still
//! slide. Two optimizations reposition them without ever changing the
//! precedence established by the packer:
//!
//! - [`spread_layer`]: pushes items apart toward the bin walls so a bottom
//!   layer gives even support, as two LP passes (x, then y with an x-drift
//!   penalty).
//! - [`maximize_support`]: places a layer against the layer below it,
//!   maximizing the number of supported item pairs through a MIP with
//!   min/max overlap linearization and binary contact indicators.
//!
//! Oracle failure is absorbed: spreading keeps the original coordinates,
//! support maximization reports the attempt as abandoned.

use crate::layer::{Layer, LayerAtom};
use palletizer_core::{LayoutProblem, LinExpr, LpOracle, PackConfig, Relation, Sense};
use std::time::Duration;

const EPS: f64 = 1e-9;

/// Placed rectangle view of a layer piece: (x, y, width, depth).
fn footprints(layer: &Layer) -> Vec<(f64, f64, f64, f64)> {
    layer
        .pieces
        .iter()
        .map(|p| (p.x, p.y, p.width(), p.depth()))
        .collect()
}

fn intervals_touch(a0: f64, a1: f64, b0: f64, b1: f64) -> bool {
    b0 <= a1 + EPS && b1 >= a0 - EPS
}

/// Precedence matrix from current coordinates: `(x_before, y_before)` per
/// ordered pair. This is the packer's established ordering; the LPs must
/// preserve it.
fn precedence(rects: &[(f64, f64, f64, f64)]) -> Vec<Vec<(bool, bool)>> {
    let n = rects.len();
    let mut z = vec![vec![(false, false); n]; n];
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let (xi, yi, wi, di) = rects[i];
            let (xj, yj, _, _) = rects[j];
            z[i][j] = (xi + wi <= xj + EPS, yi + di <= yj + EPS);
        }
    }
    z
}

/// Rows of items sharing a y-interval (for x gaps) or an x-interval (for y
/// gaps), deduplicated.
fn strips(rects: &[(f64, f64, f64, f64)], along_x: bool) -> Vec<Vec<usize>> {
    let n = rects.len();
    let mut result: Vec<Vec<usize>> = Vec::new();
    for i in 0..n {
        let (xi, yi, wi, di) = rects[i];
        let (a0, a1) = if along_x {
            (yi, yi + di)
        } else {
            (xi, xi + wi)
        };
        let mut strip: Vec<usize> = (0..n)
            .filter(|&j| {
                if j == i {
                    return true;
                }
                let (xj, yj, wj, dj) = rects[j];
                let (b0, b1) = if along_x {
                    (yj, yj + dj)
                } else {
                    (xj, xj + wj)
                };
                intervals_touch(a0, a1, b0, b1)
            })
            .collect();
        strip.sort_unstable();
        if !result.contains(&strip) {
            result.push(strip);
        }
    }
    result
}

/// Spreads a layer's items toward the bin walls.
///
/// Two oracle calls: the x pass maximizes the per-strip gaps plus the
/// smallest gap, the y pass does the same in y while penalizing drift from
/// the x-pass coordinates. If either solve fails the layer keeps the
/// coordinates it had.
pub fn spread_layer(layer: &mut Layer, config: &PackConfig, oracle: &dyn LpOracle) -> bool {
    if layer.pieces.len() < 2 {
        return false;
    }
    let limit = Duration::from_millis(config.oracle_time_limit_ms);

    // X pass.
    let rects = footprints(layer);
    match oracle.solve_layout(&spread_problem(&rects, config, true, None), limit) {
        Ok(solution) => {
            for (i, piece) in layer.pieces.iter_mut().enumerate() {
                piece.x = solution.values[2 * i].round();
                piece.y = solution.values[2 * i + 1].round();
            }
        }
        Err(err) => {
            log::debug!("layer spread (x) kept original coordinates: {err}");
            return false;
        }
    }

    // Y pass, anchored to the x-pass result.
    let rects = footprints(layer);
    let anchors: Vec<f64> = rects.iter().map(|r| r.0).collect();
    match oracle.solve_layout(&spread_problem(&rects, config, false, Some(&anchors)), limit) {
        Ok(solution) => {
            for (i, piece) in layer.pieces.iter_mut().enumerate() {
                piece.x = solution.values[2 * i].round();
                piece.y = solution.values[2 * i + 1].round();
            }
            true
        }
        Err(err) => {
            log::debug!("layer spread (y) kept x-pass coordinates: {err}");
            false
        }
    }
}

/// Builds one spread pass. Variables `2i`/`2i+1` are the x/y coordinates of
/// item `i`; the remaining variables are gap measures.
fn spread_problem(
    rects: &[(f64, f64, f64, f64)],
    config: &PackConfig,
    along_x: bool,
    x_anchors: Option<&[f64]>,
) -> LayoutProblem {
    let n = rects.len();
    let bin_w = config.bin_width;
    let bin_d = config.bin_depth;
    let z = precedence(rects);

    let mut problem = LayoutProblem::new(Sense::Maximize);
    for &(_, _, w, d) in rects {
        problem.continuous(0.0, bin_w - w);
        problem.continuous(0.0, bin_d - d);
    }
    let coord = |i: usize, x_axis: bool| if x_axis { 2 * i } else { 2 * i + 1 };

    // Per-item gap variables and the global minimum gap.
    let gaps: Vec<usize> = (0..n)
        .map(|_| problem.continuous(f64::NEG_INFINITY, if along_x { bin_w } else { bin_d }))
        .collect();
    let min_gap = problem.continuous(f64::NEG_INFINITY, if along_x { bin_w } else { bin_d });

    let mut objective = LinExpr::term(min_gap, if along_x { n as f64 } else { 1000.0 });
    for &g in &gaps {
        objective = objective.add_term(g, 1.0);
    }

    // Drift penalties keep the y pass near the x-pass layout.
    if let Some(anchors) = x_anchors {
        for (i, &x0) in anchors.iter().enumerate() {
            let drift = problem.continuous(f64::NEG_INFINITY, f64::INFINITY);
            objective = objective.add_term(drift, -1.0);
            // drift >= |x_i - x0|
            problem.constrain(
                LinExpr::term(drift, -1.0).add_term(coord(i, true), 1.0),
                Relation::Le,
                x0,
            );
            problem.constrain(
                LinExpr::term(drift, -1.0).add_term(coord(i, true), -1.0),
                Relation::Le,
                -x0,
            );
        }
    }
    problem.objective = objective;

    // Precedence in both axes, kept with big-M slack on the inactive pairs.
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let (_, _, wi, di) = rects[i];
            let (zx, zy) = z[i][j];
            problem.constrain(
                LinExpr::term(coord(i, true), 1.0).add_term(coord(j, true), -1.0),
                Relation::Le,
                bin_w - wi - if zx { bin_w } else { 0.0 },
            );
            problem.constrain(
                LinExpr::term(coord(i, false), 1.0).add_term(coord(j, false), -1.0),
                Relation::Le,
                bin_d - di - if zy { bin_d } else { 0.0 },
            );

            // Global minimum gap along the active axis.
            let active = if along_x { zx } else { zy };
            if active {
                let extent = if along_x { wi } else { di };
                problem.constrain(
                    LinExpr::term(min_gap, 1.0)
                        .add_term(coord(i, along_x), 1.0)
                        .add_term(coord(j, along_x), -1.0),
                    Relation::Le,
                    -extent,
                );
            }
        }
    }

    // Per-strip gaps: an item's gap variable is bounded by the free space to
    // its successor within the same strip.
    for strip in strips(rects, along_x) {
        for &i in &strip {
            for &k in &strip {
                if i == k {
                    continue;
                }
                let active = if along_x { z[i][k].0 } else { z[i][k].1 };
                if !active {
                    continue;
                }
                let extent = if along_x { rects[i].2 } else { rects[i].3 };
                problem.constrain(
                    LinExpr::term(gaps[i], 1.0)
                        .add_term(coord(i, along_x), 1.0)
                        .add_term(coord(k, along_x), -1.0),
                    Relation::Le,
                    -extent,
                );
            }
        }
    }

    problem
}

/// Repositions `layer` against the layer below it, maximizing the number of
/// item pairs in supporting contact.
///
/// Returns `false` when the oracle cannot produce a solution; the caller
/// abandons the stacking attempt in that case.
pub fn maximize_support(
    bottom_atoms: &[LayerAtom],
    bottom_height: f64,
    layer: &mut Layer,
    config: &PackConfig,
    oracle: &dyn LpOracle,
) -> bool {
    let n = layer.pieces.len();
    if n == 0 || bottom_atoms.is_empty() {
        return false;
    }
    let rects = footprints(layer);
    let tol = config.layer_height_tolerance;

    // Bottom atoms whose tops form the supporting surface.
    let surface: Vec<&LayerAtom> = bottom_atoms
        .iter()
        .filter(|a| bottom_height - (a.z + a.height) <= tol)
        .collect();
    if surface.is_empty() {
        return false;
    }

    let z = transitive_reduced_precedence(&rects);

    let mut problem = LayoutProblem::new(Sense::Maximize);
    for &(_, _, w, d) in &rects {
        problem.continuous(0.0, config.bin_width - w);
        problem.continuous(0.0, config.bin_depth - d);
    }
    let coord = |i: usize, x_axis: bool| if x_axis { 2 * i } else { 2 * i + 1 };

    // Hard precedence: the packer's ordering holds without slack here.
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let (zx, zy) = z[i][j];
            if zx {
                problem.constrain(
                    LinExpr::term(coord(i, true), 1.0).add_term(coord(j, true), -1.0),
                    Relation::Le,
                    -rects[i].2,
                );
            }
            if zy {
                problem.constrain(
                    LinExpr::term(coord(i, false), 1.0).add_term(coord(j, false), -1.0),
                    Relation::Le,
                    -rects[i].3,
                );
            }
        }
    }

    // Contact indicators: ov[i][j] may be 1 only if item i genuinely
    // overlaps bottom atom j by at least one unit in both axes.
    let delta = 1.0;
    let big_m_x = config.bin_width + delta;
    let big_m_y = config.bin_depth + delta;
    let mut objective = LinExpr::zero();

    for (i, &(_, _, w, d)) in rects.iter().enumerate() {
        for atom in &surface {
            let x_max = problem.continuous(0.0, config.bin_width);
            let x_min = problem.continuous(0.0, config.bin_width);
            let y_max = problem.continuous(0.0, config.bin_depth);
            let y_min = problem.continuous(0.0, config.bin_depth);
            let ov = problem.binary();
            objective = objective.add_term(ov, 1.0);

            // x_max <= min(top right edge, bottom right edge)
            problem.constrain(
                LinExpr::term(x_max, 1.0).add_term(coord(i, true), -1.0),
                Relation::Le,
                w,
            );
            problem.constrain(LinExpr::term(x_max, 1.0), Relation::Le, atom.x + atom.width);
            // x_min >= max(left edges)
            problem.constrain(
                LinExpr::term(x_min, 1.0).add_term(coord(i, true), -1.0),
                Relation::Ge,
                0.0,
            );
            problem.constrain(LinExpr::term(x_min, 1.0), Relation::Ge, atom.x);
            // Same in y.
            problem.constrain(
                LinExpr::term(y_max, 1.0).add_term(coord(i, false), -1.0),
                Relation::Le,
                d,
            );
            problem.constrain(LinExpr::term(y_max, 1.0), Relation::Le, atom.y + atom.depth);
            problem.constrain(
                LinExpr::term(y_min, 1.0).add_term(coord(i, false), -1.0),
                Relation::Ge,
                0.0,
            );
            problem.constrain(LinExpr::term(y_min, 1.0), Relation::Ge, atom.y);

            // ov = 1 forces a real overlap extent in both axes.
            problem.constrain(
                LinExpr::term(x_max, -1.0)
                    .add_term(x_min, 1.0)
                    .add_term(ov, big_m_x),
                Relation::Le,
                big_m_x - delta,
            );
            problem.constrain(
                LinExpr::term(y_max, -1.0)
                    .add_term(y_min, 1.0)
                    .add_term(ov, big_m_y),
                Relation::Le,
                big_m_y - delta,
            );
        }
    }
    problem.objective = objective;

    let limit = Duration::from_millis(config.oracle_time_limit_ms);
    match oracle.solve_layout(&problem, limit) {
        Ok(solution) => {
            for (i, piece) in layer.pieces.iter_mut().enumerate() {
                piece.x = solution.values[2 * i].round();
                piece.y = solution.values[2 * i + 1].round();
            }
            true
        }
        Err(err) => {
            log::debug!("support maximization abandoned: {err}");
            false
        }
    }
}

/// Precedence with transitively implied pairs removed: when some item sits
/// between `i` and `k` in a shared strip, the `(i, k)` edge is dropped so the
/// MIP keeps only adjacent ordering constraints.
fn transitive_reduced_precedence(rects: &[(f64, f64, f64, f64)]) -> Vec<Vec<(bool, bool)>> {
    let n = rects.len();
    let mut z = vec![vec![(false, false); n]; n];
    for i in 0..n {
        let (xi, yi, wi, di) = rects[i];
        for k in 0..n {
            if i == k {
                continue;
            }
            let (xk, yk, wk, dk) = rects[k];
            let mut skip = false;
            for l in 0..n {
                if l == i || l == k {
                    continue;
                }
                let (xl, yl, wl, dl) = rects[l];
                // l lies between i and k in x while all three share y range.
                if intervals_touch(yi, yi + di, yl, yl + dl)
                    && intervals_touch(yi, yi + di, yk, yk + dk)
                    && xi + wi <= xl + EPS
                    && xl + wl < xk - EPS
                {
                    skip = true;
                    break;
                }
                // Or between them in y while sharing x range.
                if intervals_touch(xi, xi + wi, xl, xl + wl)
                    && intervals_touch(xi, xi + wi, xk, xk + wk)
                    && yi + di <= yl + EPS
                    && yl + dl < yk - EPS
                {
                    skip = true;
                    break;
                }
            }
            if skip {
                continue;
            }
            z[i][k] = (xi + wi <= xk + EPS, yi + di <= yk + EPS);
        }
    }
    z
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Catalog, ItemSpec, PackPiece};
    use crate::layer::LayerPiece;
    use palletizer_core::{LayoutSolution, MasterProblem, MasterSolution, OracleError};

    fn two_piece_layer(config: &PackConfig) -> Layer {
        let catalog = Catalog::from_specs(
            &[
                ItemSpec::boxed(100.0, 100.0, 50.0, 1.0),
                ItemSpec::boxed(100.0, 100.0, 50.0, 1.0),
            ],
            config,
        )
        .unwrap();
        let mut layer = Layer::default();
        layer.pieces.push(LayerPiece {
            piece: PackPiece::single(catalog.item(0)),
            x: 0.0,
            y: 0.0,
            rotated: false,
        });
        layer.pieces.push(LayerPiece {
            piece: PackPiece::single(catalog.item(1)),
            x: 100.0,
            y: 0.0,
            rotated: false,
        });
        layer.refresh(config);
        layer
    }

    #[test]
    fn precedence_reflects_coordinates() {
        let rects = vec![(0.0, 0.0, 100.0, 100.0), (100.0, 0.0, 100.0, 100.0)];
        let z = precedence(&rects);
        assert!(z[0][1].0);
        assert!(!z[1][0].0);
        assert!(!z[0][1].1);
    }

    #[test]
    fn strips_group_by_shared_interval() {
        // Two items side by side in x share a y-interval: one x-strip.
        let rects = vec![
            (0.0, 0.0, 100.0, 100.0),
            (100.0, 0.0, 100.0, 100.0),
            (0.0, 300.0, 100.0, 100.0),
        ];
        let x_strips = strips(&rects, true);
        assert!(x_strips.contains(&vec![0, 1]));
        assert!(x_strips.contains(&vec![2]));
    }

    #[test]
    fn spread_problem_shape() {
        let config = PackConfig::default().with_bin(600.0, 800.0, 2200.0);
        let rects = vec![(0.0, 0.0, 100.0, 100.0), (100.0, 0.0, 100.0, 100.0)];
        let problem = spread_problem(&rects, &config, true, None);
        // 2 coords per item + 2 gap vars + min gap.
        assert_eq!(problem.num_vars(), 7);
        assert!(!problem.is_mip());
        assert_eq!(problem.sense, Sense::Maximize);
    }

    /// Oracle stub that pushes the second item to the far wall.
    struct SpreadStub;
    impl LpOracle for SpreadStub {
        fn solve_master(
            &self,
            _master: &MasterProblem,
            _limit: Duration,
        ) -> Result<MasterSolution, OracleError> {
            Err(OracleError::Unavailable("stub".into()))
        }
        fn solve_layout(
            &self,
            layout: &LayoutProblem,
            _limit: Duration,
        ) -> Result<LayoutSolution, OracleError> {
            let mut values = vec![0.0; layout.num_vars()];
            // Item 0 stays, item 1 goes to x=500 (bin width 600 - width 100).
            values[2] = 500.0;
            Ok(LayoutSolution {
                objective: 0.0,
                values,
            })
        }
    }

    /// Oracle stub that always fails.
    struct FailingStub;
    impl LpOracle for FailingStub {
        fn solve_master(
            &self,
            _master: &MasterProblem,
            _limit: Duration,
        ) -> Result<MasterSolution, OracleError> {
            Err(OracleError::Infeasible)
        }
        fn solve_layout(
            &self,
            _layout: &LayoutProblem,
            _limit: Duration,
        ) -> Result<LayoutSolution, OracleError> {
            Err(OracleError::Timeout(Duration::from_secs(1)))
        }
    }

    #[test]
    fn spread_applies_oracle_coordinates() {
        let config = PackConfig::default().with_bin(600.0, 800.0, 2200.0);
        let mut layer = two_piece_layer(&config);
        assert!(spread_layer(&mut layer, &config, &SpreadStub));
        assert!((layer.pieces[1].x - 500.0).abs() < 1e-9);
    }

    #[test]
    fn spread_keeps_coordinates_on_failure() {
        let config = PackConfig::default().with_bin(600.0, 800.0, 2200.0);
        let mut layer = two_piece_layer(&config);
        assert!(!spread_layer(&mut layer, &config, &FailingStub));
        assert!((layer.pieces[1].x - 100.0).abs() < 1e-9);
        assert!((layer.pieces[0].x - 0.0).abs() < 1e-9);
    }

    #[test]
    fn support_maximization_reports_failure() {
        let config = PackConfig::default().with_bin(600.0, 800.0, 2200.0);
        let mut layer = two_piece_layer(&config);
        let bottom = vec![LayerAtom {
            item: 0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            width: 200.0,
            depth: 200.0,
            height: 50.0,
        }];
        assert!(!maximize_support(
            &bottom,
            50.0,
            &mut layer,
            &config,
            &FailingStub
        ));
        // Coordinates untouched.
        assert!((layer.pieces[1].x - 100.0).abs() < 1e-9);
    }

    #[test]
    fn support_problem_is_a_mip() {
        let config = PackConfig::default().with_bin(600.0, 800.0, 2200.0);
        let layer = two_piece_layer(&config);
        let rects = footprints(&layer);
        assert_eq!(rects.len(), 2);
        // Build through the public entry with a capturing stub.
        struct Capture(std::cell::RefCell<Option<bool>>);
        impl LpOracle for Capture {
            fn solve_master(
                &self,
                _m: &MasterProblem,
                _l: Duration,
            ) -> Result<MasterSolution, OracleError> {
                Err(OracleError::Unavailable("stub".into()))
            }
            fn solve_layout(
                &self,
                layout: &LayoutProblem,
                _l: Duration,
            ) -> Result<LayoutSolution, OracleError> {
                *self.0.borrow_mut() = Some(layout.is_mip());
                Err(OracleError::Timeout(Duration::from_secs(1)))
            }
        }
        let capture = Capture(std::cell::RefCell::new(None));
        let mut layer = layer;
        let bottom = vec![LayerAtom {
            item: 0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            width: 200.0,
            depth: 200.0,
            height: 50.0,
        }];
        maximize_support(&bottom, 50.0, &mut layer, &config, &capture);
        assert_eq!(*capture.0.borrow(), Some(true));
    }
}
