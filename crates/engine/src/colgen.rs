//! Column-generation layer selection.
//!
//! The master LP minimizes total stacked layer height subject to covering
//! every batch item at least once; candidate layers are its columns. Round 1
//! seeds heuristic layers from the height groups plus one singleton layer per
//! batch item so the master is always feasible. Each later round prices the
//! items with the master duals, regenerates layers biased toward expensive
//! items, and appends only columns with negative reduced cost. The oracle is
//! called once per round on the cumulative column set.

use crate::item::{Catalog, PackPiece};
use crate::layer::{generate_initial_layers, generate_layers, Layer};
use palletizer_core::{
    ItemId, LpOracle, MasterProblem, PackConfig, RejectionCounters,
};
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::time::{Duration, Instant};

const IMPROVEMENT_RATIO: f64 = 0.001;

/// Runs the column-generation loop for one batch and returns the full
/// candidate layer pool.
///
/// Stopping rules, checked between rounds: no new column was generated, no
/// objective improvement for the configured round budget, the wall-clock
/// budget elapsed, or the batch is too small to justify the machinery.
pub fn generate_layer_pool(
    batch: &[ItemId],
    groups: &[Vec<PackPiece>],
    catalog: &Catalog,
    config: &PackConfig,
    oracle: &dyn LpOracle,
    rng: &mut StdRng,
    counters: &mut RejectionCounters,
) -> Vec<Layer> {
    let mut layers: Vec<Layer> = Vec::new();
    let mut duals = vec![0.0; catalog.len()];
    let row_of: HashMap<ItemId, usize> =
        batch.iter().enumerate().map(|(row, &id)| (id, row)).collect();
    let mut master = MasterProblem::new(batch.len());
    let mut columns_synced = 0usize;

    let start = Instant::now();
    let budget = Duration::from_millis(config.colgen_time_limit_ms);
    let oracle_limit = Duration::from_millis(config.oracle_time_limit_ms);

    let mut round: u32 = 1;
    let mut improvement_counter: u32 = 0;
    let mut best_objective = f64::INFINITY;

    loop {
        if round == 1 {
            generate_initial_layers(groups, config, rng, &mut layers);
        } else if !generate_layers(groups, &duals, config, &mut layers) {
            break;
        }

        if improvement_counter >= config.improvement_limit {
            break;
        }
        if start.elapsed() > budget {
            log::info!("column generation stopped on the wall-clock budget");
            break;
        }
        if batch.len() < config.min_colgen_items {
            break;
        }

        if round == 1 {
            // Singleton guarantee columns keep the master feasible no matter
            // which heuristic layers exist.
            for &id in batch {
                let mut layer = Layer::singleton(PackPiece::single(catalog.item(id)));
                layer.refresh(config);
                layers.push(layer);
            }
        }

        while columns_synced < layers.len() {
            let layer = &layers[columns_synced];
            let covers: Vec<usize> = layer
                .covered_items()
                .into_iter()
                .filter_map(|id| row_of.get(&id).copied())
                .collect();
            master.add_column(layer.height, covers);
            columns_synced += 1;
        }

        let solution = match oracle.solve_master(&master, oracle_limit) {
            Ok(solution) => solution,
            Err(err) => {
                log::warn!("master solve failed, keeping the current pool: {err}");
                counters.oracle += 1;
                break;
            }
        };

        if round == 1 {
            best_objective = solution.objective;
        }
        if (best_objective - solution.objective) / solution.objective.max(1e-9)
            > IMPROVEMENT_RATIO
        {
            improvement_counter = 0;
            best_objective = solution.objective;
        } else {
            improvement_counter += 1;
        }

        // Dual prices flow back to the batch items; super-item duals are
        // derived from these sums at regeneration time.
        for (&id, &row) in &row_of {
            duals[id] = solution.duals[row];
        }

        round += 1;
    }

    layers
}
