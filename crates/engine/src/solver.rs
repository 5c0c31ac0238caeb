//! Top-level pallet loading solver.
//!
//! Runs the full pipeline over sequence-ordered batches: super-item and group
//! generation, column-generation layer selection, bottom-up bin assembly and
//! leftover placement. Uncovered items roll into the next batch; a batch
//! iteration that covers nothing ends the run with the remainder reported as
//! unplaced.

use crate::bin::construct_bins;
use crate::colgen::generate_layer_pool;
use crate::item::{Catalog, ItemSpec};
use crate::layer::Layer;
use crate::lp::default_oracle;
use crate::superitem::{generate_super_items, group_pieces};
use crate::support::SupportLedger;
use palletizer_core::{
    Error, ItemId, LpOracle, PackConfig, PackResult, RejectionCounters, Result, RunSummary,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Layer-based 3D pallet loading planner.
pub struct PalletSolver {
    config: PackConfig,
    oracle: Box<dyn LpOracle>,
    cancelled: Arc<AtomicBool>,
}

impl PalletSolver {
    /// Creates a solver with the given configuration and the default oracle
    /// backend for this build.
    pub fn new(config: PackConfig) -> Self {
        Self::with_oracle(config, default_oracle())
    }

    /// Creates a solver with an explicit oracle backend.
    pub fn with_oracle(config: PackConfig, oracle: Box<dyn LpOracle>) -> Self {
        Self {
            config,
            oracle,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &PackConfig {
        &self.config
    }

    /// Requests cooperative cancellation: the solver stops between batches.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Plans the load for the given item records.
    pub fn solve(&self, specs: &[ItemSpec]) -> Result<PackResult> {
        let start = Instant::now();
        self.cancelled.store(false, Ordering::Relaxed);
        self.config.validate()?;

        let catalog = Catalog::from_specs(specs, &self.config)?;
        let mut ledger = SupportLedger::new(catalog.len());
        let mut covered = vec![false; catalog.len()];
        let mut counters = RejectionCounters::default();
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        // Items not yet drawn into a batch, ordered so the back of the list
        // is the next to load (lowest sequence number first when sequencing).
        let mut remaining: Vec<ItemId> = (0..catalog.len()).collect();
        if self.config.preserve_sequence {
            remaining.sort_by(|&a, &b| {
                catalog
                    .item(b)
                    .sequence
                    .cmp(&catalog.item(a).sequence)
                    .then(b.cmp(&a))
            });
        }

        let mut batch: Vec<ItemId> = Vec::new();
        let mut result = PackResult::default();
        let mut layer_count = 0usize;
        let mut leftover_count = 0usize;

        while !remaining.is_empty() || !batch.is_empty() {
            if self.cancelled.load(Ordering::Relaxed) {
                log::info!("solve cancelled between batches");
                break;
            }

            while batch.len() < self.config.batch_size {
                match remaining.pop() {
                    Some(id) => batch.push(id),
                    None => break,
                }
            }

            let covered_before = covered.iter().filter(|&&c| c).count();

            let supers = generate_super_items(&batch, &catalog, &self.config);
            let groups = group_pieces(&batch, &supers, &catalog, &self.config);
            log::debug!(
                "batch of {}: {} super-items, {} height groups",
                batch.len(),
                supers.len(),
                groups.len()
            );

            let layers: Vec<Layer> = generate_layer_pool(
                &batch,
                &groups,
                &catalog,
                &self.config,
                self.oracle.as_ref(),
                &mut rng,
                &mut counters,
            );
            layer_count += layers.len();

            let assembly = construct_bins(
                layers,
                &batch,
                &catalog,
                &mut ledger,
                &mut covered,
                &self.config,
                self.oracle.as_ref(),
                &mut counters,
            );
            leftover_count += assembly.leftover_placed;
            for bin in &assembly.bins {
                if !bin.boxes.is_empty() {
                    result.bins.push(bin.manifest());
                }
            }

            let covered_after = covered.iter().filter(|&&c| c).count();
            batch = assembly.uncovered;

            if covered_after == covered_before {
                // No progress: the stragglers will never place. Report them
                // instead of looping forever.
                if !batch.is_empty() || !remaining.is_empty() {
                    log::warn!(
                        "{} items could not be placed",
                        batch.len() + remaining.len()
                    );
                }
                result.unplaced.append(&mut batch);
                result.unplaced.extend(remaining.drain(..));
                break;
            }
        }

        result.unplaced.sort_unstable();
        result.summary = RunSummary {
            item_count: catalog.len(),
            elapsed_ms: start.elapsed().as_millis() as u64,
            bin_count: result.bins.len(),
            layer_count,
            leftover_count,
            unplaced_count: result.unplaced.len(),
            rejections: counters,
        };

        if self.cancelled.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }
        Ok(result)
    }
}
