//! Support graph and load propagation.
//!
//! Each item records which items directly support it and with what share of
//! its weight; shares over an item's direct supporters sum to one. Support
//! strictly flows downward in z, so the relation is a DAG and propagating a
//! new item's weight upward along it terminates.
//!
//! Feasibility checks must not leak speculative state: a candidate's weight
//! distribution is computed in a [`SupportUpdate`] holding only the touched
//! deltas, and applied to the shared [`SupportLedger`] through an explicit
//! commit once the candidate is accepted. A rejected candidate is simply
//! dropped.

use crate::item::Catalog;
use palletizer_core::ItemId;
use std::collections::{HashMap, VecDeque};

/// Per-item support state.
#[derive(Debug, Clone, Default)]
struct LedgerEntry {
    /// Direct supporters and the share of the item's weight each carries.
    supporters: Vec<(ItemId, f64)>,
    /// Total weight currently resting on this item, directly or indirectly.
    carried: f64,
}

/// Shared support state of a run.
#[derive(Debug, Clone)]
pub struct SupportLedger {
    entries: Vec<LedgerEntry>,
}

impl SupportLedger {
    /// Creates an empty ledger for `len` items.
    pub fn new(len: usize) -> Self {
        Self {
            entries: vec![LedgerEntry::default(); len],
        }
    }

    /// The weight currently carried by an item.
    pub fn carried(&self, item: ItemId) -> f64 {
        self.entries[item].carried
    }

    /// Direct supporters of an item with their weight shares.
    pub fn supporters(&self, item: ItemId) -> &[(ItemId, f64)] {
        &self.entries[item].supporters
    }

    /// Replaces an item's supporter set directly. Only used when a base
    /// layer is unpacked onto the bin floor, where no propagation is needed.
    pub fn set_supporters(&mut self, item: ItemId, supporters: Vec<(ItemId, f64)>) {
        self.entries[item].supporters = supporters;
    }

    /// Distributes a candidate's weight over its supporters and walks the
    /// support DAG upward, accumulating carried weight.
    ///
    /// `supports` pairs each direct supporter with its overlap area share.
    /// Returns the update to commit, or `None` as soon as any ancestor's
    /// accumulated weight would exceed its load capacity. Shared state is
    /// never touched.
    pub fn propagate(
        &self,
        catalog: &Catalog,
        item: ItemId,
        weight: f64,
        supports: &[(ItemId, f64)],
    ) -> Option<SupportUpdate> {
        let total: f64 = supports.iter().map(|(_, area)| area).sum();
        debug_assert!(total > 0.0 || supports.is_empty());

        let mut shares = Vec::with_capacity(supports.len());
        let mut deltas: HashMap<ItemId, f64> = HashMap::new();
        let mut queue: VecDeque<(ItemId, f64)> = VecDeque::new();

        for &(supporter, area) in supports {
            let share = area / total;
            shares.push((supporter, share));
            queue.push_back((supporter, weight * share));
        }

        while let Some((current, load)) = queue.pop_front() {
            let delta = deltas.entry(current).or_insert(0.0);
            *delta += load;

            let entry = &self.entries[current];
            if entry.carried + *delta > catalog.item(current).load_cap {
                return None;
            }

            for &(ancestor, share) in &entry.supporters {
                // Supporters sit strictly below; z-monotonicity keeps this
                // walk finite.
                debug_assert_ne!(ancestor, current);
                queue.push_back((ancestor, load * share));
            }
        }

        Some(SupportUpdate {
            item,
            shares,
            deltas,
        })
    }
}

/// Delta transaction produced by a successful propagation.
///
/// Holds the candidate's supporter shares and the carried-weight deltas of
/// every touched ancestor. Dropping the update rolls the check back for
/// free; committing applies the deltas to the shared ledger.
#[derive(Debug, Clone)]
pub struct SupportUpdate {
    item: ItemId,
    shares: Vec<(ItemId, f64)>,
    deltas: HashMap<ItemId, f64>,
}

impl SupportUpdate {
    /// An update with no supporters (floor placement).
    pub fn floor(item: ItemId) -> Self {
        Self {
            item,
            shares: Vec::new(),
            deltas: HashMap::new(),
        }
    }

    /// The candidate item this update belongs to.
    pub fn item(&self) -> ItemId {
        self.item
    }

    /// Applies the update to the shared ledger.
    pub fn commit(self, ledger: &mut SupportLedger) {
        for (item, delta) in self.deltas {
            ledger.entries[item].carried += delta;
        }
        ledger.entries[self.item].supporters = self.shares;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemSpec;
    use palletizer_core::PackConfig;

    fn catalog(caps: &[f64]) -> Catalog {
        let specs: Vec<ItemSpec> = caps
            .iter()
            .map(|&cap| {
                // load_cap = per_area * 100 * 100 / 200 = per_area * 50
                ItemSpec::boxed(100.0, 100.0, 50.0, 10.0).with_load_capacity(cap / 50.0)
            })
            .collect();
        Catalog::from_specs(&specs, &PackConfig::default()).unwrap()
    }

    #[test]
    fn shares_are_normalized() {
        let catalog = catalog(&[1000.0, 1000.0, 1000.0]);
        let ledger = SupportLedger::new(3);
        // Item 2 rests on 0 and 1 with a 3:1 area split.
        let update = ledger
            .propagate(&catalog, 2, 10.0, &[(0, 7500.0), (1, 2500.0)])
            .unwrap();
        let mut ledger = ledger;
        update.commit(&mut ledger);

        let shares = ledger.supporters(2);
        let total: f64 = shares.iter().map(|(_, s)| s).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!((shares[0].1 - 0.75).abs() < 1e-9);
        assert!((ledger.carried(0) - 7.5).abs() < 1e-9);
        assert!((ledger.carried(1) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn propagation_walks_ancestors() {
        let catalog = catalog(&[1000.0, 1000.0, 1000.0]);
        let mut ledger = SupportLedger::new(3);
        // 1 fully rests on 0; then 2 fully rests on 1.
        ledger
            .propagate(&catalog, 1, 10.0, &[(0, 10_000.0)])
            .unwrap()
            .commit(&mut ledger);
        ledger
            .propagate(&catalog, 2, 10.0, &[(1, 10_000.0)])
            .unwrap()
            .commit(&mut ledger);

        // Item 0 carries both: 10 from item 1 plus 10 forwarded from item 2.
        assert!((ledger.carried(0) - 20.0).abs() < 1e-9);
        assert!((ledger.carried(1) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn overload_rejects_without_mutation() {
        let catalog = catalog(&[15.0, 1000.0, 1000.0]);
        let mut ledger = SupportLedger::new(3);
        ledger
            .propagate(&catalog, 1, 10.0, &[(0, 10_000.0)])
            .unwrap()
            .commit(&mut ledger);

        // Another 10 through item 1 would put 20 > 15 on item 0.
        let rejected = ledger.propagate(&catalog, 2, 10.0, &[(1, 10_000.0)]);
        assert!(rejected.is_none());
        // The failed check left no trace.
        assert!((ledger.carried(0) - 10.0).abs() < 1e-9);
        assert!((ledger.carried(1) - 10.0).abs() < 1e-9);
        assert!(ledger.supporters(2).is_empty());
    }

    #[test]
    fn split_weight_propagates_partially() {
        let catalog = catalog(&[1000.0, 1000.0, 1000.0, 1000.0]);
        let mut ledger = SupportLedger::new(4);
        // 2 rests half on 0, half on 1.
        ledger
            .propagate(&catalog, 2, 10.0, &[(0, 5000.0), (1, 5000.0)])
            .unwrap()
            .commit(&mut ledger);
        // 3 rests fully on 2: its weight splits through to 0 and 1.
        ledger
            .propagate(&catalog, 3, 8.0, &[(2, 10_000.0)])
            .unwrap()
            .commit(&mut ledger);

        assert!((ledger.carried(2) - 8.0).abs() < 1e-9);
        assert!((ledger.carried(0) - 9.0).abs() < 1e-9);
        assert!((ledger.carried(1) - 9.0).abs() < 1e-9);
    }

    #[test]
    fn floor_update_clears_supporters() {
        let mut ledger = SupportLedger::new(2);
        ledger.set_supporters(1, vec![(0, 1.0)]);
        SupportUpdate::floor(1).commit(&mut ledger);
        assert!(ledger.supporters(1).is_empty());
    }
}
