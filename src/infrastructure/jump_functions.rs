//! C2 — JumpFunctionTable: the concurrent, tri-indexed
//! `(d1, n, d2) -> EdgeFunction` map.
//!
//! Grounded on `ide_solver.rs`'s `value_table`/`jump_function_cache`
//! `DashMap`-backed tables, generalized from that file's single flat cache
//! into the spec's three explicit views. Per the design note on tabled
//! state, `by_target` (keyed by `n`, the node most lookups key off of in
//! `processNormalFlow`/`processCall`/`processExit`) is the authoritative
//! store; `forward` and `reverse` are secondary indices this table's
//! `add`/`remove` keep in lock-step so no caller ever observes one updated
//! without the others.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::domain::edge_function::EdgeFn;

/// `(d1, n) -> {d2 -> F}`
type ForwardKey<N, D> = (D, N);
/// `(n, d2) -> {d1 -> F}`
type ReverseKey<N, D> = (N, D);

pub struct JumpFunctionTable<N, D, V> {
    by_target: DashMap<N, FxHashMap<(D, D), EdgeFn<V>>>,
    forward: DashMap<ForwardKey<N, D>, FxHashMap<D, EdgeFn<V>>>,
    reverse: DashMap<ReverseKey<N, D>, FxHashMap<D, EdgeFn<V>>>,
    /// Guards the compound read-modify-write sequence `propagate` performs
    /// (get existing, join, compare, add). `add`/`remove` on their own do
    /// not need it: each DashMap shard-locks its own bucket, which is
    /// sufficient to keep the three indices individually consistent.
    structural_lock: Mutex<()>,
}

impl<N, D, V> Default for JumpFunctionTable<N, D, V>
where
    N: Clone + Eq + Hash + Send + Sync + 'static,
    D: Clone + Eq + Hash + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<N, D, V> JumpFunctionTable<N, D, V>
where
    N: Clone + Eq + Hash + Send + Sync + 'static,
    D: Clone + Eq + Hash + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            by_target: DashMap::new(),
            forward: DashMap::new(),
            reverse: DashMap::new(),
            structural_lock: Mutex::new(()),
        }
    }

    /// Acquire the structural lock around a read-modify-write sequence
    /// (used by `propagate`/`clearAndPropagate`). Exposed so the tabulation
    /// engine can bracket "get, join, compare, add" in one critical section.
    pub fn lock(&self) -> parking_lot::MutexGuard<'_, ()> {
        self.structural_lock.lock()
    }

    /// `F` stored for `(d1, n, d2)`, or `None` meaning `allTop` (absence).
    pub fn get(&self, d1: &D, n: &N, d2: &D) -> Option<EdgeFn<V>> {
        self.by_target
            .get(n)
            .and_then(|row| row.get(&(d1.clone(), d2.clone())).cloned())
    }

    /// Insert or overwrite `(d1, n, d2) -> F`, keeping all three indices in
    /// sync.
    pub fn add(&self, d1: D, n: N, d2: D, f: EdgeFn<V>) {
        self.by_target
            .entry(n.clone())
            .or_default()
            .insert((d1.clone(), d2.clone()), f.clone());
        self.forward
            .entry((d1.clone(), n.clone()))
            .or_default()
            .insert(d2.clone(), f.clone());
        self.reverse.entry((n, d2)).or_default().insert(d1, f);
    }

    /// Remove the single entry `(d1, n, d2)`, if present.
    pub fn remove(&self, d1: &D, n: &N, d2: &D) {
        if let Some(mut row) = self.by_target.get_mut(n) {
            row.remove(&(d1.clone(), d2.clone()));
        }
        if let Some(mut row) = self.forward.get_mut(&(d1.clone(), n.clone())) {
            row.remove(d2);
        }
        if let Some(mut row) = self.reverse.get_mut(&(n.clone(), d2.clone())) {
            row.remove(d1);
        }
    }

    /// Remove every entry `(d1, n, *)` for the given `d1` (used by
    /// `clearAndPropagate`, which clears only the touched source fact's
    /// prior contributions at a target, not every source fact's).
    pub fn remove_by_source_and_target(&self, d1: &D, n: &N) {
        let removed_d2: Vec<D> = match self.by_target.get_mut(n) {
            Some(mut row) => {
                let keys: Vec<(D, D)> = row.keys().filter(|(k1, _)| k1 == d1).cloned().collect();
                for k in &keys {
                    row.remove(k);
                }
                keys.into_iter().map(|(_, d2)| d2).collect()
            }
            None => Vec::new(),
        };
        self.forward.remove(&(d1.clone(), n.clone()));
        for d2 in removed_d2 {
            if let Some(mut rev) = self.reverse.get_mut(&(n.clone(), d2)) {
                rev.remove(d1);
            }
        }
    }

    /// Remove every entry whose target node is `n` (used by expired-node
    /// cleanup, which must drop all source facts since the node itself no
    /// longer exists).
    pub fn remove_by_target(&self, n: &N) {
        if let Some((_, row)) = self.by_target.remove(n) {
            for (d1, d2) in row.keys() {
                if let Some(mut fwd) = self.forward.get_mut(&(d1.clone(), n.clone())) {
                    fwd.remove(d2);
                }
                if let Some(mut rev) = self.reverse.get_mut(&(n.clone(), d2.clone())) {
                    rev.remove(d1);
                }
            }
        }
        self.forward.retain(|(_, key_n), _| key_n != n);
        self.reverse.retain(|(key_n, _), _| key_n != n);
    }

    /// Snapshot of `{d2 -> F}` for a given `(d1, n)`.
    pub fn forward_view(&self, d1: &D, n: &N) -> HashMap<D, EdgeFn<V>> {
        self.forward
            .get(&(d1.clone(), n.clone()))
            .map(|row| row.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    /// Snapshot of `{d1 -> F}` for a given `(n, d2)`.
    pub fn reverse_view(&self, n: &N, d2: &D) -> HashMap<D, EdgeFn<V>> {
        self.reverse
            .get(&(n.clone(), d2.clone()))
            .map(|row| row.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    /// Snapshot of `{(d1,d2) -> F}` for a given `n`.
    pub fn by_target_view(&self, n: &N) -> Vec<(D, D, EdgeFn<V>)> {
        self.by_target
            .get(n)
            .map(|row| row.iter().map(|((d1, d2), f)| (d1.clone(), d2.clone(), f.clone())).collect())
            .unwrap_or_default()
    }

    /// Every node that currently has at least one stored jump function.
    /// Used by value computation's Phase V2 node enumeration.
    pub fn target_nodes(&self) -> Vec<N> {
        self.by_target.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.by_target.iter().all(|entry| entry.is_empty())
    }

    /// Drop every stored entry across all three indices (`Solver::clear_results`).
    pub fn clear(&self) {
        self.by_target.clear();
        self.forward.clear();
        self.reverse.clear();
    }
}

/// Shared handle convenience alias; the engine always holds the table
/// behind an `Arc` so workers can share it.
pub type SharedJumpFunctionTable<N, D, V> = Arc<JumpFunctionTable<N, D, V>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::edge_function::EdgeIdentity;

    fn id() -> EdgeFn<i64> {
        Arc::new(EdgeIdentity)
    }

    #[test]
    fn add_then_get_round_trips() {
        let table: JumpFunctionTable<&'static str, &'static str, i64> = JumpFunctionTable::new();
        table.add("d1", "n", "d2", id());
        assert!(table.get(&"d1", &"n", &"d2").is_some());
        assert!(table.get(&"d1", &"n", &"other").is_none());
    }

    #[test]
    fn views_stay_consistent_across_indices() {
        let table: JumpFunctionTable<&'static str, &'static str, i64> = JumpFunctionTable::new();
        table.add("d1", "n", "d2", id());
        assert_eq!(table.forward_view(&"d1", &"n").len(), 1);
        assert_eq!(table.reverse_view(&"n", &"d2").len(), 1);
        assert_eq!(table.by_target_view(&"n").len(), 1);
    }

    #[test]
    fn remove_by_target_clears_all_indices() {
        let table: JumpFunctionTable<&'static str, &'static str, i64> = JumpFunctionTable::new();
        table.add("d1", "n", "d2", id());
        table.remove_by_target(&"n");
        assert!(table.get(&"d1", &"n", &"d2").is_none());
        assert_eq!(table.forward_view(&"d1", &"n").len(), 0);
        assert_eq!(table.reverse_view(&"n", &"d2").len(), 0);
        assert_eq!(table.by_target_view(&"n").len(), 0);
    }

    #[test]
    fn remove_by_source_and_target_spares_other_sources() {
        let table: JumpFunctionTable<&'static str, &'static str, i64> = JumpFunctionTable::new();
        table.add("d1", "n", "d2", id());
        table.add("d1b", "n", "d2", id());
        table.remove_by_source_and_target(&"d1", &"n");
        assert!(table.get(&"d1", &"n", &"d2").is_none());
        assert!(table.get(&"d1b", &"n", &"d2").is_some());
        assert_eq!(table.reverse_view(&"n", &"d2").len(), 1);
        assert_eq!(table.by_target_view(&"n").len(), 1);
    }

    #[test]
    fn remove_single_entry_leaves_siblings() {
        let table: JumpFunctionTable<&'static str, &'static str, i64> = JumpFunctionTable::new();
        table.add("d1", "n", "d2", id());
        table.add("d1", "n", "d2b", id());
        table.remove(&"d1", &"n", &"d2");
        assert!(table.get(&"d1", &"n", &"d2").is_none());
        assert!(table.get(&"d1", &"n", &"d2b").is_some());
    }
}
