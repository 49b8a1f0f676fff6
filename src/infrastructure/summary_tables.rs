//! C3 — EndSummary & Incoming tables, guarded by a single "incoming lock".
//!
//! The design note on Incoming/EndSummary concurrency is explicit that a
//! finer-grained scheme risks reintroducing the race CC'10 fixed, so both
//! tables live behind one `parking_lot::Mutex` rather than (say) two
//! independent `DashMap`s. Grounded on the lock-guarded shared state shown
//! in `features/points_to/infrastructure/parallel_andersen.rs` (that file's
//! `Arc<RwLock<...>>`/`Mutex`-guarded tables are the teacher's idiom for
//! "several structures that must be read/written together under one lock"
//! in this codebase).

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use parking_lot::Mutex;

use crate::domain::edge_function::{equal_to, EdgeFn};

/// `(sP, d1) -> {(eP, d2) -> F}`
type EndSummaryKey<N, D> = (N, D);
/// `(sP, d3) -> {c -> set<D>}`
type IncomingKey<N, D> = (N, D);

struct Tables<N, D, V> {
    end_summary: HashMap<EndSummaryKey<N, D>, Vec<(N, D, EdgeFn<V>)>>,
    incoming: HashMap<IncomingKey<N, D>, HashMap<N, Vec<D>>>,
}

pub struct SummaryTables<N, D, V> {
    inner: Mutex<Tables<N, D, V>>,
}

/// A point-in-time copy of `endSummary[sP,d1]`, safe to iterate without
/// holding the incoming lock.
pub type EndSummarySnapshot<N, D, V> = Vec<(N, D, EdgeFn<V>)>;

/// A point-in-time copy of `incoming[sP,d3]`.
pub type IncomingSnapshot<N, D> = HashMap<N, Vec<D>>;

impl<N, D, V> Default for SummaryTables<N, D, V>
where
    N: Clone + Eq + Hash,
    D: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<N, D, V> SummaryTables<N, D, V>
where
    N: Clone + Eq + Hash,
    D: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Tables {
                end_summary: HashMap::new(),
                incoming: HashMap::new(),
            }),
        }
    }

    /// Run `body` with exclusive access to both tables. Every read-then-write
    /// sequence that touches both Incoming and EndSummary (processCall,
    /// processExit) must go through here, per the single coarse-lock design.
    pub fn with_lock<R>(&self, body: impl FnOnce(&mut TablesGuard<'_, N, D, V>) -> R) -> R {
        let mut guard = self.inner.lock();
        let mut view = TablesGuard { tables: &mut guard };
        body(&mut view)
    }
}

/// Borrowed, locked view handed to the closure passed to `with_lock`.
pub struct TablesGuard<'a, N, D, V> {
    tables: &'a mut Tables<N, D, V>,
}

impl<'a, N, D, V> TablesGuard<'a, N, D, V>
where
    N: Clone + Eq + Hash,
    D: Clone + Eq + Hash,
{
    /// Record a new end-summary entry for `(sP,d1)`, deduplicating against
    /// semantically-equal edge functions already observed for the same
    /// `(eP, d2)`.
    pub fn add_end_summary(&mut self, sp: N, d1: D, ep: N, d2: D, f: EdgeFn<V>) {
        let entries = self.tables.end_summary.entry((sp, d1)).or_default();
        if entries
            .iter()
            .any(|(existing_ep, existing_d2, existing_f)| {
                *existing_ep == ep && *existing_d2 == d2 && equal_to(existing_f, &f)
            })
        {
            return;
        }
        entries.push((ep, d2, f));
    }

    pub fn snapshot_end_summary(&self, sp: &N, d1: &D) -> EndSummarySnapshot<N, D, V> {
        self.tables
            .end_summary
            .get(&(sp.clone(), d1.clone()))
            .cloned()
            .unwrap_or_default()
    }

    /// Record that caller fact `(c, d2)` flowed into callee start `(sP,d3)`.
    pub fn add_incoming(&mut self, sp: N, d3: D, c: N, d2: D) {
        let callers = self.tables.incoming.entry((sp, d3)).or_default();
        let facts = callers.entry(c).or_default();
        if !facts.contains(&d2) {
            facts.push(d2);
        }
    }

    pub fn snapshot_incoming(&self, sp: &N, d3: &D) -> IncomingSnapshot<N, D> {
        self.tables
            .incoming
            .get(&(sp.clone(), d3.clone()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn incoming_is_empty(&self, sp: &N, d3: &D) -> bool {
        self.tables
            .incoming
            .get(&(sp.clone(), d3.clone()))
            .map(|callers| callers.is_empty())
            .unwrap_or(true)
    }

    /// Remove every end-summary whose exit node is `n` (IncrementalUpdater
    /// Phase 4).
    pub fn remove_end_summaries_with_exit(&mut self, n: &N) {
        for entries in self.tables.end_summary.values_mut() {
            entries.retain(|(ep, _, _)| ep != n);
        }
    }

    /// Drop every end-summary and incoming entry (`Solver::clear_results`).
    pub fn clear(&mut self) {
        self.tables.end_summary.clear();
        self.tables.incoming.clear();
    }

    /// Remove every row and nested entry mentioning expired node `x`
    /// (IncrementalUpdater Phase 1).
    pub fn remove_node(&mut self, x: &N) {
        self.tables.end_summary.retain(|(sp, _), _| sp != x);
        for entries in self.tables.end_summary.values_mut() {
            entries.retain(|(ep, _, _)| ep != x);
        }
        self.tables.incoming.retain(|(sp, _), _| sp != x);
        for callers in self.tables.incoming.values_mut() {
            callers.remove(x);
        }
    }
}
