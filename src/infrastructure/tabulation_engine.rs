//! C5 — TabulationEngine: the SRH'96 worklist with CC'10 end-summary reuse.
//!
//! Grounded on `ifds_solver.rs`'s `process_path_edge`/`process_normal_edge`/
//! `process_call_edge`/`process_return_edge` dispatch, but replacing that
//! file's heuristic return-site resolution (`find_callee_entry_for_return`'s
//! `trim_end_matches("_entry"/"_exit")` string matching, plus its `O(all
//! path edges at the call site)` linear scan) with proper Incoming/EndSummary
//! bookkeeping, which is what §4.4/§4.5 actually specify.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::domain::edge_function::{compose, equal_to, join, EdgeFn, EdgeIdentity};
use crate::domain::fact::TargetFact;
use crate::domain::icfg::InterproceduralCfg;
use crate::domain::lattice::JoinLattice;
use crate::domain::path_edge::PathEdge;
use crate::domain::problem::{EdgeFunctions, FlowFunctions, TabulationProblem};
use crate::infrastructure::jump_functions::JumpFunctionTable;
use crate::infrastructure::stats::SolverStats;
use crate::infrastructure::summary_tables::SummaryTables;
use crate::infrastructure::work_executor::WorkExecutor;

/// `Compute` is the ordinary monotone-join mode; `Update` additionally
/// deletes prior contributions at first touch during an incremental replay
/// (§4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Compute,
    Update,
}

/// Everything `processNormalFlow`/`processCall`/`processExit`/`propagate`
/// need, bundled so it can be captured once behind an `Arc` and shared by
/// every worker closure.
pub struct EngineCore<N, D, M, V> {
    pub problem: Arc<dyn TabulationProblem<N, D, M, V>>,
    pub icfg: Arc<dyn InterproceduralCfg<N, M>>,
    pub flow_functions: Arc<dyn FlowFunctions<N, D, M>>,
    pub edge_functions: Arc<dyn EdgeFunctions<N, D, M, V>>,
    pub jump_fn: Arc<JumpFunctionTable<N, D, V>>,
    pub summaries: Arc<SummaryTables<N, D, V>>,
    pub executor: Arc<WorkExecutor>,
    pub stats: Arc<SolverStats>,
    /// Update-mode-only bookkeeping: the set of `(target)` nodes whose prior
    /// jump functions have already been cleared during the current update
    /// (clearAndPropagate's `jumpSave`), and the set of nodes touched by any
    /// clearAndPropagate so far (`changedNodes`), each independently
    /// guarded as §5 requires.
    pub jump_save: parking_lot::Mutex<rustc_hash::FxHashMap<N, rustc_hash::FxHashSet<D>>>,
    pub changed_nodes: dashmap::DashSet<N>,
}

impl<N, D, M, V> EngineCore<N, D, M, V>
where
    N: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    D: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    M: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    V: Clone + Debug + Send + Sync + 'static,
{
    /// Schedule `edge` for processing on the worker pool, dispatching by
    /// node kind per §4.2 once a worker picks it up.
    pub fn schedule(self: &Arc<Self>, edge: PathEdge<N, D>, mode: Mode) {
        let engine = self.clone();
        self.executor.submit(Box::new(move || {
            engine.process_path_edge(edge, mode);
        }));
    }

    fn process_path_edge(self: &Arc<Self>, edge: PathEdge<N, D>, mode: Mode) {
        let n = edge.target_node.clone();
        if self.icfg.is_call_stmt(&n) {
            self.process_call(edge, mode);
            return;
        }
        if self.icfg.is_exit_stmt(&n) {
            self.process_exit(edge.clone(), mode);
        }
        if !self.icfg.succs_of(&n).is_empty() {
            self.process_normal_flow(edge, mode);
        }
    }

    /// Seeds the trivial path edge `⟨d, s_p, d⟩` with `jumpFn[d, s_p, d] =
    /// identity` before scheduling it, matching the literature's
    /// `submitInitialSeeds` (Heros' `IDESolver`). Without this, the first
    /// worker to process a seed edge would find no jump-function entry at
    /// all, default to `allTop`, and compose every downstream edge function
    /// through `allTop` instead of identity — collapsing every result to
    /// `⊤` regardless of what the flow/edge functions actually compute.
    pub fn seed(self: &Arc<Self>, d: D, sp: N, mode: Mode) {
        self.propagate(d.clone(), sp, d, Arc::new(EdgeIdentity), mode);
    }

    /// §4.6 — the core write path. Returns `true` if the stored jump
    /// function actually changed (and therefore the edge was scheduled).
    fn propagate(self: &Arc<Self>, d1: D, n: N, d2: D, f_new: EdgeFn<V>, mode: Mode) -> bool {
        let lattice = self.problem.join_lattice();
        let changed = {
            let _guard = self.jump_fn.lock();
            let existing = self
                .jump_fn
                .get(&d1, &n, &d2)
                .unwrap_or_else(|| self.problem.all_top_function());
            let merged = join(&lattice, existing.clone(), f_new);
            if equal_to(&merged, &existing) {
                false
            } else {
                self.jump_fn.add(d1.clone(), n.clone(), d2.clone(), merged);
                true
            }
        };
        self.stats.propagation_count.fetch_add(1, Ordering::Relaxed);
        if changed {
            self.schedule(PathEdge::new(d1, n, d2), mode);
        }
        changed
    }

    /// §4.7 — Update-mode-only erasure. `clear_and_propagate(d1, n, None)`
    /// erases prior contributions at `n` and schedules the erased-fact path
    /// edge that propagates the deletion transitively; with an explicit
    /// `(d2, f_new)` it behaves like `propagate` after first clearing.
    fn clear_and_propagate(self: &Arc<Self>, d1: D, n: N, rest: Option<(D, EdgeFn<V>)>) {
        let first_touch = {
            let mut jump_save = self.jump_save.lock();
            let seen = jump_save.entry(n.clone()).or_default();
            seen.insert(d1.clone())
        };
        if first_touch {
            self.jump_fn.remove_by_source_and_target(&d1, &n);
            self.changed_nodes.insert(n.clone());
        }
        match rest {
            Some((d2, f_new)) => {
                self.propagate(d1, n, d2, f_new, Mode::Update);
            }
            None => {
                self.schedule(PathEdge::erased(d1, n), Mode::Update);
            }
        }
    }

    fn propagate_or_clear(self: &Arc<Self>, d1: D, n: N, d2: D, f: EdgeFn<V>, mode: Mode) {
        match mode {
            Mode::Compute => {
                self.propagate(d1, n, d2, f, mode);
            }
            Mode::Update => {
                self.clear_and_propagate(d1, n, Some((d2, f)));
            }
        }
    }

    fn clear_if_update(self: &Arc<Self>, mode: Mode, d1: D, n: N) {
        if mode == Mode::Update {
            self.clear_and_propagate(d1, n, None);
        }
    }

    /// Times and counts one call into `flowFunctions`'s factory (§6's
    /// `flowFunctionConstructionCount`/`durationFlowFunctionConstruction`).
    /// The counters are best-effort: a relaxed increment can race another
    /// worker's, but never under/over-counts by more than the concurrent
    /// calls in flight (Open Question Q4).
    fn construct_flow<R>(&self, build: impl FnOnce() -> R) -> R {
        let start = std::time::Instant::now();
        let flow = build();
        self.stats.flow_function_construction_count.fetch_add(1, Ordering::Relaxed);
        self.stats
            .duration_flow_function_construction_ms
            .fetch_add(start.elapsed().as_millis() as u64, Ordering::Relaxed);
        flow
    }

    /// Times and counts one call to a flow function's `compute_targets`
    /// (§6's `flowFunctionApplicationCount`/`durationFlowFunctionApplication`).
    fn apply_flow<D2>(&self, flow: &dyn crate::domain::flow_function::FlowFunction<D2>, fact: &D2) -> std::collections::HashSet<D2> {
        let start = std::time::Instant::now();
        let res = flow.compute_targets(fact);
        self.stats.flow_function_application_count.fetch_add(1, Ordering::Relaxed);
        self.stats
            .duration_flow_function_application_ms
            .fetch_add(start.elapsed().as_millis() as u64, Ordering::Relaxed);
        res
    }

    /// §4.3 — processNormalFlow.
    fn process_normal_flow(self: &Arc<Self>, edge: PathEdge<N, D>, mode: Mode) {
        let PathEdge {
            source_fact: d1,
            target_node: n,
            target_fact: d2,
        } = edge;

        if let TargetFact::Erased = d2 {
            for m in self.icfg.succs_of(&n) {
                self.clear_and_propagate(d1.clone(), m, None);
            }
            return;
        }
        let d2 = d2.real().cloned().expect("checked above");

        let f = self
            .jump_fn
            .get(&d1, &n, &d2)
            .unwrap_or_else(|| self.problem.all_top_function());

        for m in self.icfg.succs_of(&n) {
            let normal_flow = self.construct_flow(|| self.flow_functions.normal(&n, &m));
            let res = self.apply_flow(normal_flow.as_ref(), &d2);

            if res.is_empty() {
                self.clear_if_update(mode, d1.clone(), m.clone());
                continue;
            }
            for d3 in res {
                let edge_fn = self.edge_functions.normal(&n, &d2, &m, &d3);
                let f_prime = compose(f.clone(), edge_fn);
                self.propagate_or_clear(d1.clone(), m.clone(), d3, f_prime, mode);
            }
        }
    }

    /// §4.4 — processCall.
    fn process_call(self: &Arc<Self>, edge: PathEdge<N, D>, mode: Mode) {
        let PathEdge {
            source_fact: d1,
            target_node: n,
            target_fact: d2,
        } = edge;

        let ret_sites = self.icfg.return_sites_of_call_at(&n);

        if let TargetFact::Erased = d2 {
            for ret_site in ret_sites {
                self.clear_and_propagate(d1.clone(), ret_site, None);
            }
            return;
        }
        let d2 = d2.real().cloned().expect("checked above");

        let f = self
            .jump_fn
            .get(&d1, &n, &d2)
            .unwrap_or_else(|| self.problem.all_top_function());

        // B. Callee propagation.
        for callee in self.icfg.callees_of_call_at(&n) {
            let call_flow = self.construct_flow(|| self.flow_functions.call(&n, &callee));
            let res = self.apply_flow(call_flow.as_ref(), &d2);

            for sp in self.icfg.start_points_of(&callee) {
                for d3 in &res {
                    // Self-loop at the callee start (SRH line 15). Always a
                    // plain propagate, never clearAndPropagate, regardless
                    // of the overall mode; `mode` is passed through only so
                    // that further processing of the scheduled edge stays
                    // in the replay's current mode.
                    self.propagate(d3.clone(), sp.clone(), d3.clone(), Arc::new(EdgeIdentity), mode);

                    let snapshot = self.summaries.with_lock(|t| {
                        t.add_incoming(sp.clone(), d3.clone(), n.clone(), d2.clone());
                        t.snapshot_end_summary(&sp, d3)
                    });

                    for (ep, d4, f_callee_sum) in snapshot {
                        for ret_site in &ret_sites {
                            let ret_flow = self.construct_flow(|| self.flow_functions.ret(&n, &callee, &ep, ret_site));
                            let targets = self.apply_flow(ret_flow.as_ref(), &d4);

                            if targets.is_empty() {
                                self.clear_if_update(mode, d1.clone(), ret_site.clone());
                                continue;
                            }
                            for d5 in targets {
                                let call_edge_fn = self.edge_functions.call(&n, &d2, &callee, d3);
                                let ret_edge_fn =
                                    self.edge_functions.ret(&n, &callee, &ep, &d4, ret_site, &d5);
                                let f_prime = compose(compose(call_edge_fn, f_callee_sum.clone()), ret_edge_fn);
                                let f_total = compose(f.clone(), f_prime);
                                self.propagate_or_clear(d1.clone(), ret_site.clone(), d5, f_total, mode);
                            }
                        }
                    }
                }
            }
        }

        // C. Call-to-return intraprocedural.
        for ret_site in &ret_sites {
            let ctr_flow = self.construct_flow(|| self.flow_functions.call_to_return(&n, ret_site));
            let targets = self.apply_flow(ctr_flow.as_ref(), &d2);

            if targets.is_empty() {
                self.clear_if_update(mode, d1.clone(), ret_site.clone());
                continue;
            }
            for d3 in targets {
                let edge_fn = self.edge_functions.call_to_return(&n, &d2, ret_site, &d3);
                let f_total = compose(f.clone(), edge_fn);
                self.propagate_or_clear(d1.clone(), ret_site.clone(), d3, f_total, mode);
            }
        }
    }

    /// §4.5 — processExit, including unbalanced-return handling.
    fn process_exit(self: &Arc<Self>, edge: PathEdge<N, D>, mode: Mode) {
        let PathEdge {
            source_fact: d1,
            target_node: n,
            target_fact: d2,
        } = edge;

        let callee = self.icfg.method_of(&n);
        let f = if let TargetFact::Real(ref d2_real) = d2 {
            self.jump_fn
                .get(&d1, &n, d2_real)
                .unwrap_or_else(|| self.problem.all_top_function())
        } else {
            self.problem.all_top_function()
        };

        for sp in self.icfg.start_points_of(&callee) {
            let snapshot = self.summaries.with_lock(|t| {
                if let TargetFact::Real(ref d2_real) = d2 {
                    t.add_end_summary(sp.clone(), d1.clone(), n.clone(), d2_real.clone(), f.clone());
                }
                t.snapshot_incoming(&sp, &d1)
            });

            for (c, call_facts) in &snapshot {
                for ret_site in self.icfg.return_sites_of_call_at(c) {
                    if let TargetFact::Erased = d2 {
                        self.clear_and_propagate(d1.clone(), ret_site, None);
                        continue;
                    }
                    let d2_real = d2.real().cloned().expect("checked above");

                    let ret_flow = self.construct_flow(|| self.flow_functions.ret(c, &callee, &n, &ret_site));
                    let targets = self.apply_flow(ret_flow.as_ref(), &d2_real);

                    for d4 in call_facts {
                        for d5 in &targets {
                            let call_edge_fn = self.edge_functions.call(c, d4, &callee, &d1);
                            let ret_edge_fn =
                                self.edge_functions.ret(c, &callee, &n, &d2_real, &ret_site, d5);
                            let f_prime = compose(compose(call_edge_fn, f.clone()), ret_edge_fn);

                            for (d3, f3) in self.jump_fn.reverse_view(c, d4) {
                                if f3.is_all_top() {
                                    continue;
                                }
                                let f_total = compose(f3, f_prime.clone());
                                self.propagate_or_clear(d3, ret_site.clone(), d5.clone(), f_total, mode);
                            }
                        }
                        if targets.is_empty() && mode == Mode::Update {
                            for (d3, f3) in self.jump_fn.reverse_view(c, d4) {
                                if f3.is_all_top() {
                                    continue;
                                }
                                self.clear_and_propagate(d3, ret_site.clone(), None);
                            }
                        }
                    }
                }
            }

            // Unbalanced-return handling.
            let incoming_empty = self.summaries.with_lock(|t| t.incoming_is_empty(&sp, &d1));
            if incoming_empty && self.problem.follow_returns_past_seeds() {
                let callers = self.icfg.callers_of(&callee);
                if callers.is_empty() {
                    if let TargetFact::Real(ref d2_real) = d2 {
                        // Purely for side effects (taint/caching); the
                        // result is intentionally discarded.
                        let _ = self.apply_flow(self.construct_flow(|| self.flow_functions.normal(&n, &n)).as_ref(), d2_real);
                    }
                } else if let TargetFact::Real(ref d2_real) = d2 {
                    for c in callers {
                        for ret_site in self.icfg.return_sites_of_call_at(&c) {
                            let ret_flow = self.construct_flow(|| self.flow_functions.ret(&c, &callee, &n, &ret_site));
                            let targets = self.apply_flow(ret_flow.as_ref(), d2_real);
                            for d5 in targets {
                                let ret_edge_fn =
                                    self.edge_functions.ret(&c, &callee, &n, d2_real, &ret_site, &d5);
                                let f_total = compose(f.clone(), ret_edge_fn);
                                self.propagate_or_clear(d1.clone(), ret_site, d5, f_total, mode);
                            }
                        }
                    }
                }
            }
        }
    }
}
