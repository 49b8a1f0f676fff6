//! C7 — IncrementalUpdater: the six-phase replay protocol (§4.8) plus the
//! predecessor-repropagated suppression check (§4.9).
//!
//! Grounded on `features/taint_analysis/infrastructure/differential/analyzer.rs`'s
//! (+ `differential/mod.rs`) `compare`/`compute_diff` changeset-then-reprocess
//! shape (analyze base vs. modified, diff into new/fixed vulnerabilities,
//! invalidate the analysis cache, then only re-analyze what the diff
//! touched) — generalized from that file's base-vs-modified vulnerability
//! diff onto the tabulation engine's expired/new node-and-edge changeset,
//! and from its single-pass re-analysis onto this crate's
//! `WorkExecutor`/`Mode::Update` replay.

use std::collections::VecDeque;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashSet;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::domain::icfg::{InterproceduralCfg, UpdatableIcfg};
use crate::domain::path_edge::PathEdge;
use crate::error::Result;
use crate::infrastructure::tabulation_engine::{EngineCore, Mode};
use crate::infrastructure::value_computation::{ValTable, ValueComputation};

/// Stateless driver over the six phases; takes everything it needs as
/// arguments rather than holding its own fields, since a full run only
/// happens once per `Solver::update()` call and there is nothing worth
/// keeping alive between calls.
pub struct IncrementalUpdater;

impl IncrementalUpdater {
    /// Runs Phases 0-5 and returns the `EngineCore` the solver should use
    /// from now on (the same tables, rebound to the new ICFG). If the
    /// changeset turns out to be empty, the original `old_engine` is
    /// returned unchanged — no replay was necessary.
    #[allow(clippy::too_many_arguments)]
    pub fn run<N, D, M, V>(
        old_engine: &Arc<EngineCore<N, D, M, V>>,
        old_icfg: &Arc<dyn UpdatableIcfg<N, M>>,
        new_icfg_updatable: Arc<dyn UpdatableIcfg<N, M>>,
        val: &Arc<ValTable<N, D, V>>,
        seeds: &[N],
        changeset_capacity_hint: usize,
    ) -> Result<Arc<EngineCore<N, D, M, V>>>
    where
        N: Clone + Eq + Hash + Debug + Send + Sync + 'static,
        D: Clone + Eq + Hash + Debug + Send + Sync + 'static,
        M: Clone + Eq + Hash + Debug + Send + Sync + 'static,
        V: Clone + Debug + PartialEq + Send + Sync + 'static,
    {
        // Phase 0 — changeset. `new_icfg_updatable` is the single source of
        // truth for the new graph; the `InterproceduralCfg` view the engine
        // walks in Phases 2-4 is derived from the same `Arc` via
        // `UpdatableAsIcfg` rather than taken as a separate argument, so the
        // two views can never drift apart.
        let changeset = old_icfg.compute_cfg_changeset(new_icfg_updatable.as_ref());
        new_icfg_updatable.merge(old_icfg.as_ref());
        old_engine.problem.invalidate_caches();

        if changeset.is_empty() {
            return Ok(old_engine.clone());
        }

        let new_icfg: Arc<dyn InterproceduralCfg<N, M>> =
            Arc::new(crate::domain::icfg::UpdatableAsIcfg(new_icfg_updatable.clone()));

        let new_engine = Arc::new(EngineCore {
            problem: old_engine.problem.clone(),
            icfg: new_icfg,
            flow_functions: old_engine.flow_functions.clone(),
            edge_functions: old_engine.edge_functions.clone(),
            jump_fn: old_engine.jump_fn.clone(),
            summaries: old_engine.summaries.clone(),
            executor: old_engine.executor.clone(),
            stats: old_engine.stats.clone(),
            jump_save: Mutex::new(FxHashMap::default()),
            changed_nodes: DashSet::new(),
        });

        // Phase 1 — remove expired nodes.
        for x in &changeset.expired_nodes {
            new_engine.jump_fn.remove_by_target(x);
            new_engine.summaries.with_lock(|t| t.remove_node(x));
        }

        // Phase 2 — build reprocessing work.
        let new_node_set: FxHashSet<N> = changeset.new_nodes.iter().cloned().collect();
        let mut change_set: FxHashMap<M, FxHashSet<N>> = FxHashMap::default();
        for (src, _dst) in changeset.expired_edges.iter().chain(changeset.new_edges.iter()) {
            if new_node_set.contains(src) {
                continue;
            }
            let method = new_engine.icfg.method_of(src);
            let entry = change_set
                .entry(method)
                .or_insert_with(|| FxHashSet::with_capacity_and_hasher(changeset_capacity_hint, Default::default()));
            if let Some(loop_start) = new_icfg_updatable.get_loop_start_point_for(src) {
                for p in new_engine.icfg.preds_of(&loop_start) {
                    entry.insert(p);
                }
            } else {
                entry.insert(src.clone());
            }
        }

        // Phase 3 — replay per starting node.
        for nodes in change_set.values() {
            let candidates: Vec<N> = nodes.iter().cloned().collect();
            for pre_loop in &candidates {
                if predecessor_repropagated(new_engine.icfg.as_ref(), nodes, pre_loop) {
                    continue;
                }
                if new_engine.changed_nodes.contains(pre_loop) {
                    continue;
                }
                new_engine.jump_save.lock().clear();
                for (d1, d2, _f) in new_engine.jump_fn.by_target_view(pre_loop) {
                    new_engine.schedule(PathEdge::new(d1, pre_loop.clone(), d2), Mode::Update);
                }
                new_engine.executor.await_completion()?;
            }
        }

        // Phase 4 — join-point recompute.
        let touched: Vec<N> = new_engine.changed_nodes.iter().map(|r| r.clone()).collect();
        for n in touched {
            if new_engine.icfg.is_exit_stmt(&n) {
                new_engine.summaries.with_lock(|t| t.remove_end_summaries_with_exit(&n));
            }
            let mut preds = new_engine.icfg.preds_of(&n);
            preds.extend(new_icfg_updatable.get_exit_nodes_for_return_site(&n));
            if preds.len() < 2 {
                continue;
            }
            for p in preds {
                for (d1, d2, _f) in new_engine.jump_fn.by_target_view(&p) {
                    new_engine.schedule(PathEdge::new(d1, p.clone(), d2), Mode::Compute);
                }
            }
        }
        new_engine.executor.await_completion()?;

        // Phase 5 — value recompute.
        val.clear();
        let vc = Arc::new(ValueComputation::new(
            new_engine.problem.clone(),
            new_engine.icfg.clone(),
            new_engine.flow_functions.clone(),
            new_engine.edge_functions.clone(),
            new_engine.jump_fn.clone(),
            new_engine.executor.clone(),
            val.clone(),
        ));
        vc.run(seeds)?;

        Ok(new_engine)
    }
}

/// §4.9 — backward BFS from `src_n`'s predecessors (never including `src_n`
/// itself, resolving Open Question Q1), stopping at the first member of `s`
/// encountered.
fn predecessor_repropagated<N, M>(icfg: &dyn InterproceduralCfg<N, M>, s: &FxHashSet<N>, src_n: &N) -> bool
where
    N: Clone + Eq + Hash,
{
    let mut visited: FxHashSet<N> = FxHashSet::default();
    let mut queue: VecDeque<N> = icfg.preds_of(src_n).into_iter().collect();

    while let Some(n) = queue.pop_front() {
        if !visited.insert(n.clone()) {
            continue;
        }
        if s.contains(&n) {
            return true;
        }
        for p in icfg.preds_of(&n) {
            if !visited.contains(&p) {
                queue.push_back(p);
            }
        }
    }
    false
}
