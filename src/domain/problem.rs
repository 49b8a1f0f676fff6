//! The `TabulationProblem` capability-set (§6): everything a client supplies
//! to get a `Solver`.

use std::sync::Arc;

use crate::domain::edge_function::EdgeFn;
use crate::domain::flow_function::FlowFn;
use crate::domain::icfg::InterproceduralCfg;
use crate::domain::lattice::JoinLattice;

/// Factory for the four flow-function kinds, grounded on
/// `ifds_framework.rs`'s `IFDSProblem` trait.
pub trait FlowFunctions<N, D, M>: Send + Sync {
    fn normal(&self, curr: &N, succ: &N) -> FlowFn<D>;
    fn call(&self, call_stmt: &N, callee: &M) -> FlowFn<D>;
    fn ret(&self, call_site: &N, callee: &M, exit_stmt: &N, return_site: &N) -> FlowFn<D>;
    fn call_to_return(&self, call_site: &N, return_site: &N) -> FlowFn<D>;
}

/// Factory for the four edge-function kinds, grounded on
/// `ide_framework.rs`'s `IDEProblem` trait. Each factory additionally takes
/// the specific `(source_fact, target_fact)` pair the edge connects, since
/// the edge function may depend on exactly which facts are involved (e.g. a
/// constant-propagation assignment's edge function differs per variable).
pub trait EdgeFunctions<N, D, M, V>: Send + Sync {
    fn normal(&self, curr: &N, curr_fact: &D, succ: &N, succ_fact: &D) -> EdgeFn<V>;
    fn call(&self, call_stmt: &N, call_fact: &D, callee: &M, callee_fact: &D) -> EdgeFn<V>;
    #[allow(clippy::too_many_arguments)]
    fn ret(
        &self,
        call_site: &N,
        callee: &M,
        exit_stmt: &N,
        exit_fact: &D,
        return_site: &N,
        return_fact: &D,
    ) -> EdgeFn<V>;
    fn call_to_return(&self, call_site: &N, call_fact: &D, return_site: &N, return_fact: &D) -> EdgeFn<V>;
}

/// Everything the engine needs from the client to run: the flow/edge
/// function factories, the ICFG, the seeds, the lattice, the `allTop`
/// sentinel, and the tuning knobs from §6.
pub trait TabulationProblem<N, D, M, V>: Send + Sync {
    fn flow_functions(&self) -> Arc<dyn FlowFunctions<N, D, M>>;
    fn edge_functions(&self) -> Arc<dyn EdgeFunctions<N, D, M, V>>;
    fn interprocedural_cfg(&self) -> Arc<dyn InterproceduralCfg<N, M>>;

    /// Program points used as tabulation roots, each seeded with the zero
    /// fact `Z`.
    fn initial_seeds(&self) -> Vec<N>;

    fn zero_value(&self) -> D;
    fn join_lattice(&self) -> Arc<dyn JoinLattice<V>>;
    fn all_top_function(&self) -> EdgeFn<V>;

    /// Whether every fact set implicitly carries `Z` alongside whatever the
    /// client's flow function computed.
    fn auto_add_zero(&self) -> bool {
        true
    }

    /// Enable processExit's unbalanced-return handling for methods with no
    /// observed callers.
    fn follow_returns_past_seeds(&self) -> bool {
        false
    }

    fn num_threads(&self) -> usize {
        num_cpus::get()
    }

    /// Whether to run Phase V (ValueComputation) after tabulation.
    fn compute_values(&self) -> bool {
        true
    }

    /// Called by `IncrementalUpdater` Phase 0 before any replay is
    /// scheduled. Clients that memoize `FlowFunctions`/`EdgeFunctions`
    /// results per-node should drop those caches here; the default does
    /// nothing, correct for clients whose factories are already cheap.
    fn invalidate_caches(&self) {}

    /// Supplies the `UpdatableIcfg` view of the same graph object handed
    /// back from `interprocedural_cfg()`, when the client wants `update()`
    /// to be available. Returning `None` (the default) makes `update()`
    /// fail with `SolverError::UnsupportedOperation`.
    fn updatable_icfg(&self) -> Option<Arc<dyn crate::domain::icfg::UpdatableIcfg<N, M>>> {
        None
    }
}
