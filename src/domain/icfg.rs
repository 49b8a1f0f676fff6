//! The interprocedural control-flow graph capability-set (`I`), and its
//! extension for incremental updates.
//!
//! Grounded on `features/taint_analysis/infrastructure/ifds_solver.rs`'s
//! `CFG`/`CFGEdgeKind` (which this crate's `TabulationEngine` dispatches on
//! in the same shape: normal / call / call-to-return / return), generalized
//! from that file's string-keyed, single-crate-internal `CFG` struct into an
//! abstract trait so the client owns the actual graph representation.

use std::sync::Arc;

/// Minimum capability-set an interprocedural CFG must provide.
pub trait InterproceduralCfg<N, M>: Send + Sync {
    fn succs_of(&self, n: &N) -> Vec<N>;
    fn preds_of(&self, n: &N) -> Vec<N>;
    fn is_call_stmt(&self, n: &N) -> bool;
    fn is_exit_stmt(&self, n: &N) -> bool;
    fn is_start_point(&self, n: &N) -> bool;
    fn callees_of_call_at(&self, n: &N) -> Vec<M>;
    fn return_sites_of_call_at(&self, n: &N) -> Vec<N>;
    fn callers_of(&self, m: &M) -> Vec<N>;
    fn calls_from_within(&self, m: &M) -> Vec<N>;
    fn start_points_of(&self, m: &M) -> Vec<N>;
    fn method_of(&self, n: &N) -> M;
    fn all_non_call_start_nodes(&self) -> Vec<N>;
}

/// The delta the incremental protocol needs between an old and a new ICFG:
/// edges/nodes whose realizability may have changed.
#[derive(Debug, Clone, Default)]
pub struct CfgChangeset<N> {
    pub expired_edges: Vec<(N, N)>,
    pub new_edges: Vec<(N, N)>,
    pub expired_nodes: Vec<N>,
    pub new_nodes: Vec<N>,
}

impl<N> CfgChangeset<N> {
    pub fn is_empty(&self) -> bool {
        self.expired_edges.is_empty() && self.new_edges.is_empty()
    }
}

/// Extra capabilities `IncrementalUpdater` (C7) needs. A `N` implementation
/// backing an `UpdatableIcfg` is expected to use a wrapper type whose
/// `Hash`/`Eq` are stable across `merge`, so that jump-function-table keys
/// computed before an update still resolve afterward (the "updatable
/// wrappers" design note).
pub trait UpdatableIcfg<N, M>: InterproceduralCfg<N, M> {
    /// Compute what changed going from `self` (the old graph) to `new_icfg`.
    fn compute_cfg_changeset(&self, new_icfg: &dyn InterproceduralCfg<N, M>) -> CfgChangeset<N>;

    /// The loop header enclosing `n`, if any, used by changeset Phase 2 to
    /// promote a changed node to its loop entry.
    fn get_loop_start_point_for(&self, n: &N) -> Option<N>;

    /// Exit nodes of the callee(s) reachable through the call whose return
    /// site is `n`, used by Phase 4's join-point predecessor set.
    fn get_exit_nodes_for_return_site(&self, n: &N) -> Vec<N>;

    /// Re-point any persistent node-wrapper identity at `self` so that keys
    /// computed against `old_icfg` keep resolving after the swap.
    fn merge(&self, old_icfg: &dyn InterproceduralCfg<N, M>);
}

/// Forwards `InterproceduralCfg` through a single `Arc<dyn UpdatableIcfg>`,
/// so `Solver::update` and `IncrementalUpdater` can take one graph object
/// instead of two and still hand the engine an `Arc<dyn
/// InterproceduralCfg<N, M>>` for Phases 2-4's `method_of`/`preds_of`/
/// `succs_of` walks. Without this there would be no way to guarantee the
/// "changeset" view and the "engine's new graph" view are the same object.
pub struct UpdatableAsIcfg<N, M>(pub Arc<dyn UpdatableIcfg<N, M>>);

impl<N, M> InterproceduralCfg<N, M> for UpdatableAsIcfg<N, M> {
    fn succs_of(&self, n: &N) -> Vec<N> {
        self.0.succs_of(n)
    }
    fn preds_of(&self, n: &N) -> Vec<N> {
        self.0.preds_of(n)
    }
    fn is_call_stmt(&self, n: &N) -> bool {
        self.0.is_call_stmt(n)
    }
    fn is_exit_stmt(&self, n: &N) -> bool {
        self.0.is_exit_stmt(n)
    }
    fn is_start_point(&self, n: &N) -> bool {
        self.0.is_start_point(n)
    }
    fn callees_of_call_at(&self, n: &N) -> Vec<M> {
        self.0.callees_of_call_at(n)
    }
    fn return_sites_of_call_at(&self, n: &N) -> Vec<N> {
        self.0.return_sites_of_call_at(n)
    }
    fn callers_of(&self, m: &M) -> Vec<N> {
        self.0.callers_of(m)
    }
    fn calls_from_within(&self, m: &M) -> Vec<N> {
        self.0.calls_from_within(m)
    }
    fn start_points_of(&self, m: &M) -> Vec<N> {
        self.0.start_points_of(m)
    }
    fn method_of(&self, n: &N) -> M {
        self.0.method_of(n)
    }
    fn all_non_call_start_nodes(&self) -> Vec<N> {
        self.0.all_non_call_start_nodes()
    }
}
