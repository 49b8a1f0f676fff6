//! Flow functions `D -> 2^D`, grounded on
//! `features/taint_analysis/infrastructure/ifds_framework.rs`'s
//! `FlowFunction` trait.

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use crate::domain::problem::FlowFunctions;

/// A single intraprocedural/call/return/call-to-return flow function,
/// computing the set of facts reachable from one input fact across one
/// supergraph edge.
pub trait FlowFunction<D>: Send + Sync + Debug {
    fn compute_targets(&self, source_fact: &D) -> HashSet<D>;

    /// `true` when `compute_targets(d) == {d}` for all `d`; lets callers
    /// skip allocating a `HashSet` on the hot path if they choose to.
    fn is_identity(&self) -> bool {
        false
    }
}

pub type FlowFn<D> = Arc<dyn FlowFunction<D>>;

/// `f(d) = {d}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityFlowFunction;

impl<D: Clone + Eq + std::hash::Hash + Send + Sync + Debug + 'static> FlowFunction<D>
    for IdentityFlowFunction
{
    fn compute_targets(&self, source_fact: &D) -> HashSet<D> {
        let mut out = HashSet::with_capacity(1);
        out.insert(source_fact.clone());
        out
    }

    fn is_identity(&self) -> bool {
        true
    }
}

/// `f(d) = {}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KillFlowFunction;

impl<D: Clone + Eq + std::hash::Hash + Send + Sync + Debug + 'static> FlowFunction<D>
    for KillFlowFunction
{
    fn compute_targets(&self, _source_fact: &D) -> HashSet<D> {
        HashSet::new()
    }
}

/// `f(d) = {d, gen_fact}`.
#[derive(Debug, Clone)]
pub struct GenFlowFunction<D> {
    pub gen_fact: D,
}

impl<D: Clone + Eq + std::hash::Hash + Send + Sync + Debug + 'static> FlowFunction<D>
    for GenFlowFunction<D>
{
    fn compute_targets(&self, source_fact: &D) -> HashSet<D> {
        let mut out = HashSet::with_capacity(2);
        out.insert(source_fact.clone());
        out.insert(self.gen_fact.clone());
        out
    }
}

/// `autoAddZero()` decorator (§6): wraps a client's `FlowFunctions` so that
/// whenever `Z` itself is the source fact, `Z` is guaranteed to be present
/// in the result, even if the client's function forgot to propagate it.
/// Grounded on Heros' `ZeroedFlowFunctions` wrapper, the reference this
/// corner of the IFDS/IDE literature is usually implemented against.
pub struct AutoAddZeroFlowFunctions<N, D, M> {
    pub inner: Arc<dyn FlowFunctions<N, D, M>>,
    pub zero: D,
}

struct AutoAddZeroFlowFn<D> {
    inner: FlowFn<D>,
    zero: D,
}

impl<D: Clone + Eq + Hash + Send + Sync + Debug + 'static> FlowFunction<D> for AutoAddZeroFlowFn<D> {
    fn compute_targets(&self, source_fact: &D) -> HashSet<D> {
        let mut out = self.inner.compute_targets(source_fact);
        if *source_fact == self.zero {
            out.insert(self.zero.clone());
        }
        out
    }
}

impl<N, D, M> FlowFunctions<N, D, M> for AutoAddZeroFlowFunctions<N, D, M>
where
    D: Clone + Eq + Hash + Send + Sync + Debug + 'static,
{
    fn normal(&self, curr: &N, succ: &N) -> FlowFn<D> {
        Arc::new(AutoAddZeroFlowFn {
            inner: self.inner.normal(curr, succ),
            zero: self.zero.clone(),
        })
    }

    fn call(&self, call_stmt: &N, callee: &M) -> FlowFn<D> {
        Arc::new(AutoAddZeroFlowFn {
            inner: self.inner.call(call_stmt, callee),
            zero: self.zero.clone(),
        })
    }

    fn ret(&self, call_site: &N, callee: &M, exit_stmt: &N, return_site: &N) -> FlowFn<D> {
        Arc::new(AutoAddZeroFlowFn {
            inner: self.inner.ret(call_site, callee, exit_stmt, return_site),
            zero: self.zero.clone(),
        })
    }

    fn call_to_return(&self, call_site: &N, return_site: &N) -> FlowFn<D> {
        Arc::new(AutoAddZeroFlowFn {
            inner: self.inner.call_to_return(call_site, return_site),
            zero: self.zero.clone(),
        })
    }
}
