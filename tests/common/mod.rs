//! Shared black-box test harness: a tiny hand-built ICFG plus flow/edge
//! function maps, used by every scenario test under `tests/`. Facts are
//! compared by value, not location, matching §3's generic-parameter
//! contract, so the same `Fact("Z")`/`Fact("x")` labels can be reused across
//! unrelated nodes without the engine confusing them.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;

use ide_solver::{
    CfgChangeset, EdgeFn, EdgeFunction, EdgeFunctions, EdgeIdentity, FlowFn, FlowFunction, FlowFunctions,
    GenericAllTop, IdentityFlowFunction, InterproceduralCfg, JoinLattice, TabulationProblem, UpdatableIcfg,
};

pub type Node = i64;
pub type Method = &'static str;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fact(pub &'static str);

pub const Z: Fact = Fact("Z");

/// `V = ℤ ∪ {⊤,⊥}`, join = min, as used by every concrete scenario in §8.
#[derive(Debug, Default)]
pub struct MinLattice;

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

/// `compute_target(_) = self.0`, used by the constant-propagation scenario
/// (S2) to label an assignment's edge function.
#[derive(Debug, Clone, Copy)]
pub struct ConstEdge(pub i64);

impl EdgeFunction<i64> for ConstEdge {
    fn compute_target(&self, _value: &i64) -> i64 {
        self.0
    }
    fn dyn_eq(&self, other: &dyn EdgeFunction<i64>) -> bool {
        other.as_any().downcast_ref::<ConstEdge>().map(|o| o.0 == self.0).unwrap_or(false)
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A hand-built, mutable ICFG: plain adjacency plus the call-graph maps
/// §6 requires. `all_nodes`/`all_methods` back the incremental-update
/// changeset diff below, which otherwise has nothing to iterate against a
/// `&dyn InterproceduralCfg`.
#[derive(Debug, Clone, Default)]
pub struct GraphIcfg {
    pub all_nodes: Vec<Node>,
    pub succs: HashMap<Node, Vec<Node>>,
    pub is_call: HashSet<Node>,
    pub is_exit: HashSet<Node>,
    pub is_start: HashSet<Node>,
    pub callees: HashMap<Node, Vec<Method>>,
    pub return_sites: HashMap<Node, Vec<Node>>,
    pub method_of: HashMap<Node, Method>,
    pub starts_of: HashMap<Method, Vec<Node>>,
    pub calls_from_within: HashMap<Method, Vec<Node>>,
    /// Test-only escape hatch: nodes the *old* view of the graph should
    /// report as `expired_nodes` in its changeset, for scenarios that
    /// exercise Phase 1 cleanup directly rather than via edge diffing.
    pub forced_expired_nodes: Vec<Node>,
}

impl GraphIcfg {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, n: Node, method: Method) {
        if !self.all_nodes.contains(&n) {
            self.all_nodes.push(n);
        }
        self.method_of.insert(n, method);
    }

    pub fn add_edge(&mut self, from: Node, to: Node) {
        self.succs.entry(from).or_default().push(to);
    }

    pub fn mark_call(&mut self, n: Node, callees: Vec<Method>, return_sites: Vec<Node>) {
        self.is_call.insert(n);
        self.callees.insert(n, callees);
        self.return_sites.insert(n, return_sites);
        let method = self.method_of[&n];
        self.calls_from_within.entry(method).or_default().push(n);
    }

    pub fn mark_exit(&mut self, n: Node) {
        self.is_exit.insert(n);
    }

    pub fn mark_start(&mut self, n: Node) {
        self.is_start.insert(n);
        let method = self.method_of[&n];
        self.starts_of.entry(method).or_default().push(n);
    }
}

impl InterproceduralCfg<Node, Method> for GraphIcfg {
    fn succs_of(&self, n: &Node) -> Vec<Node> {
        self.succs.get(n).cloned().unwrap_or_default()
    }

    fn preds_of(&self, n: &Node) -> Vec<Node> {
        self.succs
            .iter()
            .filter_map(|(from, tos)| if tos.contains(n) { Some(*from) } else { None })
            .collect()
    }

    fn is_call_stmt(&self, n: &Node) -> bool {
        self.is_call.contains(n)
    }

    fn is_exit_stmt(&self, n: &Node) -> bool {
        self.is_exit.contains(n)
    }

    fn is_start_point(&self, n: &Node) -> bool {
        self.is_start.contains(n)
    }

    fn callees_of_call_at(&self, n: &Node) -> Vec<Method> {
        self.callees.get(n).cloned().unwrap_or_default()
    }

    fn return_sites_of_call_at(&self, n: &Node) -> Vec<Node> {
        self.return_sites.get(n).cloned().unwrap_or_default()
    }

    fn callers_of(&self, m: &Method) -> Vec<Node> {
        self.callees
            .iter()
            .filter_map(|(call_node, callees)| if callees.contains(m) { Some(*call_node) } else { None })
            .collect()
    }

    fn calls_from_within(&self, m: &Method) -> Vec<Node> {
        self.calls_from_within.get(m).cloned().unwrap_or_default()
    }

    fn start_points_of(&self, m: &Method) -> Vec<Node> {
        self.starts_of.get(m).cloned().unwrap_or_default()
    }

    fn method_of(&self, n: &Node) -> Method {
        self.method_of[n]
    }

    fn all_non_call_start_nodes(&self) -> Vec<Node> {
        self.all_nodes.iter().copied().filter(|n| !self.is_call.contains(n)).collect()
    }
}

impl UpdatableIcfg<Node, Method> for GraphIcfg {
    /// Diffs both structural successor edges and call-graph associations
    /// against `new_icfg`. A call-graph-only change (a callee added or
    /// removed at an unchanged call node) is reported as a self-edge
    /// `(n, n)` purely so Phase 2 can key off `n` as the changed node's
    /// method/src — `IncrementalUpdater` never reads the destination half
    /// of an (expired|new)_edges pair.
    fn compute_cfg_changeset(&self, new_icfg: &dyn InterproceduralCfg<Node, Method>) -> CfgChangeset<Node> {
        let mut expired_edges = Vec::new();
        let mut new_edges = Vec::new();

        for &n in &self.all_nodes {
            let old_succs: HashSet<Node> = self.succs_of(&n).into_iter().collect();
            let new_succs: HashSet<Node> = new_icfg.succs_of(&n).into_iter().collect();
            for s in old_succs.difference(&new_succs) {
                expired_edges.push((n, *s));
            }
            for s in new_succs.difference(&old_succs) {
                new_edges.push((n, *s));
            }

            if self.is_call_stmt(&n) {
                let old_callees: HashSet<Method> = self.callees_of_call_at(&n).into_iter().collect();
                let new_callees: HashSet<Method> = new_icfg.callees_of_call_at(&n).into_iter().collect();
                if old_callees != new_callees {
                    expired_edges.push((n, n));
                }
            }
        }

        CfgChangeset {
            expired_edges,
            new_edges,
            expired_nodes: self.forced_expired_nodes.clone(),
            new_nodes: Vec::new(),
        }
    }

    fn get_loop_start_point_for(&self, _n: &Node) -> Option<Node> {
        None
    }

    fn get_exit_nodes_for_return_site(&self, _n: &Node) -> Vec<Node> {
        Vec::new()
    }

    fn merge(&self, _old_icfg: &dyn InterproceduralCfg<Node, Method>) {
        // Node identity is a plain `i64`, stable by construction; nothing
        // to re-point.
    }
}

/// Per-edge-kind flow-function overrides, falling back to identity. Good
/// enough to express every §8 scenario: most edges are identity, and a
/// scenario that needs something else (kill, gen-a-fact) only has to
/// populate the one map entry it cares about.
#[derive(Default)]
pub struct MapFlowFunctions {
    pub normal: HashMap<(Node, Node), FlowFn<Fact>>,
    pub call: HashMap<(Node, Method), FlowFn<Fact>>,
    pub ret: HashMap<(Node, Method, Node, Node), FlowFn<Fact>>,
    pub call_to_return: HashMap<(Node, Node), FlowFn<Fact>>,
}

impl FlowFunctions<Node, Fact, Method> for MapFlowFunctions {
    fn normal(&self, curr: &Node, succ: &Node) -> FlowFn<Fact> {
        self.normal.get(&(*curr, *succ)).cloned().unwrap_or_else(|| Arc::new(IdentityFlowFunction))
    }

    fn call(&self, call_stmt: &Node, callee: &Method) -> FlowFn<Fact> {
        self.call.get(&(*call_stmt, *callee)).cloned().unwrap_or_else(|| Arc::new(IdentityFlowFunction))
    }

    fn ret(&self, call_site: &Node, callee: &Method, exit_stmt: &Node, return_site: &Node) -> FlowFn<Fact> {
        self.ret
            .get(&(*call_site, *callee, *exit_stmt, *return_site))
            .cloned()
            .unwrap_or_else(|| Arc::new(IdentityFlowFunction))
    }

    fn call_to_return(&self, call_site: &Node, return_site: &Node) -> FlowFn<Fact> {
        self.call_to_return
            .get(&(*call_site, *return_site))
            .cloned()
            .unwrap_or_else(|| Arc::new(IdentityFlowFunction))
    }
}

/// `f(d) = {d, gen}` for a single fixed `gen`, used by the constant
/// propagation scenario to introduce the assigned variable's fact.
#[derive(Debug, Clone)]
pub struct GenOnce(pub Fact);

impl FlowFunction<Fact> for GenOnce {
    fn compute_targets(&self, source_fact: &Fact) -> HashSet<Fact> {
        let mut out = HashSet::with_capacity(2);
        out.insert(*source_fact);
        out.insert(self.0);
        out
    }
}

/// Per-edge-kind edge-function overrides, falling back to identity.
#[derive(Default)]
pub struct MapEdgeFunctions {
    pub normal: HashMap<(Node, Fact, Node, Fact), EdgeFn<i64>>,
    pub call: HashMap<(Node, Fact, Method, Fact), EdgeFn<i64>>,
    pub ret: HashMap<(Node, Method, Node, Fact, Node, Fact), EdgeFn<i64>>,
    pub call_to_return: HashMap<(Node, Fact, Node, Fact), EdgeFn<i64>>,
}

impl EdgeFunctions<Node, Fact, Method, i64> for MapEdgeFunctions {
    fn normal(&self, curr: &Node, curr_fact: &Fact, succ: &Node, succ_fact: &Fact) -> EdgeFn<i64> {
        self.normal
            .get(&(*curr, *curr_fact, *succ, *succ_fact))
            .cloned()
            .unwrap_or_else(|| Arc::new(EdgeIdentity))
    }

    fn call(&self, call_stmt: &Node, call_fact: &Fact, callee: &Method, callee_fact: &Fact) -> EdgeFn<i64> {
        self.call
            .get(&(*call_stmt, *call_fact, *callee, *callee_fact))
            .cloned()
            .unwrap_or_else(|| Arc::new(EdgeIdentity))
    }

    fn ret(
        &self,
        call_site: &Node,
        callee: &Method,
        exit_stmt: &Node,
        exit_fact: &Fact,
        return_site: &Node,
        return_fact: &Fact,
    ) -> EdgeFn<i64> {
        self.ret
            .get(&(*call_site, *callee, *exit_stmt, *exit_fact, *return_site, *return_fact))
            .cloned()
            .unwrap_or_else(|| Arc::new(EdgeIdentity))
    }

    fn call_to_return(&self, call_site: &Node, call_fact: &Fact, return_site: &Node, return_fact: &Fact) -> EdgeFn<i64> {
        self.call_to_return
            .get(&(*call_site, *call_fact, *return_site, *return_fact))
            .cloned()
            .unwrap_or_else(|| Arc::new(EdgeIdentity))
    }
}

/// Everything `Solver::new` needs, assembled from the pieces above.
pub struct TestProblem {
    pub icfg: Arc<GraphIcfg>,
    pub flow: Arc<MapFlowFunctions>,
    pub edge: Arc<MapEdgeFunctions>,
    pub seeds: Vec<Node>,
    pub follow_returns_past_seeds: bool,
    pub num_threads: usize,
    pub updatable: Option<Arc<GraphIcfg>>,
}

impl TabulationProblem<Node, Fact, Method, i64> for TestProblem {
    fn flow_functions(&self) -> Arc<dyn FlowFunctions<Node, Fact, Method>> {
        self.flow.clone()
    }

    fn edge_functions(&self) -> Arc<dyn EdgeFunctions<Node, Fact, Method, i64>> {
        self.edge.clone()
    }

    fn interprocedural_cfg(&self) -> Arc<dyn InterproceduralCfg<Node, Method>> {
        self.icfg.clone()
    }

    fn initial_seeds(&self) -> Vec<Node> {
        self.seeds.clone()
    }

    fn zero_value(&self) -> Fact {
        Z
    }

    fn join_lattice(&self) -> Arc<dyn JoinLattice<i64>> {
        Arc::new(MinLattice)
    }

    fn all_top_function(&self) -> EdgeFn<i64> {
        Arc::new(GenericAllTop::new(&MinLattice))
    }

    fn follow_returns_past_seeds(&self) -> bool {
        self.follow_returns_past_seeds
    }

    fn num_threads(&self) -> usize {
        self.num_threads
    }

    fn updatable_icfg(&self) -> Option<Arc<dyn UpdatableIcfg<Node, Method>>> {
        self.updatable.clone().map(|icfg| icfg as Arc<dyn UpdatableIcfg<Node, Method>>)
    }
}
