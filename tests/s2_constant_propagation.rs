//! S2 — constant propagation: an assignment's flow function introduces a
//! new fact, and its edge function stamps a constant value onto it.

mod common;

use std::sync::Arc;

use ide_solver::Solver;

use common::{ConstEdge, GenOnce, GraphIcfg, MapEdgeFunctions, MapFlowFunctions, TestProblem, Fact, Z};

#[test]
fn assigned_variable_carries_its_constant_value() {
    let mut icfg = GraphIcfg::new();
    icfg.add_node(1, "m");
    icfg.add_node(2, "m");
    icfg.add_node(3, "m");
    icfg.add_edge(1, 2);
    icfg.add_edge(2, 3);
    icfg.mark_start(1);

    let x = Fact("x");

    let mut flow = MapFlowFunctions::default();
    flow.normal.insert((1, 2), Arc::new(GenOnce(x)));

    let mut edge = MapEdgeFunctions::default();
    edge.normal.insert((1, Z, 2, x), Arc::new(ConstEdge(42)));

    let problem = Arc::new(TestProblem {
        icfg: Arc::new(icfg),
        flow: Arc::new(flow),
        edge: Arc::new(edge),
        seeds: vec![1],
        follow_returns_past_seeds: false,
        num_threads: 2,
        updatable: None,
    });

    let solver = Solver::new(problem);
    solver.solve().unwrap();

    assert_eq!(solver.result_at(&2, &x), 42);
    assert_eq!(solver.result_at(&3, &x), 42);

    let entries = solver.results_at(&3);
    assert_eq!(entries, vec![(x, 42)]);
}
