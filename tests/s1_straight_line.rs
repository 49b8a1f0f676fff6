//! S1 — straight-line intraprocedural propagation: `Z` survives node to
//! node with no branching and no calls.

mod common;

use std::sync::Arc;

use ide_solver::Solver;

use common::{GraphIcfg, MapEdgeFunctions, MapFlowFunctions, TestProblem, Z};

#[test]
fn zero_fact_reaches_the_end_of_a_straight_line() {
    let mut icfg = GraphIcfg::new();
    icfg.add_node(1, "m");
    icfg.add_node(2, "m");
    icfg.add_node(3, "m");
    icfg.add_edge(1, 2);
    icfg.add_edge(2, 3);
    icfg.mark_start(1);

    let problem = Arc::new(TestProblem {
        icfg: Arc::new(icfg),
        flow: Arc::new(MapFlowFunctions::default()),
        edge: Arc::new(MapEdgeFunctions::default()),
        seeds: vec![1],
        follow_returns_past_seeds: false,
        num_threads: 2,
        updatable: None,
    });

    let solver = Solver::new(problem);
    solver.solve().unwrap();

    assert_eq!(solver.result_at(&3, &Z), i64::MIN);
    assert_eq!(solver.result_at(&1, &Z), i64::MIN);
}
