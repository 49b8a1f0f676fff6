//! S3 — interprocedural call/return: `Z` flows from a caller's call site,
//! through the callee, and back out to the caller's return site.

mod common;

use std::sync::Arc;

use ide_solver::Solver;

use common::{GraphIcfg, MapEdgeFunctions, MapFlowFunctions, TestProblem, Z};

fn build_icfg() -> GraphIcfg {
    let mut icfg = GraphIcfg::new();

    // main: 0 (start) -> 1 (call) -> 2 (return site) -> 3
    icfg.add_node(0, "main");
    icfg.add_node(1, "main");
    icfg.add_node(2, "main");
    icfg.add_node(3, "main");
    icfg.add_edge(0, 1);
    icfg.add_edge(2, 3);
    icfg.mark_start(0);
    icfg.mark_call(1, vec!["callee"], vec![2]);

    // callee: 10 (start) -> 11 (exit)
    icfg.add_node(10, "callee");
    icfg.add_node(11, "callee");
    icfg.add_edge(10, 11);
    icfg.mark_start(10);
    icfg.mark_exit(11);

    icfg
}

#[test]
fn zero_fact_round_trips_through_a_call() {
    let icfg = build_icfg();

    let problem = Arc::new(TestProblem {
        icfg: Arc::new(icfg),
        flow: Arc::new(MapFlowFunctions::default()),
        edge: Arc::new(MapEdgeFunctions::default()),
        seeds: vec![0],
        follow_returns_past_seeds: false,
        num_threads: 2,
        updatable: None,
    });

    let solver = Solver::new(problem);
    solver.solve().unwrap();

    assert_eq!(solver.result_at(&10, &Z), i64::MIN);
    assert_eq!(solver.result_at(&2, &Z), i64::MIN);
    assert_eq!(solver.result_at(&3, &Z), i64::MIN);
}
