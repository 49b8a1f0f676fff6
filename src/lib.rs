//! Generic interprocedural IDE/IFDS tabulation solver.
//!
//! Implements the Reps-Horwitz-Sagiv (SRH'96) exploded-supergraph
//! tabulation algorithm, Sagiv-Reps-Horwitz's IDE extension for
//! distributive lattice values along edge functions, and the
//! Naeem-Lhoták-Rodriguez (CC'10) end-summary/incoming worklist
//! bookkeeping, plus an incremental-update mode that replays only the
//! sub-graph affected by an ICFG change.
//!
//! A client implements [`domain::TabulationProblem`] (flow functions, edge
//! functions, the ICFG, seeds, lattice) and drives it through
//! [`application::Solver`].

#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

// ═══════════════════════════════════════════════════════════════════════
// Module layout
// ═══════════════════════════════════════════════════════════════════════

/// The client-facing façade: `Solver` (C8).
pub mod application;

/// Crate-level configuration (`SolverConfig`, `OptimizationMode`).
pub mod config;

/// The traits and value types a client implements or constructs: facts,
/// flow/edge functions, the lattice, the ICFG, path edges (C1).
pub mod domain;

/// Crate-level error type.
pub mod error;

/// The concurrent tables and engines behind the façade (C2-C7).
pub mod infrastructure;

pub use application::Solver;
pub use config::{OptimizationMode, SolverConfig};
pub use domain::{
    compose, equal_to, join, AutoAddZeroFlowFunctions, CfgChangeset, EdgeFn, EdgeFunction, EdgeFunctions,
    EdgeIdentity, FlowFn, FlowFunction, FlowFunctions, GenFlowFunction, GenericAllTop, IdentityFlowFunction,
    InterproceduralCfg, JoinLattice, KillFlowFunction, PathEdge, TabulationProblem, TargetFact, UpdatableIcfg,
};
pub use error::{Result, SolverError};
pub use infrastructure::{StatsSnapshot, WorkExecutor};
