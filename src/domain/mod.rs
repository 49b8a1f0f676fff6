//! Domain types: the abstractions a client implements to get a solver, and
//! the small immutable value types the engine itself is built from.

pub mod edge_function;
pub mod fact;
pub mod flow_function;
pub mod icfg;
pub mod lattice;
pub mod path_edge;
pub mod problem;

pub use edge_function::{compose, equal_to, join, EdgeFn, EdgeFunction, EdgeIdentity, GenericAllTop};
pub use fact::TargetFact;
pub use flow_function::{
    AutoAddZeroFlowFunctions, FlowFn, FlowFunction, GenFlowFunction, IdentityFlowFunction, KillFlowFunction,
};
pub use icfg::{CfgChangeset, InterproceduralCfg, UpdatableIcfg};
pub use lattice::JoinLattice;
pub use path_edge::PathEdge;
pub use problem::{EdgeFunctions, FlowFunctions, TabulationProblem};
