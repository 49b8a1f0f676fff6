//! Application layer: the public `Solver` façade (C8).

pub mod solver;

pub use solver::Solver;
