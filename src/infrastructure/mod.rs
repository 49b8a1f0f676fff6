//! Infrastructure: the concurrent tables and engines the domain traits get
//! wired into (C2-C7). Nothing in here is client-facing; `application::Solver`
//! is the only thing that constructs and drives these types.

pub mod incremental_updater;
pub mod jump_functions;
pub mod stats;
pub mod summary_tables;
pub mod tabulation_engine;
pub mod value_computation;
pub mod work_executor;

pub use incremental_updater::IncrementalUpdater;
pub use jump_functions::JumpFunctionTable;
pub use stats::{SolverStats, StatsSnapshot};
pub use summary_tables::SummaryTables;
pub use tabulation_engine::{EngineCore, Mode};
pub use value_computation::{ValTable, ValueComputation};
pub use work_executor::WorkExecutor;
