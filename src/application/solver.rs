//! C8 — `Solver`: the façade a client actually holds. Everything in
//! `domain`/`infrastructure` is reachable only through here.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashSet;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{info_span, instrument};

use crate::config::{OptimizationMode, SolverConfig};
use crate::domain::flow_function::AutoAddZeroFlowFunctions;
use crate::domain::icfg::UpdatableIcfg;
use crate::domain::problem::{FlowFunctions, TabulationProblem};
use crate::error::{Result, SolverError};
use crate::infrastructure::jump_functions::JumpFunctionTable;
use crate::infrastructure::incremental_updater::IncrementalUpdater;
use crate::infrastructure::stats::{SolverStats, StatsSnapshot};
use crate::infrastructure::summary_tables::SummaryTables;
use crate::infrastructure::tabulation_engine::{EngineCore, Mode};
use crate::infrastructure::value_computation::{ValTable, ValueComputation};
use crate::infrastructure::work_executor::WorkExecutor;

/// Generic interprocedural IDE/IFDS solver (§6). Construct with
/// [`Solver::new`], call [`Solver::solve`], and read results back with
/// [`Solver::result_at`]/[`Solver::results_at`].
pub struct Solver<N, D, M, V> {
    engine: Mutex<Arc<EngineCore<N, D, M, V>>>,
    val: Arc<ValTable<N, D, V>>,
    config: Mutex<SolverConfig>,
    updatable_icfg: Mutex<Option<Arc<dyn UpdatableIcfg<N, M>>>>,
}

impl<N, D, M, V> Solver<N, D, M, V>
where
    N: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    D: Clone + Eq + Hash + Debug + PartialEq + Send + Sync + 'static,
    M: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    V: Clone + Debug + PartialEq + Send + Sync + 'static,
{
    pub fn new(problem: Arc<dyn TabulationProblem<N, D, M, V>>) -> Self {
        let icfg = problem.interprocedural_cfg();
        let flow_functions: Arc<dyn FlowFunctions<N, D, M>> = if problem.auto_add_zero() {
            Arc::new(AutoAddZeroFlowFunctions {
                inner: problem.flow_functions(),
                zero: problem.zero_value(),
            })
        } else {
            problem.flow_functions()
        };
        let edge_functions = problem.edge_functions();
        let executor = Arc::new(WorkExecutor::new(problem.num_threads()));
        let updatable_icfg = problem.updatable_icfg();

        let engine = Arc::new(EngineCore {
            problem,
            icfg,
            flow_functions,
            edge_functions,
            jump_fn: Arc::new(JumpFunctionTable::new()),
            summaries: Arc::new(SummaryTables::new()),
            executor,
            stats: Arc::new(SolverStats::default()),
            jump_save: Mutex::new(FxHashMap::default()),
            changed_nodes: DashSet::new(),
        });

        Self {
            engine: Mutex::new(engine),
            val: Arc::new(ValTable::default()),
            config: Mutex::new(SolverConfig::default()),
            updatable_icfg: Mutex::new(updatable_icfg),
        }
    }

    /// Seed every initial seed with `Z`, run the tabulation fixpoint to
    /// quiescence, then (unless `compute_values()` is false) run
    /// ValueComputation.
    #[instrument(skip_all)]
    pub fn solve(&self) -> Result<()> {
        let engine = self.engine.lock().clone();
        let seeds = engine.problem.initial_seeds();
        let zero = engine.problem.zero_value();

        {
            let _span = info_span!("tabulate", seed_count = seeds.len()).entered();
            for sp in &seeds {
                engine.seed(zero.clone(), sp.clone(), Mode::Compute);
            }
            engine.executor.await_completion()?;
        }

        if engine.problem.compute_values() {
            let _span = info_span!("value_computation").entered();
            let vc = Arc::new(ValueComputation::new(
                engine.problem.clone(),
                engine.icfg.clone(),
                engine.flow_functions.clone(),
                engine.edge_functions.clone(),
                engine.jump_fn.clone(),
                engine.executor.clone(),
                self.val.clone(),
            ));
            vc.run(&seeds)?;
        }
        Ok(())
    }

    /// Re-run tabulation incrementally against `new_icfg` (§6's single-argument
    /// `update(newICFG)`). Fails with [`SolverError::UnsupportedOperation`] if
    /// this solver was constructed from a `TabulationProblem` whose
    /// `updatable_icfg()` returned `None`.
    #[instrument(skip_all)]
    pub fn update(&self, new_icfg: Arc<dyn UpdatableIcfg<N, M>>) -> Result<()> {
        let old_engine = self.engine.lock().clone();
        let old_updatable = self
            .updatable_icfg
            .lock()
            .clone()
            .ok_or_else(|| SolverError::unsupported("ICFG does not implement UpdatableIcfg"))?;

        let seeds = old_engine.problem.initial_seeds();
        let capacity_hint = self.config.lock().optimization_mode.changeset_capacity_hint();
        let new_engine = IncrementalUpdater::run(
            &old_engine,
            &old_updatable,
            new_icfg.clone(),
            &self.val,
            &seeds,
            capacity_hint,
        )?;

        *self.engine.lock() = new_engine;
        *self.updatable_icfg.lock() = Some(new_icfg);
        Ok(())
    }

    /// `val(n,d)`, or `⊤` if no contribution was ever recorded.
    pub fn result_at(&self, n: &N, d: &D) -> V {
        let engine = self.engine.lock().clone();
        let lattice = engine.problem.join_lattice();
        self.val.get(n, d, lattice.as_ref())
    }

    /// Every non-`Z` fact recorded at `n`, with its value.
    pub fn results_at(&self, n: &N) -> Vec<(D, V)> {
        let engine = self.engine.lock().clone();
        let zero = engine.problem.zero_value();
        self.val.entries_at(n, &zero)
    }

    /// Clears `jumpFn`, `endSummary`/`incoming`, and `Val` so a subsequent
    /// `solve()` re-establishes every table from scratch (§3's "tables are
    /// cleared by `clearResults` and re-established by `solve`").
    pub fn clear_results(&self) {
        let engine = self.engine.lock().clone();
        engine.jump_fn.clear();
        engine.summaries.with_lock(|t| t.clear());
        engine.changed_nodes.clear();
        engine.jump_save.lock().clear();
        self.val.clear();
    }

    pub fn set_optimization_mode(&self, mode: OptimizationMode) {
        self.config.lock().optimization_mode = mode;
    }

    pub fn get_optimization_mode(&self) -> OptimizationMode {
        self.config.lock().optimization_mode
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.engine.lock().stats.snapshot()
    }

    pub fn print_stats(&self) {
        let snapshot = self.stats();
        tracing::info!(
            flow_function_application_count = snapshot.flow_function_application_count,
            flow_function_construction_count = snapshot.flow_function_construction_count,
            propagation_count = snapshot.propagation_count,
            duration_flow_function_construction_ms = snapshot.duration_flow_function_construction_ms,
            duration_flow_function_application_ms = snapshot.duration_flow_function_application_ms,
            "solver stats"
        );
    }
}
