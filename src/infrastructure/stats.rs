//! Published counters (§6), resolved per Open Question Q4 as atomics rather
//! than unsynchronized "benign race" counters — see the design note under
//! §5 in `SPEC_FULL.md` for the reasoning.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct SolverStats {
    pub flow_function_application_count: AtomicU64,
    pub flow_function_construction_count: AtomicU64,
    pub propagation_count: AtomicU64,
    pub duration_flow_function_construction_ms: AtomicU64,
    pub duration_flow_function_application_ms: AtomicU64,
}

/// Point-in-time copy of the published counters, safe to log or hand to a
/// caller without further synchronization.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsSnapshot {
    pub flow_function_application_count: u64,
    pub flow_function_construction_count: u64,
    pub propagation_count: u64,
    pub duration_flow_function_construction_ms: u64,
    pub duration_flow_function_application_ms: u64,
}

impl SolverStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            flow_function_application_count: self.flow_function_application_count.load(Ordering::Relaxed),
            flow_function_construction_count: self.flow_function_construction_count.load(Ordering::Relaxed),
            propagation_count: self.propagation_count.load(Ordering::Relaxed),
            duration_flow_function_construction_ms: self
                .duration_flow_function_construction_ms
                .load(Ordering::Relaxed),
            duration_flow_function_application_ms: self
                .duration_flow_function_application_ms
                .load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.flow_function_application_count.store(0, Ordering::Relaxed);
        self.flow_function_construction_count.store(0, Ordering::Relaxed);
        self.propagation_count.store(0, Ordering::Relaxed);
        self.duration_flow_function_construction_ms.store(0, Ordering::Relaxed);
        self.duration_flow_function_application_ms.store(0, Ordering::Relaxed);
    }
}
