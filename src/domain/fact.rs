//! Dataflow fact and erased-fact sentinel.

use std::fmt::Debug;
use std::hash::Hash;

/// A dataflow fact `D`. Facts are opaque to the engine: compared by value,
/// hashed, and moved freely across worker threads.
pub trait DataflowFact: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> DataflowFact for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// The target-fact slot of a scheduled path edge.
///
/// During incremental updates a path edge may be scheduled purely to erase
/// prior contributions at a node rather than to propagate a real fact.
/// `Erased` is a distinct case from any `DataflowFact::clone()` of the zero
/// fact `Z`, so it can never collide with client-supplied data (Open
/// Question Q3).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetFact<D> {
    Real(D),
    Erased,
}

impl<D> TargetFact<D> {
    pub fn real(&self) -> Option<&D> {
        match self {
            TargetFact::Real(d) => Some(d),
            TargetFact::Erased => None,
        }
    }

    pub fn is_erased(&self) -> bool {
        matches!(self, TargetFact::Erased)
    }
}
