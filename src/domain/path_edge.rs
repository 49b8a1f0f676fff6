//! C1 — PathEdge: the unit of work the worklist schedules.

use crate::domain::fact::TargetFact;

/// An immutable triple `⟨d1, n, d2⟩`: a realizable same-level path from the
/// enclosing method's start fact `d1` to `⟨n, d2⟩`. `d2` is either a real
/// fact or the erased-fact sentinel (Update mode only, see
/// [`TargetFact`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathEdge<N, D> {
    pub source_fact: D,
    pub target_node: N,
    pub target_fact: TargetFact<D>,
}

impl<N, D> PathEdge<N, D> {
    pub fn new(source_fact: D, target_node: N, target_fact: D) -> Self {
        Self {
            source_fact,
            target_node,
            target_fact: TargetFact::Real(target_fact),
        }
    }

    pub fn erased(source_fact: D, target_node: N) -> Self {
        Self {
            source_fact,
            target_node,
            target_fact: TargetFact::Erased,
        }
    }
}
