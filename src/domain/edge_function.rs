//! Edge functions `F: V -> V` and their composition/join monoid.
//!
//! Grounded on `features/taint_analysis/infrastructure/ide_framework.rs`'s
//! `EdgeFunction` trait, generalized in two ways the source version did not
//! get right:
//!
//! - `compose`/`join` are free functions over `Arc<dyn EdgeFunction<V>>`
//!   rather than trait methods that ignore their `other` argument (the
//!   source's `IdentityEdgeFunction::compose`, `ConstantEdgeFunction::compose`
//!   and `AllTopEdgeFunction::compose` all did this). Building the composite
//!   wrapper types outside the trait keeps the trait object-safe while still
//!   performing real function composition.
//! - both free functions canonicalize away identity operands immediately
//!   (`f ∘ identity = f`, `identity ∘ f = f`) instead of nesting a nop
//!   wrapper, which is what makes `equal_to`'s structural comparison able to
//!   detect a fixpoint at all (see the design note on composition chains).

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use crate::domain::lattice::JoinLattice;

/// Reference-counted, immutable edge function. Cheap to clone and to share
/// across many jump-function-table entries.
pub type EdgeFn<V> = Arc<dyn EdgeFunction<V>>;

/// `F: V -> V`, the summary abstraction an edge in the exploded supergraph is
/// labeled with.
pub trait EdgeFunction<V>: Any + Send + Sync + Debug {
    /// Apply this function to a lattice value.
    fn compute_target(&self, value: &V) -> V;

    /// `true` for `EdgeIdentity`. Lets `compose`/`join` canonicalize without
    /// downcasting in the common case.
    fn is_identity(&self) -> bool {
        false
    }

    /// `true` for the sentinel `allTop` function supplied by
    /// `TabulationProblem::all_top_function`. `allTop` is the identity of
    /// `join` (never actually stored — absence means allTop) and is itself
    /// the image of any composition that runs through it as the second leg.
    fn is_all_top(&self) -> bool {
        false
    }

    /// Semantic, conservative equality against another edge function.
    /// Implementers (including this module's `Composed`/`Joined` wrappers)
    /// must only ever return `true` when the two functions are certainly
    /// equal; returning `false` when unsure merely costs an extra worklist
    /// iteration, never unsoundness.
    fn dyn_eq(&self, other: &dyn EdgeFunction<V>) -> bool;

    fn as_any(&self) -> &dyn Any;
}

/// `EdgeIdentity.compute_target(v) = v`. Used for the self-loop edge at a
/// callee start (SRH line 15) and as the neutral element of composition.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeIdentity;

impl<V: Clone + Send + Sync + Debug + 'static> EdgeFunction<V> for EdgeIdentity {
    fn compute_target(&self, value: &V) -> V {
        value.clone()
    }

    fn is_identity(&self) -> bool {
        true
    }

    fn dyn_eq(&self, other: &dyn EdgeFunction<V>) -> bool {
        other.is_identity()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Convenience `allTop` implementation for clients whose lattice's `top()`
/// can be computed once up front. Clients remain free to supply their own
/// `all_top_function()` edge function instead.
#[derive(Debug, Clone)]
pub struct GenericAllTop<V> {
    top: V,
}

impl<V: Clone + Send + Sync + Debug + 'static> GenericAllTop<V> {
    pub fn new(lattice: &dyn JoinLattice<V>) -> Self {
        Self { top: lattice.top() }
    }
}

impl<V: Clone + Send + Sync + Debug + 'static> EdgeFunction<V> for GenericAllTop<V> {
    fn compute_target(&self, _value: &V) -> V {
        self.top.clone()
    }

    fn is_all_top(&self) -> bool {
        true
    }

    fn dyn_eq(&self, other: &dyn EdgeFunction<V>) -> bool {
        other.is_all_top()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `(first ∘ second)(v) = second(first(v))`: `first` summarizes the path up
/// to a node, `second` is the one-step local edge function for the next
/// hop, matching processNormalFlow's `f.composeWith(edgeFunctions.normal(...))`.
#[derive(Debug)]
struct Composed<V> {
    first: EdgeFn<V>,
    second: EdgeFn<V>,
}

impl<V: Send + Sync + Debug + 'static> EdgeFunction<V> for Composed<V> {
    fn compute_target(&self, value: &V) -> V {
        self.second.compute_target(&self.first.compute_target(value))
    }

    fn dyn_eq(&self, other: &dyn EdgeFunction<V>) -> bool {
        match other.as_any().downcast_ref::<Composed<V>>() {
            Some(o) => equal_to(&self.first, &o.first) && equal_to(&self.second, &o.second),
            None => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Pointwise join of two edge functions under the caller-supplied lattice:
/// `joined(v) = lattice.join(a(v), b(v))`.
struct Joined<V> {
    lattice: Arc<dyn JoinLattice<V>>,
    a: EdgeFn<V>,
    b: EdgeFn<V>,
}

impl<V: Send + Sync + Debug + 'static> Debug for Joined<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Joined").field("a", &self.a).field("b", &self.b).finish()
    }
}

impl<V: Send + Sync + Debug + 'static> EdgeFunction<V> for Joined<V> {
    fn compute_target(&self, value: &V) -> V {
        let va = self.a.compute_target(value);
        let vb = self.b.compute_target(value);
        self.lattice.join(&va, &vb)
    }

    fn dyn_eq(&self, other: &dyn EdgeFunction<V>) -> bool {
        match other.as_any().downcast_ref::<Joined<V>>() {
            Some(o) => {
                (equal_to(&self.a, &o.a) && equal_to(&self.b, &o.b))
                    || (equal_to(&self.a, &o.b) && equal_to(&self.b, &o.a))
            }
            None => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `first ∘ second`, canonicalizing away identity operands so that repeated
/// composition against `EdgeIdentity` never grows a chain.
pub fn compose<V: Send + Sync + Debug + 'static>(first: EdgeFn<V>, second: EdgeFn<V>) -> EdgeFn<V> {
    if first.is_identity() {
        return second;
    }
    if second.is_identity() {
        return first;
    }
    Arc::new(Composed { first, second })
}

/// Pointwise join, with `allTop` (absence) acting as the identity element.
pub fn join<V: Send + Sync + Debug + 'static>(
    lattice: &Arc<dyn JoinLattice<V>>,
    a: EdgeFn<V>,
    b: EdgeFn<V>,
) -> EdgeFn<V> {
    if a.is_all_top() {
        return b;
    }
    if b.is_all_top() {
        return a;
    }
    Arc::new(Joined {
        lattice: lattice.clone(),
        a,
        b,
    })
}

/// Semantic equality between two edge functions: identical `Arc`s are always
/// equal; otherwise each side gets a chance to claim equality and the result
/// is over-approximated toward `false` (more worklist iterations, never
/// unsoundness) when neither recognizes the other.
pub fn equal_to<V>(a: &EdgeFn<V>, b: &EdgeFn<V>) -> bool {
    if Arc::ptr_eq(a, b) {
        return true;
    }
    a.dyn_eq(b.as_ref()) || b.dyn_eq(a.as_ref())
}
