//! Congruence over patterns that are already known to be equal.
//!
//! Patterns enter lazily. Each new class triggers a lookup of the theorem
//! index; equivalent patterns that are relevant, or that would be a better
//! representative, are merged in. Every class keeps a preferred visible
//! representative chosen by [`universal_less_than`].

use crate::congruence::{CongruenceClosure, MergeListener};
use crate::pattern::PatternRegistry;
use crate::term::{Term, TermId, TermStore};
use crate::theorem_index::TheoremIndex;
use rustc_hash::{FxHashMap, FxHashSet};

#[cfg(feature = "tracing")]
use crate::trace::trace;

/// Collaborators consulted while extending the relation.
pub struct UniversalCtx<'a> {
    pub registry: &'a mut PatternRegistry,
    pub theorems: &'a TheoremIndex,
    pub terms: &'a TermStore,
}

/// Strict preference between two patterns for class representative:
/// normal beats non-normal, then fewer function symbols, then a pattern
/// already reported canonical beats one that is not.
pub fn universal_less_than(
    a: TermId,
    b: TermId,
    registry: &mut PatternRegistry,
    reported: &FxHashSet<TermId>,
    terms: &TermStore,
) -> bool {
    let (a_normal, a_size) = {
        let s = registry.stats_for(a, terms);
        (s.normal, s.size)
    };
    let (b_normal, b_size) = {
        let s = registry.stats_for(b, terms);
        (s.normal, s.size)
    };
    if a_normal != b_normal {
        return a_normal;
    }
    if a_size != b_size {
        return a_size < b_size;
    }
    reported.contains(&a) && !reported.contains(&b)
}

struct RepresentativeTracker<'a, 'b> {
    reps: &'a mut FxHashMap<TermId, TermId>,
    pending: &'a mut Vec<TermId>,
    reported: &'a FxHashSet<TermId>,
    registry: &'a mut PatternRegistry,
    terms: &'b TermStore,
}

impl MergeListener for RepresentativeTracker<'_, '_> {
    fn new_class(&mut self, term: TermId) {
        self.pending.push(term);
    }

    fn pre_merge(&mut self, survivor: TermId, absorbed: TermId) {
        let rs = self.reps.get(&survivor).copied().unwrap_or(survivor);
        let ra = self.reps.get(&absorbed).copied().unwrap_or(absorbed);
        if universal_less_than(ra, rs, self.registry, self.reported, self.terms) {
            self.reps.insert(survivor, ra);
        }
    }
}

#[derive(Debug, Default)]
pub struct UniversalEquivalence {
    cc: CongruenceClosure,
    /// Preferred representative per congruence-closure representative.
    reps: FxHashMap<TermId, TermId>,
    pending: Vec<TermId>,
    relevant: FxHashSet<TermId>,
    reported: FxHashSet<TermId>,
    /// Host equalities already asserted, with scope marks.
    asserted: FxHashSet<(TermId, TermId)>,
    asserted_log: Vec<(TermId, TermId)>,
    asserted_scopes: Vec<usize>,
}

impl UniversalEquivalence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget round-local relevance and canonicity reports.
    pub fn reset_round(&mut self) {
        self.relevant.clear();
        self.reported.clear();
    }

    pub fn is_relevant(&self, t: TermId) -> bool {
        self.relevant.contains(&t)
    }

    pub fn mark_reported_canon(&mut self, t: TermId) {
        self.reported.insert(t);
    }

    pub fn is_reported_canon(&self, t: TermId) -> bool {
        self.reported.contains(&t)
    }

    pub fn has_term(&self, t: TermId) -> bool {
        self.cc.has_term(t)
    }

    /// Mark `t` and its subterms relevant and register them as patterns.
    fn set_relevant(&mut self, t: TermId, ctx: &mut UniversalCtx<'_>) {
        let mut stack = vec![t];
        while let Some(u) = stack.pop() {
            if !self.relevant.insert(u) {
                continue;
            }
            if let Some(sort) = ctx.terms.sort_of(u) {
                ctx.registry.register(u, sort, ctx.terms);
            }
            if let Some(Term::App(_, children)) = ctx.terms.resolve(u) {
                stack.extend(children);
            }
        }
    }

    fn add_term(&mut self, t: TermId, ctx: &mut UniversalCtx<'_>) {
        let mut tracker = RepresentativeTracker {
            reps: &mut self.reps,
            pending: &mut self.pending,
            reported: &self.reported,
            registry: &mut *ctx.registry,
            terms: ctx.terms,
        };
        self.cc.add_term_with(t, ctx.terms, &mut tracker);
    }

    fn merge(&mut self, a: TermId, b: TermId, ctx: &mut UniversalCtx<'_>) {
        #[cfg(feature = "tracing")]
        trace!(?a, ?b, "universal_merge");
        let mut tracker = RepresentativeTracker {
            reps: &mut self.reps,
            pending: &mut self.pending,
            reported: &self.reported,
            registry: &mut *ctx.registry,
            terms: ctx.terms,
        };
        self.cc.assert_equal_with(a, b, ctx.terms, &mut tracker);
    }

    /// Drain newly created classes, pulling in theorem-equivalent patterns.
    fn process_pending(&mut self, ctx: &mut UniversalCtx<'_>) {
        while let Some(t) = self.pending.pop() {
            for e in ctx.theorems.equivalent_terms(t, ctx.terms) {
                if e == t {
                    continue;
                }
                if self.relevant.contains(&e) {
                    self.merge(t, e, ctx);
                    continue;
                }
                if let Some(sort) = ctx.terms.sort_of(e) {
                    ctx.registry.register(e, sort, ctx.terms);
                }
                if universal_less_than(e, t, ctx.registry, &self.reported, ctx.terms) {
                    self.set_relevant(e, ctx);
                    self.merge(t, e, ctx);
                }
            }
        }
    }

    /// Preferred representative of `n`. With `add`, `n` is first made
    /// relevant and entered into the relation. Unknown patterns represent
    /// themselves.
    pub fn representative(&mut self, n: TermId, add: bool, ctx: &mut UniversalCtx<'_>) -> TermId {
        if add && !self.relevant.contains(&n) {
            self.set_relevant(n, ctx);
            self.add_term(n, ctx);
            self.process_pending(ctx);
        }
        self.current_representative(n)
    }

    /// Representative without extending the relation.
    pub fn current_representative(&self, n: TermId) -> TermId {
        if !self.cc.has_term(n) {
            return n;
        }
        let r = self.cc.representative(n);
        self.reps.get(&r).copied().unwrap_or(r)
    }

    pub fn are_equal(&self, a: TermId, b: TermId) -> bool {
        self.cc.are_equal(a, b)
    }

    /// Assert that two patterns are universally equal.
    pub fn assert_equal(&mut self, a: TermId, b: TermId, ctx: &mut UniversalCtx<'_>) {
        self.merge(a, b, ctx);
        self.process_pending(ctx);
    }

    /// Record a host equality; false if it was already recorded in scope.
    pub fn note_asserted(&mut self, lhs: TermId, rhs: TermId) -> bool {
        if !self.asserted.insert((lhs, rhs)) {
            return false;
        }
        self.asserted_log.push((lhs, rhs));
        true
    }

    pub fn is_asserted(&self, lhs: TermId, rhs: TermId) -> bool {
        self.asserted.contains(&(lhs, rhs))
    }

    pub fn push(&mut self) {
        self.cc.push();
        self.asserted_scopes.push(self.asserted_log.len());
    }

    /// Undo every equality asserted since the matching `push`.
    pub fn pop(&mut self, ctx: &mut UniversalCtx<'_>) {
        let mark = self
            .asserted_scopes
            .pop()
            .unwrap_or_else(|| panic!("universal equivalence popped without a matching push"));
        for entry in self.asserted_log.drain(mark..) {
            self.asserted.remove(&entry);
        }
        self.reps.clear();
        let mut tracker = RepresentativeTracker {
            reps: &mut self.reps,
            pending: &mut self.pending,
            reported: &self.reported,
            registry: &mut *ctx.registry,
            terms: ctx.terms,
        };
        self.cc.pop_with(ctx.terms, &mut tracker);
        // Replay re-announces every class; their theorem consequences are
        // already part of the surviving log.
        self.pending.clear();
    }
}

#[cfg(test)]
#[path = "tests/universal.rs"]
mod tests;
