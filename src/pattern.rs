//! Pattern statistics and canonical variable numbering.

use crate::symbol::{FuncId, SortId};
use crate::term::{Term, TermId, TermStore};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;

#[cfg(feature = "tracing")]
use crate::trace::trace;

/// Structural statistics of a pattern, computed once by a preorder walk.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PatternStats {
    /// Occurrences of each function symbol.
    pub symbol_counts: FxHashMap<FuncId, u32>,
    /// Occurrences of each variable, keyed by the variable term.
    pub var_occurrences: FxHashMap<TermId, u32>,
    /// Highest variable index seen per sort.
    pub max_var: BTreeMap<SortId, u32>,
    /// Number of function-symbol nodes.
    pub size: u32,
    /// Variable occurrences beyond the first.
    pub repeated_vars: u32,
    /// Variables of each sort appear in first-occurrence order without gaps.
    pub normal: bool,
}

impl PatternStats {
    pub fn compute(pattern: TermId, terms: &TermStore) -> Self {
        let mut stats = PatternStats {
            normal: true,
            ..Default::default()
        };
        // Running (min, max) index per sort over first occurrences.
        let mut bounds: FxHashMap<SortId, (u32, u32)> = FxHashMap::default();
        let mut stack = vec![pattern];

        while let Some(t) = stack.pop() {
            match terms.resolve(t) {
                Some(Term::App(f, children)) => {
                    *stats.symbol_counts.entry(f).or_insert(0) += 1;
                    stats.size += 1;
                    stack.extend(children.iter().rev().copied());
                }
                Some(Term::Var { sort, index }) => {
                    let seen = stats.var_occurrences.entry(t).or_insert(0);
                    *seen += 1;
                    if *seen > 1 {
                        stats.repeated_vars += 1;
                        #[cfg(feature = "tracing")]
                        trace!(?pattern, var = ?t, "pattern_repeated_variable");
                        continue;
                    }
                    match bounds.get_mut(&sort) {
                        None => {
                            bounds.insert(sort, (index, index));
                        }
                        Some((min, max)) => {
                            if index < *min {
                                stats.normal = false;
                                *min = index;
                            }
                            if index > *max {
                                if index != *max + 1 {
                                    stats.normal = false;
                                }
                                *max = index;
                            }
                        }
                    }
                    let top = stats.max_var.entry(sort).or_insert(index);
                    *top = (*top).max(index);
                }
                None => {}
            }
        }
        stats
    }

    /// Number of distinct variables of `sort` under canonical numbering.
    pub fn var_count(&self, sort: SortId) -> u32 {
        self.max_var.get(&sort).map_or(0, |m| m + 1)
    }

    pub fn occurrences(&self, var: TermId) -> u32 {
        self.var_occurrences.get(&var).copied().unwrap_or(0)
    }
}

/// Memoized pattern statistics plus the per-round list of registered
/// patterns by sort.
///
/// Statistics are a pure function of the pattern and survive across rounds;
/// the registration lists are cleared at the start of every round.
#[derive(Debug, Default)]
pub struct PatternRegistry {
    stats: FxHashMap<TermId, PatternStats>,
    by_sort: BTreeMap<SortId, Vec<TermId>>,
    registered: FxHashSet<TermId>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear_round(&mut self) {
        self.by_sort.clear();
        self.registered.clear();
    }

    /// Register `pattern` under `sort`. No-op if already registered this round.
    pub fn register(&mut self, pattern: TermId, sort: SortId, terms: &TermStore) {
        if !self.registered.insert(pattern) {
            return;
        }
        debug_assert_eq!(terms.sort_of(pattern), Some(sort));
        self.by_sort.entry(sort).or_default().push(pattern);
        self.stats_for(pattern, terms);
    }

    pub fn is_registered(&self, pattern: TermId) -> bool {
        self.registered.contains(&pattern)
    }

    /// Patterns registered for `sort` this round, in registration order.
    pub fn patterns(&self, sort: SortId) -> &[TermId] {
        self.by_sort.get(&sort).map_or(&[], |v| v.as_slice())
    }

    pub fn stats(&self, pattern: TermId) -> Option<&PatternStats> {
        self.stats.get(&pattern)
    }

    /// Statistics of `pattern`, computing them on first request.
    pub fn stats_for(&mut self, pattern: TermId, terms: &TermStore) -> &PatternStats {
        self.stats
            .entry(pattern)
            .or_insert_with(|| PatternStats::compute(pattern, terms))
    }
}

/// Renumbers pattern variables per sort in first-occurrence order.
///
/// One canonicalizer can be applied to several terms in sequence so that
/// they share a numbering, as both sides of an equation must.
#[derive(Debug, Default)]
pub struct Canonicalizer {
    counts: BTreeMap<SortId, u32>,
    renaming: FxHashMap<TermId, TermId>,
}

impl Canonicalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical form of `term`, or None if it mentions a function rejected
    /// by `allowed`.
    pub fn canonicalize(
        &mut self,
        term: TermId,
        terms: &TermStore,
        allowed: &dyn Fn(FuncId) -> bool,
    ) -> Option<TermId> {
        match terms.resolve(term)? {
            Term::Var { sort, .. } => {
                if let Some(&renamed) = self.renaming.get(&term) {
                    return Some(renamed);
                }
                let next = self.counts.entry(sort).or_insert(0);
                let renamed = terms.var(sort, *next);
                *next += 1;
                self.renaming.insert(term, renamed);
                Some(renamed)
            }
            Term::App(f, children) => {
                if !allowed(f) {
                    return None;
                }
                let mut canon = smallvec::SmallVec::with_capacity(children.len());
                for child in children {
                    canon.push(self.canonicalize(child, terms, allowed)?);
                }
                Some(terms.app(f, canon))
            }
        }
    }
}

/// Canonical form of a single pattern over all functions.
pub fn canonicalize(pattern: TermId, terms: &TermStore) -> TermId {
    Canonicalizer::new()
        .canonicalize(pattern, terms, &|_| true)
        .unwrap_or(pattern)
}

/// True if the variables of each sort are numbered 0, 1, 2, ... in
/// first-occurrence order.
pub fn is_canonical(pattern: TermId, terms: &TermStore) -> bool {
    canonicalize(pattern, terms) == pattern
}

#[cfg(test)]
#[path = "tests/pattern.rs"]
mod tests;
