//! Immediate-generalization DAG over the patterns discovered in a round.

use crate::matching::is_generalization;
use crate::symbol::SortId;
use crate::term::{TermId, TermStore};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::collections::BTreeMap;

#[cfg(feature = "tracing")]
use crate::trace::trace;

/// Per-sort lattice of patterns ordered by generalization.
///
/// Only immediate edges are stored: when inserting a pattern, generalizers
/// that are ancestors of an already found generalizer are skipped.
#[derive(Debug, Default)]
pub struct GeneralizationLattice {
    by_sort: BTreeMap<SortId, Vec<TermId>>,
    parents: FxHashMap<TermId, SmallVec<[TermId; 4]>>,
    children: FxHashMap<TermId, SmallVec<[TermId; 4]>>,
    depth: FxHashMap<TermId, u32>,
    maxima: BTreeMap<SortId, Vec<TermId>>,
}

impl GeneralizationLattice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.by_sort.clear();
        self.parents.clear();
        self.children.clear();
        self.depth.clear();
        self.maxima.clear();
    }

    /// Insert `pattern` of `sort`, linking it under its immediate generalizers
    /// among earlier patterns. Returns its depth.
    pub fn insert(&mut self, pattern: TermId, sort: SortId, terms: &TermStore) -> u32 {
        debug_assert!(
            !self.depth.contains_key(&pattern),
            "pattern inserted into the lattice twice"
        );
        let mut processed: FxHashSet<TermId> = FxHashSet::default();
        let mut max_parent_depth: Option<u32> = None;
        let mut parents: SmallVec<[TermId; 4]> = SmallVec::new();

        let earlier = self.by_sort.get(&sort).map_or(&[][..], |v| v.as_slice());
        for &candidate in earlier.iter().rev() {
            if processed.contains(&candidate) || !is_generalization(candidate, pattern, terms) {
                continue;
            }
            parents.push(candidate);
            let d = self.depth.get(&candidate).copied().unwrap_or(0);
            max_parent_depth = Some(max_parent_depth.map_or(d, |m| m.max(d)));
            self.mark_ancestors(candidate, &mut processed);
        }

        let depth = max_parent_depth.map_or(0, |d| d + 1);
        for &parent in &parents {
            self.children.entry(parent).or_default().push(pattern);
        }
        if parents.is_empty() {
            self.maxima.entry(sort).or_default().push(pattern);
        }
        #[cfg(feature = "tracing")]
        trace!(?pattern, depth, parents = parents.len(), "lattice_insert");
        self.parents.insert(pattern, parents);
        self.depth.insert(pattern, depth);
        self.by_sort.entry(sort).or_default().push(pattern);
        depth
    }

    fn mark_ancestors(&self, start: TermId, processed: &mut FxHashSet<TermId>) {
        let mut stack = vec![start];
        while let Some(p) = stack.pop() {
            if !processed.insert(p) {
                continue;
            }
            if let Some(ps) = self.parents.get(&p) {
                stack.extend(ps.iter().copied());
            }
        }
    }

    pub fn contains(&self, pattern: TermId) -> bool {
        self.depth.contains_key(&pattern)
    }

    pub fn depth(&self, pattern: TermId) -> Option<u32> {
        self.depth.get(&pattern).copied()
    }

    /// Immediate generalizers of `pattern`.
    pub fn parents(&self, pattern: TermId) -> &[TermId] {
        self.parents.get(&pattern).map_or(&[], |v| v.as_slice())
    }

    /// Immediate instances of `pattern`.
    pub fn children(&self, pattern: TermId) -> &[TermId] {
        self.children.get(&pattern).map_or(&[], |v| v.as_slice())
    }

    /// Patterns of `sort` with no generalizer, in discovery order.
    pub fn maxima(&self, sort: SortId) -> &[TermId] {
        self.maxima.get(&sort).map_or(&[], |v| v.as_slice())
    }

    /// All patterns of `sort` in discovery order.
    pub fn patterns(&self, sort: SortId) -> &[TermId] {
        self.by_sort.get(&sort).map_or(&[], |v| v.as_slice())
    }
}

#[cfg(test)]
#[path = "tests/lattice.rs"]
mod tests;
