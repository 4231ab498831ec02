//! Resumable, depth-bounded pattern enumeration.
//!
//! A [`TermEnumerator`] owns a stack of generator nodes. The root node
//! produces terms of one sort (or of every sort); an application node spawns
//! one child node per argument. Each call to [`TermEnumerator::next_term`]
//! advances the tree to the next pattern in depth-first order: a fresh
//! variable first, then each variable already in scope, then applications of
//! the function universe in order with the last argument varying fastest.
//!
//! Nodes are allocated and released strictly LIFO. The same tree can be
//! matched against a ground class with [`TermEnumerator::next_match`], which
//! walks the model's per-function argument tries in the same order.

use crate::model::ModelIndex;
use crate::symbol::{FuncId, SortId};
use crate::term::{FuncKind, Signature, TermId, TermStore};
use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::collections::BTreeMap;

#[cfg(feature = "tracing")]
use crate::trace::trace;

/// Function symbols available for enumeration, ordered per result sort.
#[derive(Debug, Clone, Default)]
pub struct FunctionUniverse {
    all: Vec<FuncId>,
    by_sort: BTreeMap<SortId, Vec<FuncId>>,
    args: FxHashMap<FuncId, SmallVec<[SortId; 4]>>,
}

impl FunctionUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every function with a handled application in the model, except
    /// selectors, skolems and predicates.
    pub fn collect(model: &ModelIndex, terms: &TermStore, bool_sort: SortId) -> Self {
        let mut universe = Self::new();
        for &f in model.functions() {
            let Some(sig) = terms.signature(f) else {
                continue;
            };
            if matches!(sig.kind, FuncKind::Selector | FuncKind::Skolem) || sig.result == bool_sort
            {
                continue;
            }
            universe.add(f, &sig);
        }
        universe
    }

    pub fn add(&mut self, f: FuncId, sig: &Signature) {
        if self.args.contains_key(&f) {
            return;
        }
        self.args.insert(f, sig.args.clone());
        self.all.push(f);
        self.by_sort.entry(sig.result).or_default().push(f);
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.all.shuffle(rng);
        for funcs in self.by_sort.values_mut() {
            funcs.shuffle(rng);
        }
    }

    /// Functions producing `sort`, or every function for `None`.
    pub fn funcs(&self, sort: Option<SortId>) -> &[FuncId] {
        match sort {
            None => &self.all,
            Some(s) => self.by_sort.get(&s).map_or(&[], |v| v.as_slice()),
        }
    }

    pub fn arg_sorts(&self, f: FuncId) -> &[SortId] {
        self.args.get(&f).map_or(&[], |v| v.as_slice())
    }

    pub fn contains(&self, f: FuncId) -> bool {
        self.args.contains_key(&f)
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

/// Which running candidate-class set a match narrows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSet {
    /// Classes without a ground term; an empty set prunes the branch.
    Subsumption = 0,
    /// Classes with a ground term; used to gather witnesses.
    Confirmation = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchMode {
    /// Distinct fresh variables must bind distinct classes.
    pub distinct: bool,
    /// Fresh variables may only bind classes with a ground term.
    pub ground_only: bool,
}

/// Ground-class pruning applied while enumerating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassFilter {
    pub active: bool,
    pub distinct_vars: bool,
    pub confirmation: bool,
    pub ground_only: bool,
}

impl ClassFilter {
    pub fn inactive() -> Self {
        Self::default()
    }

    pub fn mode(&self, set: CandidateSet) -> MatchMode {
        match set {
            CandidateSet::Subsumption => MatchMode {
                distinct: self.distinct_vars,
                ground_only: false,
            },
            CandidateSet::Confirmation => MatchMode {
                distinct: false,
                ground_only: self.confirmation && self.ground_only,
            },
        }
    }
}

/// Read-only context for one enumeration.
pub struct EnumEnv<'a> {
    pub terms: &'a TermStore,
    pub universe: &'a FunctionUniverse,
    pub model: &'a ModelIndex,
    pub filter: ClassFilter,
}

/// Final say on a completely built pattern.
pub trait CanonFilter {
    /// `class_filtering` tells whether ground-class pruning is active.
    fn admit(&mut self, term: TermId, class_filtering: bool) -> bool;
}

/// Accepts every pattern.
pub struct AcceptAll;

impl CanonFilter for AcceptAll {
    fn admit(&mut self, _term: TermId, _class_filtering: bool) -> bool {
        true
    }
}

/// Variable bindings produced by matching, keyed by (sort, index).
#[derive(Debug, Clone, Default)]
pub struct MatchBinding {
    subs: BTreeMap<(SortId, u32), TermId>,
    used: FxHashSet<TermId>,
}

impl MatchBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, sort: SortId, index: u32) -> Option<TermId> {
        self.subs.get(&(sort, index)).copied()
    }

    pub fn len(&self) -> usize {
        self.subs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    /// Bindings ordered by sort, then index.
    pub fn iter(&self) -> impl Iterator<Item = ((SortId, u32), TermId)> + '_ {
        self.subs.iter().map(|(k, v)| (*k, *v))
    }
}

pub type GenId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Start,
    /// Produced freshly allocated variable `index`.
    FreshVar(u32),
    /// Producing variables already in scope; holds the current one.
    Reuse(Option<u32>),
    /// Next function to try.
    Functions { next: usize },
    /// Building an application; `child` is the argument being driven.
    Apply { func: usize, child: isize },
    Exhausted,
}

#[derive(Debug, Clone, Default)]
struct Matcher {
    mode: MatchMode,
    entered: bool,
    bound: bool,
    child: isize,
    /// Per matched argument level: (trie node, edge position).
    cursors: SmallVec<[(u32, usize); 4]>,
}

#[derive(Debug, Clone)]
struct Generator {
    sort: Option<SortId>,
    step: Step,
    children: SmallVec<[GenId; 4]>,
    matcher: Matcher,
}

impl Generator {
    fn new(sort: Option<SortId>) -> Self {
        Self {
            sort,
            step: Step::Start,
            children: SmallVec::new(),
            matcher: Matcher::default(),
        }
    }
}

#[derive(Debug)]
pub struct TermEnumerator {
    gens: Vec<Generator>,
    allocated: BTreeMap<SortId, u32>,
    limits: BTreeMap<SortId, u32>,
    gdepth: u32,
    gdepth_limit: Option<u32>,
    /// Candidate classes per set, one frame per live generator plus a base.
    frames: [Vec<Vec<TermId>>; 2],
}

impl TermEnumerator {
    pub fn new() -> Self {
        Self {
            gens: Vec::new(),
            allocated: BTreeMap::new(),
            limits: BTreeMap::new(),
            gdepth: 0,
            gdepth_limit: None,
            frames: [vec![Vec::new()], vec![Vec::new()]],
        }
    }

    /// Seed the base frames with the classes patterns are matched against.
    pub fn set_candidate_classes(&mut self, subsumption: Vec<TermId>, confirmation: Vec<TermId>) {
        assert!(self.gens.is_empty(), "candidate classes changed mid-enumeration");
        self.frames = [vec![subsumption], vec![confirmation]];
    }

    /// Forget all allocated variables and budgets.
    pub fn reset_variables(&mut self) {
        assert!(self.gens.is_empty(), "variables reset mid-enumeration");
        self.allocated.clear();
        self.limits.clear();
    }

    /// Put `allocated` variables of `sort` in scope, allowing fresh ones up
    /// to `limit` (unbounded for None).
    pub fn set_variable_budget(&mut self, sort: SortId, allocated: u32, limit: Option<u32>) {
        self.allocated.insert(sort, allocated);
        match limit {
            Some(l) => self.limits.insert(sort, l),
            None => self.limits.remove(&sort),
        };
    }

    pub fn allocated(&self, sort: SortId) -> u32 {
        self.allocated.get(&sort).copied().unwrap_or(0)
    }

    /// Variables in scope per sort.
    pub fn variable_counts(&self) -> &BTreeMap<SortId, u32> {
        &self.allocated
    }

    pub fn set_generalization_limit(&mut self, limit: Option<u32>) {
        self.gdepth_limit = limit;
    }

    pub fn is_active(&self) -> bool {
        !self.gens.is_empty()
    }

    /// Begin enumerating patterns of `sort` (all sorts for None).
    pub fn start(&mut self, sort: Option<SortId>) -> GenId {
        assert!(self.gens.is_empty(), "enumeration started while another is live");
        self.gdepth = 0;
        self.push_generator(sort)
    }

    /// Drop a partially explored enumeration, releasing its variables.
    pub fn abandon(&mut self) {
        while let Some(gen) = self.gens.pop() {
            if let (Step::FreshVar(index), Some(sort)) = (gen.step, gen.sort) {
                self.release(sort, index);
            }
        }
        for frames in self.frames.iter_mut() {
            frames.truncate(1);
        }
        self.gdepth = 0;
    }

    /// Advance to the next pattern of depth at most `depth`.
    pub fn next_term<C: CanonFilter>(&mut self, depth: u32, env: &EnumEnv<'_>, canon: &mut C) -> bool {
        if self.gens.is_empty() {
            return false;
        }
        self.step(0, depth, env, canon)
    }

    /// The pattern currently held by the root.
    pub fn current(&self, env: &EnumEnv<'_>) -> Option<TermId> {
        if self.gens.is_empty() {
            return None;
        }
        self.term(0, env)
    }

    /// Candidate classes of the innermost frame.
    pub fn candidates(&self, set: CandidateSet) -> &[TermId] {
        self.frames[set as usize]
            .last()
            .map_or(&[], |v| v.as_slice())
    }

    fn push_generator(&mut self, sort: Option<SortId>) -> GenId {
        let id = self.gens.len();
        self.gens.push(Generator::new(sort));
        for frames in self.frames.iter_mut() {
            frames.push(Vec::new());
        }
        id
    }

    fn pop_generator(&mut self, id: GenId) {
        assert_eq!(
            id + 1,
            self.gens.len(),
            "generator released out of LIFO order"
        );
        self.gens.pop();
        for frames in self.frames.iter_mut() {
            frames.pop();
        }
    }

    fn allows_fresh(&self, sort: SortId) -> bool {
        self.limits
            .get(&sort)
            .map_or(true, |&limit| self.allocated(sort) < limit)
    }

    fn allocate(&mut self, sort: SortId) -> u32 {
        let slot = self.allocated.entry(sort).or_insert(0);
        *slot += 1;
        *slot - 1
    }

    fn release(&mut self, sort: SortId, index: u32) {
        let slot = self.allocated.entry(sort).or_insert(0);
        debug_assert_eq!(*slot, index + 1, "variables released out of order");
        *slot = slot.saturating_sub(1);
    }

    fn step<C: CanonFilter>(&mut self, id: GenId, depth: u32, env: &EnumEnv<'_>, canon: &mut C) -> bool {
        loop {
            let sort = self.gens[id].sort;
            match self.gens[id].step {
                Step::Start => match sort {
                    Some(s) if self.allows_fresh(s) => {
                        let index = self.allocate(s);
                        self.gens[id].step = Step::FreshVar(index);
                        if self.admit_partial(env) {
                            return true;
                        }
                    }
                    Some(_) => {
                        self.gdepth += 1;
                        self.gens[id].step = Step::Reuse(None);
                    }
                    None => self.gens[id].step = Step::Functions { next: 0 },
                },
                Step::FreshVar(index) => {
                    if let Some(s) = sort {
                        self.release(s, index);
                    }
                    self.gdepth += 1;
                    self.gens[id].step = Step::Reuse(None);
                }
                Step::Reuse(current) => {
                    let next = current.map_or(0, |c| c + 1);
                    let in_scope = sort.map_or(0, |s| self.allocated(s));
                    if next < in_scope {
                        self.gens[id].step = Step::Reuse(Some(next));
                        if self.admit_partial(env) {
                            return true;
                        }
                    } else {
                        self.gdepth -= 1;
                        self.gens[id].step = Step::Functions { next: 0 };
                    }
                }
                Step::Functions { next } => {
                    if depth > 0 && next < env.universe.funcs(sort).len() {
                        self.gdepth += 1;
                        self.gens[id].step = Step::Apply {
                            func: next,
                            child: 0,
                        };
                        if !self.admit_partial(env) {
                            self.gdepth -= 1;
                            self.gens[id].step = Step::Functions { next: next + 1 };
                        }
                    } else {
                        self.gens[id].step = Step::Exhausted;
                    }
                }
                Step::Apply { func, child } => {
                    let f = env.universe.funcs(sort)[func];
                    let arg_sorts = env.universe.arg_sorts(f);
                    if child < 0 {
                        self.gdepth -= 1;
                        self.gens[id].step = Step::Functions { next: func + 1 };
                    } else if child as usize == arg_sorts.len() {
                        self.gens[id].step = Step::Apply {
                            func,
                            child: child - 1,
                        };
                        if self.admit_complete(id, env, canon) {
                            return true;
                        }
                    } else if child as usize == self.gens[id].children.len() {
                        let c = self.push_generator(Some(arg_sorts[child as usize]));
                        self.gens[id].children.push(c);
                    } else {
                        let c = self.gens[id].children[child as usize];
                        let advanced = self.step(c, depth - 1, env, canon);
                        let delta = if advanced { 1 } else { -1 };
                        if !advanced {
                            self.gens[id].children.pop();
                        }
                        self.gens[id].step = Step::Apply {
                            func,
                            child: child + delta,
                        };
                    }
                }
                Step::Exhausted => {
                    debug_assert!(self.gens[id].children.is_empty());
                    self.pop_generator(id);
                    return false;
                }
            }
        }
    }

    /// Screen a partial pattern after a variable or function choice.
    fn admit_partial(&mut self, env: &EnumEnv<'_>) -> bool {
        debug_assert_eq!(self.generalization_depth(0), self.gdepth);
        if self.gdepth_limit.is_some_and(|limit| self.gdepth > limit) {
            return false;
        }
        if !env.filter.active {
            return true;
        }
        let level = self.gens.len();
        for set in [CandidateSet::Subsumption, CandidateSet::Confirmation] {
            let mode = env.filter.mode(set);
            let previous = self.frames[set as usize][level - 1].clone();
            let mut narrowed = Vec::new();
            for class in previous {
                let mut binding = MatchBinding::new();
                self.reset_matching(0, mode);
                if self.next_match(0, class, &mut binding, env) {
                    narrowed.push(class);
                }
            }
            self.frames[set as usize][level] = narrowed;
        }
        if self.frames[CandidateSet::Subsumption as usize][level].is_empty() {
            return false;
        }
        !(env.filter.confirmation && self.frames[CandidateSet::Confirmation as usize][level].is_empty())
    }

    fn admit_complete<C: CanonFilter>(&mut self, id: GenId, env: &EnumEnv<'_>, canon: &mut C) -> bool {
        match self.term(id, env) {
            Some(t) => {
                let ok = canon.admit(t, env.filter.active);
                #[cfg(feature = "tracing")]
                if !ok {
                    trace!(term = ?t, "enumerate_noncanonical");
                }
                ok
            }
            None => true,
        }
    }

    /// Pattern held by generator `id`, if it is complete.
    pub fn term(&self, id: GenId, env: &EnumEnv<'_>) -> Option<TermId> {
        let gen = self.gens.get(id)?;
        match gen.step {
            Step::FreshVar(index) | Step::Reuse(Some(index)) => Some(env.terms.var(gen.sort?, index)),
            Step::Apply { func, .. } => {
                let f = env.universe.funcs(gen.sort)[func];
                if gen.children.len() != env.universe.arg_sorts(f).len() {
                    return None;
                }
                let mut args: SmallVec<[TermId; 4]> = SmallVec::with_capacity(gen.children.len());
                for &c in &gen.children {
                    args.push(self.term(c, env)?);
                }
                Some(env.terms.app(f, args))
            }
            _ => None,
        }
    }

    /// Nesting depth of the pattern held by generator `id`.
    pub fn depth(&self, id: GenId) -> u32 {
        match self.gens.get(id).map(|g| g.step) {
            Some(Step::Apply { .. }) => {
                1 + self.gens[id]
                    .children
                    .iter()
                    .map(|&c| self.depth(c))
                    .max()
                    .unwrap_or(0)
            }
            _ => 0,
        }
    }

    /// Reused variables and applications count one each; fresh variables
    /// count nothing.
    pub fn generalization_depth(&self, id: GenId) -> u32 {
        match self.gens.get(id).map(|g| g.step) {
            Some(Step::Reuse(_)) => 1,
            Some(Step::Apply { .. }) => {
                1 + self.gens[id]
                    .children
                    .iter()
                    .map(|&c| self.generalization_depth(c))
                    .sum::<u32>()
            }
            _ => 0,
        }
    }

    pub fn reset_matching(&mut self, id: GenId, mode: MatchMode) {
        self.gens[id].matcher = Matcher {
            mode,
            ..Matcher::default()
        };
    }

    /// Next binding under which the pattern of generator `id` matches
    /// `class`. Bindings of an exhausted match are removed from `binding`.
    pub fn next_match(
        &mut self,
        id: GenId,
        class: TermId,
        binding: &mut MatchBinding,
        env: &EnumEnv<'_>,
    ) -> bool {
        loop {
            let gen = &self.gens[id];
            let mode = gen.matcher.mode;
            match gen.step {
                Step::FreshVar(index) => {
                    let Some(sort) = gen.sort else {
                        return false;
                    };
                    let m = &mut self.gens[id].matcher;
                    if m.entered {
                        if m.bound {
                            binding.subs.remove(&(sort, index));
                            if mode.distinct {
                                binding.used.remove(&class);
                            }
                            m.bound = false;
                        }
                        return false;
                    }
                    m.entered = true;
                    if mode.ground_only && !env.model.is_ground_class(class) {
                        return false;
                    }
                    if mode.distinct && !binding.used.insert(class) {
                        return false;
                    }
                    let previous = binding.subs.insert((sort, index), class);
                    debug_assert!(previous.is_none(), "fresh variable bound twice");
                    m.bound = true;
                    return true;
                }
                Step::Reuse(Some(index)) => {
                    let Some(sort) = gen.sort else {
                        return false;
                    };
                    let m = &mut self.gens[id].matcher;
                    if m.entered {
                        return false;
                    }
                    m.entered = true;
                    let bound = binding.subs.get(&(sort, index)).copied();
                    debug_assert!(bound.is_some(), "reused variable matched before binding");
                    return bound == Some(class);
                }
                Step::Apply { func, .. } => {
                    let f = env.universe.funcs(gen.sort)[func];
                    let n_children = gen.children.len();
                    let Some(ft) = env.model.func_trie(f) else {
                        return false;
                    };
                    if gen.matcher.child < 0 {
                        return false;
                    }
                    let child = gen.matcher.child as usize;

                    if gen.matcher.entered {
                        let (node, pos) = gen.matcher.cursors[child];
                        let c = gen.children[child];
                        let Some((key, _)) = ft.trie.edge(node, pos) else {
                            return false;
                        };
                        self.gens[id].matcher.entered = false;
                        if self.next_match(c, key, binding, env) {
                            self.gens[id].matcher.child += 1;
                        } else {
                            self.gens[id].matcher.cursors[child].1 += 1;
                        }
                        continue;
                    }

                    if child == gen.matcher.cursors.len() {
                        let node = if child == 0 {
                            ft.root(class)
                        } else {
                            let (parent, pos) = gen.matcher.cursors[child - 1];
                            ft.trie.edge(parent, pos).map(|(_, target)| target)
                        };
                        match node {
                            Some(node) => self.gens[id].matcher.cursors.push((node, 0)),
                            None => {
                                self.gens[id].matcher.child = -1;
                                return false;
                            }
                        }
                    }

                    let m = &mut self.gens[id].matcher;
                    m.entered = true;
                    let (node, pos) = m.cursors[child];
                    if ft.trie.edge(node, pos).is_none() {
                        m.cursors.pop();
                        m.child -= 1;
                        continue;
                    }
                    if child == n_children {
                        m.cursors.pop();
                        m.child -= 1;
                        return true;
                    }
                    let c = self.gens[id].children[child];
                    self.reset_matching(c, mode);
                }
                _ => return false,
            }
        }
    }
}

impl Default for TermEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/enumerate.rs"]
mod tests;
