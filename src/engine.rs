//! Conjecture engine - one bounded search round per full-effort check.
//!
//! A round:
//! 1. Snapshots the ground model into a [`ModelIndex`]
//! 2. Seeds the theorem index and universal equivalence from the host's
//!    quantified equalities, deactivating subsumed ones
//! 3. Enumerates left-hand-side patterns, building the generalization
//!    lattice and the witness bindings of each pattern
//! 4. Enumerates right-hand sides and pairs them with lattice maxima
//! 5. Filters the pairs against the witnesses and emits the survivors

use crate::config::ConjectureConfig;
use crate::enumerate::{
    CandidateSet, CanonFilter, ClassFilter, EnumEnv, FunctionUniverse, MatchBinding, MatchMode,
    TermEnumerator,
};
use crate::error::ConfigError;
use crate::lattice::GeneralizationLattice;
use crate::lemma::{Assertion, CaseSplit, Conjecture, Effort, ProofHost};
use crate::matching::is_generalization;
use crate::metrics::SearchMetrics;
use crate::model::{GroundEvaluator, GroundModel, ModelIndex};
use crate::pattern::{Canonicalizer, PatternRegistry};
use crate::subst_index::{Confirmation, SubstitutionIndex};
use crate::symbol::{FuncId, SortId, SymbolStore};
use crate::term::{FuncKind, TermId, TermStore};
use crate::theorem_index::TheoremIndex;
use crate::universal::{UniversalCtx, UniversalEquivalence};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::collections::BTreeMap;

#[cfg(feature = "tracing")]
use crate::trace::{debug, debug_span, info, info_span, trace};

/// Why a candidate pair was not turned into a conjecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Both sides are the same pattern.
    Trivial,
    /// Both sides are constructor applications.
    Constructors,
    /// The right-hand side needs variables the left-hand side lacks.
    UncoveredVariables,
    AlreadyConjectured,
    /// A ground witness maps the sides to distinct values.
    Falsified,
    /// No ground witness agrees with the pair.
    Unconfirmed,
    /// Some variable was witnessed by too few distinct classes.
    SparseDomain,
}

impl Rejection {
    /// Whether the pair is retried with the lattice children of its
    /// left-hand side one depth further down. Only an already conjectured
    /// pair is final.
    pub fn retries_specializations(self) -> bool {
        match self {
            Rejection::Trivial
            | Rejection::Constructors
            | Rejection::UncoveredVariables
            | Rejection::Falsified
            | Rejection::Unconfirmed
            | Rejection::SparseDomain => true,
            Rejection::AlreadyConjectured => false,
        }
    }
}

/// What one round did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundReport {
    /// Conjectures emitted this round, in emission order.
    pub conjectures: Vec<Conjecture>,
    /// Left-hand-side patterns registered.
    pub patterns: usize,
    /// Right-hand-side terms enumerated.
    pub rhs_terms: usize,
    /// Candidate pairs queued.
    pub candidates: usize,
    /// Indices of host assertions found to be subsumed.
    pub subsumed: Vec<usize>,
}

/// Rejects complete patterns that are not their own universal representative.
struct UniversalCanon<'a> {
    universal: &'a mut UniversalEquivalence,
    ctx: UniversalCtx<'a>,
}

impl CanonFilter for UniversalCanon<'_> {
    fn admit(&mut self, term: TermId, class_filtering: bool) -> bool {
        let rep = self.universal.representative(term, true, &mut self.ctx);
        if rep == term {
            self.universal.mark_reported_canon(term);
            return true;
        }
        // Non-canonical: kept only under class filtering, and only when the
        // representative does not generalize it.
        class_filtering && !is_generalization(rep, term, self.ctx.terms)
    }
}

/// Working state of one round.
#[derive(Default)]
struct RoundState {
    witnesses: FxHashMap<TermId, SubstitutionIndex>,
    var_sum: FxHashMap<TermId, usize>,
    /// Candidate pairs by retry depth.
    queue: Vec<Vec<(TermId, TermId)>>,
    /// Left-hand sides already paired with each right-hand side.
    paired: FxHashMap<TermId, SmallVec<[TermId; 4]>>,
    waiting: Vec<Conjecture>,
    candidates: usize,
}

impl RoundState {
    fn add_candidate(&mut self, lhs: TermId, rhs: TermId, depth: usize) {
        let paired = self.paired.entry(rhs).or_default();
        if paired.contains(&lhs) {
            return;
        }
        paired.push(lhs);
        if self.queue.len() <= depth {
            self.queue.resize_with(depth + 1, Vec::new);
        }
        self.queue[depth].push((lhs, rhs));
        self.candidates += 1;
    }

    fn take_queue(&mut self, depth: usize) -> Vec<(TermId, TermId)> {
        self.queue.get_mut(depth).map(std::mem::take).unwrap_or_default()
    }
}

pub struct ConjectureEngine {
    config: ConjectureConfig,
    rng: StdRng,
    bool_sort: SortId,
    full_effort_count: u64,
    registry: PatternRegistry,
    lattice: GeneralizationLattice,
    universal: UniversalEquivalence,
    theorems: TheoremIndex,
    /// Every pair ever conjectured, in both directions.
    conjectured: FxHashMap<TermId, FxHashSet<TermId>>,
    conjectures: Vec<Conjecture>,
    metrics: SearchMetrics,
}

impl ConjectureEngine {
    pub fn new(config: ConjectureConfig, symbols: &SymbolStore) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            bool_sort: symbols.bool_sort(),
            full_effort_count: 0,
            registry: PatternRegistry::new(),
            lattice: GeneralizationLattice::new(),
            universal: UniversalEquivalence::new(),
            theorems: TheoremIndex::new(),
            conjectured: FxHashMap::default(),
            conjectures: Vec::new(),
            metrics: SearchMetrics::new(),
        })
    }

    pub fn config(&self) -> &ConjectureConfig {
        &self.config
    }

    /// Replace the random source that orders functions and sorts.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Conjectures emitted so far, oldest first.
    pub fn conjectures(&self) -> &[Conjecture] {
        &self.conjectures
    }

    pub fn metrics(&self) -> &SearchMetrics {
        &self.metrics
    }

    /// True if `lhs = rhs` was conjectured in some round.
    pub fn was_conjectured(&self, lhs: TermId, rhs: TermId) -> bool {
        self.conjectured
            .get(&lhs)
            .is_some_and(|others| others.contains(&rhs))
    }

    pub fn needs_check(&self, effort: Effort) -> bool {
        effort == Effort::Full
    }

    pub fn push_context(&mut self) {
        self.universal.push();
    }

    /// Undo the universal equalities asserted since the last `push_context`.
    pub fn pop_context(&mut self, terms: &TermStore) {
        let mut ctx = UniversalCtx {
            registry: &mut self.registry,
            theorems: &self.theorems,
            terms,
        };
        self.universal.pop(&mut ctx);
    }

    /// Run a round if this check is due. Full-effort checks are counted
    /// unless the host already has lemmas pending, in which case nothing
    /// happens.
    pub fn check<M, H>(
        &mut self,
        effort: Effort,
        model: &M,
        host: &mut H,
        terms: &TermStore,
    ) -> Option<RoundReport>
    where
        M: GroundModel + ?Sized,
        H: ProofHost + ?Sized,
    {
        if !self.needs_check(effort) {
            return None;
        }
        let due = self.full_effort_count % u64::from(self.config.full_check_frequency) == 0;
        if host.has_pending_lemmas() {
            return None;
        }
        self.full_effort_count += 1;
        if !due {
            return None;
        }
        Some(self.run_round(model, host, terms))
    }

    fn run_round<M, H>(&mut self, model: &M, host: &mut H, terms: &TermStore) -> RoundReport
    where
        M: GroundModel + ?Sized,
        H: ProofHost + ?Sized,
    {
        #[cfg(feature = "tracing")]
        let _span = info_span!("conjecture_round", round = self.full_effort_count).entered();
        self.metrics.record_round();

        let index = ModelIndex::build(model, terms);
        let mut universe = FunctionUniverse::collect(&index, terms, self.bool_sort);
        universe.shuffle(&mut self.rng);

        self.registry.clear_round();
        self.lattice.clear();
        self.universal.reset_round();
        let subsumed = self.seed_theorems(host, &universe, terms);

        let mut round = RoundState::default();
        let (rt_var_max, mut rt_types) = self.lhs_phase(&index, &universe, &mut round, terms);
        let patterns = round.var_sum.len();
        let rhs_terms = self.rhs_phase(&index, &universe, &rt_var_max, &mut rt_types, &mut round, terms);

        let emitted = std::mem::take(&mut round.waiting);
        for conjecture in &emitted {
            host.add_lemma(CaseSplit {
                conjecture: conjecture.clone(),
            });
            host.require_phase(conjecture, false);
            self.metrics.record_conjecture();
        }
        self.conjectures.extend(emitted.iter().cloned());

        #[cfg(feature = "tracing")]
        info!(
            patterns,
            rhs_terms,
            candidates = round.candidates,
            conjectures = emitted.len(),
            "round_done"
        );
        RoundReport {
            conjectures: emitted,
            patterns,
            rhs_terms,
            candidates: round.candidates,
            subsumed,
        }
    }

    /// Index the host's quantified equalities. Returns the assertions found
    /// subsumed by what is already known.
    fn seed_theorems<H: ProofHost + ?Sized>(
        &mut self,
        host: &mut H,
        universe: &FunctionUniverse,
        terms: &TermStore,
    ) -> Vec<usize> {
        #[cfg(feature = "tracing")]
        let _span = debug_span!("seed_theorems").entered();
        self.theorems.clear();
        let allowed = |f: FuncId| universe.contains(f);
        let mut subsumed = Vec::new();

        for (i, assertion) in host.assertions().into_iter().enumerate() {
            let Assertion::Equality { lhs, rhs } = assertion else {
                continue;
            };
            let mut canon = Canonicalizer::new();
            let (Some(l), Some(r)) = (
                canon.canonicalize(lhs, terms, &allowed),
                canon.canonicalize(rhs, terms, &allowed),
            ) else {
                continue;
            };

            if !self.universal.is_asserted(lhs, rhs) {
                let mut ctx = UniversalCtx {
                    registry: &mut self.registry,
                    theorems: &self.theorems,
                    terms,
                };
                let nl = self.universal.representative(l, true, &mut ctx);
                let nr = self.universal.representative(r, true, &mut ctx);
                if self.universal.are_equal(nl, nr) {
                    #[cfg(feature = "tracing")]
                    debug!(index = i, "theorem_subsumed");
                    host.deactivate(i);
                    subsumed.push(i);
                    continue;
                }
                self.universal.note_asserted(lhs, rhs);
                self.universal.assert_equal(nl, nr, &mut ctx);
            }

            self.theorems.add_theorem(l, r, terms);
            let mut flipped = Canonicalizer::new();
            if let (Some(l2), Some(r2)) = (
                flipped.canonicalize(rhs, terms, &allowed),
                flipped.canonicalize(lhs, terms, &allowed),
            ) {
                self.theorems.add_theorem(l2, r2, terms);
            }
            self.metrics.record_theorem();
        }
        subsumed
    }

    fn canon_filter<'s>(&'s mut self, terms: &'s TermStore) -> UniversalCanon<'s> {
        UniversalCanon {
            universal: &mut self.universal,
            ctx: UniversalCtx {
                registry: &mut self.registry,
                theorems: &self.theorems,
                terms,
            },
        }
    }

    /// Enumerate left-hand sides. Returns the largest variable count seen per
    /// sort and the sorts that produced a pattern.
    fn lhs_phase(
        &mut self,
        index: &ModelIndex,
        universe: &FunctionUniverse,
        round: &mut RoundState,
        terms: &TermStore,
    ) -> (BTreeMap<SortId, u32>, Vec<SortId>) {
        let (non_ground, ground) = index.relevant_classes();
        let mut gen = TermEnumerator::new();
        gen.set_candidate_classes(non_ground, ground);
        let env = EnumEnv {
            terms,
            universe,
            model: index,
            filter: ClassFilter {
                active: true,
                distinct_vars: self.config.require_distinct_variable_patterns,
                confirmation: self.config.filter_confirmation,
                ground_only: self.config.filter_confirmation_ground_only,
            },
        };
        let witness_mode = MatchMode {
            distinct: false,
            ground_only: self.config.filter_confirmation_ground_only,
        };

        let mut rt_var_max: BTreeMap<SortId, u32> = BTreeMap::new();
        let mut rt_types: Vec<SortId> = Vec::new();

        for depth in 1..=self.config.max_lhs_depth {
            #[cfg(feature = "tracing")]
            let _span = debug_span!("lhs_depth", depth).entered();
            gen.reset_variables();
            gen.set_generalization_limit(None);
            gen.start(None);

            loop {
                let more = {
                    let mut canon = self.canon_filter(terms);
                    gen.next_term(depth, &env, &mut canon)
                };
                if !more {
                    break;
                }
                if gen.depth(0) != depth {
                    continue;
                }
                let Some(nn) = gen.current(&env) else {
                    continue;
                };
                if self.universal.current_representative(nn) != nn {
                    continue;
                }
                let Some(sort) = terms.sort_of(nn) else {
                    continue;
                };
                if round.var_sum.contains_key(&nn) {
                    continue;
                }

                let mut layout: Vec<(SortId, u32)> = Vec::new();
                for (&s, &count) in gen.variable_counts() {
                    layout.extend((0..count).map(|i| (s, i)));
                }
                let vars: Vec<TermId> = layout.iter().map(|&(s, i)| terms.var(s, i)).collect();
                round.var_sum.insert(nn, vars.len());

                self.registry.register(nn, sort, terms);
                debug_assert!(
                    self.registry.stats(nn).is_some_and(|s| s.normal),
                    "enumerated pattern is not in normal form"
                );
                let _gen_depth = self.lattice.insert(nn, sort, terms);
                #[cfg(feature = "tracing")]
                trace!(pattern = ?nn, gen_depth = _gen_depth, "lhs_pattern");

                for (&s, &count) in gen.variable_counts() {
                    let top = rt_var_max.entry(s).or_insert(count);
                    *top = (*top).max(count);
                }
                if !rt_types.contains(&sort) {
                    rt_types.push(sort);
                }

                let mut witnesses = SubstitutionIndex::new();
                let classes = gen.candidates(CandidateSet::Confirmation).to_vec();
                for class in classes {
                    let mut binding = MatchBinding::new();
                    gen.reset_matching(0, witness_mode);
                    while gen.next_match(0, class, &mut binding, &env) {
                        let grounds: Option<Vec<TermId>> =
                            layout.iter().map(|&(s, i)| binding.get(s, i)).collect();
                        if let Some(grounds) = grounds {
                            witnesses.add_substitution(class, &vars, &grounds);
                        }
                    }
                }
                round.witnesses.insert(nn, witnesses);
                self.metrics.record_pattern();
            }
            gen.abandon();
        }
        (rt_var_max, rt_types)
    }

    /// Enumerate right-hand sides and process the queued candidates.
    /// Returns the number of right-hand sides considered.
    fn rhs_phase(
        &mut self,
        index: &ModelIndex,
        universe: &FunctionUniverse,
        rt_var_max: &BTreeMap<SortId, u32>,
        rt_types: &mut Vec<SortId>,
        round: &mut RoundState,
        terms: &TermStore,
    ) -> usize {
        let mut gen = TermEnumerator::new();
        for (&s, &max) in rt_var_max {
            gen.set_variable_budget(s, max, Some(max));
        }
        let env = EnumEnv {
            terms,
            universe,
            model: index,
            filter: ClassFilter::inactive(),
        };
        let mut total = 0usize;

        for depth in 0..=self.config.max_rhs_depth {
            #[cfg(feature = "tracing")]
            let _span = debug_span!("rhs_depth", depth).entered();
            rt_types.shuffle(&mut self.rng);
            for &sort in rt_types.iter() {
                gen.start(Some(sort));
                while total < self.config.max_rhs_candidates {
                    let more = {
                        let mut canon = self.canon_filter(terms);
                        gen.next_term(depth, &env, &mut canon)
                    };
                    if !more {
                        break;
                    }
                    if gen.depth(0) != depth {
                        continue;
                    }
                    let Some(rhs) = gen.current(&env) else {
                        continue;
                    };
                    self.registry.register(rhs, sort, terms);
                    for &lhs in self.lattice.maxima(sort) {
                        round.add_candidate(lhs, rhs, 0);
                    }
                    total += 1;
                    self.metrics.record_rhs_term(u64::from(depth));
                }
                gen.abandon();
            }

            for conj_depth in 0..depth as usize {
                let pending = round.take_queue(conj_depth);
                for &(lhs, rhs) in pending.iter().rev() {
                    self.process_candidate(lhs, rhs, conj_depth, round, index, terms);
                }
            }
        }
        total
    }

    fn process_candidate(
        &mut self,
        lhs: TermId,
        rhs: TermId,
        depth: usize,
        round: &mut RoundState,
        index: &ModelIndex,
        terms: &TermStore,
    ) {
        if round.waiting.len() >= self.config.max_conjectures_per_round {
            return;
        }
        self.metrics.record_candidate();
        match self.consider(lhs, rhs, round, index, terms) {
            Err(reason) => {
                #[cfg(feature = "tracing")]
                trace!(?lhs, ?rhs, ?reason, "candidate_rejected");
                match reason {
                    Rejection::Falsified => self.metrics.record_falsified(),
                    Rejection::Unconfirmed | Rejection::SparseDomain => {
                        self.metrics.record_unconfirmed()
                    }
                    _ => self.metrics.record_filtered(),
                }
                // Retried after structural and witness rejections alike, not
                // only unconfirmed ones; never after AlreadyConjectured, so an
                // unchanged model yields no new lemmas.
                if !reason.retries_specializations() {
                    return;
                }
                let below = self.lattice.depth(lhs).unwrap_or(0) + 1;
                let children: SmallVec<[TermId; 4]> = self
                    .lattice
                    .children(lhs)
                    .iter()
                    .copied()
                    .filter(|&c| self.lattice.depth(c) == Some(below))
                    .collect();
                for child in children {
                    round.add_candidate(child, rhs, depth + 1);
                }
            }
            Ok(_confirmation) => {
                #[cfg(feature = "tracing")]
                debug!(
                    ?lhs,
                    ?rhs,
                    confirmed = _confirmation.confirmed,
                    range = _confirmation.range.len(),
                    "conjecture"
                );
                debug_assert_eq!(self.universal.current_representative(lhs), lhs);
                debug_assert_eq!(self.universal.current_representative(rhs), rhs);
                self.conjectured.entry(lhs).or_default().insert(rhs);
                self.conjectured.entry(rhs).or_default().insert(lhs);

                let mut vars: SmallVec<[TermId; 4]> = SmallVec::new();
                if let Some(stats) = self.registry.stats(lhs) {
                    for (&s, &max) in &stats.max_var {
                        vars.extend((0..=max).map(|i| terms.var(s, i)));
                    }
                }
                round.waiting.push(Conjecture { vars, lhs, rhs });
            }
        }
    }

    /// Decide whether `lhs = rhs` is worth conjecturing.
    fn consider(
        &self,
        lhs: TermId,
        rhs: TermId,
        round: &RoundState,
        index: &ModelIndex,
        terms: &TermStore,
    ) -> Result<Confirmation, Rejection> {
        if lhs == rhs {
            return Err(Rejection::Trivial);
        }
        if terms.head_kind(lhs) == Some(FuncKind::Constructor)
            && terms.head_kind(rhs) == Some(FuncKind::Constructor)
        {
            return Err(Rejection::Constructors);
        }

        let lstats = self
            .registry
            .stats(lhs)
            .unwrap_or_else(|| panic!("left-hand side {:?} was never registered", lhs));
        let rstats = self
            .registry
            .stats(rhs)
            .unwrap_or_else(|| panic!("right-hand side {:?} was never registered", rhs));
        for (sort, &rmax) in &rstats.max_var {
            match lstats.max_var.get(sort) {
                Some(&lmax) if lmax >= rmax => {}
                _ => return Err(Rejection::UncoveredVariables),
            }
        }
        if self.was_conjectured(lhs, rhs) {
            return Err(Rejection::AlreadyConjectured);
        }

        let mut confirmation = Confirmation::default();
        if !self.config.uses_witnesses() {
            return Ok(confirmation);
        }
        let num_vars = round.var_sum.get(&lhs).copied().unwrap_or(0);
        if let Some(witnesses) = round.witnesses.get(&lhs) {
            let eval = GroundEvaluator {
                model: index,
                terms,
            };
            if !witnesses.notify_substitutions(
                rhs,
                num_vars,
                self.config.filter_falsification,
                &eval,
                &mut confirmation,
            ) {
                return Err(Rejection::Falsified);
            }
        }
        if self.config.filter_confirmation && confirmation.confirmed == 0 {
            return Err(Rejection::Unconfirmed);
        }
        if self.config.filter_confirmation_by_domain_coverage {
            for (&var, domain) in &confirmation.domains {
                let required = lstats.occurrences(var).max(rstats.occurrences(var));
                if (domain.len() as u32) < required {
                    return Err(Rejection::SparseDomain);
                }
            }
        }
        Ok(confirmation)
    }
}

#[cfg(test)]
#[path = "tests/engine.rs"]
mod tests;
