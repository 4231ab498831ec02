//! Witness bindings observed for a left-hand-side pattern.
//!
//! Each path through the trie binds the pattern variables, in a fixed order,
//! to ground classes; the leaf records the class the whole pattern matched.

use crate::subst::Subst;
use crate::term::TermId;
use rustc_hash::{FxHashMap, FxHashSet};

/// Ground facts the witness walk needs from the current model.
pub trait WitnessEvaluator {
    /// Class of `pattern` under `binding`, or None if it cannot be resolved.
    fn evaluate(&self, pattern: TermId, binding: &Subst) -> Option<TermId>;
    /// Ground term of `class`, if one is known.
    fn ground_term(&self, class: TermId) -> Option<TermId>;
    /// True if `term` is a syntactic constant.
    fn is_value(&self, term: TermId) -> bool;
}

/// Confirmation statistics gathered while notifying one right-hand side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Confirmation {
    /// Witnesses under which both sides landed in the same class.
    pub confirmed: u32,
    /// Distinct left-hand-side classes among confirmed witnesses.
    pub range: FxHashSet<TermId>,
    /// Distinct bindings observed per variable among confirmed witnesses.
    pub domains: FxHashMap<TermId, FxHashSet<TermId>>,
}

impl Confirmation {
    pub fn domain_size(&self, var: TermId) -> usize {
        self.domains.get(&var).map_or(0, |d| d.len())
    }
}

#[derive(Debug, Clone, Default)]
struct SubstNode {
    var: Option<TermId>,
    children: Vec<(TermId, usize)>,
    witness: Option<TermId>,
}

/// Trie of variable bindings keyed by ground class, one variable per level.
#[derive(Debug, Clone)]
pub struct SubstitutionIndex {
    nodes: Vec<SubstNode>,
}

impl SubstitutionIndex {
    pub fn new() -> Self {
        Self {
            nodes: vec![SubstNode::default()],
        }
    }

    /// Record that `class` matched the pattern with `vars[i]` bound to
    /// `grounds[i]`.
    pub fn add_substitution(&mut self, class: TermId, vars: &[TermId], grounds: &[TermId]) {
        assert_eq!(vars.len(), grounds.len(), "one ground class per variable");
        let mut node = 0;
        for (&var, &ground) in vars.iter().zip(grounds.iter()) {
            match self.nodes[node].var {
                Some(existing) => {
                    assert_eq!(existing, var, "variable order differs between witnesses")
                }
                None => self.nodes[node].var = Some(var),
            }
            node = match self.nodes[node].children.iter().find(|(g, _)| *g == ground) {
                Some(&(_, child)) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(SubstNode::default());
                    self.nodes[node].children.push((ground, child));
                    child
                }
            };
        }
        self.nodes[node].witness = Some(class);
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty() && self.nodes[0].witness.is_none()
    }

    /// Evaluate `rhs` under every stored witness binding.
    ///
    /// Returns false as soon as a witness puts the two sides in distinct
    /// classes whose ground terms are both constants (only when
    /// `falsify` is set). Agreeing witnesses are tallied into `stats`;
    /// unresolved evaluations are skipped.
    pub fn notify_substitutions<E: WitnessEvaluator>(
        &self,
        rhs: TermId,
        num_vars: usize,
        falsify: bool,
        eval: &E,
        stats: &mut Confirmation,
    ) -> bool {
        let mut binding = Subst::new();
        self.walk(0, 0, rhs, num_vars, falsify, eval, &mut binding, stats)
    }

    #[allow(clippy::too_many_arguments)]
    fn walk<E: WitnessEvaluator>(
        &self,
        node: usize,
        level: usize,
        rhs: TermId,
        num_vars: usize,
        falsify: bool,
        eval: &E,
        binding: &mut Subst,
        stats: &mut Confirmation,
    ) -> bool {
        let current = &self.nodes[node];
        if level == num_vars {
            let Some(lhs_class) = current.witness else {
                return true;
            };
            let Some(rhs_class) = eval.evaluate(rhs, binding) else {
                return true;
            };
            if lhs_class != rhs_class {
                if falsify {
                    let lhs_ground = eval.ground_term(lhs_class);
                    let rhs_ground = eval.ground_term(rhs_class);
                    if let (Some(l), Some(r)) = (lhs_ground, rhs_ground) {
                        if eval.is_value(l) && eval.is_value(r) {
                            return false;
                        }
                    }
                }
                return true;
            }
            for (var, value) in binding.iter() {
                stats.domains.entry(var).or_default().insert(value);
            }
            stats.confirmed += 1;
            stats.range.insert(lhs_class);
            return true;
        }

        let Some(var) = current.var else {
            return true;
        };
        for &(ground, child) in &current.children {
            binding.bind(var, ground);
            let ok = self.walk(child, level + 1, rhs, num_vars, falsify, eval, binding, stats);
            binding.unbind(var);
            if !ok {
                return false;
            }
        }
        true
    }
}

impl Default for SubstitutionIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/subst_index.rs"]
mod tests;
