//! Trie of proved equalities for equivalent-term lookup.
//!
//! Left-hand sides are stored in preorder: an application contributes an
//! operator edge and then its arguments, a variable contributes a variable
//! edge that captures a whole subterm of the query.

use crate::subst::{apply_subst, Subst};
use crate::symbol::FuncId;
use crate::term::{Term, TermId, TermStore};

#[cfg(feature = "tracing")]
use crate::trace::trace;

#[derive(Debug, Clone, Default)]
struct ThmNode {
    ops: Vec<(FuncId, usize)>,
    vars: Vec<(TermId, usize)>,
    rhs: Vec<TermId>,
}

#[derive(Debug, Clone)]
pub struct TheoremIndex {
    nodes: Vec<ThmNode>,
    len: usize,
}

impl TheoremIndex {
    pub fn new() -> Self {
        Self {
            nodes: vec![ThmNode::default()],
            len: 0,
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.nodes.push(ThmNode::default());
        self.len = 0;
    }

    /// Number of stored equalities.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store the oriented equality `lhs = rhs`.
    pub fn add_theorem(&mut self, lhs: TermId, rhs: TermId, terms: &TermStore) {
        #[cfg(feature = "tracing")]
        trace!(?lhs, ?rhs, "theorem_add");
        let mut node = 0;
        let mut pending = vec![lhs];
        while let Some(t) = pending.pop() {
            node = match terms.resolve(t) {
                Some(Term::App(f, children)) => {
                    pending.extend(children.iter().rev().copied());
                    self.child(node, Edge::Op(f))
                }
                _ => self.child(node, Edge::Var(t)),
            };
        }
        let leaf = &mut self.nodes[node];
        if !leaf.rhs.contains(&rhs) {
            leaf.rhs.push(rhs);
            self.len += 1;
        }
    }

    fn child(&mut self, node: usize, edge: Edge) -> usize {
        let existing = match edge {
            Edge::Op(f) => self.nodes[node]
                .ops
                .iter()
                .find(|(k, _)| *k == f)
                .map(|&(_, c)| c),
            Edge::Var(v) => self.nodes[node]
                .vars
                .iter()
                .find(|(k, _)| *k == v)
                .map(|&(_, c)| c),
        };
        if let Some(c) = existing {
            return c;
        }
        let c = self.nodes.len();
        self.nodes.push(ThmNode::default());
        match edge {
            Edge::Op(f) => self.nodes[node].ops.push((f, c)),
            Edge::Var(v) => self.nodes[node].vars.push((v, c)),
        }
        c
    }

    /// Terms provably equal to `term` by one stored equality applied at the
    /// root.
    pub fn equivalent_terms(&self, term: TermId, terms: &TermStore) -> Vec<TermId> {
        let mut out = Vec::new();
        let mut binding = Subst::new();
        self.collect(0, vec![term], &mut binding, terms, &mut out);
        out
    }

    fn collect(
        &self,
        node: usize,
        mut pending: Vec<TermId>,
        binding: &mut Subst,
        terms: &TermStore,
        out: &mut Vec<TermId>,
    ) {
        let current = &self.nodes[node];
        let Some(t) = pending.pop() else {
            for &rhs in &current.rhs {
                let instance = apply_subst(rhs, binding, terms);
                if !out.contains(&instance) {
                    out.push(instance);
                }
            }
            return;
        };

        if let Some((f, children)) = terms.is_app(t) {
            if let Some(&(_, next)) = current.ops.iter().find(|(k, _)| *k == f) {
                let mut deeper = pending.clone();
                deeper.extend(children.iter().rev().copied());
                self.collect(next, deeper, binding, terms, out);
            }
        }

        let sort = terms.sort_of(t);
        for &(var, next) in &current.vars {
            if terms.sort_of(var) != sort {
                continue;
            }
            match binding.get(var) {
                Some(bound) if bound == t => {
                    self.collect(next, pending.clone(), binding, terms, out);
                }
                Some(_) => {}
                None => {
                    binding.bind(var, t);
                    self.collect(next, pending.clone(), binding, terms, out);
                    binding.unbind(var);
                }
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Edge {
    Op(FuncId),
    Var(TermId),
}

impl Default for TheoremIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/theorem_index.rs"]
mod tests;
