use crate::term::{Term, TermId, TermStore};
use smallvec::SmallVec;

/// A substitution maps pattern variables (by their TermId) to terms.
///
/// Patterns mention few variables, so bindings live in a small inline vector
/// in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Subst {
    bindings: SmallVec<[(TermId, TermId); 8]>,
}

impl Subst {
    /// Create an empty substitution.
    pub fn new() -> Self {
        Self {
            bindings: SmallVec::new(),
        }
    }

    /// Bind a variable to a term, replacing any previous binding.
    pub fn bind(&mut self, var: TermId, term: TermId) {
        match self.bindings.iter_mut().find(|(v, _)| *v == var) {
            Some(slot) => slot.1 = term,
            None => self.bindings.push((var, term)),
        }
    }

    /// Remove the binding for a variable, returning it.
    pub fn unbind(&mut self, var: TermId) -> Option<TermId> {
        let pos = self.bindings.iter().position(|(v, _)| *v == var)?;
        Some(self.bindings.remove(pos).1)
    }

    /// Get the binding for a variable, if any.
    pub fn get(&self, var: TermId) -> Option<TermId> {
        self.bindings
            .iter()
            .find(|(v, _)| *v == var)
            .map(|(_, t)| *t)
    }

    /// Check if a variable is bound.
    pub fn is_bound(&self, var: TermId) -> bool {
        self.get(var).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Number of bound variables.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Iterator over (variable, term) pairs in binding order.
    pub fn iter(&self) -> impl Iterator<Item = (TermId, TermId)> + '_ {
        self.bindings.iter().copied()
    }
}

/// Apply a substitution to a term, returning a new term.
///
/// Substitution is simultaneous: a bound variable is replaced by its image,
/// and the image is not substituted again. Unbound variables are kept.
///
/// Uses explicit stack to avoid recursion.
pub fn apply_subst(term: TermId, subst: &Subst, terms: &TermStore) -> TermId {
    if subst.is_empty() {
        return term;
    }

    // Stack contains (original term, children_processed)
    let mut work_stack: Vec<(TermId, bool)> = vec![(term, false)];
    let mut result_stack: Vec<TermId> = Vec::new();

    while let Some((tid, children_done)) = work_stack.pop() {
        match terms.resolve(tid) {
            Some(Term::App(func, children)) if children_done => {
                let n = children.len();
                let new_children: SmallVec<[TermId; 4]> =
                    result_stack.drain(result_stack.len() - n..).collect();
                result_stack.push(terms.app(func, new_children));
            }
            Some(Term::App(_, children)) if !children.is_empty() => {
                work_stack.push((tid, true));
                for child in children.iter().rev() {
                    work_stack.push((*child, false));
                }
            }
            Some(Term::Var { .. }) => {
                result_stack.push(subst.get(tid).unwrap_or(tid));
            }
            _ => result_stack.push(tid),
        }
    }

    assert_eq!(result_stack.len(), 1, "apply_subst must produce one term");
    result_stack[0]
}

#[cfg(test)]
#[path = "tests/subst.rs"]
mod tests;
