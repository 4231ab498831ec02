//! One-sided matching between patterns.
//!
//! `general` matches `specific` when some substitution of the variables of
//! `general` yields `specific` exactly. Variables of `specific` are treated as
//! rigid constants.

use crate::subst::Subst;
use crate::term::{Term, TermId, TermStore};
use smallvec::SmallVec;

#[cfg(feature = "tracing")]
use crate::trace::trace;

/// Match `general` against `specific`, returning the substitution `σ` with
/// `σ(general) == specific`.
///
/// A variable of `general` binds on first sight to a subterm of its own sort;
/// later occurrences must align with the identical subterm. Uses an explicit
/// worklist to avoid recursion.
pub fn generalization_subst(general: TermId, specific: TermId, terms: &TermStore) -> Option<Subst> {
    let mut subst = Subst::new();
    let mut worklist: SmallVec<[(TermId, TermId); 32]> = SmallVec::new();
    worklist.push((general, specific));

    while let Some((g, s)) = worklist.pop() {
        match terms.resolve(g)? {
            Term::Var { .. } => match subst.get(g) {
                Some(bound) if bound != s => {
                    #[cfg(feature = "tracing")]
                    trace!(?g, ?bound, ?s, "generalization_binding_conflict");
                    return None;
                }
                Some(_) => {}
                None if terms.sort_of(g) != terms.sort_of(s) => return None,
                None => subst.bind(g, s),
            },
            Term::App(gf, gchildren) => {
                let (sf, schildren) = terms.is_app(s)?;
                if gf != sf || gchildren.len() != schildren.len() {
                    return None;
                }
                for (gc, sc) in gchildren.iter().zip(schildren.iter()).rev() {
                    worklist.push((*gc, *sc));
                }
            }
        }
    }

    Some(subst)
}

/// True if `specific` is an instance of `general`.
pub fn is_generalization(general: TermId, specific: TermId, terms: &TermStore) -> bool {
    general == specific || generalization_subst(general, specific, terms).is_some()
}

#[cfg(test)]
#[path = "tests/matching.rs"]
mod tests;
