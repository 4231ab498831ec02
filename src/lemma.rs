//! What the engine exchanges with the host prover.

use crate::symbol::SymbolStore;
use crate::term::{format_term, TermId, TermStore};
use smallvec::SmallVec;

/// Strength of the host check the engine is called from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effort {
    Standard,
    Full,
    LastCall,
}

/// A formula currently asserted by the host, as far as the engine cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assertion {
    /// A universally quantified equality; its pattern variables are the
    /// quantified ones.
    Equality { lhs: TermId, rhs: TermId },
    Other,
}

/// A universally quantified equality `forall vars. lhs = rhs`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Conjecture {
    pub vars: SmallVec<[TermId; 4]>,
    pub lhs: TermId,
    pub rhs: TermId,
}

/// Lemma `(not C) or C` for a conjecture `C`. The host must case-split on
/// the conjecture instead of assuming it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseSplit {
    pub conjecture: Conjecture,
}

/// The proof loop the engine runs inside.
pub trait ProofHost {
    fn assertions(&self) -> Vec<Assertion>;

    /// True when the host already produced obligations in this step.
    fn has_pending_lemmas(&self) -> bool;

    /// Stop using assertion `index` (of `assertions()`); it is subsumed.
    fn deactivate(&mut self, index: usize);

    fn add_lemma(&mut self, lemma: CaseSplit);

    /// Ask the host to try `conjecture` with the given truth value first.
    fn require_phase(&mut self, conjecture: &Conjecture, phase: bool);
}

/// Render `forall $Nat0 $Nat1. lhs = rhs`.
pub fn format_conjecture(
    conjecture: &Conjecture,
    terms: &TermStore,
    symbols: &SymbolStore,
) -> Result<String, String> {
    let mut out = String::from("forall");
    for &v in &conjecture.vars {
        out.push(' ');
        out.push_str(&format_term(v, terms, symbols)?);
    }
    out.push_str(". ");
    out.push_str(&format_term(conjecture.lhs, terms, symbols)?);
    out.push_str(" = ");
    out.push_str(&format_term(conjecture.rhs, terms, symbols)?);
    Ok(out)
}
