use crate::congruence::CongruenceClosure;
use crate::lemma::{Assertion, CaseSplit, Conjecture, ProofHost};
use crate::symbol::{FuncId, SortId, SymbolStore};
use crate::term::{FuncKind, TermId, TermStore};

pub(crate) fn setup() -> (SymbolStore, TermStore) {
    (SymbolStore::new(), TermStore::new())
}

/// Peano naturals: `Z`, `S` (constructors) and an uninterpreted `plus`.
pub(crate) struct Nat {
    pub symbols: SymbolStore,
    pub terms: TermStore,
    pub nat: SortId,
    pub z: FuncId,
    pub s: FuncId,
    pub plus: FuncId,
}

impl Nat {
    pub fn new() -> Self {
        let (symbols, terms) = setup();
        let nat = symbols.sort("Nat");
        let z = symbols.intern("Z");
        let s = symbols.intern("S");
        let plus = symbols.intern("plus");
        terms.declare(z, &[], nat, FuncKind::Constructor);
        terms.declare(s, &[nat], nat, FuncKind::Constructor);
        terms.declare(plus, &[nat, nat], nat, FuncKind::Uninterpreted);
        Self {
            symbols,
            terms,
            nat,
            z,
            s,
            plus,
        }
    }

    pub fn func(&self, name: &str, args: &[SortId], kind: FuncKind) -> FuncId {
        let f = self.symbols.intern(name);
        self.terms.declare(f, args, self.nat, kind);
        f
    }

    pub fn zero(&self) -> TermId {
        self.terms.app0(self.z)
    }

    pub fn succ(&self, t: TermId) -> TermId {
        self.terms.app1(self.s, t)
    }

    /// The numeral `S^n(Z)`.
    pub fn num(&self, n: u32) -> TermId {
        (0..n).fold(self.zero(), |t, _| self.succ(t))
    }

    pub fn add(&self, a: TermId, b: TermId) -> TermId {
        self.terms.app2(self.plus, a, b)
    }

    pub fn x(&self, i: u32) -> TermId {
        self.terms.var(self.nat, i)
    }

    /// Ground model holding `terms` with `plus(a, b)` evaluated for every
    /// pair of numerals below `n`.
    pub fn plus_table(&self, n: u32) -> CongruenceClosure {
        let mut cc = CongruenceClosure::new();
        for a in 0..n {
            cc.add_term(self.num(a), &self.terms);
            for b in 0..n {
                let sum = self.add(self.num(a), self.num(b));
                cc.assert_equal(sum, self.num(a + b), &self.terms);
            }
        }
        cc
    }

    pub fn show(&self, t: TermId) -> String {
        crate::term::format_term(t, &self.terms, &self.symbols).unwrap_or_default()
    }
}

/// Host that records everything the engine sends it.
#[derive(Default)]
pub(crate) struct RecordingHost {
    pub assertions: Vec<Assertion>,
    pub pending: bool,
    pub deactivated: Vec<usize>,
    pub lemmas: Vec<CaseSplit>,
    pub phases: Vec<(Conjecture, bool)>,
}

impl ProofHost for RecordingHost {
    fn assertions(&self) -> Vec<Assertion> {
        self.assertions.clone()
    }

    fn has_pending_lemmas(&self) -> bool {
        self.pending
    }

    fn deactivate(&mut self, index: usize) {
        self.deactivated.push(index);
    }

    fn add_lemma(&mut self, lemma: CaseSplit) {
        self.lemmas.push(lemma);
    }

    fn require_phase(&mut self, conjecture: &Conjecture, phase: bool) {
        self.phases.push((conjecture.clone(), phase));
    }
}
