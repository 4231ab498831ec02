use crate::error::TermError;
use crate::symbol::{FuncId, SortId, SymbolStore};
use hashbrown::HashMap;
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet, FxHasher};
use smallvec::SmallVec;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};

/// Unique identifier for a term in the term store.
/// TermIds are stable and can be compared for equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(u32);

impl TermId {
    /// Get the raw u32 value (for debugging/display).
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// A term is either a bound pattern variable or a function application.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// Pattern variable `index` of `sort`. Hashconsing makes each
    /// (sort, index) pair a singleton, which is the free-variable pool.
    Var { sort: SortId, index: u32 },
    /// A function application: functor applied to children.
    App(FuncId, SmallVec<[TermId; 4]>),
}

/// How a function symbol participates in matching and enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FuncKind {
    Uninterpreted,
    Constructor,
    Selector,
    /// Skolem symbols denote witnesses introduced by the host; their
    /// applications are never indexed for matching.
    Skolem,
}

/// Argument and result sorts of a declared function symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub args: SmallVec<[SortId; 4]>,
    pub result: SortId,
    pub kind: FuncKind,
}

/// Number of shards for hashcons maps (power of 2 for fast modulo).
const NUM_SHARDS: usize = 16;

/// Thread-safe term store with hashconsing and a signature table.
///
/// Guarantees:
/// - Structurally equal terms get the same TermId
/// - TermId can be resolved back to the term
/// - All terms (including variables) are hashconsed
pub struct TermStore {
    /// Central storage of all terms, indexed by TermId.
    nodes: RwLock<Vec<Option<Term>>>,
    /// Sharded hashcons maps for reducing contention.
    shards: [RwLock<HashMap<Term, TermId>>; NUM_SHARDS],
    /// Counter for generating unique TermIds.
    next_id: AtomicU32,
    signatures: RwLock<FxHashMap<FuncId, Signature>>,
    /// Sorts with at least one declared constructor.
    inductive: RwLock<FxHashSet<SortId>>,
}

impl TermStore {
    /// Create a new empty term store.
    pub fn new() -> Self {
        let shards = std::array::from_fn(|_| RwLock::new(HashMap::new()));
        Self {
            nodes: RwLock::new(Vec::new()),
            shards,
            next_id: AtomicU32::new(0),
            signatures: RwLock::new(FxHashMap::default()),
            inductive: RwLock::new(FxHashSet::default()),
        }
    }

    /// Intern a term, returning its TermId.
    /// If the term already exists, returns the existing TermId.
    fn intern(&self, term: Term) -> TermId {
        let shard_idx = Self::shard_index(&term);
        let shard = &self.shards[shard_idx];

        {
            let map = shard.read();
            if let Some(&id) = map.get(&term) {
                return id;
            }
        }

        let mut map = shard.write();

        // Double-check after acquiring write lock
        if let Some(&id) = map.get(&term) {
            return id;
        }

        let id = TermId(self.next_id.fetch_add(1, Ordering::Relaxed));
        {
            let mut nodes = self.nodes.write();
            let idx = id.0 as usize;
            if nodes.len() <= idx {
                nodes.resize(idx + 1, None);
            }
            nodes[idx] = Some(term.clone());
        }
        map.insert(term, id);
        id
    }

    /// Declare (or redeclare) the signature of a function symbol.
    pub fn declare(&self, func: FuncId, args: &[SortId], result: SortId, kind: FuncKind) {
        if kind == FuncKind::Constructor {
            self.inductive.write().insert(result);
        }
        self.signatures.write().insert(
            func,
            Signature {
                args: SmallVec::from_slice(args),
                result,
                kind,
            },
        );
    }

    pub fn signature(&self, func: FuncId) -> Option<Signature> {
        self.signatures.read().get(&func).cloned()
    }

    pub fn kind(&self, func: FuncId) -> Option<FuncKind> {
        self.signatures.read().get(&func).map(|sig| sig.kind)
    }

    /// True if some constructor produces values of `sort`.
    pub fn is_inductive(&self, sort: SortId) -> bool {
        self.inductive.read().contains(&sort)
    }

    /// The canonical pattern variable `index` of `sort`.
    pub fn var(&self, sort: SortId, index: u32) -> TermId {
        self.intern(Term::Var { sort, index })
    }

    /// Create an application term.
    /// Hashconsed: same functor and children always returns same TermId.
    pub fn app(&self, func: FuncId, children: SmallVec<[TermId; 4]>) -> TermId {
        self.intern(Term::App(func, children))
    }

    /// Create a nullary (0-arity) application.
    pub fn app0(&self, func: FuncId) -> TermId {
        self.app(func, SmallVec::new())
    }

    /// Create a unary (1-arity) application.
    pub fn app1(&self, func: FuncId, child: TermId) -> TermId {
        self.app(func, smallvec::smallvec![child])
    }

    /// Create a binary (2-arity) application.
    pub fn app2(&self, func: FuncId, left: TermId, right: TermId) -> TermId {
        self.app(func, smallvec::smallvec![left, right])
    }

    /// Create an application after checking it against the declared
    /// signature of `func`.
    pub fn try_app(&self, func: FuncId, children: &[TermId]) -> Result<TermId, TermError> {
        let sig = self
            .signature(func)
            .ok_or(TermError::UnknownFunction(func))?;
        if sig.args.len() != children.len() {
            return Err(TermError::ArityMismatch {
                func,
                expected: sig.args.len(),
                found: children.len(),
            });
        }
        for (position, (&child, &expected)) in children.iter().zip(sig.args.iter()).enumerate() {
            let found = self.sort_of(child).ok_or(TermError::UnknownTerm(child))?;
            if found != expected {
                return Err(TermError::SortMismatch {
                    func,
                    position,
                    expected,
                    found,
                });
            }
        }
        Ok(self.app(func, SmallVec::from_slice(children)))
    }

    /// Resolve a TermId to its term.
    /// Returns None if the TermId is invalid.
    pub fn resolve(&self, id: TermId) -> Option<Term> {
        let nodes = self.nodes.read();
        nodes.get(id.0 as usize).cloned().flatten()
    }

    /// Check if a term is a variable, returning its sort and index.
    pub fn is_var(&self, id: TermId) -> Option<(SortId, u32)> {
        match self.resolve(id)? {
            Term::Var { sort, index } => Some((sort, index)),
            Term::App(_, _) => None,
        }
    }

    /// Check if a term is an application, returning functor and children.
    pub fn is_app(&self, id: TermId) -> Option<(FuncId, SmallVec<[TermId; 4]>)> {
        match self.resolve(id)? {
            Term::Var { .. } => None,
            Term::App(f, children) => Some((f, children)),
        }
    }

    /// Sort of a term. Applications of undeclared functions have no sort.
    pub fn sort_of(&self, id: TermId) -> Option<SortId> {
        match self.resolve(id)? {
            Term::Var { sort, .. } => Some(sort),
            Term::App(f, _) => self.signature(f).map(|sig| sig.result),
        }
    }

    /// Kind of the head symbol of an application.
    pub fn head_kind(&self, id: TermId) -> Option<FuncKind> {
        let (f, _) = self.is_app(id)?;
        self.kind(f)
    }

    /// True for constructor applications whose arguments are all values.
    pub fn is_value(&self, id: TermId) -> bool {
        let mut stack = vec![id];
        while let Some(t) = stack.pop() {
            match self.resolve(t) {
                Some(Term::App(f, children)) if self.kind(f) == Some(FuncKind::Constructor) => {
                    stack.extend(children);
                }
                _ => return false,
            }
        }
        true
    }

    /// True if the term contains no pattern variables.
    pub fn is_ground(&self, id: TermId) -> bool {
        let mut stack = vec![id];
        while let Some(t) = stack.pop() {
            match self.resolve(t) {
                Some(Term::App(_, children)) => stack.extend(children),
                _ => return false,
            }
        }
        true
    }

    /// Get the shard index for a term (for hashconsing distribution).
    fn shard_index(term: &Term) -> usize {
        let mut hasher = FxHasher::default();
        term.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }
}

/// Render a term in s-expression form. Variables print as `$` followed by
/// their sort name and index, e.g. `$Nat0`.
pub fn format_term(
    term: TermId,
    terms: &TermStore,
    symbols: &SymbolStore,
) -> Result<String, String> {
    fn render(
        term: TermId,
        terms: &TermStore,
        symbols: &SymbolStore,
        out: &mut String,
    ) -> Result<(), String> {
        match terms.resolve(term) {
            Some(Term::Var { sort, index }) => {
                let name = symbols
                    .sort_name(sort)
                    .ok_or_else(|| format!("Unknown sort id {:?}", sort))?;
                out.push('$');
                out.push_str(name);
                out.push_str(&index.to_string());
                Ok(())
            }
            Some(Term::App(func, children)) => {
                let name = symbols
                    .resolve(func)
                    .ok_or_else(|| format!("Unknown symbol for func id {:?}", func))?;
                if children.is_empty() {
                    out.push_str(name);
                    Ok(())
                } else {
                    out.push('(');
                    out.push_str(name);
                    for child in children.iter() {
                        out.push(' ');
                        render(*child, terms, symbols, out)?;
                    }
                    out.push(')');
                    Ok(())
                }
            }
            None => Err(format!("Unknown term id {:?}", term)),
        }
    }

    let mut out = String::new();
    render(term, terms, symbols, &mut out)?;
    Ok(out)
}

impl Default for TermStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolStore;

    fn setup() -> (SymbolStore, TermStore) {
        (SymbolStore::new(), TermStore::new())
    }

    // ========== HAPPY PATH: VARIABLE TESTS ==========

    #[test]
    fn var_same_sort_and_index_returns_same_id() {
        let (symbols, terms) = setup();
        let nat = symbols.sort("Nat");
        assert_eq!(
            terms.var(nat, 3),
            terms.var(nat, 3),
            "Same variable should return same TermId"
        );
    }

    #[test]
    fn var_distinguishes_sorts() {
        let (symbols, terms) = setup();
        let nat = symbols.sort("Nat");
        let list = symbols.sort("List");
        assert_ne!(
            terms.var(nat, 0),
            terms.var(list, 0),
            "Variables of different sorts must differ"
        );
    }

    #[test]
    fn var_resolves_with_sort() {
        let (symbols, terms) = setup();
        let nat = symbols.sort("Nat");
        let id = terms.var(nat, 7);
        assert_eq!(terms.resolve(id), Some(Term::Var { sort: nat, index: 7 }));
        assert_eq!(terms.is_var(id), Some((nat, 7)));
        assert_eq!(terms.sort_of(id), Some(nat));
    }

    // ========== HAPPY PATH: APPLICATION TESTS ==========

    #[test]
    fn app_hashconses_structurally_equal_terms() {
        let (symbols, terms) = setup();
        let s = symbols.intern("S");
        let z = symbols.intern("Z");
        let a = terms.app1(s, terms.app0(z));
        let b = terms.app1(s, terms.app0(z));
        assert_eq!(a, b, "Structurally equal applications share an id");
    }

    #[test]
    fn sort_of_app_uses_declared_result() {
        let (symbols, terms) = setup();
        let nat = symbols.sort("Nat");
        let z = symbols.intern("Z");
        terms.declare(z, &[], nat, FuncKind::Constructor);
        assert_eq!(terms.sort_of(terms.app0(z)), Some(nat));
    }

    #[test]
    fn sort_of_undeclared_app_is_none() {
        let (symbols, terms) = setup();
        let f = symbols.intern("f");
        assert_eq!(terms.sort_of(terms.app0(f)), None);
    }

    // ========== CHECKED CONSTRUCTION ==========

    #[test]
    fn try_app_rejects_wrong_arity() {
        let (symbols, terms) = setup();
        let nat = symbols.sort("Nat");
        let s = symbols.intern("S");
        terms.declare(s, &[nat], nat, FuncKind::Constructor);
        let err = terms.try_app(s, &[]).unwrap_err();
        assert_eq!(
            err,
            TermError::ArityMismatch {
                func: s,
                expected: 1,
                found: 0
            }
        );
    }

    #[test]
    fn try_app_rejects_wrong_sort() {
        let (symbols, terms) = setup();
        let nat = symbols.sort("Nat");
        let list = symbols.sort("List");
        let s = symbols.intern("S");
        terms.declare(s, &[nat], nat, FuncKind::Constructor);
        let x = terms.var(list, 0);
        assert!(matches!(
            terms.try_app(s, &[x]),
            Err(TermError::SortMismatch { position: 0, .. })
        ));
    }

    #[test]
    fn try_app_rejects_undeclared_function() {
        let (symbols, terms) = setup();
        let f = symbols.intern("f");
        assert_eq!(terms.try_app(f, &[]), Err(TermError::UnknownFunction(f)));
    }

    // ========== VALUES AND INDUCTIVE SORTS ==========

    #[test]
    fn is_value_requires_constructors_all_the_way_down() {
        let (symbols, terms) = setup();
        let nat = symbols.sort("Nat");
        let z = symbols.intern("Z");
        let s = symbols.intern("S");
        let k = symbols.intern("k");
        terms.declare(z, &[], nat, FuncKind::Constructor);
        terms.declare(s, &[nat], nat, FuncKind::Constructor);
        terms.declare(k, &[], nat, FuncKind::Skolem);

        let one = terms.app1(s, terms.app0(z));
        assert!(terms.is_value(one));
        assert!(!terms.is_value(terms.app1(s, terms.app0(k))));
        assert!(!terms.is_value(terms.var(nat, 0)));
        assert!(terms.is_inductive(nat));
        assert!(!terms.is_inductive(symbols.bool_sort()));
    }

    #[test]
    fn is_ground_detects_variables() {
        let (symbols, terms) = setup();
        let nat = symbols.sort("Nat");
        let s = symbols.intern("S");
        let z = symbols.intern("Z");
        assert!(terms.is_ground(terms.app1(s, terms.app0(z))));
        assert!(!terms.is_ground(terms.app1(s, terms.var(nat, 0))));
    }

    // ========== FORMATTING ==========

    #[test]
    fn format_term_renders_sorted_variables() {
        let (symbols, terms) = setup();
        let nat = symbols.sort("Nat");
        let plus = symbols.intern("plus");
        let z = symbols.intern("Z");
        let t = terms.app2(plus, terms.var(nat, 1), terms.app0(z));
        assert_eq!(
            format_term(t, &terms, &symbols).unwrap(),
            "(plus $Nat1 Z)"
        );
    }

    #[test]
    fn format_term_unknown_id_is_error() {
        let (symbols, terms) = setup();
        assert!(format_term(TermId(999), &terms, &symbols).is_err());
    }
}
