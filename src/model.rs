//! Ground model access and the per-round index built over it.

use crate::subst::Subst;
use crate::subst_index::WitnessEvaluator;
use crate::symbol::FuncId;
use crate::term::{FuncKind, Term, TermId, TermStore};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

#[cfg(feature = "tracing")]
use crate::trace::{debug, debug_span};

/// Read access to the equivalence classes of the current ground model.
pub trait GroundModel {
    fn has_term(&self, t: TermId) -> bool;
    fn representative(&self, t: TermId) -> TermId;
    fn are_disequal(&self, a: TermId, b: TermId) -> bool;
    /// Class representatives.
    fn classes(&self) -> Vec<TermId>;
    fn class_members(&self, rep: TermId) -> Vec<TermId>;

    fn are_equal(&self, a: TermId, b: TermId) -> bool {
        a == b
            || (self.has_term(a)
                && self.has_term(b)
                && self.representative(a) == self.representative(b))
    }

    /// False for terms the host has excluded from matching.
    fn is_matchable(&self, _t: TermId) -> bool {
        true
    }

    /// The designated Boolean constant for `value`, if the model has one.
    fn boolean_term(&self, _value: bool) -> Option<TermId> {
        None
    }
}

/// Trie over argument-representative sequences. Edges at depth `k` are keyed
/// by the class of argument `k`; below the last argument a final edge is
/// keyed by the term itself.
#[derive(Debug, Clone, Default)]
pub struct ArgTrie {
    nodes: Vec<ArgNode>,
}

#[derive(Debug, Clone, Default)]
struct ArgNode {
    children: Vec<(TermId, u32)>,
    /// Applications ending at this node (operator-argument view).
    ops: Vec<(FuncId, TermId)>,
}

impl ArgTrie {
    fn new_root(&mut self) -> u32 {
        self.nodes.push(ArgNode::default());
        (self.nodes.len() - 1) as u32
    }

    fn child(&mut self, node: u32, key: TermId) -> u32 {
        if let Some(&(_, c)) = self.nodes[node as usize]
            .children
            .iter()
            .find(|(k, _)| *k == key)
        {
            return c;
        }
        let c = self.nodes.len() as u32;
        self.nodes.push(ArgNode::default());
        self.nodes[node as usize].children.push((key, c));
        c
    }

    fn insert_path(&mut self, root: u32, keys: &[TermId]) -> u32 {
        keys.iter().fold(root, |node, &k| self.child(node, k))
    }

    /// Key and target of edge `pos` of `node`.
    pub fn edge(&self, node: u32, pos: usize) -> Option<(TermId, u32)> {
        self.nodes[node as usize].children.get(pos).copied()
    }
}

/// Per-function index from a class to the argument classes of the
/// applications in it.
#[derive(Debug, Clone, Default)]
pub struct FuncClassTrie {
    roots: FxHashMap<TermId, u32>,
    pub trie: ArgTrie,
}

impl FuncClassTrie {
    pub fn root(&self, class: TermId) -> Option<u32> {
        self.roots.get(&class).copied()
    }
}

/// Snapshot of the ground model taken at the start of a round.
#[derive(Debug, Default)]
pub struct ModelIndex {
    classes: Vec<TermId>,
    class_numbers: FxHashMap<TermId, usize>,
    ground: FxHashMap<TermId, TermId>,
    booleans: [Option<TermId>; 2],
    op_args: ArgTrie,
    op_arg_roots: FxHashMap<TermId, u32>,
    func_tries: FxHashMap<FuncId, FuncClassTrie>,
    signatures: FxHashMap<(FuncId, SmallVec<[TermId; 4]>), TermId>,
    functions: Vec<FuncId>,
}

impl ModelIndex {
    pub fn build<M: GroundModel + ?Sized>(model: &M, terms: &TermStore) -> Self {
        #[cfg(feature = "tracing")]
        let _span = debug_span!("model_index_build").entered();

        let mut index = ModelIndex::default();
        let truth = [model.boolean_term(false), model.boolean_term(true)];

        for rep in model.classes() {
            index.class_numbers.insert(rep, index.classes.len());
            index.classes.push(rep);
            for (value, b) in truth.iter().enumerate() {
                if let Some(b) = *b {
                    if model.are_equal(rep, b) {
                        index.booleans[value] = Some(rep);
                        index.ground.insert(rep, b);
                    }
                }
            }
            for member in model.class_members(rep) {
                if !model.is_matchable(member) {
                    continue;
                }
                let Some(Term::App(f, children)) = terms.resolve(member) else {
                    continue;
                };
                if terms.kind(f) == Some(FuncKind::Skolem) {
                    continue;
                }
                let args: SmallVec<[TermId; 4]> = children
                    .iter()
                    .map(|&c| model.representative(c))
                    .collect();
                index.add_handled(rep, member, f, &args);
            }
        }

        index.compute_ground_terms(terms);
        #[cfg(feature = "tracing")]
        debug!(
            classes = index.classes.len(),
            ground = index.ground.len(),
            functions = index.functions.len(),
            "model_index_ready"
        );
        index
    }

    fn add_handled(&mut self, rep: TermId, term: TermId, f: FuncId, args: &[TermId]) {
        if !self.func_tries.contains_key(&f) {
            self.functions.push(f);
        }

        let op_root = match self.op_arg_roots.get(&rep) {
            Some(&r) => r,
            None => {
                let r = self.op_args.new_root();
                self.op_arg_roots.insert(rep, r);
                r
            }
        };
        let leaf = self.op_args.insert_path(op_root, args);
        let ops = &mut self.op_args.nodes[leaf as usize].ops;
        if !ops.iter().any(|&(g, _)| g == f) {
            ops.push((f, term));
        }

        let ft = self.func_tries.entry(f).or_default();
        let root = match ft.roots.get(&rep) {
            Some(&r) => r,
            None => {
                let r = ft.trie.new_root();
                ft.roots.insert(rep, r);
                r
            }
        };
        let last = ft.trie.insert_path(root, args);
        ft.trie.child(last, term);

        self.signatures
            .entry((f, SmallVec::from_slice(args)))
            .or_insert(rep);
    }

    /// Assign ground terms until no class gains one, first through
    /// constructor applications only and then through any application.
    /// Each pass either makes progress or stops, so at most one pass per
    /// class is needed.
    fn compute_ground_terms(&mut self, terms: &TermStore) {
        for constructors_only in [true, false] {
            let mut passes = 0;
            loop {
                passes += 1;
                assert!(
                    passes <= self.classes.len() + 1,
                    "ground term resolution did not reach a fixpoint"
                );
                let mut changed = false;
                for i in 0..self.classes.len() {
                    let rep = self.classes[i];
                    if self.ground.contains_key(&rep) {
                        continue;
                    }
                    let inductive = terms.sort_of(rep).is_some_and(|s| terms.is_inductive(s));
                    let found = if inductive {
                        self.op_arg_roots.get(&rep).and_then(|&root| {
                            self.ground_term_at(root, constructors_only, &mut SmallVec::new(), terms)
                        })
                    } else {
                        Some(rep)
                    };
                    if let Some(g) = found {
                        self.ground.insert(rep, g);
                        changed = true;
                    }
                }
                if !changed {
                    break;
                }
            }
        }
    }

    fn ground_term_at(
        &self,
        node: u32,
        constructors_only: bool,
        args: &mut SmallVec<[TermId; 4]>,
        terms: &TermStore,
    ) -> Option<TermId> {
        let n = &self.op_args.nodes[node as usize];
        let constructor = n
            .ops
            .iter()
            .find(|(f, _)| terms.kind(*f) == Some(FuncKind::Constructor));
        let chosen = if constructors_only {
            constructor
        } else {
            constructor.or_else(|| n.ops.first())
        };
        if let Some(&(f, _)) = chosen {
            return Some(terms.app(f, args.clone()));
        }
        for &(arg_class, child) in &n.children {
            if let Some(&g) = self.ground.get(&arg_class) {
                args.push(g);
                let found = self.ground_term_at(child, constructors_only, args, terms);
                args.pop();
                if found.is_some() {
                    return found;
                }
            }
        }
        None
    }

    pub fn classes(&self) -> &[TermId] {
        &self.classes
    }

    /// Stable number of a class within this snapshot.
    pub fn class_number(&self, class: TermId) -> Option<usize> {
        self.class_numbers.get(&class).copied()
    }

    pub fn ground_term(&self, class: TermId) -> Option<TermId> {
        self.ground.get(&class).copied()
    }

    pub fn is_ground_class(&self, class: TermId) -> bool {
        self.ground.contains_key(&class)
    }

    pub fn boolean_class(&self, value: bool) -> Option<TermId> {
        self.booleans[value as usize]
    }

    /// Classes split into those without a ground term and those with one.
    pub fn relevant_classes(&self) -> (Vec<TermId>, Vec<TermId>) {
        self.classes
            .iter()
            .copied()
            .partition(|c| !self.ground.contains_key(c))
    }

    /// Functions with at least one handled application, in first-seen order.
    pub fn functions(&self) -> &[FuncId] {
        &self.functions
    }

    pub fn func_trie(&self, f: FuncId) -> Option<&FuncClassTrie> {
        self.func_tries.get(&f)
    }

    /// Class of the existing application `f(args)`.
    pub fn lookup(&self, f: FuncId, args: &[TermId]) -> Option<TermId> {
        self.signatures
            .get(&(f, SmallVec::from_slice(args)))
            .copied()
    }

    /// Class of `pattern` with its variables replaced by the classes in
    /// `binding`. None when a variable is unbound or some application has
    /// no counterpart in the model.
    pub fn evaluate(&self, pattern: TermId, binding: &Subst, terms: &TermStore) -> Option<TermId> {
        match terms.resolve(pattern)? {
            Term::Var { .. } => binding.get(pattern),
            Term::App(f, children) => {
                let mut args: SmallVec<[TermId; 4]> = SmallVec::with_capacity(children.len());
                for c in children {
                    args.push(self.evaluate(c, binding, terms)?);
                }
                self.lookup(f, &args)
            }
        }
    }
}

/// Witness evaluation against a model snapshot.
pub struct GroundEvaluator<'a> {
    pub model: &'a ModelIndex,
    pub terms: &'a TermStore,
}

impl WitnessEvaluator for GroundEvaluator<'_> {
    fn evaluate(&self, pattern: TermId, binding: &Subst) -> Option<TermId> {
        self.model.evaluate(pattern, binding, self.terms)
    }

    fn ground_term(&self, class: TermId) -> Option<TermId> {
        self.model.ground_term(class)
    }

    fn is_value(&self, term: TermId) -> bool {
        self.terms.is_value(term)
    }
}

#[cfg(test)]
#[path = "tests/model.rs"]
mod tests;
