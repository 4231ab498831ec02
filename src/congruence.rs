//! Backtrackable congruence closure.
//!
//! Union-find with union by size, a signature table for congruence and use
//! lists per class. Scopes are handled by logging every operation: `pop`
//! truncates the log to the scope mark and replays the rest into fresh
//! structures, re-raising listener events on the way.

use crate::model::GroundModel;
use crate::symbol::FuncId;
use crate::term::{Term, TermId, TermStore};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

#[cfg(feature = "tracing")]
use crate::trace::trace;

/// Observer of class events. Terms passed are class representatives; on
/// merge `survivor` keeps representing the union and `absorbed` stops.
pub trait MergeListener {
    fn new_class(&mut self, _term: TermId) {}
    fn pre_merge(&mut self, _survivor: TermId, _absorbed: TermId) {}
    fn post_merge(&mut self, _survivor: TermId, _absorbed: TermId) {}
    fn disequal(&mut self, _left: TermId, _right: TermId) {}
}

/// Listener that ignores every event.
pub struct NoListener;

impl MergeListener for NoListener {}

type NodeId = u32;
type SigKey = (FuncId, SmallVec<[NodeId; 4]>);

#[derive(Debug, Clone)]
struct Node {
    term: TermId,
    parent: NodeId,
    size: u32,
    /// Next member in the circular class list.
    next: NodeId,
    app: Option<(FuncId, SmallVec<[NodeId; 4]>)>,
    /// Applications with an argument in this class (kept on representatives).
    uses: Vec<NodeId>,
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Add(TermId),
    Equal(TermId, TermId),
    Disequal(TermId, TermId),
}

#[derive(Debug, Default)]
pub struct CongruenceClosure {
    nodes: Vec<Node>,
    index: FxHashMap<TermId, NodeId>,
    lookup: FxHashMap<SigKey, NodeId>,
    disequal: Vec<(NodeId, NodeId)>,
    log: Vec<Op>,
    scopes: Vec<usize>,
}

impl CongruenceClosure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_term(&mut self, term: TermId, terms: &TermStore) {
        self.add_term_with(term, terms, &mut NoListener);
    }

    pub fn add_term_with<L: MergeListener>(&mut self, term: TermId, terms: &TermStore, l: &mut L) {
        self.apply(Op::Add(term), terms, l);
    }

    pub fn assert_equal(&mut self, a: TermId, b: TermId, terms: &TermStore) {
        self.assert_equal_with(a, b, terms, &mut NoListener);
    }

    pub fn assert_equal_with<L: MergeListener>(
        &mut self,
        a: TermId,
        b: TermId,
        terms: &TermStore,
        l: &mut L,
    ) {
        self.apply(Op::Equal(a, b), terms, l);
    }

    pub fn assert_disequal(&mut self, a: TermId, b: TermId, terms: &TermStore) {
        self.apply(Op::Disequal(a, b), terms, &mut NoListener);
    }

    pub fn push(&mut self) {
        self.scopes.push(self.log.len());
    }

    pub fn pop(&mut self, terms: &TermStore) {
        self.pop_with(terms, &mut NoListener);
    }

    /// Undo everything since the matching `push`.
    pub fn pop_with<L: MergeListener>(&mut self, terms: &TermStore, l: &mut L) {
        let mark = self
            .scopes
            .pop()
            .unwrap_or_else(|| panic!("congruence closure popped without a matching push"));
        let mut ops = std::mem::take(&mut self.log);
        ops.truncate(mark);
        self.nodes.clear();
        self.index.clear();
        self.lookup.clear();
        self.disequal.clear();
        for op in ops {
            self.apply(op, terms, l);
        }
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    fn apply<L: MergeListener>(&mut self, op: Op, terms: &TermStore, l: &mut L) {
        self.log.push(op);
        let mut pending = Vec::new();
        match op {
            Op::Add(t) => {
                self.intern(t, terms, l, &mut pending);
            }
            Op::Equal(a, b) => {
                let na = self.intern(a, terms, l, &mut pending);
                let nb = self.intern(b, terms, l, &mut pending);
                pending.push((na, nb));
            }
            Op::Disequal(a, b) => {
                let na = self.intern(a, terms, l, &mut pending);
                let nb = self.intern(b, terms, l, &mut pending);
                self.disequal.push((na, nb));
                l.disequal(a, b);
            }
        }
        self.propagate(&mut pending, l);
    }

    fn find(&self, mut n: NodeId) -> NodeId {
        while self.nodes[n as usize].parent != n {
            n = self.nodes[n as usize].parent;
        }
        n
    }

    fn signature(&self, n: NodeId) -> Option<SigKey> {
        let (f, args) = self.nodes[n as usize].app.as_ref()?;
        Some((*f, args.iter().map(|&a| self.find(a)).collect()))
    }

    fn intern<L: MergeListener>(
        &mut self,
        t: TermId,
        terms: &TermStore,
        l: &mut L,
        pending: &mut Vec<(NodeId, NodeId)>,
    ) -> NodeId {
        if let Some(&n) = self.index.get(&t) {
            return n;
        }
        let app = match terms.resolve(t) {
            Some(Term::App(f, children)) => {
                let mut args: SmallVec<[NodeId; 4]> = SmallVec::new();
                for &c in children.iter() {
                    args.push(self.intern(c, terms, l, pending));
                }
                Some((f, args))
            }
            _ => None,
        };
        let n = self.nodes.len() as NodeId;
        self.nodes.push(Node {
            term: t,
            parent: n,
            size: 1,
            next: n,
            app,
            uses: Vec::new(),
        });
        self.index.insert(t, n);
        l.new_class(t);

        if let Some(sig) = self.signature(n) {
            for &arg_rep in sig.1.iter() {
                let uses = &mut self.nodes[arg_rep as usize].uses;
                if !uses.contains(&n) {
                    uses.push(n);
                }
            }
            match self.lookup.get(&sig) {
                Some(&other) => pending.push((n, other)),
                None => {
                    self.lookup.insert(sig, n);
                }
            }
        }
        n
    }

    fn propagate<L: MergeListener>(&mut self, pending: &mut Vec<(NodeId, NodeId)>, l: &mut L) {
        while let Some((a, b)) = pending.pop() {
            let (mut survivor, mut absorbed) = (self.find(a), self.find(b));
            if survivor == absorbed {
                continue;
            }
            if self.nodes[survivor as usize].size < self.nodes[absorbed as usize].size {
                std::mem::swap(&mut survivor, &mut absorbed);
            }
            let (st, at) = (
                self.nodes[survivor as usize].term,
                self.nodes[absorbed as usize].term,
            );
            #[cfg(feature = "tracing")]
            trace!(survivor = ?st, absorbed = ?at, "congruence_merge");
            l.pre_merge(st, at);

            let moved = std::mem::take(&mut self.nodes[absorbed as usize].uses);
            for &u in &moved {
                if let Some(sig) = self.signature(u) {
                    if self.lookup.get(&sig) == Some(&u) {
                        self.lookup.remove(&sig);
                    }
                }
            }

            self.nodes[absorbed as usize].parent = survivor;
            self.nodes[survivor as usize].size += self.nodes[absorbed as usize].size;
            let survivor_next = self.nodes[survivor as usize].next;
            self.nodes[survivor as usize].next = self.nodes[absorbed as usize].next;
            self.nodes[absorbed as usize].next = survivor_next;

            for u in moved {
                if let Some(sig) = self.signature(u) {
                    match self.lookup.get(&sig) {
                        Some(&v) if self.find(v) != self.find(u) => pending.push((u, v)),
                        Some(_) => {}
                        None => {
                            self.lookup.insert(sig, u);
                        }
                    }
                }
                let uses = &mut self.nodes[survivor as usize].uses;
                if !uses.contains(&u) {
                    uses.push(u);
                }
            }
            l.post_merge(st, at);
        }
    }

    pub fn has_term(&self, t: TermId) -> bool {
        self.index.contains_key(&t)
    }

    /// Representative of the class of `t`, or `t` itself if unknown.
    pub fn representative(&self, t: TermId) -> TermId {
        match self.index.get(&t) {
            Some(&n) => self.nodes[self.find(n) as usize].term,
            None => t,
        }
    }

    pub fn are_equal(&self, a: TermId, b: TermId) -> bool {
        if a == b {
            return true;
        }
        match (self.index.get(&a), self.index.get(&b)) {
            (Some(&na), Some(&nb)) => self.find(na) == self.find(nb),
            _ => false,
        }
    }

    pub fn are_disequal(&self, a: TermId, b: TermId) -> bool {
        let (Some(&na), Some(&nb)) = (self.index.get(&a), self.index.get(&b)) else {
            return false;
        };
        let (ra, rb) = (self.find(na), self.find(nb));
        self.disequal.iter().any(|&(x, y)| {
            let (rx, ry) = (self.find(x), self.find(y));
            (rx == ra && ry == rb) || (rx == rb && ry == ra)
        })
    }

    /// Class representatives in order of first appearance.
    pub fn classes(&self) -> Vec<TermId> {
        (0..self.nodes.len() as NodeId)
            .filter(|&n| self.nodes[n as usize].parent == n)
            .map(|n| self.nodes[n as usize].term)
            .collect()
    }

    /// Members of the class of `t`, starting with `t`'s node.
    pub fn class_members(&self, t: TermId) -> Vec<TermId> {
        let Some(&start) = self.index.get(&t) else {
            return Vec::new();
        };
        let mut out = vec![self.nodes[start as usize].term];
        let mut n = self.nodes[start as usize].next;
        while n != start {
            out.push(self.nodes[n as usize].term);
            n = self.nodes[n as usize].next;
        }
        out
    }
}

impl GroundModel for CongruenceClosure {
    fn has_term(&self, t: TermId) -> bool {
        CongruenceClosure::has_term(self, t)
    }

    fn representative(&self, t: TermId) -> TermId {
        CongruenceClosure::representative(self, t)
    }

    fn are_disequal(&self, a: TermId, b: TermId) -> bool {
        CongruenceClosure::are_disequal(self, a, b)
    }

    fn classes(&self) -> Vec<TermId> {
        CongruenceClosure::classes(self)
    }

    fn class_members(&self, rep: TermId) -> Vec<TermId> {
        CongruenceClosure::class_members(self, rep)
    }
}

#[cfg(test)]
#[path = "tests/congruence.rs"]
mod tests;
