use super::*;
use crate::term::FuncKind;
use crate::test_utils::Nat;

// ========== LOOKUP ==========

#[test]
fn equivalent_terms_instantiates_the_stored_rhs() {
    let n = Nat::new();
    let f = n.func("f", &[n.nat, n.nat], FuncKind::Uninterpreted);
    let g = n.func("g", &[n.nat], FuncKind::Uninterpreted);
    let a = n.func("a", &[], FuncKind::Uninterpreted);
    let b = n.func("b", &[], FuncKind::Uninterpreted);
    let (ta, tb) = (n.terms.app0(a), n.terms.app0(b));

    let mut index = TheoremIndex::new();
    index.add_theorem(n.terms.app2(f, n.x(0), n.x(1)), n.terms.app1(g, n.x(0)), &n.terms);

    let found = index.equivalent_terms(n.terms.app2(f, ta, tb), &n.terms);
    assert!(
        found.contains(&n.terms.app1(g, ta)),
        "f(a, b) should be equivalent to g(a), got {:?}",
        found
    );
}

#[test]
fn operator_branch_requires_matching_structure() {
    let n = Nat::new();
    let mut index = TheoremIndex::new();
    // plus(x0, Z) = x0
    index.add_theorem(n.add(n.x(0), n.zero()), n.x(0), &n.terms);

    let hit = index.equivalent_terms(n.add(n.num(2), n.zero()), &n.terms);
    assert_eq!(hit, vec![n.num(2)]);

    let miss = index.equivalent_terms(n.add(n.num(2), n.num(1)), &n.terms);
    assert!(miss.is_empty(), "S(Z) does not match the Z edge");
}

#[test]
fn distinct_variables_bind_independently() {
    let n = Nat::new();
    let mut index = TheoremIndex::new();
    // plus(x0, x0) = S(x0) and plus(x0, x1) = plus(x1, x0)
    index.add_theorem(n.add(n.x(0), n.x(0)), n.succ(n.x(0)), &n.terms);
    index.add_theorem(n.add(n.x(0), n.x(1)), n.add(n.x(1), n.x(0)), &n.terms);

    let found = index.equivalent_terms(n.add(n.zero(), n.num(1)), &n.terms);
    assert_eq!(
        found,
        vec![n.add(n.num(1), n.zero())],
        "the diagonal theorem must not fire on distinct arguments"
    );

    let diagonal = index.equivalent_terms(n.add(n.zero(), n.zero()), &n.terms);
    assert!(diagonal.contains(&n.succ(n.zero())));
    assert!(diagonal.contains(&n.add(n.zero(), n.zero())));
}

#[test]
fn variable_branch_captures_whole_subterms() {
    let n = Nat::new();
    let mut index = TheoremIndex::new();
    index.add_theorem(n.succ(n.x(0)), n.add(n.x(0), n.num(1)), &n.terms);
    let deep = n.add(n.zero(), n.zero());
    assert_eq!(
        index.equivalent_terms(n.succ(deep), &n.terms),
        vec![n.add(deep, n.num(1))]
    );
}

#[test]
fn variables_do_not_capture_other_sorts() {
    let n = Nat::new();
    let list = n.symbols.sort("List");
    let nil = n.symbols.intern("nil");
    n.terms.declare(nil, &[], list, FuncKind::Constructor);
    let mut index = TheoremIndex::new();
    index.add_theorem(n.x(0), n.zero(), &n.terms);
    assert!(index.equivalent_terms(n.terms.app0(nil), &n.terms).is_empty());
}

// ========== BOOKKEEPING ==========

#[test]
fn duplicate_theorems_are_stored_once() {
    let n = Nat::new();
    let mut index = TheoremIndex::new();
    let lhs = n.add(n.x(0), n.zero());
    index.add_theorem(lhs, n.x(0), &n.terms);
    index.add_theorem(lhs, n.x(0), &n.terms);
    assert_eq!(index.len(), 1);
    index.clear();
    assert!(index.is_empty());
    assert!(index.equivalent_terms(n.add(n.zero(), n.zero()), &n.terms).is_empty());
}

#[test]
fn shared_prefixes_reuse_trie_nodes() {
    let n = Nat::new();
    let mut index = TheoremIndex::new();
    // plus(x0, Z) = x0 and plus(x0, S(x1)) = S(plus(x0, x1)) share the
    // operator edge for plus and the variable edge for x0.
    index.add_theorem(n.add(n.x(0), n.zero()), n.x(0), &n.terms);
    let after_first = index.nodes.len();
    let step = n.add(n.x(0), n.succ(n.x(1)));
    index.add_theorem(step, n.succ(n.add(n.x(0), n.x(1))), &n.terms);
    assert_eq!(
        index.nodes.len(),
        after_first + 2,
        "only the S and x1 edges should be new"
    );
    assert_eq!(index.len(), 2);

    let base = index.equivalent_terms(n.add(n.num(2), n.zero()), &n.terms);
    assert_eq!(base, vec![n.num(2)]);
    let stepped = index.equivalent_terms(n.add(n.num(2), n.num(1)), &n.terms);
    assert_eq!(stepped, vec![n.succ(n.add(n.num(2), n.zero()))]);
}
