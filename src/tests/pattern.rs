use super::*;
use crate::test_utils::Nat;

// ========== STATISTICS ==========

#[test]
fn stats_count_symbols_and_variables() {
    let n = Nat::new();
    let p = n.add(n.succ(n.x(0)), n.x(0));
    let stats = PatternStats::compute(p, &n.terms);

    assert_eq!(stats.size, 2, "plus and S are the only function nodes");
    assert_eq!(stats.symbol_counts.get(&n.plus), Some(&1));
    assert_eq!(stats.symbol_counts.get(&n.s), Some(&1));
    assert_eq!(stats.occurrences(n.x(0)), 2);
    assert_eq!(stats.repeated_vars, 1);
    assert_eq!(stats.var_count(n.nat), 1);
    assert!(stats.normal, "a repeated variable does not break normality");
}

#[test]
fn stats_detect_out_of_order_variables() {
    let n = Nat::new();
    let swapped = PatternStats::compute(n.add(n.x(1), n.x(0)), &n.terms);
    assert!(!swapped.normal, "x1 before x0 is not normal");

    let gap = PatternStats::compute(n.add(n.x(0), n.x(2)), &n.terms);
    assert!(!gap.normal, "skipping x1 is not normal");

    let ordered = PatternStats::compute(n.add(n.x(0), n.x(1)), &n.terms);
    assert!(ordered.normal);
    assert_eq!(ordered.var_count(n.nat), 2);
}

#[test]
fn stats_track_sorts_independently() {
    let n = Nat::new();
    let list = n.symbols.sort("List");
    let cons = n.symbols.intern("cons");
    n.terms
        .declare(cons, &[n.nat, list], list, crate::term::FuncKind::Constructor);
    let p = n.terms.app2(cons, n.x(0), n.terms.var(list, 0));
    let stats = PatternStats::compute(p, &n.terms);
    assert!(stats.normal, "each sort numbers its own variables from zero");
    assert_eq!(stats.var_count(n.nat), 1);
    assert_eq!(stats.var_count(list), 1);
}

#[test]
fn ground_pattern_has_no_variables() {
    let n = Nat::new();
    let stats = PatternStats::compute(n.num(2), &n.terms);
    assert_eq!(stats.size, 3);
    assert!(stats.var_occurrences.is_empty());
    assert_eq!(stats.var_count(n.nat), 0);
}

// ========== REGISTRY ==========

#[test]
fn register_is_idempotent_per_round() {
    let n = Nat::new();
    let mut registry = PatternRegistry::new();
    let p = n.succ(n.x(0));
    registry.register(p, n.nat, &n.terms);
    registry.register(p, n.nat, &n.terms);
    assert_eq!(registry.patterns(n.nat), &[p]);
    assert!(registry.is_registered(p));
}

#[test]
fn clear_round_keeps_statistics() {
    let n = Nat::new();
    let mut registry = PatternRegistry::new();
    let p = n.succ(n.x(0));
    registry.register(p, n.nat, &n.terms);
    let before = registry.stats(p).cloned();

    registry.clear_round();
    assert!(!registry.is_registered(p));
    assert!(registry.patterns(n.nat).is_empty());
    assert_eq!(registry.stats(p).cloned(), before, "stats are immutable once computed");
}

#[test]
fn stats_for_computes_lazily() {
    let n = Nat::new();
    let mut registry = PatternRegistry::new();
    let p = n.add(n.x(0), n.x(1));
    assert!(registry.stats(p).is_none());
    assert_eq!(registry.stats_for(p, &n.terms).size, 1);
    assert!(registry.stats(p).is_some());
    assert!(!registry.is_registered(p), "computing stats does not register");
}

// ========== CANONICALIZATION ==========

#[test]
fn canonicalize_renumbers_in_first_occurrence_order() {
    let n = Nat::new();
    let p = n.add(n.x(3), n.succ(n.x(1)));
    assert_eq!(canonicalize(p, &n.terms), n.add(n.x(0), n.succ(n.x(1))));
}

#[test]
fn canonicalize_is_idempotent() {
    let n = Nat::new();
    let p = n.add(n.x(5), n.add(n.x(2), n.x(5)));
    let once = canonicalize(p, &n.terms);
    assert_eq!(canonicalize(once, &n.terms), once);
    assert!(is_canonical(once, &n.terms));
    assert!(!is_canonical(p, &n.terms));
}

#[test]
fn shared_canonicalizer_numbers_both_sides_jointly() {
    let n = Nat::new();
    let mut canon = Canonicalizer::new();
    let lhs = canon.canonicalize(n.add(n.x(4), n.x(7)), &n.terms, &|_| true);
    let rhs = canon.canonicalize(n.add(n.x(7), n.x(4)), &n.terms, &|_| true);
    assert_eq!(lhs, Some(n.add(n.x(0), n.x(1))));
    assert_eq!(rhs, Some(n.add(n.x(1), n.x(0))), "renaming carries over to the second side");
}

#[test]
fn canonicalize_rejects_disallowed_functions() {
    let n = Nat::new();
    let plus = n.plus;
    let mut canon = Canonicalizer::new();
    let out = canon.canonicalize(n.succ(n.add(n.x(0), n.zero())), &n.terms, &|f| f != plus);
    assert_eq!(out, None);
}
