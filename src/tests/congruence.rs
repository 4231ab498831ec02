use super::*;
use crate::term::FuncKind;
use crate::test_utils::Nat;

fn constants(n: &Nat, names: &[&str]) -> Vec<TermId> {
    names
        .iter()
        .map(|name| n.terms.app0(n.func(name, &[], FuncKind::Uninterpreted)))
        .collect()
}

#[derive(Default)]
struct Recorder {
    created: Vec<TermId>,
    merges: Vec<(TermId, TermId)>,
    disequalities: usize,
}

impl MergeListener for Recorder {
    fn new_class(&mut self, term: TermId) {
        self.created.push(term);
    }

    fn pre_merge(&mut self, survivor: TermId, absorbed: TermId) {
        self.merges.push((survivor, absorbed));
    }

    fn disequal(&mut self, _left: TermId, _right: TermId) {
        self.disequalities += 1;
    }
}

// ========== CLOSURE ==========

#[test]
fn equality_is_closed_under_congruence() {
    let n = Nat::new();
    let c = constants(&n, &["a", "b"]);
    let (a, b) = (c[0], c[1]);
    let mut cc = CongruenceClosure::new();
    let fa = n.succ(a);
    let fb = n.succ(b);
    cc.add_term(fa, &n.terms);
    cc.add_term(fb, &n.terms);
    assert!(!cc.are_equal(fa, fb));

    cc.assert_equal(a, b, &n.terms);
    assert!(cc.are_equal(fa, fb), "S(a) = S(b) follows from a = b");
    assert_eq!(cc.representative(fa), cc.representative(fb));
}

#[test]
fn congruence_applies_to_terms_added_later() {
    let n = Nat::new();
    let c = constants(&n, &["a", "b"]);
    let mut cc = CongruenceClosure::new();
    cc.assert_equal(c[0], c[1], &n.terms);
    cc.add_term(n.add(c[0], n.zero()), &n.terms);
    cc.add_term(n.add(c[1], n.zero()), &n.terms);
    assert!(cc.are_equal(n.add(c[0], n.zero()), n.add(c[1], n.zero())));
}

#[test]
fn plus_table_evaluates_sums() {
    let n = Nat::new();
    let cc = n.plus_table(3);
    assert!(cc.are_equal(n.add(n.num(1), n.num(1)), n.num(2)));
    assert!(cc.are_equal(n.add(n.num(2), n.num(2)), n.num(4)));
    assert!(!cc.are_equal(n.num(1), n.num(2)));
    assert_eq!(cc.classes().len(), 5, "numerals 0 through 4");
}

#[test]
fn class_members_enumerate_the_whole_class() {
    let n = Nat::new();
    let cc = n.plus_table(2);
    let members = cc.class_members(n.num(1));
    assert_eq!(members[0], n.num(1), "the queried term comes first");
    for t in [n.add(n.zero(), n.num(1)), n.add(n.num(1), n.zero())] {
        assert!(members.contains(&t), "{} missing", n.show(t));
    }
    assert_eq!(members.len(), 3);
    assert!(cc.class_members(n.num(7)).is_empty());
}

#[test]
fn unknown_terms_represent_themselves() {
    let n = Nat::new();
    let cc = CongruenceClosure::new();
    let t = n.num(3);
    assert!(!cc.has_term(t));
    assert_eq!(cc.representative(t), t);
    assert!(cc.are_equal(t, t));
}

// ========== DISEQUALITY ==========

#[test]
fn disequality_follows_merged_classes() {
    let n = Nat::new();
    let c = constants(&n, &["a", "b", "c"]);
    let mut cc = CongruenceClosure::new();
    cc.assert_disequal(c[0], c[1], &n.terms);
    assert!(cc.are_disequal(c[0], c[1]));
    assert!(cc.are_disequal(c[1], c[0]), "disequality is symmetric");
    assert!(!cc.are_disequal(c[2], c[1]));

    cc.assert_equal(c[2], c[0], &n.terms);
    assert!(cc.are_disequal(c[2], c[1]));
}

// ========== SCOPES ==========

#[test]
fn pop_restores_previous_classes() {
    let n = Nat::new();
    let c = constants(&n, &["a", "b"]);
    let mut cc = CongruenceClosure::new();
    cc.add_term(n.succ(c[0]), &n.terms);
    cc.add_term(n.succ(c[1]), &n.terms);

    cc.push();
    assert_eq!(cc.scope_depth(), 1);
    cc.assert_equal(c[0], c[1], &n.terms);
    assert!(cc.are_equal(n.succ(c[0]), n.succ(c[1])));

    cc.pop(&n.terms);
    assert_eq!(cc.scope_depth(), 0);
    assert!(!cc.are_equal(c[0], c[1]));
    assert!(!cc.are_equal(n.succ(c[0]), n.succ(c[1])));
    assert!(cc.has_term(n.succ(c[0])), "terms added before push survive");
}

#[test]
fn pop_drops_terms_added_in_scope() {
    let n = Nat::new();
    let mut cc = CongruenceClosure::new();
    cc.push();
    cc.add_term(n.num(2), &n.terms);
    cc.pop(&n.terms);
    assert!(!cc.has_term(n.num(2)));
    assert!(cc.classes().is_empty());
}

#[test]
#[should_panic(expected = "without a matching push")]
fn pop_without_push_panics() {
    let n = Nat::new();
    let mut cc = CongruenceClosure::new();
    cc.pop(&n.terms);
}

// ========== LISTENER ==========

#[test]
fn listener_sees_class_events() {
    let n = Nat::new();
    let c = constants(&n, &["a", "b"]);
    let mut cc = CongruenceClosure::new();
    let mut rec = Recorder::default();

    cc.add_term_with(n.succ(c[0]), &n.terms, &mut rec);
    assert_eq!(rec.created, vec![c[0], n.succ(c[0])], "children are created first");

    cc.assert_equal_with(c[0], c[1], &n.terms, &mut rec);
    assert_eq!(rec.merges.len(), 1);
    let (survivor, absorbed) = rec.merges[0];
    assert!(survivor != absorbed);
    assert!([c[0], c[1]].contains(&survivor) && [c[0], c[1]].contains(&absorbed));

    cc.assert_disequal(c[0], n.succ(c[0]), &n.terms);
    assert_eq!(rec.disequalities, 0, "plain disequality bypasses the listener");
}

#[test]
fn pop_replays_surviving_events() {
    let n = Nat::new();
    let c = constants(&n, &["a", "b"]);
    let mut cc = CongruenceClosure::new();
    cc.assert_equal(c[0], c[1], &n.terms);
    cc.push();
    cc.add_term(n.num(1), &n.terms);

    let mut rec = Recorder::default();
    cc.pop_with(&n.terms, &mut rec);
    assert_eq!(rec.created, vec![c[0], c[1]]);
    assert_eq!(rec.merges.len(), 1, "the surviving merge is replayed");
}
