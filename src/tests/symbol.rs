use super::*;

// ========== FUNCTION SYMBOLS ==========

#[test]
fn intern_same_name_returns_same_id() {
    let symbols = SymbolStore::new();
    let a = symbols.intern("plus");
    let b = symbols.intern("plus");
    assert_eq!(a, b, "Same name should intern to the same FuncId");
}

#[test]
fn intern_resolves_back_to_name() {
    let symbols = SymbolStore::new();
    let id = symbols.intern("S");
    assert_eq!(symbols.resolve(id), Some("S"));
    assert!(symbols.contains("S"));
    assert_eq!(symbols.get("S"), Some(id));
    assert_eq!(symbols.get("missing"), None);
}

// ========== SORTS ==========

#[test]
fn bool_sort_exists_from_the_start() {
    let symbols = SymbolStore::new();
    assert_eq!(symbols.sort_name(symbols.bool_sort()), Some(BOOL_SORT_NAME));
    assert_eq!(
        symbols.sort(BOOL_SORT_NAME),
        symbols.bool_sort(),
        "Interning Bool again must return the built-in sort"
    );
}

#[test]
fn sorts_and_functions_have_separate_namespaces() {
    let symbols = SymbolStore::new();
    let nat = symbols.sort("Nat");
    assert!(!symbols.contains("Nat"), "A sort name is not a function symbol");
    symbols.intern("Nat");
    assert_eq!(symbols.sort("Nat"), nat);
    assert_eq!(symbols.sort_name(nat), Some("Nat"));
}

#[test]
fn distinct_sorts_get_distinct_ids() {
    let symbols = SymbolStore::new();
    let nat = symbols.sort("Nat");
    let list = symbols.sort("List");
    assert_ne!(nat, list);
    assert_ne!(nat, symbols.bool_sort());
}
