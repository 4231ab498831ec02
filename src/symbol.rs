use lasso::{Key, Spur, ThreadedRodeo};

/// A unique identifier for a function symbol (uninterpreted function,
/// constructor, selector or skolem).
/// This is an interned string ID for fast equality comparison.
pub type FuncId = Spur;

/// Identifier for a sort. Sorts are interned in their own namespace, so a
/// sort and a function may share a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SortId(u32);

impl SortId {
    /// Get the raw u32 value (for debugging/display).
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Name of the sort interned first by every store.
pub const BOOL_SORT_NAME: &str = "Bool";

/// Thread-safe symbol store for interning function and sort names.
///
/// Guarantees:
/// - Same string always produces same id within a namespace
/// - Ids can be resolved back to the original string
/// - The Boolean sort always exists
pub struct SymbolStore {
    funcs: ThreadedRodeo,
    sorts: ThreadedRodeo,
    bool_sort: SortId,
}

impl SymbolStore {
    /// Create a store holding only the Boolean sort.
    pub fn new() -> Self {
        let sorts = ThreadedRodeo::new();
        let bool_key = sorts.get_or_intern(BOOL_SORT_NAME);
        Self {
            funcs: ThreadedRodeo::new(),
            sorts,
            bool_sort: SortId(bool_key.into_usize() as u32),
        }
    }

    /// Intern a function symbol, returning its unique FuncId.
    pub fn intern(&self, name: &str) -> FuncId {
        self.funcs.get_or_intern(name)
    }

    /// Resolve a FuncId back to its string representation.
    pub fn resolve(&self, id: FuncId) -> Option<&str> {
        self.funcs.try_resolve(&id)
    }

    /// Check if a function symbol has already been interned.
    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains(name)
    }

    /// Get the FuncId for a symbol if it exists, without interning.
    pub fn get(&self, name: &str) -> Option<FuncId> {
        self.funcs.get(name)
    }

    /// Intern a sort name.
    pub fn sort(&self, name: &str) -> SortId {
        let key = self.sorts.get_or_intern(name);
        SortId(key.into_usize() as u32)
    }

    /// Resolve a sort back to its name.
    pub fn sort_name(&self, sort: SortId) -> Option<&str> {
        let key = Spur::try_from_usize(sort.0 as usize)?;
        self.sorts.try_resolve(&key)
    }

    pub fn bool_sort(&self) -> SortId {
        self.bool_sort
    }
}

impl Default for SymbolStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/symbol.rs"]
mod tests;
