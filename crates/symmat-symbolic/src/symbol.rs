//! Symbols, assumptions and fresh dummy variables

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_DUMMY: AtomicU64 = AtomicU64::new(1);

/// Identity of a dummy symbol; unique within the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(pub u64);

impl SymbolId {
    fn fresh() -> Self {
        SymbolId(NEXT_DUMMY.fetch_add(1, Ordering::Relaxed))
    }
}

/// Assumptions attached to a symbol
///
/// A `false` field means "not assumed", not "assumed false". `negative` is
/// the only field that lets a symbol be proven invalid as a dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolAttrs {
    pub real: bool,
    pub positive: bool,
    pub integer: bool,
    pub nonnegative: bool,
    pub negative: bool,
}

impl SymbolAttrs {
    /// Nonnegative integer, the usual assumption for a matrix dimension
    pub fn dimension() -> Self {
        SymbolAttrs {
            real: true,
            integer: true,
            nonnegative: true,
            ..Default::default()
        }
    }

    /// Integer with no sign assumption, used for bound summation indices
    pub fn integer() -> Self {
        SymbolAttrs {
            real: true,
            integer: true,
            ..Default::default()
        }
    }
}

/// Where a symbol came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolScope {
    /// User-visible symbol, matched by name in substitutions
    Free,
    /// Fresh dummy, never equal to any other symbol
    Dummy(SymbolId),
    /// Canonical bound variable at the given nesting depth
    Bound(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    pub name: String,
    pub attrs: SymbolAttrs,
    pub scope: SymbolScope,
}

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_attrs(name, SymbolAttrs::default())
    }

    pub fn with_attrs(name: impl Into<String>, attrs: SymbolAttrs) -> Self {
        Symbol {
            name: name.into(),
            attrs,
            scope: SymbolScope::Free,
        }
    }

    /// A fresh dummy with integer assumptions
    ///
    /// Two calls with the same name yield symbols that never compare equal.
    pub fn dummy(name: impl Into<String>) -> Self {
        Symbol {
            name: name.into(),
            attrs: SymbolAttrs::integer(),
            scope: SymbolScope::Dummy(SymbolId::fresh()),
        }
    }

    /// The canonical bound variable for a given nesting depth
    pub fn bound(depth: u32, attrs: SymbolAttrs) -> Self {
        Symbol {
            name: format!("k{depth}"),
            attrs,
            scope: SymbolScope::Bound(depth),
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self.scope, SymbolScope::Free)
    }

    /// Name used to key this symbol in variable tables
    ///
    /// Dummies get their id appended so they can never shadow a free symbol
    /// with the same display name.
    pub fn unique_name(&self) -> String {
        match self.scope {
            SymbolScope::Free => self.name.clone(),
            SymbolScope::Dummy(SymbolId(id)) => format!("_{}#{}", self.name, id),
            SymbolScope::Bound(depth) => format!("_k#b{}", depth),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            SymbolScope::Free => write!(f, "{}", self.name),
            _ => write!(f, "_{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummies_are_unique() {
        let a = Symbol::dummy("i");
        let b = Symbol::dummy("i");
        assert_ne!(a, b);
        assert_ne!(a.unique_name(), b.unique_name());
        assert_eq!(a.to_string(), "_i");
        assert!(a.attrs.integer);
    }

    #[test]
    fn free_symbols_compare_by_name_and_attrs() {
        assert_eq!(Symbol::new("n"), Symbol::new("n"));
        assert_ne!(
            Symbol::new("n"),
            Symbol::with_attrs("n", SymbolAttrs::dimension())
        );
        assert_ne!(Symbol::new("i").unique_name(), Symbol::dummy("i").unique_name());
    }
}
