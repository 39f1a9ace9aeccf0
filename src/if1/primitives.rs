//! The `Primitives` collaborator (§4.7, "Primitive recognition"): the
//! fixed arity/purity table a `SEND`'s operator symbol is matched against.
//! The same `#[derive(Assoc)]` + `#[func(...)]`/`#[assoc(...)]` pattern
//! that associates a per-variant opcode elsewhere associates a per-variant
//! IF1 arity and functional/non-functional purity flag here.

use std::collections::HashMap;

use compiler_core_common::interner::Symbol as Name;
use compiler_core_common::Interner;
use enum_assoc::Assoc;

/// The registry's closed operator set. `arity()` is the number of operand
/// `rvals` beyond the operator symbol itself (`SEND.rvals[0]`, J4);
/// `is_nonfunctional()` marks operators symbol liveness must treat as
/// side-effecting regardless of whether their results are live (§4.7).
#[allow(non_camel_case_types)]
#[derive(Debug, Eq, PartialEq, Copy, Clone, Assoc, strum_macros::Display)]
#[func(pub const fn arity(&self) -> usize)]
#[func(pub const fn is_nonfunctional(&self) -> bool)]
pub enum Primitive {
    #[assoc(arity = 1)]
    #[assoc(is_nonfunctional = false)]
    Neg,
    #[assoc(arity = 1)]
    #[assoc(is_nonfunctional = false)]
    Not,
    #[assoc(arity = 2)]
    #[assoc(is_nonfunctional = false)]
    Add,
    #[assoc(arity = 2)]
    #[assoc(is_nonfunctional = false)]
    Sub,
    #[assoc(arity = 2)]
    #[assoc(is_nonfunctional = false)]
    Mul,
    #[assoc(arity = 2)]
    #[assoc(is_nonfunctional = false)]
    Div,
    #[assoc(arity = 2)]
    #[assoc(is_nonfunctional = false)]
    Mod,
    #[assoc(arity = 2)]
    #[assoc(is_nonfunctional = false)]
    And,
    #[assoc(arity = 2)]
    #[assoc(is_nonfunctional = false)]
    Or,
    #[assoc(arity = 2)]
    #[assoc(is_nonfunctional = false)]
    Eq,
    #[assoc(arity = 2)]
    #[assoc(is_nonfunctional = false)]
    Ne,
    #[assoc(arity = 2)]
    #[assoc(is_nonfunctional = false)]
    Lt,
    #[assoc(arity = 2)]
    #[assoc(is_nonfunctional = false)]
    Le,
    #[assoc(arity = 2)]
    #[assoc(is_nonfunctional = false)]
    Gt,
    #[assoc(arity = 2)]
    #[assoc(is_nonfunctional = false)]
    Ge,
    #[assoc(arity = 1)]
    #[assoc(is_nonfunctional = true)]
    Print,
    #[assoc(arity = 1)]
    #[assoc(is_nonfunctional = true)]
    Use,
    #[assoc(arity = 2)]
    #[assoc(is_nonfunctional = true)]
    Store,
}

/// Every builtin name the registry recognises, paired with its `Primitive`.
/// `PrimitiveRegistry::new` interns each name once so lookups afterwards are
/// `Name` comparisons rather than string comparisons.
const NAMES: &[(&str, Primitive)] = &[
    ("neg", Primitive::Neg),
    ("not", Primitive::Not),
    ("add", Primitive::Add),
    ("sub", Primitive::Sub),
    ("mul", Primitive::Mul),
    ("div", Primitive::Div),
    ("mod", Primitive::Mod),
    ("and", Primitive::And),
    ("or", Primitive::Or),
    ("eq", Primitive::Eq),
    ("ne", Primitive::Ne),
    ("lt", Primitive::Lt),
    ("le", Primitive::Le),
    ("gt", Primitive::Gt),
    ("ge", Primitive::Ge),
    ("print", Primitive::Print),
    ("use", Primitive::Use),
    ("store", Primitive::Store),
];

#[derive(Debug, Default, Clone)]
pub struct PrimitiveRegistry {
    by_name: HashMap<Name, Primitive>,
}

impl PrimitiveRegistry {
    pub fn new(interner: &mut Interner) -> Self {
        let mut by_name = HashMap::new();
        for &(text, prim) in NAMES {
            by_name.insert(interner.intern_str(text), prim);
        }
        PrimitiveRegistry { by_name }
    }

    pub fn recognize(&self, name: Name) -> Option<Primitive> {
        self.by_name.get(&name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_has_arity_two_and_is_functional() {
        assert_eq!(Primitive::Add.arity(), 2);
        assert!(!Primitive::Add.is_nonfunctional());
    }

    #[test]
    fn print_is_nonfunctional() {
        assert!(Primitive::Print.is_nonfunctional());
    }

    #[test]
    fn registry_recognizes_interned_builtin_names() {
        let mut interner = Interner::new();
        let registry = PrimitiveRegistry::new(&mut interner);
        let add_name = interner.intern_str("add");
        assert_eq!(registry.recognize(add_name), Some(Primitive::Add));
        let unknown = interner.intern_str("frobnicate");
        assert_eq!(registry.recognize(unknown), None);
    }
}
