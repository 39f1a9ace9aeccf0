use std::collections::HashMap;

use compiler_core_common::interner::Symbol as Name;
use compiler_core_common::SourceLoc;

use super::node::{ScopeId, StmtId, SymbolId};

/// What a scope is attached to (C3/I3). Scopes are owned by exactly one of
/// these; destroying the owner destroys the scope (§5, "Ownership").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeOwner {
    Block(StmtId),
    Fn(SymbolId),
    Module(SymbolId),
    Class(SymbolId),
}

/// A lexical scope: a name table with a parent link (C3). `order` exists
/// purely so iteration over a scope's symbols is deterministic (§5,
/// "Ordering guarantees") -- `names` is a `HashMap` and must not be iterated
/// directly where order matters.
#[derive(Debug, Clone)]
pub struct Scope {
    pub ast_parent: ScopeOwner,
    pub parent: Option<ScopeId>,
    names: HashMap<Name, SymbolId>,
    order: Vec<SymbolId>,
}

/// Error produced by [`Scope::define`] when a name is already bound to
/// something other than an `UnresolvedSymbol` placeholder (§4.4, "Failure
/// modes") -- always a user error, never an internal one.
#[derive(Debug, Clone)]
pub struct DuplicateDefinition {
    pub name: Name,
    pub loc: SourceLoc,
}

impl Scope {
    pub fn new(ast_parent: ScopeOwner, parent: Option<ScopeId>) -> Self {
        Scope { ast_parent, parent, names: HashMap::new(), order: Vec::new() }
    }

    /// Binds `name -> sym` provided either no prior binding exists or the
    /// prior binding was an `UnresolvedSymbol` placeholder, which is
    /// silently replaced (§4.3). Callers supply `is_unresolved` for the
    /// existing symbol since `Scope` does not know about `SymbolKind`.
    pub fn define(
        &mut self,
        name: Name,
        sym: SymbolId,
        existing_is_unresolved: impl Fn(SymbolId) -> bool,
        loc: SourceLoc,
    ) -> Result<(), DuplicateDefinition> {
        if let Some(&existing) = self.names.get(&name) {
            if !existing_is_unresolved(existing) {
                return Err(DuplicateDefinition { name, loc });
            }
            // Replace the placeholder binding in place; `order` already
            // holds a slot for it so iteration order is undisturbed.
            if let Some(slot) = self.order.iter_mut().find(|s| **s == existing) {
                *slot = sym;
            }
            self.names.insert(name, sym);
            return Ok(());
        }
        self.names.insert(name, sym);
        self.order.push(sym);
        Ok(())
    }

    /// Removes the binding for `sym` if `sym` is bound under `name`. A
    /// no-op if the binding was already gone (e.g. shadowed and replaced).
    pub fn undefine(&mut self, name: Name, sym: SymbolId) {
        if self.names.get(&name) == Some(&sym) {
            self.names.remove(&name);
        }
        self.order.retain(|s| *s != sym);
    }

    /// Looks up `name` in this scope only (no parent-chain walk).
    pub fn lookup_local(&self, name: Name) -> Option<SymbolId> {
        self.names.get(&name).copied()
    }

    pub fn defined_symbols(&self) -> &[SymbolId] {
        &self.order
    }
}

/// Scope-chain lookup (C3): walks from `start` up through `parent` links
/// until `name` is found or the chain is exhausted.
pub fn lookup(scopes: &compiler_core_common::Arena<Scope>, start: ScopeId, name: Name) -> Option<SymbolId> {
    let mut current = Some(start);
    while let Some(id) = current {
        let scope = scopes.get(id);
        if let Some(sym) = scope.lookup_local(name) {
            return Some(sym);
        }
        current = scope.parent;
    }
    None
}
