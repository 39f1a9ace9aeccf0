//! `clear_type_info` and `update_symbols` (§4.5): the two passes a type
//! inferencer sits between. Both operate over a subtree rather than the
//! whole program, since type inference typically re-runs one function at a
//! time.

use std::collections::HashMap;

use crate::ast::{collect_preorder, Context, ExprKind, GotoStmt, NodeRef, StmtKind, SymbolId, SymbolKind, TypeId};

/// Resets every symbol reachable from `root` back to `dtUnknown`: a
/// `VarSymbol`/`ArgSymbol`'s own type, and a `FnSymbol`'s `retType` and
/// static `type`. Formals are reached for free -- `children()` already
/// walks a `FnSymbol`'s `formals` as direct `Symbol` children, so they are
/// each visited in their own right during the same preorder pass.
pub fn clear_type_info(ctx: &mut Context, root: NodeRef) {
    let dt_unknown = ctx.dt_unknown;
    for node in collect_preorder(ctx, root) {
        let NodeRef::Symbol(sym) = node else { continue };
        match &mut ctx.symbols.get_mut(sym).kind {
            SymbolKind::Var(v) => v.ty = dt_unknown,
            SymbolKind::Arg(a) => a.ty = dt_unknown,
            SymbolKind::Fn(f) => {
                f.ret_type = dt_unknown;
                f.ty = dt_unknown;
            }
            _ => {}
        }
    }
}

/// A symbol-kept-apart-from-type substitution map for [`update_symbols`].
/// Splitting the two keeps "replacement of the wrong variant" impossible by
/// construction -- the re-architecture of §9's runtime-typed-downcast note
/// applied to this pass specifically, recorded in `DESIGN.md`.
#[derive(Debug, Default, Clone)]
pub struct Substitution {
    pub symbols: HashMap<SymbolId, SymbolId>,
    pub types: HashMap<TypeId, TypeId>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map_symbol(&mut self, old: SymbolId, new: SymbolId) -> &mut Self {
        self.symbols.insert(old, new);
        self
    }

    pub fn map_type(&mut self, old: TypeId, new: TypeId) -> &mut Self {
        self.types.insert(old, new);
        self
    }
}

/// Rewrites every reference to a mapped symbol or type over `root`'s
/// subtree: `SymExpr.var`, `GotoStmt.label`, `VarSymbol.type`,
/// `ArgSymbol.type`, `FnSymbol.{type,retType,_this}` (S6).
pub fn update_symbols(ctx: &mut Context, root: NodeRef, sub: &Substitution) {
    for node in collect_preorder(ctx, root) {
        match node {
            NodeRef::Expr(id) => {
                if let ExprKind::Sym(s) = &mut ctx.exprs.get_mut(id).kind {
                    if let Some(&new) = sub.symbols.get(&s.var) {
                        s.var = new;
                    }
                }
            }
            NodeRef::Stmt(id) => {
                if let StmtKind::Goto(GotoStmt { label }) = &mut ctx.stmts.get_mut(id).kind {
                    if let Some(&new) = sub.symbols.get(label) {
                        *label = new;
                    }
                }
            }
            NodeRef::Symbol(id) => match &mut ctx.symbols.get_mut(id).kind {
                SymbolKind::Var(v) => {
                    if let Some(&new) = sub.types.get(&v.ty) {
                        v.ty = new;
                    }
                }
                SymbolKind::Arg(a) => {
                    if let Some(&new) = sub.types.get(&a.ty) {
                        a.ty = new;
                    }
                }
                SymbolKind::Fn(f) => {
                    if let Some(&new) = sub.types.get(&f.ret_type) {
                        f.ret_type = new;
                    }
                    if let Some(&new) = sub.types.get(&f.ty) {
                        f.ty = new;
                    }
                    if let Some(this) = f.this {
                        if let Some(&new) = sub.symbols.get(&this) {
                            f.this = Some(new);
                        }
                    }
                }
                _ => {}
            },
            NodeRef::Type(_) => {}
        }
    }
}
