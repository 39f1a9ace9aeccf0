//! `compute_sym_uses` (I6, P2): rebuilds `symbol.uses` for every symbol
//! reachable from a given root (or, with no root, the whole program). A
//! `SymExpr` counts as a use only when the symbol it names has a `defPoint`
//! that is itself reachable from the same root -- this is what keeps the
//! pass well-defined when called on a single function rather than the whole
//! tree (§4.5).

use std::collections::HashSet;

use compiler_core_common::CompileError;

use crate::ast::{collect_preorder, Context, ExprId, ExprKind, NodeRef, SymbolId, SymbolKind};

/// Whole-program form: every module is a root. This is the shape the driver
/// calls between passes (§6).
pub fn compute_sym_uses(ctx: &mut Context) -> Result<(), CompileError> {
    let roots: Vec<NodeRef> = ctx.modules.iter().map(|&m| NodeRef::Symbol(m)).collect();
    compute_sym_uses_over(ctx, &roots)
}

/// Scoped form: rebuilds `uses` only for symbols whose `defPoint` is
/// reachable from `root`, leaving the rest of the program's `uses` caches
/// untouched (§4.5).
pub fn compute_sym_uses_from(ctx: &mut Context, root: NodeRef) -> Result<(), CompileError> {
    compute_sym_uses_over(ctx, &[root])
}

fn compute_sym_uses_over(ctx: &mut Context, roots: &[NodeRef]) -> Result<(), CompileError> {
    let mut nodes: Vec<NodeRef> = Vec::new();
    for &r in roots {
        nodes.extend(collect_preorder(ctx, r));
    }

    let mut live_def_exprs: HashSet<ExprId> = HashSet::new();
    let mut defined_syms: HashSet<SymbolId> = HashSet::new();
    for &node in &nodes {
        if let NodeRef::Expr(id) = node {
            if let ExprKind::Def(d) = &ctx.exprs.get(id).kind {
                live_def_exprs.insert(id);
                defined_syms.insert(d.sym);
            }
        }
    }

    for &sym in &defined_syms {
        clear_uses(ctx, sym);
    }

    for &node in &nodes {
        let NodeRef::Expr(id) = node else { continue };
        let ExprKind::Sym(s) = &ctx.exprs.get(id).kind else { continue };
        let var = s.var;
        let Some(def_point) = ctx.symbols.get(var).kind.def_point() else { continue };
        if live_def_exprs.contains(&def_point) {
            push_use(ctx, var, id);
        }
    }

    Ok(())
}

fn clear_uses(ctx: &mut Context, sym: SymbolId) {
    uses_mut(ctx, sym).clear();
}

fn push_use(ctx: &mut Context, sym: SymbolId, use_site: ExprId) {
    uses_mut(ctx, sym).push(use_site);
}

fn uses_mut(ctx: &mut Context, sym: SymbolId) -> &mut Vec<ExprId> {
    match &mut ctx.symbols.get_mut(sym).kind {
        SymbolKind::Var(s) => &mut s.uses,
        SymbolKind::Arg(s) => &mut s.uses,
        SymbolKind::Fn(s) => &mut s.uses,
        SymbolKind::Type(s) => &mut s.uses,
        SymbolKind::Label(s) => &mut s.uses,
        SymbolKind::Module(s) => &mut s.uses,
        SymbolKind::Unresolved(s) => &mut s.uses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BlockTag, InsertCtx, ScopeOwner};
    use compiler_core_common::SourceLoc;

    fn new_module(ctx: &mut Context, name: &str) -> (SymbolId, crate::ast::ScopeId, crate::ast::StmtId) {
        let n = ctx.intern(name);
        let body = ctx.new_block_stmt(SourceLoc::internal(), BlockTag::Scoped, vec![]);
        let init_fn = ctx.new_fn_symbol(SourceLoc::internal(), n, vec![], ctx.dt_unknown, Some(body));
        let module = ctx.new_module_symbol(SourceLoc::internal(), n);
        let mod_scope = ctx.new_scope(ScopeOwner::Module(module), None);
        if let SymbolKind::Module(m) = &mut ctx.symbols.get_mut(module).kind {
            m.mod_scope = Some(mod_scope);
            m.init_fn = Some(init_fn);
        }
        ctx.modules.push(module);
        let ictx = InsertCtx {
            parent_expr: None,
            parent_stmt: None,
            parent_symbol: Some(module),
            parent_scope: Some(mod_scope),
        };
        crate::ast::insert_help(ctx, NodeRef::Symbol(init_fn), ictx).unwrap();
        (module, mod_scope, body)
    }

    #[test]
    fn every_sym_expr_naming_a_live_def_point_is_recorded() {
        let mut ctx = Context::new();
        let (_module, _mod_scope, body) = new_module(&mut ctx, "M");

        let x_name = ctx.intern("x");
        let x = ctx.new_var_symbol(SourceLoc::internal(), x_name, ctx.dt_unknown);
        let def = ctx.new_def_expr(SourceLoc::internal(), x);
        let def_stmt = ctx.new_expr_stmt(SourceLoc::internal(), def);
        if let crate::ast::StmtKind::Block(b) = &mut ctx.stmts.get_mut(body).kind {
            b.stmts.push_back(def_stmt);
        }
        crate::ast::sibling_insert_help(&mut ctx, NodeRef::Stmt(body), NodeRef::Stmt(def_stmt)).unwrap();
        // `insert_help` sets `def_point` as part of registering `x` -- see
        // `insert_def_expr` in `ast::mutate`.

        let use1 = ctx.new_sym_expr(SourceLoc::internal(), x);
        let use1_stmt = ctx.new_expr_stmt(SourceLoc::internal(), use1);
        if let crate::ast::StmtKind::Block(b) = &mut ctx.stmts.get_mut(body).kind {
            b.stmts.push_back(use1_stmt);
        }
        crate::ast::sibling_insert_help(&mut ctx, NodeRef::Stmt(def_stmt), NodeRef::Stmt(use1_stmt)).unwrap();

        let use2 = ctx.new_sym_expr(SourceLoc::internal(), x);
        let use2_stmt = ctx.new_expr_stmt(SourceLoc::internal(), use2);
        if let crate::ast::StmtKind::Block(b) = &mut ctx.stmts.get_mut(body).kind {
            b.stmts.push_back(use2_stmt);
        }
        crate::ast::sibling_insert_help(&mut ctx, NodeRef::Stmt(use1_stmt), NodeRef::Stmt(use2_stmt)).unwrap();

        compute_sym_uses(&mut ctx).unwrap();

        match &ctx.symbols.get(x).kind {
            SymbolKind::Var(s) => assert_eq!(s.uses, vec![use1, use2]),
            _ => panic!("expected VarSymbol"),
        }
    }

    #[test]
    fn a_sym_expr_naming_a_symbol_outside_root_is_not_recorded() {
        let mut ctx = Context::new();
        let (_module, _mod_scope, body) = new_module(&mut ctx, "M");

        let x_name = ctx.intern("x");
        let x = ctx.new_var_symbol(SourceLoc::internal(), x_name, ctx.dt_unknown);
        let def = ctx.new_def_expr(SourceLoc::internal(), x);
        let def_stmt = ctx.new_expr_stmt(SourceLoc::internal(), def);
        if let crate::ast::StmtKind::Block(b) = &mut ctx.stmts.get_mut(body).kind {
            b.stmts.push_back(def_stmt);
        }
        crate::ast::sibling_insert_help(&mut ctx, NodeRef::Stmt(body), NodeRef::Stmt(def_stmt)).unwrap();

        let use1 = ctx.new_sym_expr(SourceLoc::internal(), x);
        let use1_stmt = ctx.new_expr_stmt(SourceLoc::internal(), use1);
        if let crate::ast::StmtKind::Block(b) = &mut ctx.stmts.get_mut(body).kind {
            b.stmts.push_back(use1_stmt);
        }
        crate::ast::sibling_insert_help(&mut ctx, NodeRef::Stmt(def_stmt), NodeRef::Stmt(use1_stmt)).unwrap();

        // Restrict the root to just the def statement's subtree -- the use
        // site living in a sibling statement is out of reach.
        compute_sym_uses_from(&mut ctx, NodeRef::Stmt(def_stmt)).unwrap();

        match &ctx.symbols.get(x).kind {
            SymbolKind::Var(s) => assert!(s.uses.is_empty()),
            _ => panic!("expected VarSymbol"),
        }
    }
}
