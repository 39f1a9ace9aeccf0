//! `cleanup; scope_resolve; normalize` — the canonical pre-processing of a
//! newly-constructed function (§4.5). The parser this core receives its
//! AST from is out of scope (§1), so `cleanup`/`normalize`'s precise
//! transformations are parser-defined; what's left here is the part the
//! core itself owns: `scope_resolve` rewrites every unresolved `SymExpr`
//! in place, and `build` sequences the three so that I1-I4 hold afterward.

use compiler_core_common::{diagnostics::user_fatal, CompileError};

use crate::ast::{collect_preorder, Context, ExprKind, NodeRef, SymbolId};

/// Strips placeholder expressions a parser's conveniences would have left
/// behind. This core carries no parser (§1 out-of-scope), so there is
/// nothing parser-specific to strip; the hook exists so a driver wiring a
/// real front end has a place to call into before `scope_resolve`.
pub fn cleanup(_ctx: &mut Context) -> Result<(), CompileError> {
    Ok(())
}

/// For every in-tree `SymExpr` whose `var` is an `UnresolvedSymbol`,
/// replaces `var` with the result of a scope-chain lookup from the
/// expression's own `parentScope`. A lookup failure is a user error.
pub fn scope_resolve(ctx: &mut Context) -> Result<(), CompileError> {
    for &module in &ctx.modules.clone() {
        resolve_subtree(ctx, NodeRef::Symbol(module))?;
    }
    Ok(())
}

fn resolve_subtree(ctx: &mut Context, root: NodeRef) -> Result<(), CompileError> {
    for node in collect_preorder(ctx, root) {
        let NodeRef::Expr(id) = node else { continue };
        let (var, scope) = match &ctx.exprs.get(id).kind {
            ExprKind::Sym(s) => (s.var, ctx.exprs.get(id).common.parent_scope),
            _ => continue,
        };
        if !ctx.is_unresolved(var) {
            continue;
        }
        let name = ctx
            .sym_name(var)
            .unwrap_or_else(|| compiler_core_common::int_fatal!(None, "UnresolvedSymbol has no name"));
        let loc = ctx.exprs.get(id).common.loc.clone();
        let scope = scope.unwrap_or_else(|| compiler_core_common::int_fatal!(Some(&loc), "SymExpr outside any scope"));
        let resolved: Option<SymbolId> = crate::ast::lookup(&ctx.scopes, scope, name);
        match resolved {
            Some(sym) => {
                if let ExprKind::Sym(s) = &mut ctx.exprs.get_mut(id).kind {
                    s.var = sym;
                }
            }
            None => {
                return Err(user_fatal(loc, format!("unresolved name '{:?}'", name)));
            }
        }
    }
    Ok(())
}

/// Canonicalises control-flow constructs (desugaring, §4.5); this core has
/// no desugaring of its own to perform since every AST it receives already
/// uses the closed `StmtKind` set.
pub fn normalize(_ctx: &mut Context) -> Result<(), CompileError> {
    Ok(())
}

/// `build(fn) = cleanup(fn); scope_resolve(fn); normalize(fn)`.
pub fn build(ctx: &mut Context) -> Result<(), CompileError> {
    cleanup(ctx)?;
    scope_resolve(ctx)?;
    normalize(ctx)
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
        if let crate::ast::SymbolKind::Module(m) = &mut ctx.symbols.get_mut(module).kind {
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
    fn scope_resolve_rewrites_unresolved_sym_expr_to_its_definition() {
        let mut ctx = Context::new();
        let (_module, _mod_scope, body) = new_module(&mut ctx, "M");

        let x_name = ctx.intern("x");
        let x = ctx.new_var_symbol(SourceLoc::internal(), x_name, ctx.dt_unknown);
        let def = ctx.new_def_expr(SourceLoc::internal(), x);
        let def_stmt = ctx.new_expr_stmt(SourceLoc::internal(), def);
        if let crate::ast::StmtKind::Block(b) = &mut ctx.stmts.get_mut(body).kind {
            b.stmts.push_back(def_stmt);
        }
        crate::ast::sibling_insert_help(
            &mut ctx,
            NodeRef::Stmt(body),
            NodeRef::Stmt(def_stmt),
        )
        .unwrap();

        let placeholder = ctx.new_unresolved_symbol(SourceLoc::internal(), x_name);
        let use_expr = ctx.new_sym_expr(SourceLoc::internal(), placeholder);
        let use_stmt = ctx.new_expr_stmt(SourceLoc::internal(), use_expr);
        if let crate::ast::StmtKind::Block(b) = &mut ctx.stmts.get_mut(body).kind {
            b.stmts.push_back(use_stmt);
        }
        crate::ast::sibling_insert_help(&mut ctx, NodeRef::Stmt(def_stmt), NodeRef::Stmt(use_stmt)).unwrap();

        scope_resolve(&mut ctx).unwrap();

        match &ctx.exprs.get(use_expr).kind {
            ExprKind::Sym(s) => assert_eq!(s.var, x),
            _ => panic!("expected SymExpr"),
        }
    }

    #[test]
    fn scope_resolve_reports_user_error_for_unbound_name() {
        let mut ctx = Context::new();
        let (_module, _mod_scope, body) = new_module(&mut ctx, "M");

        let missing_name = ctx.intern("missing");
        let placeholder = ctx.new_unresolved_symbol(SourceLoc::internal(), missing_name);
        let use_expr = ctx.new_sym_expr(SourceLoc::internal(), placeholder);
        let use_stmt = ctx.new_expr_stmt(SourceLoc::internal(), use_expr);
        if let crate::ast::StmtKind::Block(b) = &mut ctx.stmts.get_mut(body).kind {
            b.stmts.push_back(use_stmt);
        }
        crate::ast::sibling_insert_help(&mut ctx, NodeRef::Stmt(body), NodeRef::Stmt(use_stmt)).unwrap();

        let err = scope_resolve(&mut ctx).unwrap_err();
        assert!(err.to_string().contains("unresolved"));
    }
}
