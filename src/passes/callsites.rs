//! Rebuilds `FnSymbol.called_by` (I5) from scratch: a `CallExpr`'s callee is
//! "resolved" when it is a `SymExpr` naming an in-tree `FnSymbol` directly
//! (no indirection through a variable of function type). `resolved_fn` is
//! cached on the `CallExpr` itself so later passes don't need to re-walk the
//! callee expression to find out whether a call site is direct.

use compiler_core_common::CompileError;

use crate::ast::{collect_preorder, Context, ExprKind, NodeRef, SymbolKind};

pub fn compute_call_sites(ctx: &mut Context) -> Result<(), CompileError> {
    clear_called_by(ctx);

    for &module in &ctx.modules.clone() {
        for node in collect_preorder(ctx, NodeRef::Symbol(module)) {
            let NodeRef::Expr(call_id) = node else { continue };
            let callee = match &ctx.exprs.get(call_id).kind {
                ExprKind::Call(c) => c.callee,
                _ => continue,
            };
            let target = match &ctx.exprs.get(callee).kind {
                ExprKind::Sym(s) => Some(s.var),
                _ => None,
            };
            let resolved = target.filter(|&sym| matches!(&ctx.symbols.get(sym).kind, SymbolKind::Fn(_)));

            if let ExprKind::Call(c) = &mut ctx.exprs.get_mut(call_id).kind {
                c.resolved_fn = resolved;
            }
            if let Some(fn_sym) = resolved {
                if let SymbolKind::Fn(f) = &mut ctx.symbols.get_mut(fn_sym).kind {
                    f.called_by.push(call_id);
                }
            }
        }
    }
    Ok(())
}

fn clear_called_by(ctx: &mut Context) {
    for id in ctx.symbols.ids() {
        if let SymbolKind::Fn(f) = &mut ctx.symbols.get_mut(id).kind {
            f.called_by.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BlockTag, InsertCtx, ScopeOwner};
    use compiler_core_common::SourceLoc;

    #[test]
    fn direct_call_registers_the_call_site_on_the_callee() {
        let mut ctx = Context::new();
        let m_name = ctx.intern("M");
        let callee_name = ctx.intern("f");

        let callee_body = ctx.new_block_stmt(SourceLoc::internal(), BlockTag::Scoped, vec![]);
        let callee = ctx.new_fn_symbol(SourceLoc::internal(), callee_name, vec![], ctx.dt_unknown, Some(callee_body));
        let callee_def = ctx.new_def_expr(SourceLoc::internal(), callee);
        let callee_def_stmt = ctx.new_expr_stmt(SourceLoc::internal(), callee_def);

        let callee_ref = ctx.new_sym_expr(SourceLoc::internal(), callee);
        let call = ctx.new_call_expr(SourceLoc::internal(), callee_ref, vec![]);
        let call_stmt = ctx.new_expr_stmt(SourceLoc::internal(), call);

        let body = ctx.new_block_stmt(
            SourceLoc::internal(),
            BlockTag::Scoped,
            vec![callee_def_stmt, call_stmt],
        );
        let init_fn = ctx.new_fn_symbol(SourceLoc::internal(), m_name, vec![], ctx.dt_unknown, Some(body));
        let module = ctx.new_module_symbol(SourceLoc::internal(), m_name);
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
        crate::ast::insert_help(&mut ctx, NodeRef::Symbol(init_fn), ictx).unwrap();

        compute_call_sites(&mut ctx).unwrap();

        match &ctx.exprs.get(call).kind {
            ExprKind::Call(c) => assert_eq!(c.resolved_fn, Some(callee)),
            _ => panic!("expected CallExpr"),
        }
        match &ctx.symbols.get(callee).kind {
            SymbolKind::Fn(f) => assert_eq!(f.called_by, vec![call]),
            _ => panic!("expected FnSymbol"),
        }
    }
}
