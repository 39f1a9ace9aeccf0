//! Overload-resolution cleanup (§4.5): once a call's actuals have been
//! matched against a candidate signature, the bookkeeping expressions that
//! made that matching possible -- `NamedExpr` wrappers, method/setter-token
//! markers -- are stripped back down to the call shape IF1 lowering expects.

use compiler_core_common::CompileError;

use crate::ast::{
    collect_functions, collect_postorder, collect_preorder, AList, Context, ExprId, ExprKind, NodeRef, SymbolId,
    SymbolKind,
};

/// Post-order over the whole program: replace each `NamedExpr(name, actual)`
/// with `actual`, adopting the `NamedExpr`'s own tree position. A
/// `NamedExpr` only ever appears as a `CallExpr` actual (§3.2), so its
/// parent is always the enclosing call.
pub fn remove_named_exprs(ctx: &mut Context) -> Result<(), CompileError> {
    for &module in &ctx.modules.clone() {
        for node in collect_postorder(ctx, NodeRef::Symbol(module)) {
            let NodeRef::Expr(id) = node else { continue };
            let actual = match &ctx.exprs.get(id).kind {
                ExprKind::Named(n) => n.actual,
                _ => continue,
            };
            let common = ctx.exprs.get(id).common.clone();
            let parent_expr = common.parent_expr.unwrap_or_else(|| {
                compiler_core_common::int_fatal!(Some(&common.loc), "NamedExpr had no enclosing call")
            });

            ctx.exprs.get_mut(actual).common = common;

            match &mut ctx.exprs.get_mut(parent_expr).kind {
                ExprKind::Call(c) => {
                    if c.callee == id {
                        c.callee = actual;
                    }
                    c.actuals.replace(id, actual);
                }
                _ => compiler_core_common::int_fatal!(None, "NamedExpr's parent_expr is not a CallExpr"),
            }
        }
    }
    Ok(())
}

fn actual_dt_token(ctx: &Context, actual: ExprId) -> Option<crate::ast::TypeId> {
    match &ctx.exprs.get(actual).kind {
        ExprKind::Sym(s) => match &ctx.symbols.get(s.var).kind {
            SymbolKind::Var(v) => Some(v.ty),
            SymbolKind::Arg(a) => Some(a.ty),
            SymbolKind::Type(t) => Some(t.ty),
            _ => None,
        },
        _ => None,
    }
}

/// Strips actuals whose type is `dtMethodToken`/`dtSetterToken` from every
/// resolved `CallExpr`'s `actuals` list.
pub fn remove_static_actuals(ctx: &mut Context) {
    let dt_method = ctx.dt_method_token;
    let dt_setter = ctx.dt_setter_token;
    for &module in &ctx.modules.clone() {
        for node in collect_preorder(ctx, NodeRef::Symbol(module)) {
            let NodeRef::Expr(call_id) = node else { continue };
            let (resolved, actuals) = match &ctx.exprs.get(call_id).kind {
                ExprKind::Call(c) => (c.resolved_fn.is_some(), c.actuals.as_slice().to_vec()),
                _ => continue,
            };
            if !resolved {
                continue;
            }
            let keep: Vec<ExprId> = actuals
                .iter()
                .copied()
                .filter(|&a| !matches!(actual_dt_token(ctx, a), Some(t) if t == dt_method || t == dt_setter))
                .collect();
            if keep.len() != actuals.len() {
                if let ExprKind::Call(c) = &mut ctx.exprs.get_mut(call_id).kind {
                    c.actuals = AList::from_vec(keep);
                }
            }
        }
    }
}

/// Strips formals typed `dtMethodToken`/`dtSetterToken` from every in-tree
/// function's `formals`. Formals are shared by every call site, so this
/// runs per-function rather than per-call; `collect_functions` already
/// restricts it to functions reachable from a module.
pub fn remove_static_formals(ctx: &mut Context) {
    let dt_method = ctx.dt_method_token;
    let dt_setter = ctx.dt_setter_token;
    for fn_sym in collect_functions(ctx) {
        let formals = match &ctx.symbols.get(fn_sym).kind {
            SymbolKind::Fn(f) => f.formals.clone(),
            _ => continue,
        };
        let keep: Vec<SymbolId> = formals
            .into_iter()
            .filter(|&a| match &ctx.symbols.get(a).kind {
                SymbolKind::Arg(arg) => arg.ty != dt_method && arg.ty != dt_setter,
                _ => true,
            })
            .collect();
        if let SymbolKind::Fn(f) = &mut ctx.symbols.get_mut(fn_sym).kind {
            f.formals = keep;
        }
    }
}

/// Given an actual inside a resolved call, returns the formal at the same
/// position. Internal-fatal if the call is unresolved, the actual is not
/// found among its own call's actuals, or the position has no formal --
/// see `DESIGN.md` for why this strictness is kept rather than relaxed.
pub fn actual_to_formal(ctx: &Context, actual: ExprId) -> SymbolId {
    let loc = ctx.exprs.get(actual).common.loc.clone();
    let call_id = ctx
        .exprs
        .get(actual)
        .common
        .parent_expr
        .unwrap_or_else(|| compiler_core_common::int_fatal!(Some(&loc), "actual has no enclosing call"));

    let (actuals, resolved_fn) = match &ctx.exprs.get(call_id).kind {
        ExprKind::Call(c) => (c.actuals.as_slice().to_vec(), c.resolved_fn),
        _ => compiler_core_common::int_fatal!(Some(&loc), "actual's parent_expr is not a CallExpr"),
    };
    let fn_sym = resolved_fn
        .unwrap_or_else(|| compiler_core_common::int_fatal!(Some(&loc), "actual_to_formal called on an unresolved call"));
    let index = actuals
        .iter()
        .position(|&a| a == actual)
        .unwrap_or_else(|| compiler_core_common::int_fatal!(Some(&loc), "actual is not among its own call's actuals"));
    let formals = match &ctx.symbols.get(fn_sym).kind {
        SymbolKind::Fn(f) => f.formals.clone(),
        _ => compiler_core_common::int_fatal!(Some(&loc), "resolved_fn does not name a FnSymbol"),
    };
    *formals
        .get(index)
        .unwrap_or_else(|| compiler_core_common::int_fatal!(Some(&loc), "call has no formal at the actual's position"))
}
