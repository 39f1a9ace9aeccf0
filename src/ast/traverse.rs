use compiler_core_common::SourceLoc;

use super::context::Context;
use super::node::*;

/// Structural children of `node`, in source order (C2). This is the single
/// exhaustive switch over every AST variant; adding a new variant anywhere
/// in `node.rs` without a matching arm here is a compile error -- a missing
/// variant can never reach a running pass as an internal failure, because
/// it cannot be built at all.
pub fn children(ctx: &Context, node: NodeRef) -> Vec<NodeRef> {
    match node {
        NodeRef::Expr(id) => match &ctx.exprs.get(id).kind {
            ExprKind::Sym(_) => Vec::new(),
            ExprKind::Def(d) => vec![NodeRef::Symbol(d.sym)],
            ExprKind::Call(c) => {
                let mut out = vec![NodeRef::Expr(c.callee)];
                out.extend(c.actuals.iter().map(|e| NodeRef::Expr(*e)));
                out
            }
            ExprKind::Named(n) => vec![NodeRef::Expr(n.actual)],
        },
        NodeRef::Stmt(id) => match &ctx.stmts.get(id).kind {
            StmtKind::Block(b) => b.stmts.iter().map(|s| NodeRef::Stmt(*s)).collect(),
            StmtKind::Goto(_) => Vec::new(),
            StmtKind::Expr(e) => vec![NodeRef::Expr(e.expr)],
            StmtKind::Return(r) => r.value.into_iter().map(NodeRef::Expr).collect(),
            StmtKind::Cond(c) => {
                let mut out = vec![NodeRef::Expr(c.cond), NodeRef::Stmt(c.then_blk)];
                if let Some(e) = c.else_blk {
                    out.push(NodeRef::Stmt(e));
                }
                out
            }
        },
        NodeRef::Symbol(id) => match &ctx.symbols.get(id).kind {
            SymbolKind::Var(_) | SymbolKind::Arg(_) | SymbolKind::Label(_) | SymbolKind::Unresolved(_) => Vec::new(),
            SymbolKind::Fn(f) => {
                let mut out: Vec<NodeRef> = f.formals.iter().map(|s| NodeRef::Symbol(*s)).collect();
                out.push(NodeRef::Type(f.ret_type));
                if let Some(body) = f.body {
                    out.push(NodeRef::Stmt(body));
                }
                out
            }
            SymbolKind::Type(t) => vec![NodeRef::Type(t.ty)],
            SymbolKind::Module(m) => m.init_fn.into_iter().map(NodeRef::Symbol).collect(),
        },
        NodeRef::Type(id) => match &ctx.types.get(id).kind {
            TypeKind::Primitive(_) | TypeKind::Class(_) | TypeKind::DtUnknown | TypeKind::DtMethodToken | TypeKind::DtSetterToken => {
                Vec::new()
            }
        },
    }
}

/// Pre-order walk of the whole subtree, descending through every kind of
/// node without exception (unlike [`collect_top`]).
pub fn collect_preorder(ctx: &Context, root: NodeRef) -> Vec<NodeRef> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    // A plain Vec used as a stack visits children right-to-left unless
    // reversed; reverse here so the emitted order matches source order.
    while let Some(n) = stack.pop() {
        out.push(n);
        let mut kids = children(ctx, n);
        kids.reverse();
        stack.extend(kids);
    }
    out
}

/// Post-order walk: every node is emitted only after all of its children.
pub fn collect_postorder(ctx: &Context, root: NodeRef) -> Vec<NodeRef> {
    let mut out = Vec::new();
    fn visit(ctx: &Context, n: NodeRef, out: &mut Vec<NodeRef>) {
        for c in children(ctx, n) {
            visit(ctx, c, out);
        }
        out.push(n);
    }
    visit(ctx, root, &mut out);
    out
}

/// Pre-order walk that stops descent at symbol boundaries: a `Symbol` child
/// is emitted but its own children (formals, body, ...) are not visited.
/// Used by passes that care about a function's *signature* shape (its
/// immediate defs) without being dragged into every nested function body.
pub fn collect_top(ctx: &Context, root: NodeRef) -> Vec<NodeRef> {
    let mut out = Vec::new();
    fn visit(ctx: &Context, n: NodeRef, out: &mut Vec<NodeRef>) {
        out.push(n);
        if matches!(n, NodeRef::Symbol(_)) {
            return;
        }
        for c in children(ctx, n) {
            visit(ctx, c, out);
        }
    }
    visit(ctx, root, &mut out);
    out
}

/// All `FnSymbol`s in the program: a full preorder over every module,
/// filtered down to symbol nodes of the `Fn` kind.
pub fn collect_functions(ctx: &Context) -> Vec<SymbolId> {
    let mut out = Vec::new();
    for &module in &ctx.modules {
        for node in collect_preorder(ctx, NodeRef::Symbol(module)) {
            if let NodeRef::Symbol(sym) = node {
                if matches!(ctx.symbols.get(sym).kind, SymbolKind::Fn(_)) {
                    out.push(sym);
                }
            }
        }
    }
    out
}

fn set_loc(ctx: &mut Context, node: NodeRef, loc: &SourceLoc) {
    match node {
        NodeRef::Expr(id) => ctx.exprs.get_mut(id).common.loc = loc.clone(),
        NodeRef::Stmt(id) => ctx.stmts.get_mut(id).common.loc = loc.clone(),
        NodeRef::Symbol(id) => ctx.symbols.get_mut(id).common.loc = loc.clone(),
        NodeRef::Type(id) => ctx.types.get_mut(id).common.loc = loc.clone(),
    }
}

/// Stamps `(file, line)` onto every descendant of `root`, `root` included.
pub fn reset_location(ctx: &mut Context, root: NodeRef, file: &str, line: i64) {
    let loc = SourceLoc::new(file, line);
    for node in collect_preorder(ctx, root) {
        set_loc(ctx, node, &loc);
    }
}

/// Stamps the `("<internal>", -1)` sentinel onto every descendant of `root`.
pub fn clear_location(ctx: &mut Context, root: NodeRef) {
    let loc = SourceLoc::internal();
    for node in collect_preorder(ctx, root) {
        set_loc(ctx, node, &loc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_of_cond_stmt_in_source_order() {
        let mut ctx = Context::new();
        let name_x = ctx.intern("x");
        let v = ctx.new_var_symbol(SourceLoc::internal(), name_x, ctx.dt_unknown);
        let cond = ctx.new_sym_expr(SourceLoc::internal(), v);
        let then_blk = ctx.new_block_stmt(SourceLoc::internal(), BlockTag::Scopeless, vec![]);
        let else_blk = ctx.new_block_stmt(SourceLoc::internal(), BlockTag::Scopeless, vec![]);
        let cond_stmt = ctx.new_cond_stmt(SourceLoc::internal(), cond, then_blk, Some(else_blk));

        let kids = children(&ctx, NodeRef::Stmt(cond_stmt));
        assert_eq!(kids, vec![NodeRef::Expr(cond), NodeRef::Stmt(then_blk), NodeRef::Stmt(else_blk)]);
    }

    #[test]
    fn collect_top_stops_at_symbol_boundary() {
        let mut ctx = Context::new();
        let fn_name = ctx.intern("f");
        let arg_name = ctx.intern("a");
        let arg = ctx.new_arg_symbol(SourceLoc::internal(), arg_name, ctx.dt_unknown);
        let body = ctx.new_block_stmt(SourceLoc::internal(), BlockTag::Scoped, vec![]);
        let fn_sym = ctx.new_fn_symbol(SourceLoc::internal(), fn_name, vec![arg], ctx.dt_unknown, Some(body));
        let def = ctx.new_def_expr(SourceLoc::internal(), fn_sym);

        let top = collect_top(&ctx, NodeRef::Expr(def));
        // DefExpr, FnSymbol -- and no further descent into the arg or body.
        assert_eq!(top, vec![NodeRef::Expr(def), NodeRef::Symbol(fn_sym)]);

        let full = collect_preorder(&ctx, NodeRef::Expr(def));
        assert!(full.contains(&NodeRef::Symbol(arg)));
        assert!(full.contains(&NodeRef::Stmt(body)));
    }

    #[test]
    fn reset_location_stamps_every_descendant() {
        let mut ctx = Context::new();
        let name = ctx.intern("x");
        let v = ctx.new_var_symbol(SourceLoc::internal(), name, ctx.dt_unknown);
        let e = ctx.new_sym_expr(SourceLoc::internal(), v);
        let stmt = ctx.new_expr_stmt(SourceLoc::internal(), e);

        reset_location(&mut ctx, NodeRef::Stmt(stmt), "foo.src", 42);
        assert_eq!(ctx.stmts.get(stmt).common.loc, SourceLoc::new("foo.src", 42));
        assert_eq!(ctx.exprs.get(e).common.loc, SourceLoc::new("foo.src", 42));

        clear_location(&mut ctx, NodeRef::Stmt(stmt));
        assert!(ctx.stmts.get(stmt).common.loc.is_internal());
    }
}
