//! The IF1 dataflow intermediate representation (C6-C8): symbols, code
//! nodes, the construction API, dead-code elimination and the canonical
//! text serializer, plus the AST-to-IF1 lowering (`build_module`) that
//! drives all of it from a resolved, overload-stripped `Context`.

pub mod builder;
pub mod code;
pub mod liveness;
pub mod primitives;
pub mod serialize;
pub mod sym;

use std::collections::HashMap;

use compiler_core_common::CompileError;

use crate::ast::{
    collect_preorder, Context, ExprId, ExprKind, NodeRef, StmtId, StmtKind, SymbolId, SymbolKind,
};

use builder::If1Builder;
use code::CodeId;
use sym::{LabelId, Sym, SymId};

pub use code::{CodeKind, CodeNode};
pub use sym::{Label, TypeKindTag};

/// Per-module lowering state: the correspondence between an AST `SymbolId`
/// and the IF1 `Sym`/`Label` it becomes. Kept alive for exactly one
/// `build_module` call -- IF1 symbols are not shared across modules any
/// more than the AST symbols that produced them are.
struct Lowering<'a> {
    ctx: &'a Context,
    builder: &'a mut If1Builder,
    sym_map: HashMap<SymbolId, SymId>,
    label_map: HashMap<SymbolId, LabelId>,
}

impl<'a> Lowering<'a> {
    fn if1_sym(&mut self, ast_sym: SymbolId) -> SymId {
        if let Some(&s) = self.sym_map.get(&ast_sym) {
            return s;
        }
        let name = self.ctx.sym_name(ast_sym).map(|n| self.builder.reintern(&self.ctx.interner, n));
        let s = self.builder.register_sym(Sym::new(), name);
        self.sym_map.insert(ast_sym, s);
        s
    }

    fn label_for(&mut self, ast_label: SymbolId) -> LabelId {
        if let Some(&l) = self.label_map.get(&ast_label) {
            return l;
        }
        let name = self.ctx.sym_name(ast_label).map(|n| self.builder.reintern(&self.ctx.interner, n));
        let l = self.builder.alloc_label(name);
        self.label_map.insert(ast_label, l);
        l
    }
}

fn ast_ref<T: Into<NodeRef>>(node: T) -> Option<NodeRef> {
    Some(node.into())
}

fn lower_expr(lw: &mut Lowering, expr: ExprId, into: &mut Option<CodeId>) -> SymId {
    match lw.ctx.exprs.get(expr).kind.clone() {
        ExprKind::Sym(s) => lw.if1_sym(s.var),
        ExprKind::Def(d) => lw.if1_sym(d.sym),
        ExprKind::Call(_) => lower_call(lw, expr, into, true).unwrap_or_else(|| {
            compiler_core_common::int_fatal!(None, "lower_call with want_result=true returned no result")
        }),
        ExprKind::Named(_) => compiler_core_common::int_fatal!(None, "NamedExpr survived into IF1 lowering"),
    }
}

fn lower_call(lw: &mut Lowering, call_expr: ExprId, into: &mut Option<CodeId>, want_result: bool) -> Option<SymId> {
    let (callee, actuals) = match &lw.ctx.exprs.get(call_expr).kind {
        ExprKind::Call(c) => (c.callee, c.actuals.as_slice().to_vec()),
        _ => compiler_core_common::int_fatal!(None, "lower_call called on a non-CallExpr"),
    };

    let op = lower_expr(lw, callee, into);
    let mut args = vec![op];
    for a in actuals {
        args.push(lower_expr(lw, a, into));
    }

    if want_result {
        let result = lw.builder.register_sym(Sym::new(), None);
        lw.builder.send(into, args, vec![result], ast_ref(call_expr));
        Some(result)
    } else {
        lw.builder.send(into, args, Vec::new(), ast_ref(call_expr));
        None
    }
}

fn lower_expr_stmt(lw: &mut Lowering, expr: ExprId, into: &mut Option<CodeId>) {
    match &lw.ctx.exprs.get(expr).kind {
        ExprKind::Def(d) => {
            let sym = d.sym;
            if matches!(lw.ctx.symbols.get(sym).kind, SymbolKind::Label(_)) {
                let label = lw.label_for(sym);
                lw.builder.label(into, ast_ref(expr), Some(label));
            } else {
                // A bare declaration with no initializer: the mapped IF1
                // symbol exists for later references to resolve against,
                // but nothing runs at this position.
                lw.if1_sym(sym);
            }
        }
        ExprKind::Call(_) => {
            lower_call(lw, expr, into, false);
        }
        _ => {
            lower_expr(lw, expr, into);
        }
    }
}

fn lower_stmt(lw: &mut Lowering, stmt: StmtId, into: &mut Option<CodeId>, ret: Option<SymId>) {
    match lw.ctx.stmts.get(stmt).kind.clone() {
        StmtKind::Block(b) => {
            for &s in b.stmts.as_slice() {
                lower_stmt(lw, s, into, ret);
            }
        }
        StmtKind::Expr(e) => {
            lower_expr_stmt(lw, e.expr, into);
        }
        StmtKind::Return(r) => {
            if let (Some(value), Some(ret)) = (r.value, ret) {
                let v = lower_expr(lw, value, into);
                lw.builder.move_(into, v, ret, ast_ref(stmt));
            }
        }
        StmtKind::Cond(c) => {
            let cond_var = lower_expr(lw, c.cond, into);
            let mut then_code = None;
            lower_stmt(lw, c.then_blk, &mut then_code, ret);
            let mut else_code = None;
            if let Some(eb) = c.else_blk {
                lower_stmt(lw, eb, &mut else_code, ret);
            }
            lw.builder.if_(into, None, cond_var, then_code, None, else_code, None, None, ast_ref(stmt));
        }
        StmtKind::Goto(g) => {
            let label = lw.label_for(g.label);
            lw.builder.goto(into, label, ast_ref(stmt));
        }
    }
}

fn lower_function(lw: &mut Lowering, fn_sym: SymbolId) {
    let (formals, ret_type, body, this) = match &lw.ctx.symbols.get(fn_sym).kind {
        SymbolKind::Fn(f) => (f.formals.clone(), f.ret_type, f.body, f.this),
        _ => return,
    };

    let f_if1 = lw.if1_sym(fn_sym);

    // A function whose declared return type is the "unknown/inferred"
    // sentinel never produces a value -- no `ret` symbol is allocated for
    // it, so an otherwise-empty closure has no extra live root besides
    // itself once DCE runs.
    let ret = if ret_type != lw.ctx.dt_unknown {
        let r = lw.builder.register_sym(Sym::new(), None);
        lw.builder.syms.get_mut(f_if1).ret = Some(r);
        Some(r)
    } else {
        None
    };

    let args: Vec<SymId> = formals.iter().map(|&a| lw.if1_sym(a)).collect();
    if let Some(this_sym) = this {
        lw.if1_sym(this_sym);
    }

    let mut code: Option<CodeId> = None;
    if let Some(body) = body {
        lower_stmt(lw, body, &mut code, ret);
    }
    lw.builder.closure(f_if1, code, args);
}

/// Lowers every function reachable from `module` into an IF1 closure
/// registered on `builder` (C6), narrowed to this crate's closed
/// `ExprKind`/`StmtKind` sets: `DefExpr` either binds a plain local (no
/// code; the mapping exists for later references) or binds a
/// `LabelSymbol` (emits a `LABEL` at this position), `CallExpr` becomes a
/// `SEND`, `CondStmt` becomes `If1Builder::if_`, `GotoStmt` becomes a
/// `GOTO` against the same label map a `DefExpr(Label)` populates.
pub fn build_module(ctx: &Context, builder: &mut If1Builder, module: SymbolId) -> Result<(), CompileError> {
    if !matches!(ctx.symbols.get(module).kind, SymbolKind::Module(_)) {
        compiler_core_common::int_fatal!(None, "build_module called on a non-ModuleSymbol");
    }

    let mut lw = Lowering { ctx, builder, sym_map: HashMap::new(), label_map: HashMap::new() };
    for node in collect_preorder(ctx, NodeRef::Symbol(module)) {
        let NodeRef::Symbol(sym) = node else { continue };
        if matches!(ctx.symbols.get(sym).kind, SymbolKind::Fn(_)) {
            lower_function(&mut lw, sym);
        }
    }
    Ok(())
}
