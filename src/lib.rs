//! A compiler front end and mid end: an arena-indexed AST (C1-C5) feeding
//! an IF1 dataflow intermediate representation (C6-C8).
//!
//! The crate is organized the way the pipeline runs: [`ast`] builds and
//! mutates the syntax tree, [`passes`] normalizes it and resolves the
//! bookkeeping invariants the AST mutation engine doesn't maintain for
//! free, and [`if1`] lowers the result into a flat, liveness-pruned
//! dataflow graph.

pub mod ast;
pub mod if1;
pub mod passes;

pub use ast::Context;

use compiler_core_common::CompileError;

/// Runs the full pipeline -- AST passes, then IF1 construction and
/// liveness pruning -- over every module currently registered in `ctx`.
///
/// `dce_enabled` gates `if1::liveness`'s dead-code elimination pass; it is
/// a plain constructor parameter rather than a config file, the same way
/// a generator choice is threaded through at construction rather than
/// read from settings on disk.
pub fn compile(ctx: &mut Context, dce_enabled: bool) -> Result<if1::builder::If1Builder, CompileError> {
    passes::build::cleanup(ctx)?;
    passes::build::scope_resolve(ctx)?;
    passes::build::normalize(ctx)?;
    passes::callsites::compute_call_sites(ctx)?;
    passes::uses::compute_sym_uses(ctx)?;
    passes::overload::remove_named_exprs(ctx)?;

    let mut builder = if1::builder::If1Builder::new();
    builder.set_primitive_types();
    for &module in &ctx.modules {
        if1::build_module(ctx, &mut builder, module)?;
    }
    builder.finalize(dce_enabled);
    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use compiler_core_common::SourceLoc;

    #[test]
    fn compiling_an_empty_module_produces_no_live_symbols() {
        let mut ctx = Context::new();
        let name = ctx.intern("Empty");
        let body = ctx.new_block_stmt(SourceLoc::internal(), ast::BlockTag::Scoped, vec![]);
        let init_fn = ctx.new_fn_symbol(SourceLoc::internal(), name, vec![], ctx.dt_unknown, Some(body));
        let module = ctx.new_module_symbol(SourceLoc::internal(), name);
        let mod_scope = ctx.new_scope(ast::ScopeOwner::Module(module), None);
        if let ast::SymbolKind::Module(m) = &mut ctx.symbols.get_mut(module).kind {
            m.mod_scope = Some(mod_scope);
            m.init_fn = Some(init_fn);
        }
        ctx.modules.push(module);
        let ictx = ast::InsertCtx {
            parent_expr: None,
            parent_stmt: None,
            parent_symbol: Some(module),
            parent_scope: Some(mod_scope),
        };
        ast::insert_help(&mut ctx, ast::NodeRef::Symbol(init_fn), ictx).unwrap();

        let builder = compile(&mut ctx, true).unwrap();
        // Root marking always keeps a closure's own symbol alive, even one
        // with an empty body and no formals -- the only live symbol left
        // after DCE is the module's init closure itself. None of the
        // bootstrapped primitive-type builtins are referenced, so they stay
        // dead.
        assert_eq!(builder.live_symbols().len(), 1);
        let live = builder.live_symbols()[0];
        assert_eq!(builder.syms.get(live).code, None);
    }
}
