use compiler_core_common::interner::Symbol as Name;
use compiler_core_common::{Arena, SourceLoc};

use super::node::*;
use super::scope::{Scope, ScopeOwner};

/// Owns every AST arena, the interner feeding it, and the distinguished
/// sentinel types (`dtUnknown`/`dtMethodToken`/`dtSetterToken`). Rather than
/// keeping `allModules` and the interner as process-wide globals, both are
/// fields of a value the embedder constructs once per compilation and can
/// freely drop and recreate between tests.
pub struct Context {
    pub interner: compiler_core_common::Interner,
    pub exprs: Arena<ExprNode>,
    pub stmts: Arena<StmtNode>,
    pub symbols: Arena<SymbolNode>,
    pub types: Arena<TypeNode>,
    pub scopes: Arena<Scope>,
    /// Top-level modules (`allModules`). A nested module, once spliced out
    /// by `insert_help`, is appended here too (S5).
    pub modules: Vec<SymbolId>,
    pub dt_unknown: TypeId,
    pub dt_method_token: TypeId,
    pub dt_setter_token: TypeId,
}

impl Context {
    pub fn new() -> Self {
        let mut types: Arena<TypeNode> = Arena::new();
        let dt_unknown = types.alloc(TypeNode { common: NodeCommon::default(), kind: TypeKind::DtUnknown });
        let dt_method_token =
            types.alloc(TypeNode { common: NodeCommon::default(), kind: TypeKind::DtMethodToken });
        let dt_setter_token =
            types.alloc(TypeNode { common: NodeCommon::default(), kind: TypeKind::DtSetterToken });

        Context {
            interner: compiler_core_common::Interner::new(),
            exprs: Arena::new(),
            stmts: Arena::new(),
            symbols: Arena::new(),
            types,
            scopes: Arena::new(),
            modules: Vec::new(),
            dt_unknown,
            dt_method_token,
            dt_setter_token,
        }
    }

    pub fn intern(&mut self, s: &str) -> Name {
        self.interner.intern_str(s)
    }

    // ---- node constructors -------------------------------------------------
    // Newly allocated nodes are not yet attached to the tree; callers pass
    // the result to `insert_help` (directly or through `sibling_insert_help`
    // / `parent_insert_help`) to establish back-links and scope bindings.

    pub fn new_sym_expr(&mut self, loc: SourceLoc, var: SymbolId) -> ExprId {
        self.exprs.alloc(ExprNode { common: NodeCommon::new(loc), kind: ExprKind::Sym(SymExpr { var }) })
    }

    pub fn new_def_expr(&mut self, loc: SourceLoc, sym: SymbolId) -> ExprId {
        self.exprs.alloc(ExprNode { common: NodeCommon::new(loc), kind: ExprKind::Def(DefExpr { sym }) })
    }

    pub fn new_call_expr(&mut self, loc: SourceLoc, callee: ExprId, actuals: Vec<ExprId>) -> ExprId {
        self.exprs.alloc(ExprNode {
            common: NodeCommon::new(loc),
            kind: ExprKind::Call(CallExpr {
                callee,
                actuals: AList::from_vec(actuals),
                primitive: false,
                resolved_fn: None,
            }),
        })
    }

    pub fn new_named_expr(&mut self, loc: SourceLoc, name: Name, actual: ExprId) -> ExprId {
        self.exprs.alloc(ExprNode { common: NodeCommon::new(loc), kind: ExprKind::Named(NamedExpr { name, actual }) })
    }

    pub fn new_block_stmt(&mut self, loc: SourceLoc, tag: BlockTag, stmts: Vec<StmtId>) -> StmtId {
        self.stmts.alloc(StmtNode {
            common: NodeCommon::new(loc),
            kind: StmtKind::Block(BlockStmt { tag, stmts: AList::from_vec(stmts), blk_scope: None }),
        })
    }

    pub fn new_goto_stmt(&mut self, loc: SourceLoc, label: SymbolId) -> StmtId {
        self.stmts.alloc(StmtNode { common: NodeCommon::new(loc), kind: StmtKind::Goto(GotoStmt { label }) })
    }

    pub fn new_expr_stmt(&mut self, loc: SourceLoc, expr: ExprId) -> StmtId {
        self.stmts.alloc(StmtNode { common: NodeCommon::new(loc), kind: StmtKind::Expr(ExprStmt { expr }) })
    }

    pub fn new_return_stmt(&mut self, loc: SourceLoc, value: Option<ExprId>) -> StmtId {
        self.stmts.alloc(StmtNode { common: NodeCommon::new(loc), kind: StmtKind::Return(ReturnStmt { value }) })
    }

    pub fn new_cond_stmt(
        &mut self,
        loc: SourceLoc,
        cond: ExprId,
        then_blk: StmtId,
        else_blk: Option<StmtId>,
    ) -> StmtId {
        self.stmts.alloc(StmtNode {
            common: NodeCommon::new(loc),
            kind: StmtKind::Cond(CondStmt { cond, then_blk, else_blk }),
        })
    }

    pub fn new_var_symbol(&mut self, loc: SourceLoc, name: Name, ty: TypeId) -> SymbolId {
        self.symbols.alloc(SymbolNode {
            common: NodeCommon::new(loc),
            kind: SymbolKind::Var(VarSymbol { name, ty, def_point: None, uses: Vec::new() }),
        })
    }

    pub fn new_arg_symbol(&mut self, loc: SourceLoc, name: Name, ty: TypeId) -> SymbolId {
        self.symbols.alloc(SymbolNode {
            common: NodeCommon::new(loc),
            kind: SymbolKind::Arg(ArgSymbol { name, ty, def_point: None, uses: Vec::new() }),
        })
    }

    pub fn new_fn_symbol(
        &mut self,
        loc: SourceLoc,
        name: Name,
        formals: Vec<SymbolId>,
        ret_type: TypeId,
        body: Option<StmtId>,
    ) -> SymbolId {
        let ty = self.dt_unknown;
        self.symbols.alloc(SymbolNode {
            common: NodeCommon::new(loc),
            kind: SymbolKind::Fn(FnSymbol {
                name,
                arg_scope: None,
                formals,
                ret_type,
                called_by: Vec::new(),
                body,
                def_point: None,
                uses: Vec::new(),
                ty,
                this: None,
            }),
        })
    }

    pub fn new_type_symbol(&mut self, loc: SourceLoc, name: Name, ty: TypeId) -> SymbolId {
        self.symbols.alloc(SymbolNode {
            common: NodeCommon::new(loc),
            kind: SymbolKind::Type(TypeSymbol { name, ty, def_point: None, uses: Vec::new() }),
        })
    }

    pub fn new_label_symbol(&mut self, loc: SourceLoc, name: Option<Name>) -> SymbolId {
        self.symbols.alloc(SymbolNode {
            common: NodeCommon::new(loc),
            kind: SymbolKind::Label(LabelSymbol { name, def_point: None, uses: Vec::new() }),
        })
    }

    pub fn new_module_symbol(&mut self, loc: SourceLoc, name: Name) -> SymbolId {
        self.symbols.alloc(SymbolNode {
            common: NodeCommon::new(loc),
            kind: SymbolKind::Module(ModuleSymbol {
                name,
                mod_scope: None,
                init_fn: None,
                def_point: None,
                uses: Vec::new(),
            }),
        })
    }

    pub fn new_unresolved_symbol(&mut self, loc: SourceLoc, name: Name) -> SymbolId {
        self.symbols.alloc(SymbolNode {
            common: NodeCommon::new(loc),
            kind: SymbolKind::Unresolved(UnresolvedSymbol { name, def_point: None, uses: Vec::new() }),
        })
    }

    pub fn new_primitive_type(&mut self, loc: SourceLoc, name: Name) -> TypeId {
        self.types.alloc(TypeNode { common: NodeCommon::new(loc), kind: TypeKind::Primitive(PrimitiveType { name }) })
    }

    pub fn new_class_type(&mut self, loc: SourceLoc, name: Name) -> TypeId {
        self.types
            .alloc(TypeNode { common: NodeCommon::new(loc), kind: TypeKind::Class(ClassType { name, struct_scope: None }) })
    }

    // ---- scope allocation ---------------------------------------------------

    pub fn new_scope(&mut self, owner: ScopeOwner, parent: Option<ScopeId>) -> ScopeId {
        self.scopes.alloc(Scope::new(owner, parent))
    }

    pub fn is_unresolved(&self, sym: SymbolId) -> bool {
        self.symbols.get(sym).kind.is_unresolved()
    }

    pub fn sym_name(&self, sym: SymbolId) -> Option<Name> {
        self.symbols.get(sym).kind.name()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
