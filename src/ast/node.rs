use compiler_core_common::interner::Symbol as Name;
use compiler_core_common::{Arena, ArenaId, SourceLoc};

/// Arena-indexed ids, one space per top-level AST variant (C2). Four
/// separate index spaces instead of one global node id means a dangling
/// reference is a type error (an `ExprId` cannot be handed to a function
/// expecting a `SymbolId`) rather than a runtime downcast failure.
pub type ExprId = ArenaId<ExprNode>;
pub type StmtId = ArenaId<StmtNode>;
pub type SymbolId = ArenaId<SymbolNode>;
pub type TypeId = ArenaId<TypeNode>;
pub type ScopeId = ArenaId<crate::ast::scope::Scope>;

/// An ordered child list. A doubly linked list whose elements know their
/// enclosing list is unnecessary here: the enclosing relationship is
/// already carried by each element's own back-links (`parent_stmt` etc), so
/// `AList` only needs to be an ordered, indexable container.
#[derive(Debug, Clone, Default)]
pub struct AList<T> {
    items: Vec<T>,
}

impl<T: Copy + PartialEq> AList<T> {
    pub fn new() -> Self {
        AList { items: Vec::new() }
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        AList { items }
    }

    pub fn push_back(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn push_front(&mut self, item: T) {
        self.items.insert(0, item);
    }

    pub fn insert_at(&mut self, index: usize, item: T) {
        self.items.insert(index, item);
    }

    pub fn replace(&mut self, old: T, new: T) -> bool {
        if let Some(slot) = self.items.iter_mut().find(|x| **x == old) {
            *slot = new;
            true
        } else {
            false
        }
    }

    pub fn remove(&mut self, item: T) -> bool {
        if let Some(pos) = self.items.iter().position(|x| *x == item) {
            self.items.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Fields common to every AST node, regardless of which of the four
/// top-level variants (Expr/Stmt/Symbol/Type) it belongs to. Only the
/// back-links relevant to a given variant are ever populated (§3.2); the
/// rest stay `None` for the lifetime of the node.
#[derive(Debug, Clone, Default)]
pub struct NodeCommon {
    pub loc: SourceLoc,
    pub parent_expr: Option<ExprId>,
    pub parent_stmt: Option<StmtId>,
    pub parent_symbol: Option<SymbolId>,
    pub parent_scope: Option<ScopeId>,
}

impl NodeCommon {
    pub fn new(loc: SourceLoc) -> Self {
        NodeCommon { loc, ..Default::default() }
    }

    /// A node is in-tree (I1) iff it has some owning symbol reachable to a
    /// module. Root-ness for an individual node is cheap to check locally:
    /// `parent_symbol.is_some()` once it has ever been inserted, or it *is*
    /// a top-level module (checked by the caller).
    pub fn is_attached(&self) -> bool {
        self.parent_symbol.is_some() || self.parent_expr.is_some() || self.parent_stmt.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct ExprNode {
    pub common: NodeCommon,
    pub kind: ExprKind,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// A reference to a symbol. `var` starts out `UnresolvedSymbol` and is
    /// rewritten in place by scope resolution (I4).
    Sym(SymExpr),
    /// Introduces a symbol into the enclosing scope at this position.
    Def(DefExpr),
    /// A call or, when `primitive` is set, a lowered primitive operation.
    Call(CallExpr),
    /// `name = actual`, used for named/keyword actuals prior to overload
    /// resolution stripping them back down to `actual` (`remove_named_exprs`).
    Named(NamedExpr),
}

#[derive(Debug, Clone)]
pub struct SymExpr {
    pub var: SymbolId,
}

#[derive(Debug, Clone)]
pub struct DefExpr {
    pub sym: SymbolId,
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub callee: ExprId,
    pub actuals: AList<ExprId>,
    pub primitive: bool,
    /// Resolved callee, populated once the callee `SymExpr`'s `var` names an
    /// in-tree `FnSymbol`. `compute_call_sites` relies on this rather than
    /// re-deriving it from `callee` each time.
    pub resolved_fn: Option<SymbolId>,
}

#[derive(Debug, Clone)]
pub struct NamedExpr {
    pub name: Name,
    pub actual: ExprId,
}

#[derive(Debug, Clone)]
pub struct StmtNode {
    pub common: NodeCommon,
    pub kind: StmtKind,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Block(BlockStmt),
    Goto(GotoStmt),
    Expr(ExprStmt),
    Return(ReturnStmt),
    Cond(CondStmt),
}

/// Whether a `BlockStmt` owns its own lexical scope (I3) or is a transparent
/// nesting device (e.g. the single-statement arm of an `if` without braces).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Scoped,
    Scopeless,
}

#[derive(Debug, Clone)]
pub struct BlockStmt {
    pub tag: BlockTag,
    pub stmts: AList<StmtId>,
    pub blk_scope: Option<ScopeId>,
}

#[derive(Debug, Clone)]
pub struct GotoStmt {
    pub label: SymbolId,
}

#[derive(Debug, Clone)]
pub struct ExprStmt {
    pub expr: ExprId,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub value: Option<ExprId>,
}

#[derive(Debug, Clone)]
pub struct CondStmt {
    pub cond: ExprId,
    pub then_blk: StmtId,
    pub else_blk: Option<StmtId>,
}

#[derive(Debug, Clone)]
pub struct SymbolNode {
    pub common: NodeCommon,
    pub kind: SymbolKind,
}

#[derive(Debug, Clone)]
pub enum SymbolKind {
    Var(VarSymbol),
    Arg(ArgSymbol),
    Fn(FnSymbol),
    Type(TypeSymbol),
    Label(LabelSymbol),
    Module(ModuleSymbol),
    Unresolved(UnresolvedSymbol),
}

impl SymbolKind {
    pub fn name(&self) -> Option<Name> {
        match self {
            SymbolKind::Var(s) => Some(s.name),
            SymbolKind::Arg(s) => Some(s.name),
            SymbolKind::Fn(s) => Some(s.name),
            SymbolKind::Type(s) => Some(s.name),
            SymbolKind::Label(s) => s.name,
            SymbolKind::Module(s) => Some(s.name),
            SymbolKind::Unresolved(s) => Some(s.name),
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, SymbolKind::Unresolved(_))
    }

    pub fn is_module(&self) -> bool {
        matches!(self, SymbolKind::Module(_))
    }

    pub fn def_point(&self) -> Option<ExprId> {
        match self {
            SymbolKind::Var(s) => s.def_point,
            SymbolKind::Arg(s) => s.def_point,
            SymbolKind::Fn(s) => s.def_point,
            SymbolKind::Type(s) => s.def_point,
            SymbolKind::Label(s) => s.def_point,
            SymbolKind::Module(s) => s.def_point,
            SymbolKind::Unresolved(s) => s.def_point,
        }
    }

    pub fn set_def_point(&mut self, point: Option<ExprId>) {
        match self {
            SymbolKind::Var(s) => s.def_point = point,
            SymbolKind::Arg(s) => s.def_point = point,
            SymbolKind::Fn(s) => s.def_point = point,
            SymbolKind::Type(s) => s.def_point = point,
            SymbolKind::Label(s) => s.def_point = point,
            SymbolKind::Module(s) => s.def_point = point,
            SymbolKind::Unresolved(s) => s.def_point = point,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VarSymbol {
    pub name: Name,
    pub ty: TypeId,
    pub def_point: Option<ExprId>,
    pub uses: Vec<ExprId>,
}

#[derive(Debug, Clone)]
pub struct ArgSymbol {
    pub name: Name,
    pub ty: TypeId,
    pub def_point: Option<ExprId>,
    pub uses: Vec<ExprId>,
}

#[derive(Debug, Clone)]
pub struct FnSymbol {
    pub name: Name,
    pub arg_scope: Option<ScopeId>,
    pub formals: Vec<SymbolId>,
    pub ret_type: TypeId,
    pub called_by: Vec<ExprId>,
    pub body: Option<StmtId>,
    pub def_point: Option<ExprId>,
    pub uses: Vec<ExprId>,
    /// Substitution target for `update_symbols`' `FnSymbol.type` slot; the
    /// function's own static type (as a value, e.g. for first-class use).
    pub ty: TypeId,
    /// `_this` slot for method-style functions; `None` for free functions.
    pub this: Option<SymbolId>,
}

#[derive(Debug, Clone)]
pub struct TypeSymbol {
    pub name: Name,
    pub ty: TypeId,
    pub def_point: Option<ExprId>,
    pub uses: Vec<ExprId>,
}

#[derive(Debug, Clone)]
pub struct LabelSymbol {
    pub name: Option<Name>,
    pub def_point: Option<ExprId>,
    pub uses: Vec<ExprId>,
}

#[derive(Debug, Clone)]
pub struct ModuleSymbol {
    pub name: Name,
    pub mod_scope: Option<ScopeId>,
    pub init_fn: Option<SymbolId>,
    pub def_point: Option<ExprId>,
    pub uses: Vec<ExprId>,
}

#[derive(Debug, Clone)]
pub struct UnresolvedSymbol {
    pub name: Name,
    pub def_point: Option<ExprId>,
    pub uses: Vec<ExprId>,
}

#[derive(Debug, Clone)]
pub struct TypeNode {
    pub common: NodeCommon,
    pub kind: TypeKind,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Primitive(PrimitiveType),
    Class(ClassType),
    DtUnknown,
    DtMethodToken,
    DtSetterToken,
}

#[derive(Debug, Clone)]
pub struct PrimitiveType {
    pub name: Name,
}

#[derive(Debug, Clone)]
pub struct ClassType {
    pub name: Name,
    pub struct_scope: Option<ScopeId>,
}

impl TypeKind {
    pub fn is_method_token(&self) -> bool {
        matches!(self, TypeKind::DtMethodToken)
    }

    pub fn is_setter_token(&self) -> bool {
        matches!(self, TypeKind::DtSetterToken)
    }
}

/// A reference to any one of the four AST arenas; the uniform handle
/// `children`/`collect_preorder` etc. walk over (C2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Expr(ExprId),
    Stmt(StmtId),
    Symbol(SymbolId),
    Type(TypeId),
}

impl From<ExprId> for NodeRef {
    fn from(id: ExprId) -> Self {
        NodeRef::Expr(id)
    }
}
impl From<StmtId> for NodeRef {
    fn from(id: StmtId) -> Self {
        NodeRef::Stmt(id)
    }
}
impl From<SymbolId> for NodeRef {
    fn from(id: SymbolId) -> Self {
        NodeRef::Symbol(id)
    }
}
impl From<TypeId> for NodeRef {
    fn from(id: TypeId) -> Self {
        NodeRef::Type(id)
    }
}

/// Convenience used by arenas generic over the node payload (kept local to
/// this module since it needs no `Context`).
pub(crate) fn arena_new<T>() -> Arena<T> {
    Arena::new()
}
