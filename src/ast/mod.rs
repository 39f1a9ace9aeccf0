//! The AST half of the pipeline (C1-C5): arena-indexed nodes, lexical
//! scopes, the `Context` value that owns both, traversal, and the mutation
//! engine that keeps scope bindings and back-links consistent under edits.

pub mod context;
pub mod mutate;
pub mod node;
pub mod scope;
pub mod traverse;

pub use context::Context;
pub use mutate::{insert_help, parent_insert_help, remove_help, sibling_insert_help, InsertCtx};
pub use node::{
    AList, ArgSymbol, BlockStmt, BlockTag, CallExpr, ClassType, CondStmt, DefExpr, ExprId, ExprKind, ExprNode, ExprStmt,
    FnSymbol, GotoStmt, LabelSymbol, ModuleSymbol, NamedExpr, NodeCommon, NodeRef, PrimitiveType, ReturnStmt,
    ScopeId, StmtId, StmtKind, StmtNode, SymExpr, SymbolId, SymbolKind, SymbolNode, TypeId, TypeKind, TypeNode,
    TypeSymbol, UnresolvedSymbol, VarSymbol,
};
pub use scope::{lookup, DuplicateDefinition, Scope, ScopeOwner};
pub use traverse::{children, clear_location, collect_functions, collect_postorder, collect_preorder, collect_top, reset_location};
