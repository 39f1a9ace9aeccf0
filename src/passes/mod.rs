//! Semantic passes (C5): the driver-visible operations that run between AST
//! construction and IF1 lowering. Each function operates over a `Context`
//! and either a single function's subtree or the whole program, per §4.5.

pub mod build;
pub mod callsites;
pub mod overload;
pub mod types;
pub mod uses;
