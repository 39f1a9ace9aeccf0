pub mod arena;
pub mod diagnostics;
pub mod interner;

pub use arena::{Arena, ArenaId};
pub use diagnostics::{CompileError, SourceLoc};
pub use interner::{Interner, Symbol as InternedSymbol};
