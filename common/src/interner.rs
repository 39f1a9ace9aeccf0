use std::collections::HashMap;
use std::fmt;

/// A handle returned by [`Interner::intern`]. Two handles compare equal iff the
/// byte sequences they were interned from compare equal (P4). Handles are cheap
/// to copy, compare and hash -- they never carry the underlying bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

impl Symbol {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Process-wide string canonicaliser (C1). `intern` returns the same [`Symbol`]
/// for equal byte ranges; comparing two symbols for equality is comparing two
/// `u32`s rather than the underlying bytes.
///
/// Iteration order of interned strings (were it ever needed) is insertion
/// order -- the backing storage is an append-only `Vec`.
#[derive(Debug, Default)]
pub struct Interner {
    lookup: HashMap<Box<[u8]>, Symbol>,
    strings: Vec<Box<[u8]>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a byte range, returning its canonical handle. Accepts zero-copy
    /// slices; the interner only allocates storage the first time a given
    /// sequence is seen.
    pub fn intern(&mut self, bytes: &[u8]) -> Symbol {
        if let Some(sym) = self.lookup.get(bytes) {
            return *sym;
        }
        let sym = Symbol(self.strings.len() as u32);
        let owned: Box<[u8]> = bytes.into();
        self.strings.push(owned.clone());
        self.lookup.insert(owned, sym);
        sym
    }

    pub fn intern_str(&mut self, s: &str) -> Symbol {
        self.intern(s.as_bytes())
    }

    /// Resolve a handle back to its bytes. Panics if the handle was not
    /// produced by this interner -- a cross-interner handle is a programmer
    /// error, not a recoverable condition.
    pub fn resolve(&self, sym: Symbol) -> &[u8] {
        &self.strings[sym.index()]
    }

    pub fn resolve_str(&self, sym: Symbol) -> &str {
        std::str::from_utf8(self.resolve(sym)).expect("interned bytes were not valid utf-8")
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_bytes_intern_to_the_same_handle() {
        let mut interner = Interner::new();
        let a = interner.intern_str("hello");
        let b = interner.intern_str("hello");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_bytes_intern_to_distinct_handles() {
        let mut interner = Interner::new();
        let a = interner.intern_str("hello");
        let b = interner.intern_str("world");
        assert_ne!(a, b);
    }

    #[test]
    fn resolve_round_trips() {
        let mut interner = Interner::new();
        let handle = interner.intern_str("round-trip");
        assert_eq!(interner.resolve_str(handle), "round-trip");
    }

    #[test]
    fn zero_copy_ranges_intern_identically_to_owned_strings() {
        let mut interner = Interner::new();
        let owned = String::from("slice-me");
        let from_slice = interner.intern(&owned.as_bytes()[0..5]);
        let from_str = interner.intern_str("slice");
        assert_eq!(from_slice, from_str);
    }
}
