use std::fmt;

/// Source location tagging, `(filename, lineno)`. The sentinel used for
/// synthesized/compiler-internal nodes is `("<internal>", -1)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLoc {
    pub file: String,
    pub line: i64,
}

impl SourceLoc {
    pub fn new(file: impl Into<String>, line: i64) -> Self {
        SourceLoc { file: file.into(), line }
    }

    pub fn internal() -> Self {
        SourceLoc { file: "<internal>".to_string(), line: -1 }
    }

    pub fn is_internal(&self) -> bool {
        self.line == -1 && self.file == "<internal>"
    }
}

impl Default for SourceLoc {
    fn default() -> Self {
        Self::internal()
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A malformed source program. Reported with a source location; by policy
/// (see `user_fatal`) a pass stops as soon as one is produced -- there is no
/// local recovery inside the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub loc: SourceLoc,
    pub message: String,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.loc, self.message)
    }
}

impl std::error::Error for CompileError {}

/// Construct a user-facing fatal diagnostic. Callers propagate the resulting
/// `Err` with `?`; the pass that produced it stops, but the process does not
/// abort (unlike [`int_fatal`]).
pub fn user_fatal(loc: SourceLoc, message: impl Into<String>) -> CompileError {
    CompileError { loc, message: message.into() }
}

/// Report a violated structural invariant and abort the process. There is no
/// recovery path for an internal error: the core's data structures are no
/// longer trustworthy once one is reached.
///
/// Call via the [`int_fatal!`] macro so `compiler_file`/`compiler_line`
/// are captured automatically at the call site.
pub fn int_fatal(
    compiler_file: &'static str,
    compiler_line: u32,
    user_loc: Option<&SourceLoc>,
    message: impl fmt::Display,
) -> ! {
    match user_loc {
        Some(loc) if !loc.is_internal() => panic!(
            "INTERNAL ERROR in {}({}): {} ({}:{})",
            compiler_file, compiler_line, message, loc.file, loc.line
        ),
        _ => panic!("INTERNAL ERROR in {}({}): {}", compiler_file, compiler_line, message),
    }
}

/// Non-fatal counterpart of [`int_fatal`]: reports the inconsistency and lets
/// the pass continue.
pub fn int_warning(
    compiler_file: &'static str,
    compiler_line: u32,
    user_loc: Option<&SourceLoc>,
    message: impl fmt::Display,
) {
    match user_loc {
        Some(loc) if !loc.is_internal() => eprintln!(
            "INTERNAL WARNING in {}({}): {} ({}:{})",
            compiler_file, compiler_line, message, loc.file, loc.line
        ),
        _ => eprintln!("INTERNAL WARNING in {}({}): {}", compiler_file, compiler_line, message),
    }
}

/// Captures the compiler file/line of the call site and traps to
/// [`int_fatal`], using `file!()`/`line!()` in place of a macro-hidden
/// `__FILE__`/`__LINE__`.
#[macro_export]
macro_rules! int_fatal {
    ($loc:expr, $($arg:tt)*) => {
        $crate::diagnostics::int_fatal(file!(), line!(), $loc, format!($($arg)*))
    };
}

/// Non-fatal counterpart of [`int_fatal!`].
#[macro_export]
macro_rules! int_warning {
    ($loc:expr, $($arg:tt)*) => {
        $crate::diagnostics::int_warning(file!(), line!(), $loc, format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_fatal_carries_location_and_message() {
        let err = user_fatal(SourceLoc::new("a.src", 12), "unresolved name 'x'");
        assert_eq!(err.to_string(), "a.src:12: unresolved name 'x'");
    }

    #[test]
    #[should_panic(expected = "INTERNAL ERROR")]
    fn int_fatal_panics_with_compiler_and_user_location() {
        let loc = SourceLoc::new("a.src", 3);
        int_fatal!(Some(&loc), "missing variant in switch");
    }

    #[test]
    fn internal_sentinel_location_is_recognised() {
        assert!(SourceLoc::internal().is_internal());
        assert!(!SourceLoc::new("a.src", 1).is_internal());
    }
}
