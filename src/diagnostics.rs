// One-line colorized diagnostic printing (spec.md §7 "user-visible
// behavior"). Grounded on `jounce::diagnostics`'s `SourceLocation` shape
// and ANSI color table, simplified to the single-line format the spec
// asks for (no multi-line source snippets, no suggestion/note chains).

use colored::Colorize;
use std::fmt;

use crate::errors::CompileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl From<crate::ast::SourceLocation> for SourceLocation {
    fn from(loc: crate::ast::SourceLocation) -> Self {
        SourceLocation::new(loc.line, loc.column)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Formats one fatal compiler error as `file:line:col: error: message`,
/// falling back to `file: error: message` when no location is available
/// (module-resolution errors have no single source position).
pub fn format_error(file: &str, err: &CompileError) -> String {
    match err.location() {
        Some(loc) => format!("{}:{}: {}: {}", file, loc, "error".red().bold(), err),
        None => format!("{}: {}: {}", file, "error".red().bold(), err),
    }
}

pub fn print_error(file: &str, err: &CompileError) {
    eprintln!("{}", format_error(file, err));
}

pub fn print_warning(file: &str, message: &str) {
    eprintln!("{}: {}: {}", file, "warning".yellow().bold(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_error_with_location() {
        let err = CompileError::UndefinedVariable {
            name: "x".to_string(),
            location: SourceLocation::new(3, 5),
        };
        let formatted = format_error("main.zs", &err);
        assert!(formatted.contains("main.zs:3:5"));
        assert!(formatted.contains("undefined variable: x"));
    }

    #[test]
    fn formats_error_without_location() {
        let err = CompileError::CircularDependency {
            cycle: "a -> b -> a".to_string(),
        };
        let formatted = format_error("a.zs", &err);
        assert!(formatted.starts_with("a.zs: "));
    }
}
