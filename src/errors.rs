// Error taxonomy for every compiler phase (spec.md §7).
//
// Grounded on `jounce::errors::CompileError`: one enum, one `Display` impl,
// each variant carrying the location it fired at. Every phase is fail-fast
// (spec.md §7 propagation policy) except the parser's own recoverable
// `had_error` accumulation, which lives on `Parser` itself rather than in
// this enum.

use std::fmt;
use std::path::PathBuf;

use crate::diagnostics::SourceLocation;

#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    // --- Parse (spec.md §4.2 / §7) ---
    UnexpectedToken {
        expected: String,
        found: String,
        location: SourceLocation,
    },
    UnexpectedEof {
        expected: String,
        location: SourceLocation,
    },
    InvalidSyntax {
        message: String,
        location: SourceLocation,
    },
    InvalidCharacter {
        lexeme: String,
        location: SourceLocation,
    },
    Overflow {
        lexeme: String,
        location: SourceLocation,
    },

    // --- Module resolution (spec.md §4.3 / §7) ---
    ModuleNotFound {
        reference: String,
        searched: Vec<PathBuf>,
    },
    CircularDependency {
        cycle: String,
    },
    ParseError {
        module: String,
        source: Box<CompileError>,
    },
    Io {
        path: PathBuf,
        message: String,
    },

    // --- Type checking (spec.md §4.4 / §7) ---
    TypeMismatch {
        expected: String,
        found: String,
        location: SourceLocation,
    },
    UndefinedVariable {
        name: String,
        location: SourceLocation,
    },
    UndefinedFunction {
        name: String,
        location: SourceLocation,
    },
    UndefinedType {
        name: String,
        location: SourceLocation,
    },
    WrongNumberOfArguments {
        expected: usize,
        found: usize,
        location: SourceLocation,
    },
    InvalidOperation {
        message: String,
        location: SourceLocation,
    },

    // --- Codegen (spec.md §4.5 / §7) ---
    UnsupportedFeature {
        message: String,
        location: SourceLocation,
    },
    InvalidCode {
        message: String,
    },
    NoSpaceLeft {
        requested: u32,
        available: u32,
    },

    // --- Package manifest (spec.md §6) ---
    ManifestError {
        path: PathBuf,
        message: String,
    },
}

impl CompileError {
    pub fn location(&self) -> Option<SourceLocation> {
        use CompileError::*;
        match self {
            UnexpectedToken { location, .. }
            | UnexpectedEof { location, .. }
            | InvalidSyntax { location, .. }
            | InvalidCharacter { location, .. }
            | Overflow { location, .. }
            | TypeMismatch { location, .. }
            | UndefinedVariable { location, .. }
            | UndefinedFunction { location, .. }
            | UndefinedType { location, .. }
            | WrongNumberOfArguments { location, .. }
            | InvalidOperation { location, .. }
            | UnsupportedFeature { location, .. } => Some(*location),
            _ => None,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::UnexpectedToken {
                expected, found, ..
            } => write!(f, "expected {}, found {}", expected, found),
            CompileError::UnexpectedEof { expected, .. } => {
                write!(f, "unexpected end of file, expected {}", expected)
            }
            CompileError::InvalidSyntax { message, .. } => write!(f, "{}", message),
            CompileError::InvalidCharacter { lexeme, .. } => {
                write!(f, "invalid character: {:?}", lexeme)
            }
            CompileError::Overflow { lexeme, .. } => {
                write!(f, "integer literal out of range: {}", lexeme)
            }
            CompileError::ModuleNotFound { reference, searched } => write!(
                f,
                "module not found: {} (searched {} location(s))",
                reference,
                searched.len()
            ),
            CompileError::CircularDependency { cycle } => {
                write!(f, "circular module dependency: {}", cycle)
            }
            CompileError::ParseError { module, source } => {
                write!(f, "failed to parse module {}: {}", module, source)
            }
            CompileError::Io { path, message } => {
                write!(f, "{}: {}", path.display(), message)
            }
            CompileError::TypeMismatch {
                expected, found, ..
            } => write!(f, "type mismatch: expected {}, found {}", expected, found),
            CompileError::UndefinedVariable { name, .. } => {
                write!(f, "undefined variable: {}", name)
            }
            CompileError::UndefinedFunction { name, .. } => {
                write!(f, "undefined function: {}", name)
            }
            CompileError::UndefinedType { name, .. } => write!(f, "undefined type: {}", name),
            CompileError::WrongNumberOfArguments {
                expected, found, ..
            } => write!(
                f,
                "wrong number of arguments: expected {}, found {}",
                expected, found
            ),
            CompileError::InvalidOperation { message, .. } => write!(f, "{}", message),
            CompileError::UnsupportedFeature { message, .. } => write!(f, "unsupported: {}", message),
            CompileError::InvalidCode { message } => write!(f, "invalid generated code: {}", message),
            CompileError::NoSpaceLeft {
                requested,
                available,
            } => write!(
                f,
                "out of linear memory: requested {} bytes, {} available",
                requested, available
            ),
            CompileError::ManifestError { path, message } => {
                write!(f, "{}: {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for CompileError {}
