// Lexical tokens for zscript.
//
// Kept close to the spec's closed token set (spec.md §3): literals,
// keywords, operators/delimiters, plus `eof` and `invalid`. Unlike the
// teacher's token set this one carries `extern` exactly once - the
// teacher's duplicated `extern` keyword (spec.md §9) is a bug this crate
// does not repeat.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: String, line: usize, column: usize) -> Self {
        Self {
            kind,
            lexeme,
            line,
            column,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literal kinds
    Identifier,
    Integer,
    Float,
    String,

    // Keywords
    Fn,
    Let,
    Const,
    If,
    Else,
    Return,
    Async,
    Await,
    Extern,
    Struct,
    Enum,
    Import,
    From,
    Export,
    Match,
    For,
    In,
    While,
    Break,
    Continue,
    True,
    False,

    // Primitive type names
    Void,
    Bool,
    I32,
    I64,
    U32,
    U64,
    F64,
    StringType,
    Bytes,

    // Operators & delimiters
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Tilde,
    Ampersand,
    Pipe,
    Caret,
    LeftShift,
    RightShift,
    AmpAmp,
    PipePipe,
    QuestionQuestion,
    Assign,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Arrow,
    FatArrow,
    Question,
    Dot,
    Comma,
    Colon,
    Semicolon,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    Eof,
    Invalid,
}

lazy_static::lazy_static! {
    pub static ref KEYWORDS: HashMap<&'static str, TokenKind> = {
        let mut map = HashMap::new();
        map.insert("fn", TokenKind::Fn);
        map.insert("let", TokenKind::Let);
        map.insert("const", TokenKind::Const);
        map.insert("if", TokenKind::If);
        map.insert("else", TokenKind::Else);
        map.insert("return", TokenKind::Return);
        map.insert("async", TokenKind::Async);
        map.insert("await", TokenKind::Await);
        map.insert("extern", TokenKind::Extern);
        map.insert("struct", TokenKind::Struct);
        map.insert("enum", TokenKind::Enum);
        map.insert("import", TokenKind::Import);
        map.insert("from", TokenKind::From);
        map.insert("export", TokenKind::Export);
        map.insert("match", TokenKind::Match);
        map.insert("for", TokenKind::For);
        map.insert("in", TokenKind::In);
        map.insert("while", TokenKind::While);
        map.insert("break", TokenKind::Break);
        map.insert("continue", TokenKind::Continue);
        map.insert("true", TokenKind::True);
        map.insert("false", TokenKind::False);
        map.insert("void", TokenKind::Void);
        map.insert("bool", TokenKind::Bool);
        map.insert("i32", TokenKind::I32);
        map.insert("i64", TokenKind::I64);
        map.insert("u32", TokenKind::U32);
        map.insert("u64", TokenKind::U64);
        map.insert("f64", TokenKind::F64);
        map.insert("string", TokenKind::StringType);
        map.insert("bytes", TokenKind::Bytes);
        map
    };
}

impl TokenKind {
    /// True for the primitive-type-name keywords, which the parser accepts
    /// as field/parameter/struct-literal names even though they are
    /// keywords (spec.md §3 invariant: keywords may be field names, but
    /// are not accepted as top-level expression identifiers).
    pub fn is_primitive_type_name(&self) -> bool {
        matches!(
            self,
            TokenKind::Void
                | TokenKind::Bool
                | TokenKind::I32
                | TokenKind::I64
                | TokenKind::U32
                | TokenKind::U64
                | TokenKind::F64
                | TokenKind::StringType
                | TokenKind::Bytes
        )
    }

    /// True for any keyword token (including primitive type names), used by
    /// the parser to accept keywords as field/parameter names.
    pub fn is_keyword(&self) -> bool {
        self.is_primitive_type_name()
            || matches!(
                self,
                TokenKind::Fn
                    | TokenKind::Let
                    | TokenKind::Const
                    | TokenKind::If
                    | TokenKind::Else
                    | TokenKind::Return
                    | TokenKind::Async
                    | TokenKind::Await
                    | TokenKind::Extern
                    | TokenKind::Struct
                    | TokenKind::Enum
                    | TokenKind::Import
                    | TokenKind::From
                    | TokenKind::Export
                    | TokenKind::Match
                    | TokenKind::For
                    | TokenKind::In
                    | TokenKind::While
                    | TokenKind::Break
                    | TokenKind::Continue
                    | TokenKind::True
                    | TokenKind::False
            )
    }
}
