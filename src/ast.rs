// AST node types (spec.md §3). Every node carries a `SourceLocation`;
// expression and statement sub-trees are `&'a` references into a single
// per-compilation `Ast` arena (see `crate::arena`).
//
// Shape grounded on `jounce::ast`'s `Statement`/`Expression` tagged-union
// split, re-targeted at this language's smaller, non-JSX grammar.

use crate::types::Type;

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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Coalesce, // ??
    Or,       // ||
    And,      // &&
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,    // -
    Not,    // !
    BitNot, // ~
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub type_annotation: Type,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct Expr<'a> {
    pub kind: ExprKind<'a>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub enum ExprKind<'a> {
    IntLiteral(i64),
    FloatLiteral(f64),
    BoolLiteral(bool),
    /// Raw text between the quotes, escapes not yet interpreted.
    StringLiteral(String),
    Identifier(String),
    Binary {
        op: BinaryOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    },
    Unary {
        op: UnaryOp,
        operand: &'a Expr<'a>,
    },
    Call {
        callee: &'a Expr<'a>,
        args: Vec<&'a Expr<'a>>,
    },
    MemberAccess {
        object: &'a Expr<'a>,
        field: String,
    },
    IndexAccess {
        object: &'a Expr<'a>,
        index: &'a Expr<'a>,
    },
    ArrayLiteral(Vec<&'a Expr<'a>>),
    StructLiteral {
        type_name: String,
        fields: Vec<(String, &'a Expr<'a>)>,
    },
    Await(&'a Expr<'a>),
    /// The postfix `?` operator applied to a `result(Ok, Err)`.
    Try(&'a Expr<'a>),
    StringInterpolation(Vec<InterpPart<'a>>),
    Match {
        value: &'a Expr<'a>,
        arms: Vec<MatchArm<'a>>,
    },
    Assign {
        target: &'a Expr<'a>,
        value: &'a Expr<'a>,
    },
    Lambda {
        params: Vec<Param>,
        return_type: Option<Type>,
        body: LambdaBody<'a>,
    },
}

#[derive(Debug, Clone)]
pub enum InterpPart<'a> {
    Text(String),
    Expr(&'a Expr<'a>),
}

#[derive(Debug, Clone)]
pub enum LambdaBody<'a> {
    Expr(&'a Expr<'a>),
    Block(&'a Stmt<'a>),
}

#[derive(Debug, Clone)]
pub enum Pattern {
    Wildcard,
    Identifier(String),
    IntLiteral(i64),
    StringLiteral(String),
    BoolLiteral(bool),
    /// `Name(binding, ...)` - an enum variant with bound payload fields.
    EnumVariant { name: String, bindings: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct MatchArm<'a> {
    pub pattern: Pattern,
    pub body: &'a Expr<'a>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct FnDecl<'a> {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Type,
    pub is_async: bool,
    pub is_export: bool,
    pub body: &'a Stmt<'a>, // always a Block
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct ExternFnDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Type,
    pub host_module: String,
    pub host_name: String,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct StructDecl<'a> {
    pub name: String,
    pub fields: Vec<(String, Type)>,
    pub methods: Vec<FnDecl<'a>>,
    pub is_export: bool,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct EnumVariant {
    pub name: String,
    pub fields: Option<Vec<(String, Type)>>,
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: String,
    pub variants: Vec<EnumVariant>,
    pub is_export: bool,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct Stmt<'a> {
    pub kind: StmtKind<'a>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub enum StmtKind<'a> {
    Expr(&'a Expr<'a>),
    Let {
        name: String,
        type_annotation: Option<Type>,
        init: Option<&'a Expr<'a>>,
        is_const: bool,
    },
    FnDecl(FnDecl<'a>),
    ExternFnDecl(ExternFnDecl),
    StructDecl(StructDecl<'a>),
    EnumDecl(EnumDecl),
    Return(Option<&'a Expr<'a>>),
    If {
        condition: &'a Expr<'a>,
        then_branch: &'a Stmt<'a>, // always a Block
        else_branch: Option<&'a Stmt<'a>>, // Block or nested If
    },
    Block(Vec<&'a Stmt<'a>>),
    Import {
        names: Vec<String>,
        path: String,
    },
    For {
        var: String,
        iterable: &'a Expr<'a>,
        body: &'a Stmt<'a>, // always a Block
    },
    While {
        condition: &'a Expr<'a>,
        body: &'a Stmt<'a>, // always a Block
    },
    Break,
    Continue,
}

#[derive(Debug, Clone)]
pub struct Module<'a> {
    pub stmts: Vec<&'a Stmt<'a>>,
}
