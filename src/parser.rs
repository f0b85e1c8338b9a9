// Recursive-descent, Pratt-style parser: tokens -> `Module` (spec.md §4.2).
//
// Grounded on `jounce::parser::Parser`'s shape: a `current`/`peek` token
// buffer maintained by `advance`, a `lazy_static` precedence table driving
// the expression climber, and per-construct `parse_*` methods. Re-targeted
// at this language's smaller statement/expression grammar, and extended
// (per SPEC_FULL.md §9) to wire the bitwise infix operators the teacher's
// analogue left tokenized-but-unused.

use std::collections::HashMap;

use crate::arena::Ast;
use crate::ast::*;
use crate::diagnostics::SourceLocation as DiagLoc;
use crate::errors::CompileError;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};
use crate::types::{Primitive, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    Lowest,
    Coalesce,     // ??
    Or,           // ||
    And,          // &&
    BitOr,        // |
    BitXor,       // ^
    BitAnd,       // &
    Equality,     // == !=
    Relational,   // < <= > >=
    Shift,        // << >>
    Additive,     // + -
    Multiplicative, // * / %
}

lazy_static::lazy_static! {
    static ref PRECEDENCES: HashMap<TokenKind, Prec> = {
        let mut m = HashMap::new();
        m.insert(TokenKind::QuestionQuestion, Prec::Coalesce);
        m.insert(TokenKind::PipePipe, Prec::Or);
        m.insert(TokenKind::AmpAmp, Prec::And);
        m.insert(TokenKind::Pipe, Prec::BitOr);
        m.insert(TokenKind::Caret, Prec::BitXor);
        m.insert(TokenKind::Ampersand, Prec::BitAnd);
        m.insert(TokenKind::Eq, Prec::Equality);
        m.insert(TokenKind::NotEq, Prec::Equality);
        m.insert(TokenKind::Lt, Prec::Relational);
        m.insert(TokenKind::LtEq, Prec::Relational);
        m.insert(TokenKind::Gt, Prec::Relational);
        m.insert(TokenKind::GtEq, Prec::Relational);
        m.insert(TokenKind::LeftShift, Prec::Shift);
        m.insert(TokenKind::RightShift, Prec::Shift);
        m.insert(TokenKind::Plus, Prec::Additive);
        m.insert(TokenKind::Minus, Prec::Additive);
        m.insert(TokenKind::Star, Prec::Multiplicative);
        m.insert(TokenKind::Slash, Prec::Multiplicative);
        m.insert(TokenKind::Percent, Prec::Multiplicative);
        m
    };
}

fn binop_for(kind: &TokenKind) -> BinaryOp {
    match kind {
        TokenKind::QuestionQuestion => BinaryOp::Coalesce,
        TokenKind::PipePipe => BinaryOp::Or,
        TokenKind::AmpAmp => BinaryOp::And,
        TokenKind::Pipe => BinaryOp::BitOr,
        TokenKind::Caret => BinaryOp::BitXor,
        TokenKind::Ampersand => BinaryOp::BitAnd,
        TokenKind::Eq => BinaryOp::Eq,
        TokenKind::NotEq => BinaryOp::NotEq,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::LtEq => BinaryOp::LtEq,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::GtEq => BinaryOp::GtEq,
        TokenKind::LeftShift => BinaryOp::Shl,
        TokenKind::RightShift => BinaryOp::Shr,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Mod,
        other => unreachable!("not a binary operator token: {:?}", other),
    }
}

pub struct Parser<'a> {
    ast: &'a Ast<'a>,
    lexer: Lexer,
    current: Token,
    peek: Token,
    had_error: bool,
    errors: Vec<CompileError>,
}

impl<'a> Parser<'a> {
    pub fn new(mut lexer: Lexer, ast: &'a Ast<'a>) -> Self {
        let current = lexer.next_token();
        let peek = lexer.next_token();
        Self {
            ast,
            lexer,
            current,
            peek,
            had_error: false,
            errors: Vec::new(),
        }
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }

    fn loc(&self) -> SourceLocation {
        SourceLocation::new(self.current.line, self.current.column)
    }

    fn advance(&mut self) -> Token {
        let next = self.lexer.next_token();
        std::mem::replace(&mut self.current, std::mem::replace(&mut self.peek, next))
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current.kind == kind
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, CompileError> {
        if self.current.kind == kind {
            Ok(self.advance())
        } else if self.current.kind == TokenKind::Eof {
            Err(CompileError::UnexpectedEof {
                expected: format!("{:?}", kind),
                location: self.loc().into(),
            })
        } else {
            Err(CompileError::UnexpectedToken {
                expected: format!("{:?}", kind),
                found: self.current.lexeme.clone(),
                location: self.loc().into(),
            })
        }
    }

    fn error(&mut self, err: CompileError) {
        self.had_error = true;
        self.errors.push(err);
    }

    /// Scan forward until the previous token was `;` or the current token
    /// starts a new statement (spec.md §4.2 error recovery).
    fn synchronize(&mut self) {
        while self.current.kind != TokenKind::Eof {
            if self.current.kind == TokenKind::Semicolon {
                self.advance();
                return;
            }
            if matches!(
                self.current.kind,
                TokenKind::Fn
                    | TokenKind::Let
                    | TokenKind::Const
                    | TokenKind::Struct
                    | TokenKind::Enum
                    | TokenKind::Import
                    | TokenKind::Return
                    | TokenKind::If
                    | TokenKind::While
                    | TokenKind::For
                    | TokenKind::Break
                    | TokenKind::Continue
                    | TokenKind::Export
                    | TokenKind::Extern
            ) {
                return;
            }
            self.advance();
        }
    }

    // ---- module ----

    pub fn parse_module(&mut self) -> Module<'a> {
        let mut stmts = Vec::new();
        while self.current.kind != TokenKind::Eof {
            match self.parse_top_level_statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(err) => {
                    self.error(err);
                    self.synchronize();
                }
            }
        }
        Module { stmts }
    }

    fn parse_top_level_statement(&mut self) -> Result<&'a Stmt<'a>, CompileError> {
        self.parse_statement()
    }

    fn parse_statement(&mut self) -> Result<&'a Stmt<'a>, CompileError> {
        let loc = self.loc();
        match self.current.kind {
            TokenKind::Export => self.parse_export(),
            TokenKind::Fn => self.parse_fn_decl(false),
            TokenKind::Async => self.parse_async_fn_decl(false),
            TokenKind::Extern => self.parse_extern_fn_decl(),
            TokenKind::Struct => self.parse_struct_decl(false),
            TokenKind::Enum => self.parse_enum_decl(false),
            TokenKind::Let | TokenKind::Const => self.parse_let_decl(),
            TokenKind::Import => self.parse_import(),
            TokenKind::Return => self.parse_return(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Break => {
                self.advance();
                self.expect(TokenKind::Semicolon)?;
                Ok(self.ast.alloc_stmt(Stmt {
                    kind: StmtKind::Break,
                    loc,
                }))
            }
            TokenKind::Continue => {
                self.advance();
                self.expect(TokenKind::Semicolon)?;
                Ok(self.ast.alloc_stmt(Stmt {
                    kind: StmtKind::Continue,
                    loc,
                }))
            }
            TokenKind::LBrace => self.parse_block(),
            _ => {
                let expr = self.parse_expression(Prec::Lowest)?;
                self.expect(TokenKind::Semicolon)?;
                Ok(self.ast.alloc_stmt(Stmt {
                    kind: StmtKind::Expr(expr),
                    loc,
                }))
            }
        }
    }

    fn parse_export(&mut self) -> Result<&'a Stmt<'a>, CompileError> {
        self.advance(); // `export`
        match self.current.kind {
            TokenKind::Fn => self.parse_fn_decl(true),
            TokenKind::Async => self.parse_async_fn_decl(true),
            TokenKind::Struct => self.parse_struct_decl(true),
            TokenKind::Enum => self.parse_enum_decl(true),
            _ => Err(CompileError::InvalidSyntax {
                message: "`export` may only prefix `fn`, `async fn`, `struct`, or `enum`"
                    .to_string(),
                location: self.loc().into(),
            }),
        }
    }

    fn parse_block(&mut self) -> Result<&'a Stmt<'a>, CompileError> {
        let loc = self.loc();
        self.expect(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while self.current.kind != TokenKind::RBrace && self.current.kind != TokenKind::Eof {
            match self.parse_statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(err) => {
                    self.error(err);
                    self.synchronize();
                }
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(self.ast.alloc_stmt(Stmt {
            kind: StmtKind::Block(stmts),
            loc,
        }))
    }

    fn parse_fn_decl(&mut self, is_export: bool) -> Result<&'a Stmt<'a>, CompileError> {
        let loc = self.loc();
        self.expect(TokenKind::Fn)?;
        let name = self.expect_identifier()?;
        let params = self.parse_param_list(None)?;
        let return_type = self.parse_optional_return_type()?;
        let body = self.parse_block()?;
        Ok(self.ast.alloc_stmt(Stmt {
            kind: StmtKind::FnDecl(FnDecl {
                name,
                params,
                return_type,
                is_async: false,
                is_export,
                body,
                loc,
            }),
            loc,
        }))
    }

    fn parse_async_fn_decl(&mut self, is_export: bool) -> Result<&'a Stmt<'a>, CompileError> {
        let loc = self.loc();
        self.expect(TokenKind::Async)?;
        self.expect(TokenKind::Fn)?;
        let name = self.expect_identifier()?;
        let params = self.parse_param_list(None)?;
        let return_type = self.parse_optional_return_type()?;
        let body = self.parse_block()?;
        Ok(self.ast.alloc_stmt(Stmt {
            kind: StmtKind::FnDecl(FnDecl {
                name,
                params,
                return_type,
                is_async: true,
                is_export,
                body,
                loc,
            }),
            loc,
        }))
    }

    fn parse_extern_fn_decl(&mut self) -> Result<&'a Stmt<'a>, CompileError> {
        let loc = self.loc();
        self.expect(TokenKind::Extern)?;
        // extern fn name(params) -> T from "module" "import_name";
        self.expect(TokenKind::Fn)?;
        let name = self.expect_identifier()?;
        let params = self.parse_param_list(None)?;
        let return_type = self.parse_optional_return_type()?;
        self.expect(TokenKind::From)?;
        let host_module = self.expect_string_literal()?;
        let host_name = if self.check(&TokenKind::String) {
            self.expect_string_literal()?
        } else {
            name.clone()
        };
        self.expect(TokenKind::Semicolon)?;
        Ok(self.ast.alloc_stmt(Stmt {
            kind: StmtKind::ExternFnDecl(ExternFnDecl {
                name,
                params,
                return_type,
                host_module,
                host_name,
                loc,
            }),
            loc,
        }))
    }

    fn parse_param_list(&mut self, implicit_self: Option<Type>) -> Result<Vec<Param>, CompileError> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if let Some(self_ty) = implicit_self {
            params.push(Param {
                name: "self".to_string(),
                type_annotation: self_ty,
                loc: self.loc(),
            });
        }
        while self.current.kind != TokenKind::RParen {
            let loc = self.loc();
            let name = self.expect_identifier_or_keyword()?;
            self.expect(TokenKind::Colon)?;
            let type_annotation = self.parse_type()?;
            params.push(Param {
                name,
                type_annotation,
                loc,
            });
            if self.current.kind == TokenKind::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    fn parse_optional_return_type(&mut self) -> Result<Type, CompileError> {
        if self.current.kind == TokenKind::Arrow {
            self.advance();
            self.parse_type()
        } else {
            Ok(Type::void())
        }
    }

    fn parse_struct_decl(&mut self, is_export: bool) -> Result<&'a Stmt<'a>, CompileError> {
        let loc = self.loc();
        self.expect(TokenKind::Struct)?;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while self.current.kind != TokenKind::RBrace && self.current.kind != TokenKind::Eof {
            if self.current.kind == TokenKind::Fn {
                let method_loc = self.loc();
                self.advance();
                let method_name = self.expect_identifier()?;
                let params = self.parse_param_list(Some(Type::UserDefined(name.clone())))?;
                let return_type = self.parse_optional_return_type()?;
                let body = self.parse_block()?;
                methods.push(FnDecl {
                    name: method_name,
                    params,
                    return_type,
                    is_async: false,
                    is_export: false,
                    body,
                    loc: method_loc,
                });
            } else {
                let field_name = self.expect_identifier_or_keyword()?;
                self.expect(TokenKind::Colon)?;
                let field_type = self.parse_type()?;
                fields.push((field_name, field_type));
                if self.current.kind == TokenKind::Comma {
                    self.advance();
                }
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(self.ast.alloc_stmt(Stmt {
            kind: StmtKind::StructDecl(StructDecl {
                name,
                fields,
                methods,
                is_export,
                loc,
            }),
            loc,
        }))
    }

    fn parse_enum_decl(&mut self, is_export: bool) -> Result<&'a Stmt<'a>, CompileError> {
        let loc = self.loc();
        self.expect(TokenKind::Enum)?;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LBrace)?;
        let mut variants = Vec::new();
        while self.current.kind != TokenKind::RBrace && self.current.kind != TokenKind::Eof {
            let variant_name = self.expect_identifier()?;
            let fields = if self.current.kind == TokenKind::LParen {
                self.advance();
                let mut fs = Vec::new();
                while self.current.kind != TokenKind::RParen {
                    let fname = self.expect_identifier_or_keyword()?;
                    self.expect(TokenKind::Colon)?;
                    let fty = self.parse_type()?;
                    fs.push((fname, fty));
                    if self.current.kind == TokenKind::Comma {
                        self.advance();
                    } else {
                        break;
                    }
                }
                self.expect(TokenKind::RParen)?;
                Some(fs)
            } else {
                None
            };
            variants.push(EnumVariant {
                name: variant_name,
                fields,
            });
            if self.current.kind == TokenKind::Comma {
                self.advance();
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(self.ast.alloc_stmt(Stmt {
            kind: StmtKind::EnumDecl(EnumDecl {
                name,
                variants,
                is_export,
                loc,
            }),
            loc,
        }))
    }

    fn parse_let_decl(&mut self) -> Result<&'a Stmt<'a>, CompileError> {
        let loc = self.loc();
        let is_const = self.current.kind == TokenKind::Const;
        self.advance(); // `let` or `const`
        let name = self.expect_identifier()?;
        let type_annotation = if self.current.kind == TokenKind::Colon {
            self.advance();
            Some(self.parse_type()?)
        } else {
            None
        };
        let init = if self.current.kind == TokenKind::Assign {
            self.advance();
            Some(self.parse_expression(Prec::Lowest)?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;
        Ok(self.ast.alloc_stmt(Stmt {
            kind: StmtKind::Let {
                name,
                type_annotation,
                init,
                is_const,
            },
            loc,
        }))
    }

    fn parse_import(&mut self) -> Result<&'a Stmt<'a>, CompileError> {
        let loc = self.loc();
        self.expect(TokenKind::Import)?;
        self.expect(TokenKind::LBrace)?;
        let mut names = Vec::new();
        while self.current.kind != TokenKind::RBrace {
            names.push(self.expect_identifier()?);
            if self.current.kind == TokenKind::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        self.expect(TokenKind::From)?;
        let path = self.expect_string_literal()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(self.ast.alloc_stmt(Stmt {
            kind: StmtKind::Import { names, path },
            loc,
        }))
    }

    fn parse_return(&mut self) -> Result<&'a Stmt<'a>, CompileError> {
        let loc = self.loc();
        self.expect(TokenKind::Return)?;
        let value = if self.current.kind == TokenKind::Semicolon {
            None
        } else {
            Some(self.parse_expression(Prec::Lowest)?)
        };
        self.expect(TokenKind::Semicolon)?;
        Ok(self.ast.alloc_stmt(Stmt {
            kind: StmtKind::Return(value),
            loc,
        }))
    }

    fn parse_if(&mut self) -> Result<&'a Stmt<'a>, CompileError> {
        let loc = self.loc();
        self.expect(TokenKind::If)?;
        let condition = self.parse_expression(Prec::Lowest)?;
        let then_branch = self.parse_block()?;
        let else_branch = if self.current.kind == TokenKind::Else {
            self.advance();
            if self.current.kind == TokenKind::If {
                Some(self.parse_if()?)
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(self.ast.alloc_stmt(Stmt {
            kind: StmtKind::If {
                condition,
                then_branch,
                else_branch,
            },
            loc,
        }))
    }

    fn parse_while(&mut self) -> Result<&'a Stmt<'a>, CompileError> {
        let loc = self.loc();
        self.expect(TokenKind::While)?;
        let condition = self.parse_expression(Prec::Lowest)?;
        let body = self.parse_block()?;
        Ok(self.ast.alloc_stmt(Stmt {
            kind: StmtKind::While { condition, body },
            loc,
        }))
    }

    fn parse_for(&mut self) -> Result<&'a Stmt<'a>, CompileError> {
        let loc = self.loc();
        self.expect(TokenKind::For)?;
        let var = self.expect_identifier()?;
        self.expect(TokenKind::In)?;
        let iterable = self.parse_expression(Prec::Lowest)?;
        let body = self.parse_block()?;
        Ok(self.ast.alloc_stmt(Stmt {
            kind: StmtKind::For {
                var,
                iterable,
                body,
            },
            loc,
        }))
    }

    // ---- types ----

    fn parse_type(&mut self) -> Result<Type, CompileError> {
        let mut ty = self.parse_type_atom()?;
        while self.current.kind == TokenKind::Question {
            self.advance();
            ty = Type::Optional(Box::new(ty));
        }
        Ok(ty)
    }

    fn parse_type_atom(&mut self) -> Result<Type, CompileError> {
        if let Some(prim) = primitive_for_token(&self.current.kind) {
            self.advance();
            return Ok(Type::Primitive(prim));
        }
        let name = self.expect_identifier()?;
        if self.current.kind == TokenKind::Lt {
            self.advance();
            let mut args = Vec::new();
            while self.current.kind != TokenKind::Gt {
                args.push(self.parse_type()?);
                if self.current.kind == TokenKind::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
            self.expect(TokenKind::Gt)?;
            return Ok(match (name.as_str(), args.len()) {
                ("Array", 1) => Type::Array(Box::new(args.into_iter().next().unwrap())),
                ("Promise", 1) => Type::Promise(Box::new(args.into_iter().next().unwrap())),
                ("Result", 2) => {
                    let mut it = args.into_iter();
                    let ok = it.next().unwrap();
                    let err = it.next().unwrap();
                    Type::Result(Box::new(ok), Box::new(err))
                }
                ("Map", 2) => {
                    let mut it = args.into_iter();
                    let k = it.next().unwrap();
                    let v = it.next().unwrap();
                    Type::Map(Box::new(k), Box::new(v))
                }
                _ => Type::Generic(name, args),
            });
        }
        Ok(Type::UserDefined(name))
    }

    // ---- identifiers / literals ----

    fn expect_identifier(&mut self) -> Result<String, CompileError> {
        if self.current.kind == TokenKind::Identifier {
            Ok(self.advance().lexeme)
        } else {
            Err(CompileError::UnexpectedToken {
                expected: "identifier".to_string(),
                found: self.current.lexeme.clone(),
                location: self.loc().into(),
            })
        }
    }

    /// Field/parameter names may be keywords (spec.md §3 invariant).
    fn expect_identifier_or_keyword(&mut self) -> Result<String, CompileError> {
        if self.current.kind == TokenKind::Identifier || self.current.kind.is_keyword() {
            Ok(self.advance().lexeme)
        } else {
            Err(CompileError::UnexpectedToken {
                expected: "identifier".to_string(),
                found: self.current.lexeme.clone(),
                location: self.loc().into(),
            })
        }
    }

    fn expect_string_literal(&mut self) -> Result<String, CompileError> {
        if self.current.kind == TokenKind::String {
            let tok = self.advance();
            Ok(strip_quotes(&tok.lexeme))
        } else {
            Err(CompileError::UnexpectedToken {
                expected: "string literal".to_string(),
                found: self.current.lexeme.clone(),
                location: self.loc().into(),
            })
        }
    }

    // ---- expressions ----

    fn parse_expression(&mut self, min_prec: Prec) -> Result<&'a Expr<'a>, CompileError> {
        if min_prec == Prec::Lowest {
            return self.parse_assignment();
        }
        self.parse_binary(min_prec)
    }

    fn parse_assignment(&mut self) -> Result<&'a Expr<'a>, CompileError> {
        let loc = self.loc();
        let target = self.parse_binary(Prec::Coalesce)?;
        if self.current.kind == TokenKind::Assign {
            if !is_assignable(target) {
                return Err(CompileError::InvalidSyntax {
                    message: "assignment target must be an identifier, field access, or index access".to_string(),
                    location: loc.into(),
                });
            }
            self.advance();
            let value = self.parse_assignment()?; // right-assoc
            return Ok(self.ast.alloc_expr(Expr {
                kind: ExprKind::Assign { target, value },
                loc,
            }));
        }
        Ok(target)
    }

    fn parse_binary(&mut self, min_prec: Prec) -> Result<&'a Expr<'a>, CompileError> {
        let mut left = self.parse_unary()?;
        loop {
            let prec = match PRECEDENCES.get(&self.current.kind) {
                Some(p) if *p >= min_prec => *p,
                _ => break,
            };
            let loc = self.loc();
            let op = binop_for(&self.current.kind);
            self.advance();
            let next_min = bump(prec);
            let right = self.parse_binary(next_min)?;
            left = self.ast.alloc_expr(Expr {
                kind: ExprKind::Binary { op, left, right },
                loc,
            });
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<&'a Expr<'a>, CompileError> {
        let loc = self.loc();
        let op = match self.current.kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(self.ast.alloc_expr(Expr {
                kind: ExprKind::Unary { op, operand },
                loc,
            }));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<&'a Expr<'a>, CompileError> {
        let mut expr = self.parse_primary()?;
        loop {
            let loc = self.loc();
            match self.current.kind {
                TokenKind::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    while self.current.kind != TokenKind::RParen {
                        args.push(self.parse_expression(Prec::Lowest)?);
                        if self.current.kind == TokenKind::Comma {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                    self.expect(TokenKind::RParen)?;
                    expr = self.ast.alloc_expr(Expr {
                        kind: ExprKind::Call { callee: expr, args },
                        loc,
                    });
                }
                TokenKind::Dot => {
                    self.advance();
                    let field = self.expect_identifier_or_keyword()?;
                    expr = self.ast.alloc_expr(Expr {
                        kind: ExprKind::MemberAccess { object: expr, field },
                        loc,
                    });
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expression(Prec::Lowest)?;
                    self.expect(TokenKind::RBracket)?;
                    expr = self.ast.alloc_expr(Expr {
                        kind: ExprKind::IndexAccess { object: expr, index },
                        loc,
                    });
                }
                TokenKind::Question => {
                    self.advance();
                    expr = self.ast.alloc_expr(Expr {
                        kind: ExprKind::Try(expr),
                        loc,
                    });
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<&'a Expr<'a>, CompileError> {
        let loc = self.loc();
        match self.current.kind.clone() {
            TokenKind::Integer => {
                let tok = self.advance();
                let value: i64 = tok.lexeme.parse().map_err(|_| CompileError::Overflow {
                    lexeme: tok.lexeme.clone(),
                    location: loc.into(),
                })?;
                Ok(self.ast.alloc_expr(Expr {
                    kind: ExprKind::IntLiteral(value),
                    loc,
                }))
            }
            TokenKind::Float => {
                let tok = self.advance();
                let value: f64 = tok.lexeme.parse().unwrap_or(0.0);
                Ok(self.ast.alloc_expr(Expr {
                    kind: ExprKind::FloatLiteral(value),
                    loc,
                }))
            }
            TokenKind::String => {
                let tok = self.advance();
                let text = strip_quotes(&tok.lexeme);
                if text.contains('{') {
                    self.parse_string_interpolation(text, loc)
                } else {
                    Ok(self.ast.alloc_expr(Expr {
                        kind: ExprKind::StringLiteral(text),
                        loc,
                    }))
                }
            }
            TokenKind::True => {
                self.advance();
                Ok(self.ast.alloc_expr(Expr {
                    kind: ExprKind::BoolLiteral(true),
                    loc,
                }))
            }
            TokenKind::False => {
                self.advance();
                Ok(self.ast.alloc_expr(Expr {
                    kind: ExprKind::BoolLiteral(false),
                    loc,
                }))
            }
            TokenKind::Await => {
                self.advance();
                let inner = self.parse_unary()?;
                Ok(self.ast.alloc_expr(Expr {
                    kind: ExprKind::Await(inner),
                    loc,
                }))
            }
            TokenKind::Fn => self.parse_lambda(),
            TokenKind::Match => self.parse_match(),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression(Prec::Lowest)?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                self.advance();
                let mut elements = Vec::new();
                while self.current.kind != TokenKind::RBracket {
                    elements.push(self.parse_expression(Prec::Lowest)?);
                    if self.current.kind == TokenKind::Comma {
                        self.advance();
                    } else {
                        break;
                    }
                }
                self.expect(TokenKind::RBracket)?;
                Ok(self.ast.alloc_expr(Expr {
                    kind: ExprKind::ArrayLiteral(elements),
                    loc,
                }))
            }
            TokenKind::Identifier => {
                let name = self.advance().lexeme;
                // spec.md §3: a struct-literal type name must start uppercase -
                // this is how `Name { .. }` is told apart from a block
                // following a bare identifier expression (e.g. an `if` condition).
                if self.current.kind == TokenKind::LBrace
                    && name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
                {
                    return self.parse_struct_literal(name, loc);
                }
                Ok(self.ast.alloc_expr(Expr {
                    kind: ExprKind::Identifier(name),
                    loc,
                }))
            }
            TokenKind::Eof => Err(CompileError::UnexpectedEof {
                expected: "expression".to_string(),
                location: loc.into(),
            }),
            _ => Err(CompileError::UnexpectedToken {
                expected: "expression".to_string(),
                found: self.current.lexeme.clone(),
                location: loc.into(),
            }),
        }
    }

    fn parse_struct_literal(
        &mut self,
        type_name: String,
        loc: SourceLocation,
    ) -> Result<&'a Expr<'a>, CompileError> {
        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        while self.current.kind != TokenKind::RBrace {
            let name = self.expect_identifier_or_keyword()?;
            self.expect(TokenKind::Colon)?;
            let value = self.parse_expression(Prec::Lowest)?;
            fields.push((name, value));
            if self.current.kind == TokenKind::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(self.ast.alloc_expr(Expr {
            kind: ExprKind::StructLiteral { type_name, fields },
            loc,
        }))
    }

    fn parse_lambda(&mut self) -> Result<&'a Expr<'a>, CompileError> {
        let loc = self.loc();
        self.expect(TokenKind::Fn)?;
        let params = self.parse_param_list(None)?;
        let return_type = if self.current.kind == TokenKind::Arrow {
            self.advance();
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(TokenKind::FatArrow)?;
        let body = if self.current.kind == TokenKind::LBrace {
            LambdaBody::Block(self.parse_block()?)
        } else {
            LambdaBody::Expr(self.parse_expression(Prec::Lowest)?)
        };
        Ok(self.ast.alloc_expr(Expr {
            kind: ExprKind::Lambda {
                params,
                return_type,
                body,
            },
            loc,
        }))
    }

    fn parse_match(&mut self) -> Result<&'a Expr<'a>, CompileError> {
        let loc = self.loc();
        self.expect(TokenKind::Match)?;
        let value = self.parse_expression(Prec::Coalesce)?;
        self.expect(TokenKind::LBrace)?;
        let mut arms = Vec::new();
        while self.current.kind != TokenKind::RBrace {
            let arm_loc = self.loc();
            let pattern = self.parse_pattern()?;
            self.expect(TokenKind::FatArrow)?;
            let body = self.parse_expression(Prec::Lowest)?;
            arms.push(MatchArm {
                pattern,
                body,
                loc: arm_loc,
            });
            if self.current.kind == TokenKind::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(self.ast.alloc_expr(Expr {
            kind: ExprKind::Match { value, arms },
            loc,
        }))
    }

    fn parse_pattern(&mut self) -> Result<Pattern, CompileError> {
        match self.current.kind.clone() {
            TokenKind::Identifier if self.current.lexeme == "_" => {
                self.advance();
                Ok(Pattern::Wildcard)
            }
            TokenKind::Integer => {
                let tok = self.advance();
                let value = tok.lexeme.parse().unwrap_or(0);
                Ok(Pattern::IntLiteral(value))
            }
            TokenKind::String => {
                let tok = self.advance();
                Ok(Pattern::StringLiteral(strip_quotes(&tok.lexeme)))
            }
            TokenKind::True => {
                self.advance();
                Ok(Pattern::BoolLiteral(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Pattern::BoolLiteral(false))
            }
            TokenKind::Identifier => {
                let name = self.advance().lexeme;
                if self.current.kind == TokenKind::LParen {
                    self.advance();
                    let mut bindings = Vec::new();
                    while self.current.kind != TokenKind::RParen {
                        bindings.push(self.expect_identifier()?);
                        if self.current.kind == TokenKind::Comma {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                    self.expect(TokenKind::RParen)?;
                    Ok(Pattern::EnumVariant { name, bindings })
                } else {
                    Ok(Pattern::Identifier(name))
                }
            }
            _ => Err(CompileError::UnexpectedToken {
                expected: "pattern".to_string(),
                found: self.current.lexeme.clone(),
                location: self.loc().into(),
            }),
        }
    }

    /// Splits `text` (already unquoted) on `{expr}` runs, re-lexing and
    /// re-parsing each bracketed substring with a fresh `Parser` over the
    /// same arena (spec.md §4.2).
    fn parse_string_interpolation(
        &mut self,
        text: String,
        loc: SourceLocation,
    ) -> Result<&'a Expr<'a>, CompileError> {
        let mut parts = Vec::new();
        let chars: Vec<char> = text.chars().collect();
        let mut i = 0;
        let mut buf = String::new();
        while i < chars.len() {
            if chars[i] == '{' {
                if !buf.is_empty() {
                    parts.push(InterpPart::Text(std::mem::take(&mut buf)));
                }
                let mut depth = 1;
                let start = i + 1;
                i += 1;
                while i < chars.len() && depth > 0 {
                    match chars[i] {
                        '{' => depth += 1,
                        '}' => depth -= 1,
                        _ => {}
                    }
                    if depth > 0 {
                        i += 1;
                    }
                }
                if depth != 0 {
                    return Err(CompileError::InvalidSyntax {
                        message: "unmatched `{` in string interpolation".to_string(),
                        location: loc.into(),
                    });
                }
                let sub_source: String = chars[start..i].iter().collect();
                i += 1; // consume closing '}'
                let sub_lexer = Lexer::new(&sub_source);
                let mut sub_parser = Parser::new(sub_lexer, self.ast);
                let expr = sub_parser.parse_expression(Prec::Lowest)?;
                if sub_parser.had_error() {
                    return Err(sub_parser.errors[0].clone());
                }
                parts.push(InterpPart::Expr(expr));
            } else {
                buf.push(chars[i]);
                i += 1;
            }
        }
        if !buf.is_empty() {
            parts.push(InterpPart::Text(buf));
        }
        Ok(self.ast.alloc_expr(Expr {
            kind: ExprKind::StringInterpolation(parts),
            loc,
        }))
    }
}

fn bump(prec: Prec) -> Prec {
    // left-associative: next minimum precedence is one level higher
    match prec {
        Prec::Lowest => Prec::Coalesce,
        Prec::Coalesce => Prec::Or,
        Prec::Or => Prec::And,
        Prec::And => Prec::BitOr,
        Prec::BitOr => Prec::BitXor,
        Prec::BitXor => Prec::BitAnd,
        Prec::BitAnd => Prec::Equality,
        Prec::Equality => Prec::Relational,
        Prec::Relational => Prec::Shift,
        Prec::Shift => Prec::Additive,
        Prec::Additive => Prec::Multiplicative,
        Prec::Multiplicative => Prec::Multiplicative,
    }
}

fn is_assignable(expr: &Expr) -> bool {
    matches!(
        expr.kind,
        ExprKind::Identifier(_) | ExprKind::MemberAccess { .. } | ExprKind::IndexAccess { .. }
    )
}

fn strip_quotes(lexeme: &str) -> String {
    lexeme
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(lexeme)
        .to_string()
}

fn primitive_for_token(kind: &TokenKind) -> Option<Primitive> {
    Some(match kind {
        TokenKind::Void => Primitive::Void,
        TokenKind::Bool => Primitive::Bool,
        TokenKind::I32 => Primitive::I32,
        TokenKind::I64 => Primitive::I64,
        TokenKind::U32 => Primitive::U32,
        TokenKind::U64 => Primitive::U64,
        TokenKind::F64 => Primitive::F64,
        TokenKind::StringType => Primitive::String,
        TokenKind::Bytes => Primitive::Bytes,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> (Module<'_>, bool) {
        // leaked so the arena outlives this helper's return value in tests
        let ast: &'static Ast<'static> = Box::leak(Box::new(Ast::new()));
        let lexer = Lexer::new(source);
        let mut parser = Parser::new(lexer, ast);
        let module = parser.parse_module();
        (module, parser.had_error())
    }

    #[test]
    fn parses_simple_function() {
        let (module, had_error) = parse("export fn add(a: i32, b: i32) -> i32 { return a + b; }");
        assert!(!had_error);
        assert_eq!(module.stmts.len(), 1);
        match &module.stmts[0].kind {
            StmtKind::FnDecl(f) => {
                assert_eq!(f.name, "add");
                assert!(f.is_export);
                assert_eq!(f.params.len(), 2);
            }
            _ => panic!("expected FnDecl"),
        }
    }

    #[test]
    fn export_not_allowed_before_let() {
        let (_module, had_error) = parse("export let x = 1;");
        assert!(had_error);
    }

    #[test]
    fn struct_literal_requires_uppercase_name() {
        let (module, had_error) = parse("fn f() { let p = Point { x: 1, y: 2 }; }");
        assert!(!had_error);
        let body = match &module.stmts[0].kind {
            StmtKind::FnDecl(f) => &f.body.kind,
            _ => panic!(),
        };
        let StmtKind::Block(stmts) = body else {
            panic!()
        };
        match &stmts[0].kind {
            StmtKind::Let { init: Some(e), .. } => {
                assert!(matches!(e.kind, ExprKind::StructLiteral { .. }));
            }
            _ => panic!("expected let with struct literal initializer"),
        }
    }

    #[test]
    fn if_condition_lowercase_identifier_leaves_block_alone() {
        let (_module, had_error) = parse("fn f() { if cond { return 1; } }");
        assert!(!had_error);
    }

    #[test]
    fn lambda_with_expression_body() {
        let (module, had_error) = parse("fn f() { let g = fn(x: i32) => x * 2; }");
        assert!(!had_error);
        let _ = module;
    }

    #[test]
    fn recovers_and_reports_multiple_errors() {
        let (_module, had_error) = parse("let = ; let y = 2;");
        assert!(had_error);
    }
}
