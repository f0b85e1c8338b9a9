// Two-pass, scope-stack type checker (spec.md §4.4).
//
// Grounded on the shape of `jounce::type_checker::TypeChecker` - a checker
// struct holding an environment plus per-kind symbol tables, walking
// statements then expressions - but deliberately NOT Hindley-Milner: the
// teacher's `TypeEnv`/`Substitution`/unification-constraint machinery is
// replaced with ordinary declared-type checking (spec.md §9: every binding's
// type comes from an explicit annotation, a literal, or a callee's declared
// signature; there is no inference of unannotated function parameters).

use std::collections::HashMap;

use crate::ast::*;
use crate::diagnostics::SourceLocation as DiagLoc;
use crate::errors::CompileError;
use crate::types::{Primitive, Type};

#[derive(Debug, Clone)]
struct FunctionSig {
    params: Vec<Type>,
    return_type: Type,
    is_async: bool,
}

#[derive(Debug, Clone)]
struct StructInfo {
    fields: Vec<(String, Type)>,
    methods: HashMap<String, FunctionSig>,
}

#[derive(Debug, Clone)]
struct EnumInfo {
    variants: HashMap<String, Option<Vec<(String, Type)>>>,
}

pub struct TypeChecker {
    functions: HashMap<String, FunctionSig>,
    structs: HashMap<String, StructInfo>,
    enums: HashMap<String, EnumInfo>,
    scopes: Vec<HashMap<String, Type>>,
}

impl TypeChecker {
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
            structs: HashMap::new(),
            enums: HashMap::new(),
            scopes: vec![HashMap::new()],
        }
    }

    pub fn check_module(&mut self, module: &Module) -> Result<(), CompileError> {
        self.collect_signatures(module)?;
        for stmt in &module.stmts {
            self.check_top_level(stmt)?;
        }
        Ok(())
    }

    // ---- pass 1: signatures ----

    fn collect_signatures(&mut self, module: &Module) -> Result<(), CompileError> {
        for stmt in &module.stmts {
            match &stmt.kind {
                StmtKind::FnDecl(f) => {
                    self.functions.insert(f.name.clone(), function_sig(f));
                }
                StmtKind::ExternFnDecl(f) => {
                    self.functions.insert(
                        f.name.clone(),
                        FunctionSig {
                            params: f.params.iter().map(|p| p.type_annotation.clone()).collect(),
                            return_type: f.return_type.clone(),
                            is_async: false,
                        },
                    );
                }
                StmtKind::StructDecl(s) => {
                    let mut methods = HashMap::new();
                    for m in &s.methods {
                        methods.insert(m.name.clone(), function_sig(m));
                    }
                    self.structs.insert(
                        s.name.clone(),
                        StructInfo {
                            fields: s.fields.clone(),
                            methods,
                        },
                    );
                }
                StmtKind::EnumDecl(e) => {
                    let mut variants = HashMap::new();
                    for v in &e.variants {
                        variants.insert(v.name.clone(), v.fields.clone());
                    }
                    self.enums.insert(e.name.clone(), EnumInfo { variants });
                }
                _ => {}
            }
        }
        Ok(())
    }

    // ---- pass 2: bodies ----

    fn check_top_level(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match &stmt.kind {
            StmtKind::FnDecl(f) => self.check_function_body(f),
            StmtKind::StructDecl(s) => {
                for m in &s.methods {
                    self.check_function_body(m)?;
                }
                Ok(())
            }
            StmtKind::ExternFnDecl(_) | StmtKind::EnumDecl(_) | StmtKind::Import { .. } => Ok(()),
            _ => {
                self.push_scope();
                let result = self.check_stmt(stmt);
                self.pop_scope();
                result
            }
        }
    }

    fn check_function_body(&mut self, f: &FnDecl) -> Result<(), CompileError> {
        self.push_scope();
        for p in &f.params {
            self.bind(p.name.clone(), p.type_annotation.clone());
        }
        // the body returns `T`; wrapping it in `Promise<T>` happens at the
        // call site (`check_arguments`), not here.
        self.check_stmt_with_return(f.body, &f.return_type)?;
        self.pop_scope();
        Ok(())
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn bind(&mut self, name: String, ty: Type) {
        self.scopes.last_mut().unwrap().insert(name, ty);
    }

    fn lookup(&self, name: &str) -> Option<&Type> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        self.check_stmt_with_return(stmt, &Type::void())
    }

    fn check_stmt_with_return(&mut self, stmt: &Stmt, expected_return: &Type) -> Result<(), CompileError> {
        match &stmt.kind {
            StmtKind::Expr(&expr) => {
                self.check_expr(expr)?;
                Ok(())
            }
            StmtKind::Let {
                name,
                type_annotation,
                init,
                ..
            } => {
                let ty = match (type_annotation, init) {
                    (Some(t), Some(&init_expr)) => {
                        let actual = self.check_expr(init_expr)?;
                        self.require_assignable(t, &actual, stmt.loc)?;
                        t.clone()
                    }
                    (Some(t), None) => t.clone(),
                    (None, Some(&init_expr)) => self.check_expr(init_expr)?,
                    (None, None) => {
                        return Err(CompileError::InvalidOperation {
                            message: format!("`{}` needs a type annotation or an initializer", name),
                            location: loc(stmt.loc),
                        })
                    }
                };
                self.bind(name.clone(), ty);
                Ok(())
            }
            StmtKind::FnDecl(_) | StmtKind::ExternFnDecl(_) | StmtKind::StructDecl(_) | StmtKind::EnumDecl(_) => {
                Err(CompileError::UnsupportedFeature {
                    message: "nested declarations are not supported".to_string(),
                    location: loc(stmt.loc),
                })
            }
            StmtKind::Return(value) => {
                let actual = match value {
                    Some(&expr) => self.check_expr(expr)?,
                    None => Type::void(),
                };
                self.require_assignable(expected_return, &actual, stmt.loc)
            }
            StmtKind::If {
                condition: &condition,
                then_branch: &then_branch,
                else_branch,
            } => {
                let cond_ty = self.check_expr(condition)?;
                self.require_assignable(&Type::bool(), &cond_ty, condition.loc)?;
                self.push_scope();
                self.check_stmt_with_return(then_branch, expected_return)?;
                self.pop_scope();
                if let Some(&else_stmt) = else_branch {
                    self.push_scope();
                    self.check_stmt_with_return(else_stmt, expected_return)?;
                    self.pop_scope();
                }
                Ok(())
            }
            StmtKind::Block(stmts) => {
                self.push_scope();
                for &s in stmts {
                    self.check_stmt_with_return(s, expected_return)?;
                }
                self.pop_scope();
                Ok(())
            }
            StmtKind::Import { .. } => Ok(()),
            StmtKind::For {
                var,
                iterable: &iterable,
                body: &body,
            } => {
                let iterable_ty = self.check_expr(iterable)?;
                let element_ty = match iterable_ty {
                    Type::Array(elem) => *elem,
                    other => {
                        return Err(CompileError::TypeMismatch {
                            expected: "Array<T>".to_string(),
                            found: other.to_string(),
                            location: loc(iterable.loc),
                        })
                    }
                };
                self.push_scope();
                self.bind(var.clone(), element_ty);
                self.check_stmt_with_return(body, expected_return)?;
                self.pop_scope();
                Ok(())
            }
            StmtKind::While {
                condition: &condition,
                body: &body,
            } => {
                let cond_ty = self.check_expr(condition)?;
                self.require_assignable(&Type::bool(), &cond_ty, condition.loc)?;
                self.push_scope();
                self.check_stmt_with_return(body, expected_return)?;
                self.pop_scope();
                Ok(())
            }
            StmtKind::Break | StmtKind::Continue => Ok(()),
        }
    }

    fn check_expr(&mut self, expr: &Expr) -> Result<Type, CompileError> {
        match &expr.kind {
            ExprKind::IntLiteral(_) => Ok(Type::i32()),
            ExprKind::FloatLiteral(_) => Ok(Type::f64()),
            ExprKind::BoolLiteral(_) => Ok(Type::bool()),
            ExprKind::StringLiteral(_) => Ok(Type::string()),
            ExprKind::StringInterpolation(_) => Ok(Type::string()),
            ExprKind::Identifier(name) => self
                .lookup(name)
                .cloned()
                .or_else(|| self.functions.get(name).map(function_type))
                .ok_or_else(|| CompileError::UndefinedVariable {
                    name: name.clone(),
                    location: loc(expr.loc),
                }),
            ExprKind::Binary {
                op: &op,
                left: &left,
                right: &right,
            } => self.check_binary(op, left, right, expr.loc),
            ExprKind::Unary { op: &op, operand: &operand } => self.check_unary(op, operand, expr.loc),
            ExprKind::Call { callee: &callee, args } => self.check_call(callee, args, expr.loc),
            ExprKind::MemberAccess { object: &object, field } => {
                self.check_member_access(object, field, expr.loc)
            }
            ExprKind::IndexAccess {
                object: &object,
                index: &index,
            } => {
                let object_ty = self.check_expr(object)?;
                let index_ty = self.check_expr(index)?;
                match object_ty {
                    Type::Array(elem) => {
                        self.require_assignable(&Type::i32(), &index_ty, index.loc)?;
                        Ok(*elem)
                    }
                    Type::Map(key_ty, value_ty) => {
                        self.require_assignable(&key_ty, &index_ty, index.loc)?;
                        Ok(*value_ty)
                    }
                    other => Err(CompileError::TypeMismatch {
                        expected: "Array<T> or Map<K, V>".to_string(),
                        found: other.to_string(),
                        location: loc(object.loc),
                    }),
                }
            }
            ExprKind::ArrayLiteral(elements) => {
                if elements.is_empty() {
                    return Err(CompileError::InvalidOperation {
                        message: "cannot infer the element type of an empty array literal".to_string(),
                        location: loc(expr.loc),
                    });
                }
                let first = self.check_expr(elements[0])?;
                for &e in &elements[1..] {
                    let ty = self.check_expr(e)?;
                    self.require_assignable(&first, &ty, e.loc)?;
                }
                Ok(Type::Array(Box::new(first)))
            }
            ExprKind::StructLiteral { type_name, fields } => self.check_struct_literal(type_name, fields, expr.loc),
            ExprKind::Await(&inner) => {
                let inner_ty = self.check_expr(inner)?;
                match inner_ty {
                    Type::Promise(t) => Ok(*t),
                    other => Err(CompileError::TypeMismatch {
                        expected: "Promise<T>".to_string(),
                        found: other.to_string(),
                        location: loc(inner.loc),
                    }),
                }
            }
            ExprKind::Try(&inner) => {
                let inner_ty = self.check_expr(inner)?;
                match inner_ty {
                    Type::Result(ok, _err) => Ok(*ok),
                    other => Err(CompileError::TypeMismatch {
                        expected: "Result<T, E>".to_string(),
                        found: other.to_string(),
                        location: loc(inner.loc),
                    }),
                }
            }
            ExprKind::Match { value: &value, arms } => self.check_match(value, arms, expr.loc),
            ExprKind::Assign {
                target: &target,
                value: &value,
            } => {
                if !matches!(
                    target.kind,
                    ExprKind::Identifier(_) | ExprKind::MemberAccess { .. } | ExprKind::IndexAccess { .. }
                ) {
                    return Err(CompileError::InvalidOperation {
                        message: "invalid assignment target".to_string(),
                        location: loc(target.loc),
                    });
                }
                let target_ty = self.check_expr(target)?;
                let value_ty = self.check_expr(value)?;
                self.require_assignable(&target_ty, &value_ty, value.loc)?;
                Ok(target_ty)
            }
            ExprKind::Lambda {
                params,
                return_type,
                body,
            } => {
                self.push_scope();
                for p in params {
                    self.bind(p.name.clone(), p.type_annotation.clone());
                }
                let declared = return_type.clone().unwrap_or(Type::void());
                match body {
                    LambdaBody::Expr(&body_expr) => {
                        let actual = self.check_expr(body_expr)?;
                        if return_type.is_some() {
                            self.require_assignable(&declared, &actual, body_expr.loc)?;
                        }
                    }
                    LambdaBody::Block(&block) => {
                        self.check_stmt_with_return(block, &declared)?;
                    }
                }
                self.pop_scope();
                Ok(Type::Function(
                    params.iter().map(|p| p.type_annotation.clone()).collect(),
                    Box::new(declared),
                    false,
                ))
            }
        }
    }

    fn check_binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        at: SourceLocation,
    ) -> Result<Type, CompileError> {
        let left_ty = self.check_expr(left)?;
        let right_ty = self.check_expr(right)?;
        match op {
            BinaryOp::And | BinaryOp::Or => {
                self.require_assignable(&Type::bool(), &left_ty, left.loc)?;
                self.require_assignable(&Type::bool(), &right_ty, right.loc)?;
                Ok(Type::bool())
            }
            BinaryOp::Eq | BinaryOp::NotEq => {
                self.require_comparable(&left_ty, &right_ty, at)?;
                Ok(Type::bool())
            }
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                self.require_numeric(&left_ty, left.loc)?;
                self.require_numeric(&right_ty, right.loc)?;
                Ok(Type::bool())
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                self.require_numeric(&left_ty, left.loc)?;
                self.require_numeric(&right_ty, right.loc)?;
                widen_numeric(&left_ty, &right_ty, at)
            }
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr => {
                self.require_integer(&left_ty, left.loc)?;
                self.require_integer(&right_ty, right.loc)?;
                widen_numeric(&left_ty, &right_ty, at)
            }
            BinaryOp::Coalesce => match left_ty {
                Type::Optional(inner) => {
                    self.require_assignable(&inner, &right_ty, right.loc)?;
                    Ok(*inner)
                }
                other => Err(CompileError::TypeMismatch {
                    expected: "T?".to_string(),
                    found: other.to_string(),
                    location: loc(left.loc),
                }),
            },
        }
    }

    fn check_unary(&mut self, op: UnaryOp, operand: &Expr, _at: SourceLocation) -> Result<Type, CompileError> {
        let ty = self.check_expr(operand)?;
        match op {
            UnaryOp::Neg => {
                self.require_numeric(&ty, operand.loc)?;
                Ok(ty)
            }
            UnaryOp::Not => {
                self.require_assignable(&Type::bool(), &ty, operand.loc)?;
                Ok(Type::bool())
            }
            UnaryOp::BitNot => {
                self.require_integer(&ty, operand.loc)?;
                Ok(ty)
            }
        }
    }

    fn check_call(&mut self, callee: &Expr, args: &[&Expr], at: SourceLocation) -> Result<Type, CompileError> {
        if let ExprKind::MemberAccess { object: &object, field } = &callee.kind {
            let object_ty = self.check_expr(object)?;
            if let Type::UserDefined(struct_name) = &object_ty {
                let sig = self
                    .structs
                    .get(struct_name)
                    .and_then(|s| s.methods.get(field))
                    .cloned()
                    .ok_or_else(|| CompileError::UndefinedFunction {
                        name: format!("{}.{}", struct_name, field),
                        location: loc(callee.loc),
                    })?;
                return self.check_arguments(&sig, args, at);
            }
        }

        let callee_ty = self.check_expr(callee)?;
        match callee_ty {
            Type::Function(params, ret, _is_async) => {
                if params.len() != args.len() {
                    return Err(CompileError::WrongNumberOfArguments {
                        expected: params.len(),
                        found: args.len(),
                        location: loc(at),
                    });
                }
                for (param_ty, &arg) in params.iter().zip(args) {
                    let arg_ty = self.check_expr(arg)?;
                    self.require_assignable(param_ty, &arg_ty, arg.loc)?;
                }
                Ok(*ret)
            }
            other => Err(CompileError::TypeMismatch {
                expected: "function".to_string(),
                found: other.to_string(),
                location: loc(callee.loc),
            }),
        }
    }

    fn check_arguments(&mut self, sig: &FunctionSig, args: &[&Expr], at: SourceLocation) -> Result<Type, CompileError> {
        if sig.params.len() != args.len() {
            return Err(CompileError::WrongNumberOfArguments {
                expected: sig.params.len(),
                found: args.len(),
                location: loc(at),
            });
        }
        for (param_ty, &arg) in sig.params.iter().zip(args) {
            let arg_ty = self.check_expr(arg)?;
            self.require_assignable(param_ty, &arg_ty, arg.loc)?;
        }
        Ok(if sig.is_async {
            Type::Promise(Box::new(sig.return_type.clone()))
        } else {
            sig.return_type.clone()
        })
    }

    fn check_member_access(&mut self, object: &Expr, field: &str, at: SourceLocation) -> Result<Type, CompileError> {
        let object_ty = self.check_expr(object)?;
        match object_ty {
            Type::UserDefined(struct_name) => {
                let info = self.structs.get(&struct_name).ok_or_else(|| CompileError::UndefinedType {
                    name: struct_name.clone(),
                    location: loc(object.loc),
                })?;
                info.fields
                    .iter()
                    .find(|(name, _)| name == field)
                    .map(|(_, ty)| ty.clone())
                    .ok_or_else(|| CompileError::InvalidOperation {
                        message: format!("{} has no field `{}`", struct_name, field),
                        location: loc(at),
                    })
            }
            other => Err(CompileError::TypeMismatch {
                expected: "struct".to_string(),
                found: other.to_string(),
                location: loc(object.loc),
            }),
        }
    }

    fn check_struct_literal(
        &mut self,
        type_name: &str,
        fields: &[(String, &Expr)],
        at: SourceLocation,
    ) -> Result<Type, CompileError> {
        let info = self
            .structs
            .get(type_name)
            .cloned()
            .ok_or_else(|| CompileError::UndefinedType {
                name: type_name.to_string(),
                location: loc(at),
            })?;
        if fields.len() != info.fields.len() {
            return Err(CompileError::InvalidOperation {
                message: format!(
                    "{} expects {} field(s), found {}",
                    type_name,
                    info.fields.len(),
                    fields.len()
                ),
                location: loc(at),
            });
        }
        for (name, &value) in fields {
            let declared = info
                .fields
                .iter()
                .find(|(fname, _)| fname == name)
                .map(|(_, ty)| ty.clone())
                .ok_or_else(|| CompileError::InvalidOperation {
                    message: format!("{} has no field `{}`", type_name, name),
                    location: loc(value.loc),
                })?;
            let actual = self.check_expr(value)?;
            self.require_assignable(&declared, &actual, value.loc)?;
        }
        Ok(Type::UserDefined(type_name.to_string()))
    }

    fn check_match(&mut self, value: &Expr, arms: &[MatchArm], at: SourceLocation) -> Result<Type, CompileError> {
        let value_ty = self.check_expr(value)?;
        if arms.is_empty() {
            return Err(CompileError::InvalidOperation {
                message: "match expression needs at least one arm".to_string(),
                location: loc(at),
            });
        }
        let mut result_ty: Option<Type> = None;
        for arm in arms {
            self.push_scope();
            self.bind_pattern(&arm.pattern, &value_ty, arm.loc)?;
            let arm_ty = self.check_expr(arm.body)?;
            self.pop_scope();
            match &result_ty {
                None => result_ty = Some(arm_ty),
                Some(expected) => self.require_assignable(expected, &arm_ty, arm.loc)?,
            }
        }
        Ok(result_ty.unwrap())
    }

    fn bind_pattern(&mut self, pattern: &Pattern, value_ty: &Type, at: SourceLocation) -> Result<(), CompileError> {
        match pattern {
            Pattern::Wildcard => Ok(()),
            Pattern::Identifier(name) => {
                self.bind(name.clone(), value_ty.clone());
                Ok(())
            }
            Pattern::IntLiteral(_) => self.require_assignable(&Type::i32(), value_ty, at),
            Pattern::StringLiteral(_) => self.require_assignable(&Type::string(), value_ty, at),
            Pattern::BoolLiteral(_) => self.require_assignable(&Type::bool(), value_ty, at),
            Pattern::EnumVariant { name, bindings } => {
                let enum_name = match value_ty {
                    Type::UserDefined(n) => n.clone(),
                    other => {
                        return Err(CompileError::TypeMismatch {
                            expected: "enum".to_string(),
                            found: other.to_string(),
                            location: loc(at),
                        })
                    }
                };
                let info = self.enums.get(&enum_name).ok_or_else(|| CompileError::UndefinedType {
                    name: enum_name.clone(),
                    location: loc(at),
                })?;
                let variant_fields = info.variants.get(name).ok_or_else(|| CompileError::InvalidOperation {
                    message: format!("{} has no variant `{}`", enum_name, name),
                    location: loc(at),
                })?;
                match variant_fields {
                    Some(fields) => {
                        if fields.len() != bindings.len() {
                            return Err(CompileError::WrongNumberOfArguments {
                                expected: fields.len(),
                                found: bindings.len(),
                                location: loc(at),
                            });
                        }
                        for (binding, (_, field_ty)) in bindings.iter().zip(fields) {
                            self.bind(binding.clone(), field_ty.clone());
                        }
                    }
                    None if !bindings.is_empty() => {
                        return Err(CompileError::WrongNumberOfArguments {
                            expected: 0,
                            found: bindings.len(),
                            location: loc(at),
                        })
                    }
                    None => {}
                }
                Ok(())
            }
        }
    }

    // ---- coercion rules (spec.md §4.4) ----

    fn require_numeric(&self, ty: &Type, at: SourceLocation) -> Result<(), CompileError> {
        if ty.is_numeric() {
            Ok(())
        } else {
            Err(CompileError::TypeMismatch {
                expected: "numeric type".to_string(),
                found: ty.to_string(),
                location: loc(at),
            })
        }
    }

    fn require_integer(&self, ty: &Type, at: SourceLocation) -> Result<(), CompileError> {
        if ty.is_integer() {
            Ok(())
        } else {
            Err(CompileError::TypeMismatch {
                expected: "integer type".to_string(),
                found: ty.to_string(),
                location: loc(at),
            })
        }
    }

    fn require_comparable(&self, a: &Type, b: &Type, at: SourceLocation) -> Result<(), CompileError> {
        if a == b || (a.is_numeric() && b.is_numeric()) {
            Ok(())
        } else {
            Err(CompileError::TypeMismatch {
                expected: a.to_string(),
                found: b.to_string(),
                location: loc(at),
            })
        }
    }

    /// `i32` values coerce to `i64` and `f64` contexts (spec.md §4.4); every
    /// other pairing must match exactly.
    fn require_assignable(&self, expected: &Type, actual: &Type, at: SourceLocation) -> Result<(), CompileError> {
        if expected == actual {
            return Ok(());
        }
        if let (Type::Primitive(Primitive::I64), Type::Primitive(Primitive::I32)) = (expected, actual) {
            return Ok(());
        }
        if let (Type::Primitive(Primitive::F64), Type::Primitive(Primitive::I32)) = (expected, actual) {
            return Ok(());
        }
        Err(CompileError::TypeMismatch {
            expected: expected.to_string(),
            found: actual.to_string(),
            location: loc(at),
        })
    }
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

fn function_sig(f: &FnDecl) -> FunctionSig {
    FunctionSig {
        params: f.params.iter().map(|p| p.type_annotation.clone()).collect(),
        return_type: f.return_type.clone(),
        is_async: f.is_async,
    }
}

fn function_type(sig: &FunctionSig) -> Type {
    Type::Function(sig.params.clone(), Box::new(sig.return_type.clone()), sig.is_async)
}

/// Binary arithmetic widens `i32 op i64 -> i64` and `integer op f64 -> f64`;
/// mismatched non-widening pairs (e.g. `i64` and `f64`) are rejected.
fn widen_numeric(left: &Type, right: &Type, at: SourceLocation) -> Result<Type, CompileError> {
    if left == right {
        return Ok(left.clone());
    }
    match (left, right) {
        (Type::Primitive(Primitive::F64), r) if r.is_integer() => Ok(Type::f64()),
        (l, Type::Primitive(Primitive::F64)) if l.is_integer() => Ok(Type::f64()),
        (Type::Primitive(Primitive::I64), r) if r.is_integer() => Ok(Type::i64()),
        (l, Type::Primitive(Primitive::I64)) if l.is_integer() => Ok(Type::i64()),
        _ => Err(CompileError::TypeMismatch {
            expected: left.to_string(),
            found: right.to_string(),
            location: loc(at),
        }),
    }
}

fn loc(l: SourceLocation) -> DiagLoc {
    DiagLoc::from(l)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Ast;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn check(source: &str) -> Result<(), CompileError> {
        let ast: &'static Ast<'static> = Box::leak(Box::new(Ast::new()));
        let lexer = Lexer::new(source);
        let mut parser = Parser::new(lexer, ast);
        let module = parser.parse_module();
        assert!(!parser.had_error(), "parse errors: {:?}", parser.errors());
        let mut checker = TypeChecker::new();
        checker.check_module(&module)
    }

    #[test]
    fn accepts_well_typed_function() {
        assert!(check("fn add(a: i32, b: i32) -> i32 { return a + b; }").is_ok());
    }

    #[test]
    fn rejects_type_mismatched_return() {
        assert!(check(r#"fn f() -> i32 { return "x"; }"#).is_err());
    }

    #[test]
    fn i32_coerces_into_i64_context() {
        assert!(check("fn f() -> i64 { let a: i32 = 1; return a; }").is_ok());
    }

    #[test]
    fn rejects_undefined_variable() {
        assert!(check("fn f() -> i32 { return x; }").is_err());
    }

    #[test]
    fn array_literal_requires_uniform_element_type() {
        assert!(check(r#"fn f() { let a = [1, "two"]; }"#).is_err());
    }

    #[test]
    fn for_loop_element_type_comes_from_array_type() {
        assert!(check("fn f(xs: Array<i32>) -> i32 { for x in xs { return x; } return 0; }").is_ok());
    }

    #[test]
    fn call_arity_mismatch_is_rejected() {
        assert!(check("fn add(a: i32, b: i32) -> i32 { return a + b; } fn f() -> i32 { return add(1); }").is_err());
    }
}
