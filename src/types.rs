// Static type representation shared by the checker and the code generator.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Void,
    Bool,
    I32,
    I64,
    U32,
    U64,
    F64,
    String,
    Bytes,
}

impl Primitive {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "void" => Primitive::Void,
            "bool" => Primitive::Bool,
            "i32" => Primitive::I32,
            "i64" => Primitive::I64,
            "u32" => Primitive::U32,
            "u64" => Primitive::U64,
            "f64" => Primitive::F64,
            "string" => Primitive::String,
            "bytes" => Primitive::Bytes,
            _ => return None,
        })
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Primitive::I32 | Primitive::I64 | Primitive::U32 | Primitive::U64
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || matches!(self, Primitive::F64)
    }

    pub fn is_64bit(self) -> bool {
        matches!(self, Primitive::I64 | Primitive::U64)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Primitive::Void => "void",
            Primitive::Bool => "bool",
            Primitive::I32 => "i32",
            Primitive::I64 => "i64",
            Primitive::U32 => "u32",
            Primitive::U64 => "u64",
            Primitive::F64 => "f64",
            Primitive::String => "string",
            Primitive::Bytes => "bytes",
        };
        write!(f, "{}", s)
    }
}

/// The static type of an expression or declared annotation.
///
/// `Generic` is parsed but never validated by the checker (spec.md §3) -
/// it exists so the parser accepts `Name<T, U>` syntax without the checker
/// having opinions about it yet.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Primitive(Primitive),
    Optional(Box<Type>),
    Result(Box<Type>, Box<Type>),
    Promise(Box<Type>),
    Array(Box<Type>),
    Map(Box<Type>, Box<Type>),
    Function(Vec<Type>, Box<Type>, bool),
    UserDefined(String),
    Generic(String, Vec<Type>),
}

impl Type {
    pub fn void() -> Self {
        Type::Primitive(Primitive::Void)
    }

    pub fn bool() -> Self {
        Type::Primitive(Primitive::Bool)
    }

    pub fn i32() -> Self {
        Type::Primitive(Primitive::I32)
    }

    pub fn i64() -> Self {
        Type::Primitive(Primitive::I64)
    }

    pub fn f64() -> Self {
        Type::Primitive(Primitive::F64)
    }

    pub fn string() -> Self {
        Type::Primitive(Primitive::String)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Primitive(p) if p.is_numeric())
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Primitive(p) if p.is_integer())
    }

    /// The wasm *value type* used for locals/params/results - not the
    /// in-memory byte width (see codegen::layout for that).
    pub fn wasm_value_type(&self) -> &'static str {
        match self {
            Type::Primitive(Primitive::I64) | Type::Primitive(Primitive::U64) => "i64",
            Type::Primitive(Primitive::F64) => "f64",
            Type::Primitive(Primitive::Void) => "",
            _ => "i32",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(p) => write!(f, "{}", p),
            Type::Optional(t) => write!(f, "{}?", t),
            Type::Result(ok, err) => write!(f, "Result<{}, {}>", ok, err),
            Type::Promise(t) => write!(f, "Promise<{}>", t),
            Type::Array(t) => write!(f, "Array<{}>", t),
            Type::Map(k, v) => write!(f, "Map<{}, {}>", k, v),
            Type::Function(params, ret, is_async) => {
                write!(f, "{}fn(", if *is_async { "async " } else { "" })?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", ret)
            }
            Type::UserDefined(name) => write!(f, "{}", name),
            Type::Generic(name, params) => {
                write!(f, "{}<", name)?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ">")
            }
        }
    }
}
