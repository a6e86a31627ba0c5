//! Go type model
//!
//! A reduced view of Go source: enough to walk struct members, read their
//! serialization tags and recover the doc comments attached to them.

/// A Go type expression as written in source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// `Foo` or `pkg.Foo` (type arguments are dropped)
    Named {
        package: Option<String>,
        name: String,
    },
    /// `*T`
    Pointer(Box<TypeExpr>),
    /// `[]T`
    Slice(Box<TypeExpr>),
    /// `[N]T`
    Array { len: String, elem: Box<TypeExpr> },
    /// `map[K]V`
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    /// `chan T`, `<-chan T`, `chan<- T`
    Chan(Box<TypeExpr>),
    /// `struct { ... }`
    Struct(Vec<Member>),
    /// `interface { ... }`
    Interface,
    /// `func(...) ...`
    Func,
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named {
            package: None,
            name: name.into(),
        }
    }

    /// Element type for one level of pointer, slice, array, map or channel
    /// indirection
    pub fn elem(&self) -> Option<&TypeExpr> {
        match self {
            TypeExpr::Pointer(elem) | TypeExpr::Slice(elem) | TypeExpr::Chan(elem) => Some(elem),
            TypeExpr::Array { elem, .. } => Some(elem),
            TypeExpr::Map { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Whether values of this type serialize as a JSON list
    pub fn is_list(&self) -> bool {
        matches!(self, TypeExpr::Slice(_) | TypeExpr::Array { .. })
    }
}

impl std::fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeExpr::Named {
                package: Some(pkg),
                name,
            } => write!(f, "{pkg}.{name}"),
            TypeExpr::Named { package: None, name } => f.write_str(name),
            TypeExpr::Pointer(elem) => write!(f, "*{elem}"),
            TypeExpr::Slice(elem) => write!(f, "[]{elem}"),
            TypeExpr::Array { len, elem } => write!(f, "[{len}]{elem}"),
            TypeExpr::Map { key, value } => write!(f, "map[{key}]{value}"),
            TypeExpr::Chan(elem) => write!(f, "chan {elem}"),
            TypeExpr::Struct(_) => f.write_str("struct{...}"),
            TypeExpr::Interface => f.write_str("interface{...}"),
            TypeExpr::Func => f.write_str("func(...)"),
        }
    }
}

/// One struct field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Field name; for embedded fields, the embedded type's name
    pub name: String,
    pub embedded: bool,
    pub ty: TypeExpr,
    /// Raw struct tag without the surrounding quotes
    pub tags: String,
    /// Doc comment lines directly above the field
    pub comment_lines: Vec<String>,
    /// 1-based source line
    pub line: usize,
}

/// A top-level `type` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: String,
    /// `type A = B`
    pub alias: bool,
    pub ty: TypeExpr,
    /// Doc comment block directly above the declaration
    pub comment_lines: Vec<String>,
    /// The comment block one blank line above the doc block
    pub second_closest_comment_lines: Vec<String>,
    pub line: usize,
}

/// Parsed contents of a single `.go` file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFile {
    pub package: String,
    pub types: Vec<TypeDecl>,
}
