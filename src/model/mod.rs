//! # Model Module
//!
//! Structural model of a scanned Go package: free functions, methods grouped
//! by receiver type, struct declarations and the per-file import tables.
//!
//! ## Overview
//!
//! The model is deliberately shallow. It keeps exactly what the classifier,
//! the graph resolver and the route extractor need:
//!
//! - **[`Package`]** - everything declared in one directory
//! - **[`Struct`]** - a `type X struct { ... }` declaration with its fields
//! - **[`Func`]** - a function or method signature with its leading comments
//! - **[`Arg`]** - a parameter, result or struct field (name, tag, type)
//! - **[`Type`]** - a typed shape (named, pointer, slice, ...) that only turns
//!   back into Go text when code is emitted
//!
//! The model for a directory is built by [`extract_package`].

use std::collections::BTreeMap;
use std::fmt;

mod extract;
mod tag;
#[cfg(test)]
mod tests;

pub use extract::{extract_package, parse_source, GoParser};
pub use tag::{parse_tag, StructTag, TagError};

/// Shape of a Go type expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// `int`, `App`, `http.Request`
    Named {
        /// Qualifier (import alias), `None` for local or builtin types
        package: Option<String>,
        name: String,
    },
    /// `*T`
    Pointer(Box<Type>),
    /// `[]T`
    Slice(Box<Type>),
    /// `[N]T`
    Array { len: String, elem: Box<Type> },
    /// `map[K]V`
    Map { key: Box<Type>, value: Box<Type> },
    /// `...T` in the last parameter position
    Variadic(Box<Type>),
    /// Anything else (func, chan, interface, generic instantiations), kept verbatim
    Other(String),
}

impl Type {
    /// Unqualified named type
    pub fn named(name: impl Into<String>) -> Self {
        Type::Named {
            package: None,
            name: name.into(),
        }
    }

    /// Qualified named type such as `http.Request`
    pub fn qualified(package: impl Into<String>, name: impl Into<String>) -> Self {
        Type::Named {
            package: Some(package.into()),
            name: name.into(),
        }
    }

    pub fn pointer(inner: Type) -> Self {
        Type::Pointer(Box::new(inner))
    }

    pub fn slice(inner: Type) -> Self {
        Type::Slice(Box::new(inner))
    }

    /// Whether the outermost shape is a pointer.
    pub fn star(&self) -> bool {
        matches!(self, Type::Pointer(_))
    }

    /// The type with one level of pointer removed.
    pub fn deref(&self) -> &Type {
        match self {
            Type::Pointer(inner) => inner,
            other => other,
        }
    }

    /// Base name of a (possibly pointer) named type.
    pub fn name(&self) -> Option<&str> {
        match self.deref() {
            Type::Named { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Qualifier of a (possibly pointer) named type.
    pub fn package(&self) -> Option<&str> {
        match self.deref() {
            Type::Named { package, .. } => package.as_deref(),
            _ => None,
        }
    }

    /// `true` for `pkg.name` exactly, without pointer indirection.
    pub fn is_qualified(&self, package: &str, name: &str) -> bool {
        matches!(self, Type::Named { package: Some(p), name: n } if p == package && n == name)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Named { package: Some(p), name } => write!(f, "{p}.{name}"),
            Type::Named { package: None, name } => f.write_str(name),
            Type::Pointer(inner) => write!(f, "*{inner}"),
            Type::Slice(inner) => write!(f, "[]{inner}"),
            Type::Array { len, elem } => write!(f, "[{len}]{elem}"),
            Type::Map { key, value } => write!(f, "map[{key}]{value}"),
            Type::Variadic(inner) => write!(f, "...{inner}"),
            Type::Other(raw) => f.write_str(raw),
        }
    }
}

/// Parameter, result or struct field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    /// Empty for unnamed parameters and embedded fields
    pub name: String,
    /// Raw tag content without the surrounding quotes; empty if absent
    pub tag: String,
    pub ty: Type,
}

impl Arg {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Arg {
            name: name.into(),
            tag: String::new(),
            ty,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Anonymous (embedded) struct field
    pub fn is_embedded(&self) -> bool {
        self.name.is_empty()
    }
}

/// Function or method declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Func {
    pub name: String,
    pub file: String,
    /// Leading comment lines, verbatim including the `//` marker
    pub comments: Vec<String>,
    pub params: Vec<Arg>,
    pub results: Vec<Arg>,
    /// Receiver, present for methods only
    pub recv: Option<Arg>,
}

impl Func {
    /// Exported identifiers start with an upper-case letter.
    pub fn is_exported(&self) -> bool {
        is_exported(&self.name)
    }
}

/// Struct type declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Struct {
    pub name: String,
    pub file: String,
    pub comments: Vec<String>,
    pub fields: Vec<Arg>,
}

/// Alias → import path table of a single file
pub type ImportTable = BTreeMap<String, String>;

/// Everything declared in one scanned directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub funcs: Vec<Func>,
    /// Receiver type name → methods in declaration order
    pub methods: BTreeMap<String, Vec<Func>>,
    pub structs: Vec<Struct>,
    /// File → alias → import path
    pub imports: BTreeMap<String, ImportTable>,
}

impl Package {
    pub fn methods_of(&self, type_name: &str) -> &[Func] {
        self.methods.get(type_name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find_struct(&self, name: &str) -> Option<&Struct> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn find_func(&self, name: &str) -> Option<&Func> {
        self.funcs.iter().find(|f| f.name == name)
    }

    /// Import path bound to `alias` in `file`.
    pub fn import_of(&self, file: &str, alias: &str) -> Option<&str> {
        self.imports
            .get(file)
            .and_then(|table| table.get(alias))
            .map(String::as_str)
    }
}

pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// Default alias of an import path: its last segment.
pub fn default_alias(import_path: &str) -> &str {
    import_path.rsplit('/').next().unwrap_or(import_path)
}
