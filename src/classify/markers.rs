//! Central tables the classifier works from.
//!
//! Actions and hooks are recognized by matching declared types against
//! marker descriptors (import path suffix + type name) instead of a type
//! checker, so the whole rule set lives here as plain data.

use crate::model::{Func, Type};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A type identified by the suffix of its package import path and its name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkerType {
    /// Import path suffix, e.g. `net/http`
    pub import: String,
    /// Type name inside that package
    pub name: String,
    /// Whether the marker is used through a pointer
    #[serde(default)]
    pub pointer: bool,
}

impl MarkerType {
    pub fn new(import: impl Into<String>, name: impl Into<String>, pointer: bool) -> Self {
        MarkerType {
            import: import.into(),
            name: name.into(),
            pointer,
        }
    }

    /// Whether `path` is the marker package (exact or `/`-separated suffix match).
    pub fn matches_import(&self, path: &str) -> bool {
        path == self.import
            || path
                .strip_suffix(self.import.as_str())
                .is_some_and(|head| head.ends_with('/'))
    }

    /// Whether `ty` is this marker when its package is imported as `alias`.
    pub fn matches_type(&self, ty: &Type, alias: &str) -> bool {
        if ty.star() != self.pointer {
            return false;
        }
        ty.deref().is_qualified(alias, &self.name)
    }
}

/// The full set of markers used during one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Markers {
    /// First result type of every action
    pub action: MarkerType,
    /// First hook parameter
    pub response_writer: MarkerType,
    /// Second hook parameter, also the `bind:"request"` field type
    pub request: MarkerType,
}

impl Default for Markers {
    fn default() -> Self {
        Markers {
            action: MarkerType::new("net/http", "Handler", false),
            response_writer: MarkerType::new("net/http", "ResponseWriter", false),
            request: MarkerType::new("net/http", "Request", true),
        }
    }
}

/// Reserved lifecycle method names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Hook {
    Before,
    After,
}

impl Hook {
    pub const ALL: [Hook; 2] = [Hook::Before, Hook::After];

    pub fn as_str(&self) -> &'static str {
        match self {
            Hook::Before => "Before",
            Hook::After => "After",
        }
    }

    pub fn from_name(name: &str) -> Option<Hook> {
        Hook::ALL.into_iter().find(|h| h.as_str() == name)
    }

    /// Name-only predicate; signatures are checked separately.
    pub fn is_reserved(func: &Func) -> bool {
        Hook::from_name(&func.name).is_some()
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar types an action parameter may be bound to
pub const PRIMITIVES: &[&str] = &[
    "bool", "string", "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16",
    "uint32", "uint64", "float32", "float64",
];

/// Name of a bindable parameter type (`int`, `[]string`), or `None` if it is not bindable.
pub fn bindable_type_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Named { package: None, name } if PRIMITIVES.contains(&name.as_str()) => {
            Some(name.clone())
        }
        Type::Slice(inner) => match inner.as_ref() {
            Type::Named { package: None, name } if PRIMITIVES.contains(&name.as_str()) => {
                Some(format!("[]{name}"))
            }
            _ => None,
        },
        _ => None,
    }
}

/// Lookup table from bindable type name to the conversion function used by generated code.
///
/// `int` → `Int`, `[]int` → `Ints`, `float64` → `Float64`, `[]float64` → `Float64s`.
pub fn conversion_table() -> BTreeMap<String, String> {
    let mut table = BTreeMap::new();
    for name in PRIMITIVES {
        let func = upper_first(name);
        table.insert((*name).to_string(), func.clone());
        table.insert(format!("[]{name}"), format!("{func}s"));
    }
    table
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
