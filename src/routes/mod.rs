//! # Routes Module
//!
//! Extracts HTTP routes from action comments and route prefixes from the
//! struct tags of parent embeddings.
//!
//! ## Annotation syntax
//!
//! ```go
//! type App struct {
//!     *base.Controller `@post:"/api" @route:"/v1"`
//! }
//!
//! //@get /users/:id user_show
//! //@route
//! func (c *App) Show(id int) http.Handler { ... }
//! ```
//!
//! The method token is a lower-case HTTP verb or `route`, which stands for
//! every verb. An action comment without a pattern uses `Controller/Action`.
//!
//! ## Prefix algebra
//!
//! Every route produced by an action is joined under each active prefix whose
//! method equals the route's method or is the wildcard, yielding one route per
//! matching prefix. A route that no prefix matches keeps its own pattern.

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::model::{parse_tag, Func};
use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

mod path;

pub use path::{clean_path, join_path};

/// Token that stands for every HTTP method
pub const WILDCARD: &str = "route";

/// Verbs a wildcard expands to, in this order
pub const ALL_METHODS: [Method; 9] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::TRACE,
    Method::OPTIONS,
    Method::CONNECT,
    Method::PATCH,
];

static ROUTE_COMMENT: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^//@(\w+)\s*(.*)$").expect("route comment regex is valid")
});

/// Method part of an annotation: one verb or all of them
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MethodSpec {
    Any,
    One(Method),
}

impl MethodSpec {
    /// Parse an annotation token (`get`, `post`, ..., `route`).
    pub fn parse(token: &str) -> Option<MethodSpec> {
        if token == WILDCARD {
            return Some(MethodSpec::Any);
        }
        if token.chars().any(|c| !c.is_ascii_lowercase()) {
            return None;
        }
        ALL_METHODS
            .iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(token))
            .cloned()
            .map(MethodSpec::One)
    }

    pub fn matches(&self, method: &Method) -> bool {
        match self {
            MethodSpec::Any => true,
            MethodSpec::One(m) => m == method,
        }
    }

    /// Concrete methods this spec stands for.
    pub fn expand(&self) -> Vec<Method> {
        match self {
            MethodSpec::Any => ALL_METHODS.to_vec(),
            MethodSpec::One(m) => vec![m.clone()],
        }
    }

    /// Narrowest spec covered by both, if they overlap.
    pub fn intersect(&self, other: &MethodSpec) -> Option<MethodSpec> {
        match (self, other) {
            (MethodSpec::Any, x) | (x, MethodSpec::Any) => Some(x.clone()),
            (MethodSpec::One(a), MethodSpec::One(b)) if a == b => Some(self.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for MethodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodSpec::Any => f.write_str(WILDCARD),
            MethodSpec::One(m) => f.write_str(m.as_str()),
        }
    }
}

/// Route prefix contributed by an ancestor embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefix {
    pub method: MethodSpec,
    pub path: String,
}

impl Prefix {
    pub fn new(method: MethodSpec, path: impl Into<String>) -> Self {
        Prefix {
            method,
            path: path.into(),
        }
    }
}

/// Prefix as written in configuration files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrefixConfig {
    pub method: String,
    pub path: String,
}

impl PrefixConfig {
    pub fn to_prefix(&self) -> anyhow::Result<Prefix> {
        let method = MethodSpec::parse(&self.method.to_ascii_lowercase())
            .ok_or_else(|| anyhow::anyhow!("Unknown prefix method `{}`", self.method))?;
        Ok(Prefix::new(method, self.path.clone()))
    }
}

/// A single dispatchable route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub method: Method,
    pub pattern: String,
    pub label: Option<String>,
    /// `Controller.Action`
    pub handler_name: String,
}

impl Serialize for Route {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Route", 4)?;
        s.serialize_field("method", self.method.as_str())?;
        s.serialize_field("pattern", &self.pattern)?;
        s.serialize_field("label", &self.label)?;
        s.serialize_field("handler_name", &self.handler_name)?;
        s.end()
    }
}

/// A parsed `//@method pattern label` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub method: MethodSpec,
    pub pattern: String,
    pub label: Option<String>,
}

/// Parse one comment line.
///
/// Returns `None` for lines that are not route annotations and
/// `Some(Err(token))` for annotations with an unknown method token.
pub fn parse_annotation(line: &str) -> Option<Result<Annotation, String>> {
    let caps = ROUTE_COMMENT.captures(line.trim_end())?;
    let token = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    let rest = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
    let Some(method) = MethodSpec::parse(token) else {
        return Some(Err(token.to_string()));
    };
    let mut words = rest.split_whitespace();
    let pattern = words.next().unwrap_or_default().to_string();
    let label = words.next().map(str::to_string);
    Some(Ok(Annotation {
        method,
        pattern,
        label,
    }))
}

/// Route prefixes declared in an embedding field's tag (`@get:"/api"`).
pub fn parse_prefixes(tag: &str, location: &str, diags: &mut Diagnostics) -> Vec<Prefix> {
    if tag.is_empty() {
        return Vec::new();
    }
    let parsed = match parse_tag(tag) {
        Ok(parsed) => parsed,
        Err(e) => {
            diags.warn(
                location,
                DiagnosticKind::MalformedTag,
                format!("cannot parse tag `{tag}`: {e}"),
            );
            return Vec::new();
        }
    };

    let mut prefixes = Vec::new();
    for (key, value) in parsed.entries() {
        let Some(token) = key.strip_prefix('@') else {
            continue;
        };
        match MethodSpec::parse(token) {
            Some(method) => prefixes.push(Prefix::new(method, value)),
            None => diags.warn(
                location,
                DiagnosticKind::UnknownRouteMethod,
                format!("unknown route method `{token}` in tag prefix, entry skipped"),
            ),
        }
    }
    prefixes
}

/// All patterns a route of `method` gets under the active `prefixes`.
pub fn apply_prefixes(method: &Method, pattern: &str, prefixes: &[Prefix]) -> Vec<String> {
    let joined: Vec<String> = prefixes
        .iter()
        .filter(|p| p.method.matches(method))
        .map(|p| join_path(&[p.path.as_str(), pattern]))
        .collect();
    if joined.is_empty() {
        vec![pattern.to_string()]
    } else {
        joined
    }
}

/// Prefixes active inside an embedded package.
///
/// Each tag prefix is joined under every compatible active prefix. Verbs of
/// a tag prefix that no active prefix covers take the tag prefix alone, and
/// verbs of an active prefix the tag does not mention keep the active
/// prefix, so without tag prefixes everything is inherited unchanged.
pub fn nest_prefixes(active: &[Prefix], declared: &[Prefix]) -> Vec<Prefix> {
    if declared.is_empty() {
        return active.to_vec();
    }
    let mut nested = Vec::new();
    for inner in declared {
        for outer in active {
            if let Some(method) = outer.method.intersect(&inner.method) {
                nested.push(Prefix::new(
                    method,
                    join_path(&[outer.path.as_str(), inner.path.as_str()]),
                ));
            }
        }
        nested.extend(uncovered(inner, active));
    }
    for outer in active {
        nested.extend(uncovered(outer, declared));
    }
    nested
}

/// `prefix` restricted to the verbs none of `others` match.
fn uncovered(prefix: &Prefix, others: &[Prefix]) -> Vec<Prefix> {
    let methods = prefix.method.expand();
    let left: Vec<Method> = methods
        .iter()
        .filter(|m| !others.iter().any(|o| o.method.matches(m)))
        .cloned()
        .collect();
    if left.len() == methods.len() {
        vec![prefix.clone()]
    } else {
        left.into_iter()
            .map(|m| Prefix::new(MethodSpec::One(m), prefix.path.clone()))
            .collect()
    }
}

/// Routes of one action of `controller`.
pub fn action_routes(
    controller: &str,
    action: &Func,
    prefixes: &[Prefix],
    diags: &mut Diagnostics,
) -> Vec<Route> {
    let handler_name = format!("{controller}.{}", action.name);
    let mut routes = Vec::new();

    for line in &action.comments {
        let annotation = match parse_annotation(line) {
            None => continue,
            Some(Ok(annotation)) => annotation,
            Some(Err(token)) => {
                diags.warn(
                    format!("{}:{}", action.file, handler_name),
                    DiagnosticKind::UnknownRouteMethod,
                    format!("unknown route method `{token}` in `{line}`, line skipped"),
                );
                continue;
            }
        };

        let pattern = if annotation.pattern.is_empty() {
            format!("{controller}/{}", action.name)
        } else {
            annotation.pattern
        };

        for method in annotation.method.expand() {
            for full in apply_prefixes(&method, &pattern, prefixes) {
                routes.push(Route {
                    method: method.clone(),
                    pattern: full,
                    label: annotation.label.clone(),
                    handler_name: handler_name.clone(),
                });
            }
        }
    }
    routes
}
