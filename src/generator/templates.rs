//! Template environment and helper table
//!
//! Templates use `<% %>` for blocks, `<@ @>` for expressions and `<# #>` for
//! comments, so the braces of the emitted Go code never need escaping.
//! The built-in templates are compiled into the binary; a configured
//! templates directory may replace any of them by file name.
//!
//! Helpers available to every template:
//!
//! | name | kind | effect |
//! |---|---|---|
//! | `lower_first` | filter | `UserID` → `userID` |
//! | `upper_first` | filter | `index` → `Index` |
//! | `snake_case` | filter | `UserProfile` → `user_profile` |
//! | `go_quote` | filter | Go interpreted string literal |
//! | `join_path(a, b, ...)` | function | slash path join |
//! | `merge(a, b)` | function | map union, `b` wins |

use crate::routes::join_path;
use anyhow::{Context, Result};
use minijinja::syntax::SyntaxConfig;
use minijinja::value::{Rest, Value};
use minijinja::{AutoEscape, Environment, Error, ErrorKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

pub const HANDLER_TEMPLATE: &str = "handler.go.tpl";
pub const INIT_TEMPLATE: &str = "init.go.tpl";
pub const LISTING_TEMPLATE: &str = "listing.go.tpl";

const BUILTIN: [(&str, &str); 3] = [
    (HANDLER_TEMPLATE, include_str!("../../templates/handler.go.tpl")),
    (INIT_TEMPLATE, include_str!("../../templates/init.go.tpl")),
    (LISTING_TEMPLATE, include_str!("../../templates/listing.go.tpl")),
];

/// Loaded and parsed templates
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// Built-in templates, each replaced by `<dir>/<name>` when that file exists.
    ///
    /// # Errors
    ///
    /// A template that cannot be read or does not parse.
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        let mut env = new_environment()?;
        for (name, builtin) in BUILTIN {
            let override_path = dir.map(|d| d.join(name)).filter(|p| p.is_file());
            let source = match &override_path {
                Some(path) => {
                    tracing::debug!(template = name, path = %path.display(), "using template override");
                    std::fs::read_to_string(path)
                        .with_context(|| format!("Failed to read template: {}", path.display()))?
                }
                None => builtin.to_string(),
            };
            env.add_template_owned(name, source)
                .with_context(|| format!("Failed to parse template {name}"))?;
        }
        Ok(Templates { env })
    }

    pub fn builtin() -> Result<Self> {
        Templates::load(None)
    }

    /// Render template `name` with `ctx`.
    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String> {
        self.env
            .get_template(name)
            .and_then(|tmpl| tmpl.render(ctx))
            .with_context(|| format!("Failed to render template {name}"))
    }
}

/// Environment with the generator syntax, whitespace settings and helpers.
pub fn new_environment() -> Result<Environment<'static>> {
    let syntax = SyntaxConfig::builder()
        .block_delimiters("<%", "%>")
        .variable_delimiters("<@", "@>")
        .comment_delimiters("<#", "#>")
        .build()
        .context("Invalid template syntax configuration")?;

    let mut env = Environment::new();
    env.set_syntax(syntax);
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_keep_trailing_newline(true);

    env.add_filter("lower_first", lower_first);
    env.add_filter("upper_first", upper_first);
    env.add_filter("snake_case", |s: String| snake_case(&s));
    env.add_filter("go_quote", |s: String| go_quote(&s));
    env.add_function("join_path", |parts: Rest<String>| {
        let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
        join_path(&parts)
    });
    env.add_function("merge", merge);
    Ok(env)
}

pub fn lower_first(s: String) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => s,
    }
}

pub fn upper_first(s: String) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => s,
    }
}

/// `UserProfile` → `user_profile`, `HTTPServer` → `http_server`.
pub fn snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).and_then(|p| chars.get(p));
            let next = chars.get(i + 1);
            let boundary = match prev {
                None | Some('_') => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) => p.is_uppercase() && next.is_some_and(|n| n.is_lowercase()),
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Quote `s` as a Go interpreted string literal.
pub fn go_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Union of two maps; keys of `b` override those of `a`.
fn merge(a: Value, b: Value) -> Result<Value, Error> {
    let mut merged: BTreeMap<String, Value> = BTreeMap::new();
    for map in [&a, &b] {
        if map.is_undefined() || map.is_none() {
            continue;
        }
        if !matches!(map.kind(), minijinja::value::ValueKind::Map) {
            return Err(Error::new(
                ErrorKind::InvalidOperation,
                format!("merge expects maps, got {}", map.kind()),
            ));
        }
        for key in map.try_iter()? {
            let value = map.get_item(&key)?;
            merged.insert(key.to_string(), value);
        }
    }
    Ok(Value::from_iter(merged))
}
