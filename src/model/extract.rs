//! Go source → [`Package`] extraction built on tree-sitter.

use super::tag::unescape;
use super::{default_alias, Arg, Func, ImportTable, Package, Struct, Type};
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser};

/// Reusable tree-sitter parser configured for Go
pub struct GoParser {
    parser: Parser,
}

impl GoParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .context("Failed to load the Go grammar")?;
        Ok(Self { parser })
    }

    /// Parse one file and merge its declarations into `package`.
    ///
    /// Ordered lists are appended to; per-file maps and the package name
    /// follow last-write-wins.
    pub fn parse_into(&mut self, file: &str, source: &str, package: &mut Package) -> Result<()> {
        let tree = self
            .parser
            .parse(source, None)
            .with_context(|| format!("Parser produced no syntax tree for {file}"))?;
        let root = tree.root_node();
        if root.has_error() {
            let line = first_error(root)
                .map(|n| n.start_position().row + 1)
                .unwrap_or(1);
            bail!("Syntax error in {file} near line {line}");
        }

        let src = source.as_bytes();
        let mut imports = ImportTable::new();
        let mut cursor = root.walk();
        for node in root.named_children(&mut cursor) {
            match node.kind() {
                "package_clause" => {
                    let mut inner = node.walk();
                    let ident = node
                        .named_children(&mut inner)
                        .find(|n| n.kind() == "package_identifier");
                    if let Some(ident) = ident {
                        package.name = text(ident, src).to_string();
                    }
                }
                "import_declaration" => collect_imports(node, src, &mut imports),
                "function_declaration" => {
                    if let Some(func) = parse_func(node, src, file, false) {
                        package.funcs.push(func);
                    }
                }
                "method_declaration" => {
                    if let Some(func) = parse_func(node, src, file, true) {
                        let receiver = func
                            .recv
                            .as_ref()
                            .and_then(|r| receiver_type_name(&r.ty))
                            .unwrap_or_default();
                        package.methods.entry(receiver).or_default().push(func);
                    }
                }
                "type_declaration" => collect_structs(node, src, file, &mut package.structs),
                _ => {}
            }
        }
        package.imports.insert(file.to_string(), imports);
        Ok(())
    }
}

/// Parse every Go file of `dir` (non-recursive, test files excluded) into one package.
pub fn extract_package(dir: &Path) -> Result<Package> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read source directory: {}", dir.display()))?;
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read entry of {}", dir.display()))?;
        let path = entry.path();
        let is_go = path.extension().is_some_and(|ext| ext == "go");
        let is_test = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with("_test.go"));
        if is_go && !is_test && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    if files.is_empty() {
        bail!("No Go source files found in {}", dir.display());
    }

    let mut parser = GoParser::new()?;
    let mut package = Package::default();
    for path in &files {
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read source file: {}", path.display()))?;
        let file = path.display().to_string();
        tracing::debug!(file = %file, "parsing Go source");
        parser.parse_into(&file, &source, &mut package)?;
    }
    Ok(package)
}

/// Parse a single in-memory source file as a package.
pub fn parse_source(file: &str, source: &str) -> Result<Package> {
    let mut parser = GoParser::new()?;
    let mut package = Package::default();
    parser.parse_into(file, source, &mut package)?;
    Ok(package)
}

fn text<'a>(node: Node<'_>, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or("")
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

/// Value of a Go string literal node (raw or interpreted).
fn string_literal(node: Node<'_>, src: &[u8]) -> String {
    let raw = text(node, src);
    if let Some(body) = raw.strip_prefix('`').and_then(|s| s.strip_suffix('`')) {
        return body.to_string();
    }
    match raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(body) => unescape(body),
        None => raw.to_string(),
    }
}

/// Contiguous comment lines directly above `node`.
fn leading_comments(node: Node<'_>, src: &[u8]) -> Vec<String> {
    let mut blocks: Vec<&str> = Vec::new();
    let mut next_row = node.start_position().row;
    let mut current = node.prev_named_sibling();
    while let Some(prev) = current {
        if prev.kind() != "comment" || prev.end_position().row + 1 != next_row {
            break;
        }
        let before = prev.prev_named_sibling();
        if before.is_some_and(|b| b.end_position().row == prev.start_position().row) {
            // trailing comment of the previous declaration
            break;
        }
        blocks.push(text(prev, src));
        next_row = prev.start_position().row;
        current = before;
    }
    blocks
        .into_iter()
        .rev()
        .flat_map(str::lines)
        .map(|line| line.trim_end().to_string())
        .collect()
}

fn collect_imports(decl: Node<'_>, src: &[u8], table: &mut ImportTable) {
    let mut cursor = decl.walk();
    for child in decl.named_children(&mut cursor) {
        match child.kind() {
            "import_spec" => add_import(child, src, table),
            "import_spec_list" => {
                let mut inner = child.walk();
                for spec in child.named_children(&mut inner) {
                    if spec.kind() == "import_spec" {
                        add_import(spec, src, table);
                    }
                }
            }
            _ => {}
        }
    }
}

fn add_import(spec: Node<'_>, src: &[u8], table: &mut ImportTable) {
    let Some(path_node) = spec.child_by_field_name("path") else {
        return;
    };
    let path = string_literal(path_node, src);
    let alias = spec
        .child_by_field_name("name")
        .map(|n| text(n, src).to_string())
        .unwrap_or_else(|| default_alias(&path).to_string());
    table.insert(alias, path);
}

fn parse_type(node: Node<'_>, src: &[u8]) -> Type {
    let other = || Type::Other(text(node, src).to_string());
    match node.kind() {
        "type_identifier" => Type::named(text(node, src)),
        "qualified_type" => match (
            node.child_by_field_name("package"),
            node.child_by_field_name("name"),
        ) {
            (Some(pkg), Some(name)) => Type::qualified(text(pkg, src), text(name, src)),
            _ => other(),
        },
        "pointer_type" | "parenthesized_type" => {
            let mut cursor = node.walk();
            let inner = node.named_children(&mut cursor).next();
            match (node.kind(), inner) {
                ("pointer_type", Some(inner)) => Type::pointer(parse_type(inner, src)),
                (_, Some(inner)) => parse_type(inner, src),
                _ => other(),
            }
        }
        "slice_type" => match node.child_by_field_name("element") {
            Some(elem) => Type::slice(parse_type(elem, src)),
            None => other(),
        },
        "array_type" => match (
            node.child_by_field_name("length"),
            node.child_by_field_name("element"),
        ) {
            (Some(len), Some(elem)) => Type::Array {
                len: text(len, src).to_string(),
                elem: Box::new(parse_type(elem, src)),
            },
            _ => other(),
        },
        "map_type" => match (
            node.child_by_field_name("key"),
            node.child_by_field_name("value"),
        ) {
            (Some(key), Some(value)) => Type::Map {
                key: Box::new(parse_type(key, src)),
                value: Box::new(parse_type(value, src)),
            },
            _ => other(),
        },
        _ => other(),
    }
}

fn parse_params(list: Node<'_>, src: &[u8]) -> Vec<Arg> {
    let mut args = Vec::new();
    let mut cursor = list.walk();
    for decl in list.named_children(&mut cursor) {
        let variadic = match decl.kind() {
            "parameter_declaration" => false,
            "variadic_parameter_declaration" => true,
            _ => continue,
        };
        let Some(type_node) = decl.child_by_field_name("type") else {
            continue;
        };
        let mut ty = parse_type(type_node, src);
        if variadic {
            ty = Type::Variadic(Box::new(ty));
        }
        let mut inner = decl.walk();
        let names: Vec<String> = decl
            .children_by_field_name("name", &mut inner)
            .map(|n| text(n, src).to_string())
            .collect();
        if names.is_empty() {
            args.push(Arg::new("", ty));
        } else {
            args.extend(names.into_iter().map(|name| Arg::new(name, ty.clone())));
        }
    }
    args
}

fn parse_results(result: Option<Node<'_>>, src: &[u8]) -> Vec<Arg> {
    match result {
        Some(node) if node.kind() == "parameter_list" => parse_params(node, src),
        Some(node) => vec![Arg::new("", parse_type(node, src))],
        None => Vec::new(),
    }
}

fn parse_func(node: Node<'_>, src: &[u8], file: &str, method: bool) -> Option<Func> {
    let name = text(node.child_by_field_name("name")?, src).to_string();
    let params = node
        .child_by_field_name("parameters")
        .map(|list| parse_params(list, src))
        .unwrap_or_default();
    let results = parse_results(node.child_by_field_name("result"), src);
    let recv = if method {
        node.child_by_field_name("receiver")
            .and_then(|list| parse_params(list, src).into_iter().next())
    } else {
        None
    };
    Some(Func {
        name,
        file: file.to_string(),
        comments: leading_comments(node, src),
        params,
        results,
        recv,
    })
}

fn receiver_type_name(ty: &Type) -> Option<String> {
    match ty.deref() {
        Type::Named { name, .. } => Some(name.clone()),
        // generic receivers such as `App[T]`
        Type::Other(raw) => raw.split('[').next().map(|s| s.trim().to_string()),
        _ => None,
    }
}

fn collect_structs(decl: Node<'_>, src: &[u8], file: &str, out: &mut Vec<Struct>) {
    let mut cursor = decl.walk();
    let children: Vec<Node<'_>> = decl.children(&mut cursor).collect();
    let grouped = children.iter().any(|c| c.kind() == "(");
    let decl_comments = if grouped {
        Vec::new()
    } else {
        leading_comments(decl, src)
    };

    for spec in children.into_iter().filter(|c| c.kind() == "type_spec") {
        let (Some(name), Some(body)) = (
            spec.child_by_field_name("name"),
            spec.child_by_field_name("type"),
        ) else {
            continue;
        };
        if body.kind() != "struct_type" {
            continue;
        }
        let mut comments = leading_comments(spec, src);
        if comments.is_empty() {
            comments = decl_comments.clone();
        }
        out.push(Struct {
            name: text(name, src).to_string(),
            file: file.to_string(),
            comments,
            fields: parse_fields(body, src),
        });
    }
}

fn parse_fields(struct_type: Node<'_>, src: &[u8]) -> Vec<Arg> {
    let mut fields = Vec::new();
    let mut cursor = struct_type.walk();
    let Some(list) = struct_type
        .named_children(&mut cursor)
        .find(|n| n.kind() == "field_declaration_list")
    else {
        return fields;
    };

    let mut list_cursor = list.walk();
    for decl in list.named_children(&mut list_cursor) {
        if decl.kind() != "field_declaration" {
            continue;
        }
        let Some(type_node) = decl.child_by_field_name("type") else {
            continue;
        };
        let mut ty = parse_type(type_node, src);
        let tag = decl
            .child_by_field_name("tag")
            .map(|t| string_literal(t, src))
            .unwrap_or_default();

        let mut inner = decl.walk();
        let names: Vec<String> = decl
            .children_by_field_name("name", &mut inner)
            .map(|n| text(n, src).to_string())
            .collect();

        if names.is_empty() {
            let mut star_cursor = decl.walk();
            let has_star = decl.children(&mut star_cursor).any(|c| c.kind() == "*");
            if has_star && !ty.star() {
                ty = Type::pointer(ty);
            }
            fields.push(Arg::new("", ty).with_tag(tag));
        } else {
            for name in names {
                fields.push(Arg::new(name, ty.clone()).with_tag(tag.clone()));
            }
        }
    }
    fields
}
