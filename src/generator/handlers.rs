//! Handler generation
//!
//! Turns a [`Resolution`] into Go source: one file per controller plus an
//! `init.go` per generated package. The root package is written to the
//! output directory itself; every other package that contributes parent
//! controllers gets its own directory `<output>/<import path>/`.

use super::templates::{snake_case, Templates, HANDLER_TEMPLATE, INIT_TEMPLATE};
use crate::classify::{bindable_type_name, conversion_table, HookMethod, Markers, PRIMITIVES};
use crate::diagnostics::Diagnostic;
use crate::graph::{resolve, BindKind, Controller, Resolution, ScannedPackage};
use crate::imports::{ImportLocator, ImportRoot};
use crate::routes::{join_path, Prefix, Route};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Header line of every generated file
pub const GENERATED_HEADER: &str = "// Code generated by handlergen. DO NOT EDIT.";

/// Identifiers declared by generated packages that controllers must not reuse
const RESERVED_CONTROLLER_NAMES: &[&str] = &["Init", "Route", "Routes"];
/// Dispatcher methods that actions must not shadow
const RESERVED_ACTION_NAMES: &[&str] = &["New", "Routes"];

/// Everything a handler generation run needs
#[derive(Debug, Clone)]
pub struct HandlerOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Go package name of the root output package
    pub package: String,
    /// Import path of `output`, derived from `go.mod` when `None`
    pub output_import: Option<String>,
    /// Package with the conversion functions, generated locally when `None`
    pub strconv_import: Option<String>,
    pub prefixes: Vec<Prefix>,
    pub markers: Markers,
    pub roots: Vec<ImportRoot>,
    pub templates_dir: Option<PathBuf>,
    pub dry_run: bool,
}

impl HandlerOptions {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, package: impl Into<String>) -> Self {
        HandlerOptions {
            input: input.into(),
            output: output.into(),
            package: package.into(),
            output_import: None,
            strconv_import: None,
            prefixes: Vec::new(),
            markers: Markers::default(),
            roots: Vec::new(),
            templates_dir: None,
            dry_run: false,
        }
    }
}

/// A rendered file, not yet written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Outcome of a generation run
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    /// Files written, or that would be written on a dry run
    pub files: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Scan `options.input` and everything it embeds, without rendering.
pub fn scan(options: &HandlerOptions) -> Result<(ImportLocator, Resolution)> {
    let locator = ImportLocator::discover(&options.input, &options.roots)?;
    let resolution = resolve(&options.input, &options.prefixes, &locator, &options.markers)
        .with_context(|| format!("Failed to resolve controllers in {}", options.input.display()))?;
    Ok((locator, resolution))
}

/// Full pipeline: scan, render and write.
///
/// # Errors
///
/// Unparsable sources, unresolvable import paths, template failures and
/// filesystem errors. Recoverable problems end up in the report instead.
pub fn generate_handlers(options: &HandlerOptions) -> Result<GenerationReport> {
    let (locator, resolution) = scan(options)?;
    let templates = Templates::load(options.templates_dir.as_deref())?;
    let files = render_handlers(&resolution, &locator, options, &templates)?;
    let written = write_files(&files, options.dry_run)?;
    Ok(GenerationReport {
        files: written,
        diagnostics: resolution.diagnostics.into_vec(),
    })
}

/// Render every generated package of `resolution`.
pub fn render_handlers(
    resolution: &Resolution,
    locator: &ImportLocator,
    options: &HandlerOptions,
    templates: &Templates,
) -> Result<Vec<GeneratedFile>> {
    let root = resolution.root_package();
    let root_import = locator.import_for(&options.input).with_context(|| {
        format!(
            "Cannot determine the Go import path of {}; add a go.mod or a [[roots]] entry",
            options.input.display()
        )
    })?;

    let packages = generated_packages(resolution);
    let output_import = if packages.len() > 1 {
        let import = options
            .output_import
            .clone()
            .or_else(|| locator.import_for(&options.output))
            .with_context(|| {
                format!(
                    "Cannot determine the Go import path of {}; set [handlers] output_import",
                    options.output.display()
                )
            })?;
        Some(import)
    } else {
        options.output_import.clone()
    };

    if root.controllers.is_empty() {
        tracing::info!(input = %options.input.display(), "no controllers found");
    }

    let mut files = Vec::new();
    for idx in packages {
        let scanned = &resolution.packages[idx];
        let is_root = idx == resolution.root;
        let target = PackageTarget {
            dir: if is_root {
                options.output.clone()
            } else {
                options.output.join(&scanned.import_path)
            },
            name: if is_root {
                options.package.clone()
            } else {
                scanned.package.name.clone()
            },
            controller_import: if is_root {
                root_import.clone()
            } else {
                scanned.import_path.clone()
            },
        };
        files.extend(render_package(
            resolution,
            idx,
            &target,
            output_import.as_deref(),
            options.strconv_import.as_deref(),
            templates,
        )?);
    }
    Ok(files)
}

/// Arena indexes of packages that get generated code, root first.
fn generated_packages(resolution: &Resolution) -> Vec<usize> {
    let mut out = vec![resolution.root];
    out.extend(
        (0..resolution.packages.len())
            .filter(|&idx| idx != resolution.root && !resolution.packages[idx].controllers.is_empty()),
    );
    out
}

struct PackageTarget {
    dir: PathBuf,
    name: String,
    controller_import: String,
}

fn render_package(
    resolution: &Resolution,
    idx: usize,
    target: &PackageTarget,
    output_import: Option<&str>,
    strconv_import: Option<&str>,
    templates: &Templates,
) -> Result<Vec<GeneratedFile>> {
    let scanned = &resolution.packages[idx];
    let parent_import = |import: &str| -> Result<String> {
        let base = output_import.context("Generated packages need an output import path")?;
        Ok(join_path(&[base, import]))
    };

    let mut files = Vec::new();
    let mut names = BTreeSet::from(["init.go".to_string()]);
    let mut controllers = Vec::new();

    for controller in scanned.controllers.values() {
        check_names(controller, scanned)?;
        let file_name = format!("{}.go", snake_case(&controller.name));
        if !names.insert(file_name.clone()) {
            bail!(
                "Controller {} of {} would overwrite the generated file {file_name}",
                controller.name,
                scanned.import_path
            );
        }

        let view = controller_view(resolution, idx, controller, strconv_import)?;
        let mut imports = BTreeMap::new();
        imports.insert("contr".to_string(), target.controller_import.clone());
        for parent in &controller.parents {
            if let Some(alias) = parent.alias() {
                imports.insert(alias, parent_import(&parent.import)?);
            }
        }
        if let (true, Some(path)) = (view.uses_conv, strconv_import) {
            imports.insert("conv".to_string(), path.to_string());
        }

        let ctx = HandlerContext {
            header: GENERATED_HEADER,
            package: &target.name,
            base_imports: BTreeMap::from([("http", "net/http")]),
            imports,
            controller: view,
        };
        let contents = templates.render(HANDLER_TEMPLATE, &ctx)?;
        files.push(GeneratedFile {
            path: target.dir.join(file_name),
            contents,
        });
        controllers.push(controller.name.as_str());
    }

    let mut imports = BTreeMap::new();
    for (id, import) in scanned.parent_imports() {
        imports.insert(format!("c{id}"), parent_import(import)?);
    }
    let init_func = scanned
        .package
        .find_func("Init")
        .is_some_and(|f| f.params.is_empty() && f.results.is_empty());
    if init_func {
        imports.insert("contr".to_string(), target.controller_import.clone());
    }
    let helpers = if strconv_import.is_none() {
        imports.insert("strconv".to_string(), "strconv".to_string());
        imports.insert("url".to_string(), "net/url".to_string());
        conversion_helpers()
    } else {
        Vec::new()
    };
    let ctx = InitContext {
        header: GENERATED_HEADER,
        package: &target.name,
        base_imports: BTreeMap::from([("http", "net/http")]),
        imports,
        controllers,
        parent_ids: scanned.parent_imports().into_iter().map(|(id, _)| id).collect(),
        init_func,
        helpers,
    };
    files.push(GeneratedFile {
        path: target.dir.join("init.go"),
        contents: templates.render(INIT_TEMPLATE, &ctx)?,
    });
    Ok(files)
}

fn check_names(controller: &Controller, scanned: &ScannedPackage) -> Result<()> {
    if RESERVED_CONTROLLER_NAMES.contains(&controller.name.as_str()) {
        bail!(
            "Controller {} of {} clashes with a generated identifier; rename it",
            controller.name,
            scanned.import_path
        );
    }
    if let Some(action) = controller
        .actions
        .iter()
        .find(|a| RESERVED_ACTION_NAMES.contains(&a.name.as_str()))
    {
        bail!(
            "Action {}.{} of {} clashes with a generated dispatcher method; rename it",
            controller.name,
            action.name,
            scanned.import_path
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct HandlerContext<'a> {
    header: &'static str,
    package: &'a str,
    base_imports: BTreeMap<&'static str, &'static str>,
    /// alias → import path
    imports: BTreeMap<String, String>,
    controller: ControllerView,
}

#[derive(Serialize)]
struct InitContext<'a> {
    header: &'static str,
    package: &'a str,
    base_imports: BTreeMap<&'static str, &'static str>,
    imports: BTreeMap<String, String>,
    controllers: Vec<&'a str>,
    parent_ids: Vec<usize>,
    init_func: bool,
    helpers: Vec<ConversionHelper>,
}

#[derive(Debug, Serialize)]
struct ControllerView {
    name: String,
    comments: Vec<String>,
    /// Direct parents: `{ name, call }` where `call` is the dispatcher
    /// expression, `Base` or `c0.Base`
    parents: Vec<ParentView>,
    fields: Vec<FieldView>,
    /// Hook calls in execution order, ancestors first
    before: Vec<HookCall>,
    after: Vec<HookCall>,
    /// Some hook takes the raw parameter values
    needs_args: bool,
    actions: Vec<ActionView>,
    uses_conv: bool,
}

#[derive(Debug, Serialize)]
struct ParentView {
    name: String,
    call: String,
}

#[derive(Debug, Serialize)]
struct FieldView {
    name: String,
    kind: BindKind,
    value: &'static str,
}

#[derive(Debug, Serialize)]
struct HookCall {
    /// Receiver selector, `c` or `c.Controller.Base`
    receiver: String,
    returns_handler: bool,
    forwards_args: bool,
}

#[derive(Debug, Serialize)]
struct ActionView {
    name: String,
    comments: Vec<String>,
    params: Vec<ParamView>,
    /// Number of results after the first
    extra_results: usize,
    routes: Vec<RouteView>,
}

#[derive(Debug, Serialize)]
struct ParamView {
    name: String,
    ty: String,
    /// Conversion call without arguments, `paramInt` or `conv.Int`
    conv: String,
}

#[derive(Debug, Serialize)]
struct RouteView {
    method: String,
    pattern: String,
    label: String,
    handler_name: String,
}

impl From<&Route> for RouteView {
    fn from(route: &Route) -> Self {
        RouteView {
            method: route.method.as_str().to_string(),
            pattern: route.pattern.clone(),
            label: route.label.clone().unwrap_or_default(),
            handler_name: route.handler_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ConversionHelper {
    ty: &'static str,
    func: String,
    /// Go call parsing `s`, `None` for strings
    parser: Option<String>,
}

fn controller_view(
    resolution: &Resolution,
    package: usize,
    controller: &Controller,
    strconv_import: Option<&str>,
) -> Result<ControllerView> {
    let table = conversion_table();
    let ancestors = resolution.all_parents(package, &controller.name)?;

    let hook_call = |receiver: String, hook: &Option<HookMethod>| {
        hook.as_ref().map(|h| HookCall {
            receiver,
            returns_handler: h.shape.returns_handler,
            forwards_args: h.shape.forwards_args,
        })
    };
    let mut before = Vec::new();
    let mut after = Vec::new();
    for ancestor in &ancestors {
        let parent = resolution
            .controller(ancestor.parent.package, &ancestor.parent.name)
            .with_context(|| format!("unknown parent controller {}", ancestor.parent.name))?;
        before.extend(hook_call(format!("c.{}", ancestor.access), &parent.before));
        after.extend(hook_call(format!("c.{}", ancestor.access), &parent.after));
    }
    before.extend(hook_call("c".to_string(), &controller.before));
    after.extend(hook_call("c".to_string(), &controller.after));

    let mut uses_conv = false;
    let mut actions = Vec::new();
    for (action, routes) in controller.actions.iter().zip(&controller.routes) {
        let mut params = Vec::new();
        for param in &action.params {
            let ty = bindable_type_name(&param.ty)
                .with_context(|| format!("parameter {} of {} is not bindable", param.name, action.name))?;
            let func = table
                .get(&ty)
                .with_context(|| format!("no conversion function for {ty}"))?;
            uses_conv = true;
            params.push(ParamView {
                name: param.name.clone(),
                conv: match strconv_import {
                    Some(_) => format!("conv.{func}"),
                    None => format!("param{func}"),
                },
                ty,
            });
        }
        actions.push(ActionView {
            name: action.name.clone(),
            comments: action.comments.clone(),
            params,
            extra_results: action.results.len().saturating_sub(1),
            routes: routes.iter().map(RouteView::from).collect(),
        });
    }

    Ok(ControllerView {
        name: controller.name.clone(),
        comments: controller.comments.clone(),
        parents: controller
            .parents
            .iter()
            .map(|p| ParentView {
                name: p.name.clone(),
                call: match p.alias() {
                    Some(alias) => format!("{alias}.{}", p.name),
                    None => p.name.clone(),
                },
            })
            .collect(),
        fields: controller
            .fields
            .iter()
            .map(|f| FieldView {
                name: f.name.clone(),
                kind: f.kind,
                value: match f.kind {
                    BindKind::Request => "r",
                    BindKind::Response => "w",
                    BindKind::Controller => "ctr",
                    BindKind::Action => "act",
                },
            })
            .collect(),
        needs_args: before.iter().chain(&after).any(|h| h.forwards_args),
        before,
        after,
        actions,
        uses_conv,
    })
}

/// Parsers behind the locally generated `param<Func>` helpers.
fn conversion_helpers() -> Vec<ConversionHelper> {
    let table = conversion_table();
    PRIMITIVES
        .iter()
        .map(|&ty| {
            let bits = ty.trim_start_matches(|c: char| c.is_ascii_alphabetic());
            let bits = if bits.is_empty() { "0" } else { bits };
            let parser = match ty {
                "string" => None,
                "bool" => Some("strconv.ParseBool(s)".to_string()),
                t if t.starts_with("float") => Some(format!("strconv.ParseFloat(s, {bits})")),
                t if t.starts_with("uint") => Some(format!("strconv.ParseUint(s, 10, {bits})")),
                _ => Some(format!("strconv.ParseInt(s, 10, {bits})")),
            };
            ConversionHelper {
                ty,
                func: table.get(ty).cloned().unwrap_or_default(),
                parser,
            }
        })
        .collect()
}

/// Write rendered files, creating directories as needed.
///
/// On a dry run nothing is touched and the paths are only logged.
pub fn write_files(files: &[GeneratedFile], dry_run: bool) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(files.len());
    for file in files {
        if dry_run {
            tracing::info!(path = %file.path.display(), bytes = file.contents.len(), "would write");
        } else {
            write_file(&file.path, &file.contents)?;
            tracing::info!(path = %file.path.display(), "generated");
        }
        written.push(file.path.clone());
    }
    Ok(written)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

/// One row of the route table
#[derive(Debug, Clone, Serialize)]
pub struct RouteEntry {
    /// Import path of the controller package
    pub package: String,
    pub controller: String,
    #[serde(flatten)]
    pub route: Route,
}

/// Routes of every controller of every scanned package, root package last.
pub fn route_table(resolution: &Resolution) -> Vec<RouteEntry> {
    resolution
        .packages
        .iter()
        .flat_map(|scanned| {
            scanned.controllers.values().flat_map(move |controller| {
                controller.all_routes().map(move |route| RouteEntry {
                    package: scanned.import_path.clone(),
                    controller: controller.name.clone(),
                    route: route.clone(),
                })
            })
        })
        .collect()
}
