//! # Graph Module
//!
//! Resolves the controllers of a package together with the parent
//! controllers they embed, across package boundaries.
//!
//! ## Overview
//!
//! A [`Resolver`] is the context of one generation run. It owns an arena of
//! scanned packages indexed by import path, the set of packages currently
//! being scanned and the diagnostics collector. Nothing survives the run:
//! [`Resolver::finish`] hands the arena over as a [`Resolution`].
//!
//! For every package the resolver
//!
//! 1. extracts the model and classifies every struct, keeping those with at
//!    least one action as [`Controller`]s
//! 2. validates `bind:"..."` fields
//! 3. follows anonymous pointer embeddings into other packages (recursively,
//!    memoized by import path) and records embedded controllers as
//!    [`Parent`]s
//!
//! Packages are pushed into the arena once they are complete, so every
//! package appears after the packages its controllers embed.
//!
//! ## Cycles
//!
//! Reaching a package that is still being scanned is an import cycle and
//! aborts the run. A struct-level embedding cycle inside one package is
//! reported the same way by [`Resolution::all_parents`].

use crate::classify::{marker_alias, Classifier, HookMethod, Markers};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::imports::ImportLocator;
use crate::model::{extract_package, is_exported, parse_tag, Arg, Func, Package, Struct, Type};
use crate::routes::{action_routes, nest_prefixes, parse_prefixes, Prefix, Route};
use anyhow::{bail, Context, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};


/// Value a `bind:"..."` field receives in generated code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BindKind {
    Request,
    Response,
    Controller,
    Action,
}

impl BindKind {
    pub fn parse(value: &str) -> Option<BindKind> {
        match value {
            "request" => Some(BindKind::Request),
            "response" => Some(BindKind::Response),
            "controller" => Some(BindKind::Controller),
            "action" => Some(BindKind::Action),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BindKind::Request => "request",
            BindKind::Response => "response",
            BindKind::Controller => "controller",
            BindKind::Action => "action",
        }
    }

    /// Whether `field` has the type this kind is injected as.
    fn accepts(&self, field: &Arg, package: &Package, file: &str, markers: &Markers) -> bool {
        let marker = match self {
            BindKind::Request => &markers.request,
            BindKind::Response => &markers.response_writer,
            BindKind::Controller | BindKind::Action => {
                return field.ty == Type::named("string");
            }
        };
        marker_alias(package, file, marker).is_some_and(|alias| marker.matches_type(&field.ty, &alias))
    }
}

impl fmt::Display for BindKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A struct field that receives a per-request value
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BindField {
    pub name: String,
    pub kind: BindKind,
}

/// A controller embedded by another controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parent {
    /// Alias number of the parent's generated package, `None` for parents
    /// declared in the same package as the child
    pub id: Option<usize>,
    /// Import path of the package declaring the parent
    pub import: String,
    /// Struct name of the parent, also the embedded field name
    pub name: String,
    /// Arena index of the parent's package
    pub package: usize,
}

impl Parent {
    /// Alias of the parent's generated package in emitted code.
    pub fn alias(&self) -> Option<String> {
        self.id.map(|id| format!("c{id}"))
    }
}

/// A struct with at least one action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controller {
    pub name: String,
    pub file: String,
    pub comments: Vec<String>,
    pub actions: Vec<Func>,
    pub before: Option<HookMethod>,
    pub after: Option<HookMethod>,
    /// Direct parents in field declaration order
    pub parents: Vec<Parent>,
    pub fields: Vec<BindField>,
    /// One route list per action, parallel to `actions`
    pub routes: Vec<Vec<Route>>,
}

impl Controller {
    /// Every route of every action, in action order.
    pub fn all_routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().flatten()
    }
}

/// One flattened ancestor of a controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ancestor {
    pub parent: Parent,
    /// Field selector from the controller down to this ancestor,
    /// e.g. `Controller.Base`
    pub access: String,
}

/// A package scanned during the run
#[derive(Debug, Clone)]
pub struct ScannedPackage {
    /// Import path, or the directory when no import path is known
    pub import_path: String,
    pub dir: PathBuf,
    pub package: Package,
    /// Controllers by struct name
    pub controllers: BTreeMap<String, Controller>,
    /// Route prefixes active while the package was first scanned
    pub prefixes: Vec<Prefix>,
    /// Parent import path → generated alias number
    pub parent_ids: BTreeMap<String, usize>,
}

impl ScannedPackage {
    /// Non-local parent packages in alias order.
    pub fn parent_imports(&self) -> Vec<(usize, &str)> {
        let mut imports: Vec<_> = self
            .parent_ids
            .iter()
            .map(|(import, id)| (*id, import.as_str()))
            .collect();
        imports.sort_unstable();
        imports
    }
}

/// Per-run resolution context
pub struct Resolver<'a> {
    locator: &'a ImportLocator,
    markers: &'a Markers,
    diagnostics: Diagnostics,
    packages: Vec<ScannedPackage>,
    index: HashMap<String, usize>,
    in_progress: HashSet<String>,
}

impl<'a> Resolver<'a> {
    pub fn new(locator: &'a ImportLocator, markers: &'a Markers) -> Self {
        Resolver {
            locator,
            markers,
            diagnostics: Diagnostics::new(),
            packages: Vec::new(),
            index: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    /// Scan the package in `dir` with `prefixes` active.
    pub fn resolve_dir(&mut self, dir: &Path, prefixes: &[Prefix]) -> Result<usize> {
        let key = self
            .locator
            .import_for(dir)
            .unwrap_or_else(|| dir.display().to_string());
        self.resolve(key, dir, prefixes)
    }

    /// Scan the package `import`, or `None` when it cannot be located.
    pub fn resolve_import(&mut self, import: &str, prefixes: &[Prefix]) -> Result<Option<usize>> {
        if let Some(&idx) = self.index.get(import) {
            return Ok(Some(idx));
        }
        let Some(dir) = self.locator.dir_for(import) else {
            return Ok(None);
        };
        self.resolve(import.to_string(), &dir, prefixes).map(Some)
    }

    fn resolve(&mut self, key: String, dir: &Path, prefixes: &[Prefix]) -> Result<usize> {
        if let Some(&idx) = self.index.get(&key) {
            tracing::debug!(import = %key, "package already scanned");
            return Ok(idx);
        }
        if self.in_progress.contains(&key) {
            bail!("import cycle: package {key} embeds controllers from a package that imports it");
        }
        self.in_progress.insert(key.clone());
        tracing::debug!(import = %key, dir = %dir.display(), "scanning package");

        let package = extract_package(dir)
            .with_context(|| format!("Failed to scan package {key}"))?;
        let mut controllers = self.collect_controllers(&package, prefixes);
        let local: HashSet<String> = controllers.keys().cloned().collect();
        let mut parent_ids = BTreeMap::new();

        for controller in controllers.values_mut() {
            let Some(decl) = package.find_struct(&controller.name) else {
                continue;
            };
            controller.parents =
                self.resolve_parents(&package, decl, &key, &local, prefixes, &mut parent_ids)?;
        }

        // dependencies are in the arena now, so this package's slot is known
        let idx = self.packages.len();
        for parent in controllers.values_mut().flat_map(|c| c.parents.iter_mut()) {
            if parent.id.is_none() {
                parent.package = idx;
            }
        }

        self.in_progress.remove(&key);
        tracing::debug!(
            import = %key,
            controllers = controllers.len(),
            "package resolved"
        );
        self.packages.push(ScannedPackage {
            import_path: key.clone(),
            dir: dir.to_path_buf(),
            package,
            controllers,
            prefixes: prefixes.to_vec(),
            parent_ids,
        });
        self.index.insert(key, idx);
        Ok(idx)
    }

    /// Classify every struct of `package` and keep the controllers.
    fn collect_controllers(&mut self, package: &Package, prefixes: &[Prefix]) -> BTreeMap<String, Controller> {
        let mut classifier = Classifier::new(package, self.markers);
        let mut controllers = BTreeMap::new();

        for decl in &package.structs {
            let classified = classifier.classify(&decl.name, &mut self.diagnostics);
            if classified.actions.is_empty() {
                continue;
            }
            if !is_exported(&decl.name) {
                self.diagnostics.warn(
                    format!("{}:{}", decl.file, decl.name),
                    DiagnosticKind::UnexportedController,
                    "struct has actions but is not exported, controller skipped",
                );
                continue;
            }
            let routes = classified
                .actions
                .iter()
                .map(|action| action_routes(&decl.name, action, prefixes, &mut self.diagnostics))
                .collect();
            let fields = self.bind_fields(package, decl);
            controllers.insert(
                decl.name.clone(),
                Controller {
                    name: decl.name.clone(),
                    file: decl.file.clone(),
                    comments: decl.comments.clone(),
                    actions: classified.actions,
                    before: classified.before,
                    after: classified.after,
                    parents: Vec::new(),
                    fields,
                    routes,
                },
            );
        }
        controllers
    }

    fn bind_fields(&mut self, package: &Package, decl: &Struct) -> Vec<BindField> {
        let mut fields = Vec::new();
        for field in decl.fields.iter().filter(|f| !f.is_embedded() && !f.tag.is_empty()) {
            let location = format!("{}:{}.{}", decl.file, decl.name, field.name);
            let tag = match parse_tag(&field.tag) {
                Ok(tag) => tag,
                Err(e) => {
                    self.diagnostics.warn(
                        location,
                        DiagnosticKind::MalformedTag,
                        format!("cannot parse tag `{}`: {e}", field.tag),
                    );
                    continue;
                }
            };
            let Some(value) = tag.get("bind") else {
                continue;
            };
            let Some(kind) = BindKind::parse(value) else {
                self.diagnostics.warn(
                    location,
                    DiagnosticKind::UnknownBindKind,
                    format!("unknown bind value `{value}`, field ignored"),
                );
                continue;
            };
            if !kind.accepts(field, package, &decl.file, self.markers) {
                self.diagnostics.warn(
                    location,
                    DiagnosticKind::BindTypeMismatch,
                    format!("field of type `{}` cannot be bound as {kind}, field ignored", field.ty),
                );
                continue;
            }
            fields.push(BindField {
                name: field.name.clone(),
                kind,
            });
        }
        fields
    }

    /// Direct parents of `decl` in field declaration order.
    ///
    /// Parents from other packages are scanned on the way. Same-package
    /// parents get no alias and are pointed at this package by the caller.
    fn resolve_parents(
        &mut self,
        package: &Package,
        decl: &Struct,
        own_key: &str,
        local: &HashSet<String>,
        prefixes: &[Prefix],
        parent_ids: &mut BTreeMap<String, usize>,
    ) -> Result<Vec<Parent>> {
        let location = format!("{}:{}", decl.file, decl.name);
        let mut parents = Vec::new();

        for field in decl.fields.iter().filter(|f| f.is_embedded()) {
            if !field.ty.star() {
                tracing::debug!(%location, embedded = %field.ty, "non-pointer embedding ignored");
                continue;
            }
            let Some(name) = field.ty.name() else {
                continue;
            };
            let import = field
                .ty
                .package()
                .and_then(|alias| package.import_of(&decl.file, alias))
                .filter(|import| *import != own_key);

            let Some(import) = import else {
                if local.contains(name) {
                    if !parse_prefixes(&field.tag, &location, &mut self.diagnostics).is_empty() {
                        self.diagnostics.warn(
                            location.clone(),
                            DiagnosticKind::IgnoredPrefix,
                            format!(
                                "route prefixes on the same-package embedding of {name} are ignored, \
                                 its routes come from the package prefixes"
                            ),
                        );
                    }
                    parents.push(Parent {
                        id: None,
                        import: own_key.to_string(),
                        name: name.to_string(),
                        package: usize::MAX,
                    });
                }
                continue;
            };

            let declared = parse_prefixes(&field.tag, &location, &mut self.diagnostics);
            let nested = nest_prefixes(prefixes, &declared);
            let Some(idx) = self.resolve_import(import, &nested)? else {
                if import.split('/').next().is_some_and(|host| host.contains('.')) {
                    self.diagnostics.warn(
                        location.clone(),
                        DiagnosticKind::UnresolvedEmbedding,
                        format!("cannot locate package {import} of embedded {}, embedding skipped", field.ty),
                    );
                } else {
                    tracing::debug!(%location, import, "standard library embedding skipped");
                }
                continue;
            };
            if !self.packages[idx].controllers.contains_key(name) {
                tracing::debug!(%location, embedded = %field.ty, "embedded type is not a controller");
                continue;
            }

            let next_id = parent_ids.len();
            let id = *parent_ids.entry(import.to_string()).or_insert(next_id);
            parents.push(Parent {
                id: Some(id),
                import: import.to_string(),
                name: name.to_string(),
                package: idx,
            });
        }
        Ok(parents)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// End the run, handing over the arena.
    pub fn finish(self, root: usize) -> Resolution {
        Resolution {
            packages: self.packages,
            root,
            diagnostics: self.diagnostics,
        }
    }
}

/// Scan `dir` and everything its controllers embed.
pub fn resolve(
    dir: &Path,
    prefixes: &[Prefix],
    locator: &ImportLocator,
    markers: &Markers,
) -> Result<Resolution> {
    let mut resolver = Resolver::new(locator, markers);
    let root = resolver.resolve_dir(dir, prefixes)?;
    Ok(resolver.finish(root))
}

/// Outcome of a run: the package arena and the collected diagnostics
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Packages, each after every package it embeds controllers from
    pub packages: Vec<ScannedPackage>,
    pub root: usize,
    pub diagnostics: Diagnostics,
}

impl Resolution {
    pub fn root_package(&self) -> &ScannedPackage {
        &self.packages[self.root]
    }

    pub fn controller(&self, package: usize, name: &str) -> Option<&Controller> {
        self.packages.get(package)?.controllers.get(name)
    }

    /// Every ancestor of a controller, each after its own ancestors.
    pub fn all_parents(&self, package: usize, name: &str) -> Result<Vec<Ancestor>> {
        let mut out = Vec::new();
        let mut stack = vec![(package, name.to_string())];
        self.flatten(package, name, "", &mut stack, &mut out)?;
        Ok(out)
    }

    fn flatten(
        &self,
        package: usize,
        name: &str,
        prefix: &str,
        stack: &mut Vec<(usize, String)>,
        out: &mut Vec<Ancestor>,
    ) -> Result<()> {
        let controller = self
            .controller(package, name)
            .with_context(|| format!("unknown controller {name}"))?;
        for parent in &controller.parents {
            let key = (parent.package, parent.name.clone());
            if stack.contains(&key) {
                let chain: Vec<_> = stack.iter().map(|(_, n)| n.as_str()).collect();
                bail!(
                    "embedding cycle: {} embeds {} again",
                    chain.join(" -> "),
                    parent.name
                );
            }
            let access = if prefix.is_empty() {
                parent.name.clone()
            } else {
                format!("{prefix}.{}", parent.name)
            };
            stack.push(key);
            self.flatten(parent.package, &parent.name, &access, stack, out)?;
            stack.pop();
            out.push(Ancestor {
                parent: parent.clone(),
                access,
            });
        }
        Ok(())
    }
}
