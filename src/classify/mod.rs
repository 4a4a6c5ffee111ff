//! # Classify Module
//!
//! Decides, per method, whether it is a request action, a lifecycle hook or
//! irrelevant.
//!
//! ## Actions
//!
//! A method is an action when all of the following hold:
//!
//! 1. its name is exported
//! 2. its file imports the action marker package (checked once per file)
//! 3. its first result is the marker type, qualified by that import's alias
//! 4. every parameter is a bindable primitive or a slice of one
//!
//! A method that fails rule 4 is reported as a diagnostic; the other rules
//! reject silently because most exported methods are simply not actions.
//!
//! ## Hooks
//!
//! `Before` and `After` are matched by name only and are never actions. Their
//! signature must be `(http.ResponseWriter, *http.Request[, []string])` with a
//! single `bool` or marker-typed result.

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::model::{Func, Package, Type};
use std::collections::HashMap;

pub mod markers;

pub use markers::{bindable_type_name, conversion_table, Hook, MarkerType, Markers, PRIMITIVES};

/// How generated code has to call a hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct HookShape {
    /// `true` when the hook returns the marker type, `false` for `bool`
    pub returns_handler: bool,
    /// `true` when the hook takes the trailing `[]string` argument
    pub forwards_args: bool,
}

/// A lifecycle hook method that passed the signature check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookMethod {
    pub hook: Hook,
    pub func: Func,
    pub shape: HookShape,
}

/// Methods of one struct, partitioned
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classified {
    pub actions: Vec<Func>,
    pub before: Option<HookMethod>,
    pub after: Option<HookMethod>,
}

/// Per-package classifier with a per-file cache of the action marker alias
pub struct Classifier<'a> {
    package: &'a Package,
    markers: &'a Markers,
    action_aliases: HashMap<String, Option<String>>,
}

impl<'a> Classifier<'a> {
    pub fn new(package: &'a Package, markers: &'a Markers) -> Self {
        Classifier {
            package,
            markers,
            action_aliases: HashMap::new(),
        }
    }

    /// Build the action predicate for this package.
    pub fn action_filter<'s>(
        &'s mut self,
        diags: &'s mut Diagnostics,
    ) -> Box<dyn FnMut(&Func) -> bool + 's> {
        Box::new(move |func: &Func| self.is_action(func, diags))
    }

    pub fn is_action(&mut self, func: &Func, diags: &mut Diagnostics) -> bool {
        if Hook::is_reserved(func) || !func.is_exported() {
            return false;
        }
        let Some(alias) = self.action_alias(&func.file) else {
            return false;
        };
        let Some(first) = func.results.first() else {
            return false;
        };
        if !self.markers.action.matches_type(&first.ty, &alias) {
            return false;
        }
        if let Some(param) = func.params.iter().find(|p| bindable_type_name(&p.ty).is_none()) {
            diags.warn(
                func_location(func),
                DiagnosticKind::UnsupportedParameter,
                format!(
                    "parameter `{}` of type `{}` cannot be bound from a request; method is not an action",
                    param.name, param.ty
                ),
            );
            return false;
        }
        true
    }

    /// Signature check for a method already matched by hook name.
    pub fn hook_shape(&mut self, func: &Func) -> Option<HookShape> {
        let writer = marker_alias(self.package, &func.file, &self.markers.response_writer)?;
        let request = marker_alias(self.package, &func.file, &self.markers.request)?;

        let head_ok = |params: &[crate::model::Arg]| {
            self.markers
                .response_writer
                .matches_type(&params[0].ty, &writer)
                && self.markers.request.matches_type(&params[1].ty, &request)
        };
        let forwards_args = match func.params.as_slice() {
            params @ [_, _] if head_ok(params) => false,
            params @ [_, _, args]
                if head_ok(params) && args.ty == Type::slice(Type::named("string")) =>
            {
                true
            }
            _ => return None,
        };

        let [result] = func.results.as_slice() else {
            return None;
        };
        let returns_handler = if result.ty == Type::named("bool") {
            false
        } else {
            let alias = self.action_alias(&func.file)?;
            if !self.markers.action.matches_type(&result.ty, &alias) {
                return None;
            }
            true
        };

        Some(HookShape {
            returns_handler,
            forwards_args,
        })
    }

    /// Partition the methods of `type_name` into actions and hooks.
    pub fn classify(&mut self, type_name: &str, diags: &mut Diagnostics) -> Classified {
        let methods = self.package.methods_of(type_name);
        let mut out = Classified::default();

        {
            let mut is_action = self.action_filter(diags);
            out.actions = methods.iter().filter(|&f| is_action(f)).cloned().collect();
        }

        for func in methods {
            let Some(hook) = Hook::from_name(&func.name) else {
                continue;
            };
            match self.hook_shape(func) {
                Some(shape) => {
                    let slot = match hook {
                        Hook::Before => &mut out.before,
                        Hook::After => &mut out.after,
                    };
                    *slot = Some(HookMethod {
                        hook,
                        func: func.clone(),
                        shape,
                    });
                }
                None => diags.warn(
                    func_location(func),
                    DiagnosticKind::HookSignature,
                    format!(
                        "{hook} must take (http.ResponseWriter, *http.Request[, []string]) and return bool or the action result type; hook ignored"
                    ),
                ),
            }
        }
        out
    }

    fn action_alias(&mut self, file: &str) -> Option<String> {
        if let Some(cached) = self.action_aliases.get(file) {
            return cached.clone();
        }
        let alias = marker_alias(self.package, file, &self.markers.action);
        if alias.is_none() {
            tracing::debug!(
                file,
                marker = %self.markers.action.import,
                "file does not import the action marker package, its methods are skipped"
            );
        }
        self.action_aliases.insert(file.to_string(), alias.clone());
        alias
    }
}

/// Alias under which `file` imports the package of `marker`.
pub fn marker_alias(package: &Package, file: &str, marker: &MarkerType) -> Option<String> {
    package
        .imports
        .get(file)?
        .iter()
        .find(|(_, path)| marker.matches_import(path))
        .map(|(alias, _)| alias.clone())
}

/// `file:Type.Method` location used in diagnostics.
pub fn func_location(func: &Func) -> String {
    let receiver = func
        .recv
        .as_ref()
        .and_then(|r| r.ty.name().map(str::to_string))
        .unwrap_or_default();
    if receiver.is_empty() {
        format!("{}:{}", func.file, func.name)
    } else {
        format!("{}:{}.{}", func.file, receiver, func.name)
    }
}
