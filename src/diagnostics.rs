//! Recoverable problems found while scanning controllers.
//!
//! A diagnostic never stops a generation run. The offending method, field
//! or route line is dropped from the model and the run carries on with a
//! best-effort result. Every diagnostic is logged through `tracing` at the
//! moment it is recorded and kept so callers (and tests) can inspect the
//! full list once the run is over.

use std::fmt;

/// Category of a recoverable problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Action parameter type is not a bindable primitive
    UnsupportedParameter,
    /// `//@<token>` comment or `@<token>:` tag with an unknown method
    UnknownRouteMethod,
    /// Bound field type does not match its `bind` tag value
    BindTypeMismatch,
    /// `bind` tag with a value that is not recognized
    UnknownBindKind,
    /// Reserved lifecycle name with a signature that cannot be called
    HookSignature,
    /// Struct tag that could not be parsed
    MalformedTag,
    /// Struct with actions whose name is not exported
    UnexportedController,
    /// Route prefix tag on an embedding that cannot carry one
    IgnoredPrefix,
    /// Embedded type from a package that cannot be located
    UnresolvedEmbedding,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::UnsupportedParameter => "unsupported_parameter",
            DiagnosticKind::UnknownRouteMethod => "unknown_route_method",
            DiagnosticKind::BindTypeMismatch => "bind_type_mismatch",
            DiagnosticKind::UnknownBindKind => "unknown_bind_kind",
            DiagnosticKind::HookSignature => "hook_signature",
            DiagnosticKind::MalformedTag => "malformed_tag",
            DiagnosticKind::UnexportedController => "unexported_controller",
            DiagnosticKind::IgnoredPrefix => "ignored_prefix",
            DiagnosticKind::UnresolvedEmbedding => "unresolved_embedding",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recoverable problem
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Diagnostic {
    /// Where the problem occurred, e.g. `controllers/app.go:App.Index`
    pub location: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(location: impl Into<String>, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            location: location.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.location, self.message)
    }
}

/// Collector owned by a single generation run
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem and log it as a warning.
    pub fn warn(&mut self, location: impl Into<String>, kind: DiagnosticKind, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(location, kind, message);
        tracing::warn!(
            location = %diagnostic.location,
            kind = %diagnostic.kind,
            "{}",
            diagnostic.message
        );
        self.items.push(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |d| d.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
