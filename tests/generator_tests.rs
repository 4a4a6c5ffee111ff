#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::fixtures::{ADMIN, APP, BASE, CORE};
use common::go_project::GoProject;
use handlergen::config::Config;
use handlergen::generator::{
    generate_handlers, route_table, scan, GenerationReport, HandlerOptions, GENERATED_HEADER,
};
use handlergen::DiagnosticKind;
use std::fs;

fn project() -> GoProject {
    let project = GoProject::new();
    project
        .write("core/core.go", CORE)
        .write("base/base.go", BASE)
        .write("controllers/app.go", APP)
        .write("controllers/admin.go", ADMIN);
    project
}

fn options(project: &GoProject) -> HandlerOptions {
    HandlerOptions::new(
        project.path("controllers"),
        project.path("assets/handlers"),
        "handlers",
    )
}

fn generate(project: &GoProject) -> GenerationReport {
    generate_handlers(&options(project)).unwrap()
}

#[test]
fn test_full_pipeline_writes_every_package() {
    let project = project();
    let report = generate(&project);

    assert_eq!(report.files.len(), 7);
    assert_eq!(
        project.files_under("assets/handlers"),
        vec![
            "admin.go",
            "app.go",
            "example.com/app/base/controller.go",
            "example.com/app/base/init.go",
            "example.com/app/core/core.go",
            "example.com/app/core/init.go",
            "init.go",
        ]
    );
    for file in &report.files {
        let contents = fs::read_to_string(file).unwrap();
        assert!(contents.starts_with(GENERATED_HEADER), "{}", file.display());
    }
}

#[test]
fn test_recoverable_problems_are_reported_not_fatal() {
    let project = project();
    let report = generate(&project);

    let mut kinds: Vec<_> = report.diagnostics.iter().map(|d| d.kind).collect();
    kinds.sort_by_key(|k| k.as_str());
    assert_eq!(
        kinds,
        vec![
            DiagnosticKind::BindTypeMismatch,
            DiagnosticKind::HookSignature,
            DiagnosticKind::UnknownRouteMethod,
            DiagnosticKind::UnsupportedParameter,
        ]
    );
    let unsupported = report
        .diagnostics
        .iter()
        .find(|d| d.kind == DiagnosticKind::UnsupportedParameter)
        .unwrap();
    assert!(unsupported.location.ends_with("app.go:App.Broken"));

    let app = project.read("assets/handlers/app.go");
    assert!(!app.contains("Broken"));
    assert!(app.contains("func (t App) Show("));
    assert!(app.contains("\tc.Name = ctr\n"));
    assert!(!app.contains("c.Bad"));
}

#[test]
fn test_hooks_run_ancestors_first() {
    let project = project();
    generate(&project);
    let app = project.read("assets/handlers/app.go");

    let show = &app[app.find("func (t App) Show(").unwrap()..];
    let show = &show[..show.find("\n}\n").unwrap()];

    let core_before = show.find("if !c.Controller.Core.Before(w, r) {").unwrap();
    let base_before = show
        .find("if h := http.Handler(c.Controller.Before(w, r, a)); h != nil {")
        .unwrap();
    let call = show
        .find("h = c.Show(paramInt64(r.Form, \"id\"), paramStrings(r.Form, \"fields\"))")
        .unwrap();
    let base_after = show.find("if !c.Controller.After(w, r) {").unwrap();
    let own_after = show.find("if !c.After(w, r) {").unwrap();
    assert!(core_before < base_before);
    assert!(base_before < call);
    assert!(call < base_after);
    assert!(base_after < own_after);

    // App.Before has the wrong result type and is never called
    assert!(!show.contains("c.Before("));
    assert!(show.contains("\ta := []string{r.Form.Get(\"id\"), r.Form.Get(\"fields\")}\n"));
}

#[test]
fn test_parent_packages_are_wired_together() {
    let project = project();
    generate(&project);

    let app = project.read("assets/handlers/app.go");
    assert!(app.contains("\tc0 \"example.com/app/assets/handlers/example.com/app/base\"\n"));
    assert!(app.contains("\tc.Controller = c0.Controller{}.New(w, r, ctr, act)\n"));

    let base = project.read("assets/handlers/example.com/app/base/controller.go");
    assert!(base.contains("package base\n"));
    assert!(base.contains("\tc.Core = c0.Core{}.New(w, r, ctr, act)\n"));
    assert!(base.contains("\tc.Request = r\n"));

    let root_init = project.read("assets/handlers/init.go");
    assert!(root_init.contains("func Init() {\n\tc0.Init()\n}\n"));
    assert!(root_init.contains("\troutes = append(routes, Admin{}.Routes()...)\n\troutes = append(routes, App{}.Routes()...)\n"));

    let base_init = project.read("assets/handlers/example.com/app/base/init.go");
    assert!(base_init.contains("func Init() {\n\tc0.Init()\n\tcontr.Init()\n}\n"));
}

#[test]
fn test_route_prefixes_follow_the_embedding_chain() {
    let project = project();
    let (_, resolution) = scan(&options(&project)).unwrap();
    let routes: Vec<(String, String, String)> = route_table(&resolution)
        .into_iter()
        .map(|e| (e.route.handler_name, e.route.method.to_string(), e.route.pattern))
        .collect();

    let has = |handler: &str, method: &str, pattern: &str| {
        routes
            .iter()
            .any(|(h, m, p)| h == handler && m == method && p == pattern)
    };
    assert!(has("Core.Health", "GET", "/health"));
    assert!(has("Controller.List", "GET", "/list"));
    assert!(has("Controller.Save", "POST", "/api/save"));
    assert!(has("App.Index", "GET", "App/Index"));
    assert!(has("App.Show", "GET", "/users/:id"));
    assert!(has("Admin.Dashboard", "GET", "/admin"));
    assert_eq!(
        routes.iter().filter(|(h, _, _)| h == "App.Submit").count(),
        9
    );
}

#[test]
fn test_tag_prefixes_with_different_methods_across_three_levels() {
    let project = GoProject::new();
    project
        .write(
            "core/core.go",
            r#"package core

import "net/http"

type Core struct{}

//@post /save
func (c *Core) Save() http.Handler { return nil }

//@get /health
func (c *Core) Health() http.Handler { return nil }
"#,
        )
        .write(
            "base/base.go",
            r#"package base

import (
	"net/http"

	"example.com/app/core"
)

type Base struct {
	*core.Core `@route:"/b"`
}

//@get /list
func (c *Base) List() http.Handler { return nil }
"#,
        )
        .write(
            "controllers/app.go",
            r#"package controllers

import (
	"net/http"

	"example.com/app/base"
)

type App struct {
	*base.Base `@get:"/a"`
}

//@get /
func (c *App) Home() http.Handler { return nil }
"#,
        );

    let report = generate(&project);
    assert!(report.diagnostics.is_empty());

    let core = project.read("assets/handlers/example.com/app/core/core.go");
    assert!(core.contains("{Method: \"POST\", Pattern: \"/b/save\""));
    assert!(core.contains("{Method: \"GET\", Pattern: \"/a/b/health\""));
    assert!(!core.contains("Pattern: \"/save\""));

    let base = project.read("assets/handlers/example.com/app/base/base.go");
    assert!(base.contains("{Method: \"GET\", Pattern: \"/a/list\""));
}

#[test]
fn test_skipped_embeddings_reach_the_report() {
    let project = GoProject::new();
    project.write(
        "controllers/app.go",
        r#"package controllers

import (
	"net/http"

	"example.com/app/missing"
)

type Base struct{}

//@get /ping
func (b *Base) Ping() http.Handler { return nil }

type App struct {
	*Base `@get:"/v1"`
	*missing.Parent
}

//@get /
func (c *App) Home() http.Handler { return nil }

type hidden struct{}

//@get /hidden
func (h *hidden) Show() http.Handler { return nil }
"#,
    );

    let report = generate(&project);
    let mut kinds: Vec<_> = report.diagnostics.iter().map(|d| d.kind).collect();
    kinds.sort_by_key(|k| k.as_str());
    assert_eq!(
        kinds,
        vec![
            DiagnosticKind::IgnoredPrefix,
            DiagnosticKind::UnexportedController,
            DiagnosticKind::UnresolvedEmbedding,
        ]
    );
    assert_eq!(project.files_under("assets/handlers"), vec!["app.go", "base.go", "init.go"]);
    assert!(!project.read("assets/handlers/init.go").contains("hidden"));
}

#[test]
fn test_configured_prefixes_and_markers() {
    let project = GoProject::new();
    project
        .write(
            "web/web.go",
            "package web\n\nimport \"net/http\"\n\ntype Result interface {\n\thttp.Handler\n}\n",
        )
        .write(
            "controllers/app.go",
            r#"package controllers

import (
	"net/http"

	"example.com/app/web"
)

type App struct{}

//@post /items
func (c *App) Create() web.Result { return nil }

//@get /legacy
func (c *App) Legacy() http.Handler { return nil }
"#,
        )
        .write(
            "handlergen.toml",
            r#"
strconv_import = "example.com/app/strconv"

[markers.action]
import = "example.com/app/web"
name = "Result"

[[prefixes]]
method = "route"
path = "/v2"
"#,
        );

    let config = Config::load(&project.path("handlergen.toml")).unwrap();
    let mut options = options(&project);
    options.markers = config.markers.clone();
    options.prefixes = config.prefixes().unwrap();
    options.strconv_import = config.strconv_import.clone();

    generate_handlers(&options).unwrap();
    let app = project.read("assets/handlers/app.go");
    assert!(app.contains("Pattern: \"/v2/items\""));
    // http.Handler is not the configured marker any more
    assert!(!app.contains("Legacy"));
    assert!(!project.read("assets/handlers/init.go").contains("strconv"));
}

#[test]
fn test_regeneration_is_byte_identical() {
    let project = project();
    let first = generate(&project);
    let snapshot: Vec<Vec<u8>> = first.files.iter().map(|f| fs::read(f).unwrap()).collect();

    let second = generate(&project);
    assert_eq!(first.files, second.files);
    let again: Vec<Vec<u8>> = second.files.iter().map(|f| fs::read(f).unwrap()).collect();
    assert_eq!(snapshot, again);
}

#[test]
fn test_unparsable_source_is_fatal() {
    let project = GoProject::new();
    project.write("controllers/app.go", "package controllers\n\nfunc (c *App {\n");
    let err = generate_handlers(&options(&project)).unwrap_err();
    assert!(format!("{err:#}").contains("app.go"));
    assert!(!project.path("assets/handlers").exists());
}

#[test]
fn test_import_cycle_is_fatal() {
    let project = GoProject::new();
    project
        .write(
            "a/a.go",
            r#"package a

import (
	"net/http"

	"example.com/app/b"
)

type A struct {
	*b.B
}

func (x *A) Index() http.Handler { return nil }
"#,
        )
        .write(
            "b/b.go",
            r#"package b

import (
	"net/http"

	"example.com/app/a"
)

type B struct {
	*a.A
}

func (x *B) Index() http.Handler { return nil }
"#,
        );
    let options = HandlerOptions::new(project.path("a"), project.path("out"), "handlers");
    let err = generate_handlers(&options).unwrap_err();
    assert!(format!("{err:#}").contains("import cycle"));
}
