#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use std::fs;

const APP_GO: &str = r#"package controllers

import (
	"net/http"

	b "github.com/acme/shop/controllers/base"
	"github.com/acme/shop/models"
)

// App is the main controller.
// It serves the landing pages.
type App struct {
	*b.Controller `@get:"/api"`
	*Local
	Request *http.Request `bind:"request"`
	First, Last string
	Items []models.Item
}

type (
	// Hidden is a grouped type.
	Hidden struct{}
	Alias = string
)

func Init() {}

// Index renders the home page.
//@get /
func (c *App) Index(page int, tags []string) http.Handler {
	return nil
}

func (c App) Count(a, b int) (n int, err error) { // trailing comment
	return 0, nil
}

func (c *App) Variadic(xs ...string) http.Handler { return nil }
"#;

#[test]
fn test_package_name_and_funcs() {
    let pkg = parse_source("app.go", APP_GO).unwrap();
    assert_eq!(pkg.name, "controllers");
    assert_eq!(pkg.funcs.len(), 1);
    assert_eq!(pkg.funcs[0].name, "Init");
    assert!(pkg.funcs[0].recv.is_none());
}

#[test]
fn test_methods_grouped_by_receiver_regardless_of_pointer() {
    let pkg = parse_source("app.go", APP_GO).unwrap();
    let names: Vec<_> = pkg.methods_of("App").iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Index", "Count", "Variadic"]);
    let count = &pkg.methods_of("App")[1];
    assert_eq!(count.recv.as_ref().unwrap().ty, Type::named("App"));
}

#[test]
fn test_params_and_results() {
    let pkg = parse_source("app.go", APP_GO).unwrap();
    let index = &pkg.methods_of("App")[0];
    assert_eq!(index.params.len(), 2);
    assert_eq!(index.params[0], Arg::new("page", Type::named("int")));
    assert_eq!(index.params[1].ty, Type::slice(Type::named("string")));
    assert_eq!(index.results.len(), 1);
    assert_eq!(index.results[0].ty, Type::qualified("http", "Handler"));

    let count = &pkg.methods_of("App")[1];
    let names: Vec<_> = count.params.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(count.results.len(), 2);
    assert_eq!(count.results[1].name, "err");

    let variadic = &pkg.methods_of("App")[2];
    assert_eq!(variadic.params[0].ty.to_string(), "...string");
}

#[test]
fn test_comments_are_verbatim() {
    let pkg = parse_source("app.go", APP_GO).unwrap();
    let index = &pkg.methods_of("App")[0];
    assert_eq!(
        index.comments,
        vec!["// Index renders the home page.", "//@get /"]
    );
    let count = &pkg.methods_of("App")[1];
    assert!(count.comments.is_empty());

    let app = pkg.find_struct("App").unwrap();
    assert_eq!(
        app.comments,
        vec!["// App is the main controller.", "// It serves the landing pages."]
    );
    let hidden = pkg.find_struct("Hidden").unwrap();
    assert_eq!(hidden.comments, vec!["// Hidden is a grouped type."]);
}

#[test]
fn test_struct_fields_and_embedding() {
    let pkg = parse_source("app.go", APP_GO).unwrap();
    assert_eq!(pkg.structs.len(), 2, "aliases are not structs");
    let app = pkg.find_struct("App").unwrap();
    assert_eq!(app.fields.len(), 6);

    let parent = &app.fields[0];
    assert!(parent.is_embedded());
    assert!(parent.ty.star());
    assert_eq!(parent.ty.package(), Some("b"));
    assert_eq!(parent.ty.name(), Some("Controller"));
    assert_eq!(parent.tag, r#"@get:"/api""#);

    let local = &app.fields[1];
    assert!(local.is_embedded());
    assert_eq!(local.ty, Type::pointer(Type::named("Local")));

    let request = &app.fields[2];
    assert_eq!(request.name, "Request");
    assert_eq!(request.ty.to_string(), "*http.Request");
    assert_eq!(request.tag, r#"bind:"request""#);

    assert_eq!(app.fields[3].name, "First");
    assert_eq!(app.fields[4].name, "Last");
    assert_eq!(app.fields[5].ty.to_string(), "[]models.Item");
}

#[test]
fn test_imports_with_default_and_explicit_alias() {
    let pkg = parse_source("app.go", APP_GO).unwrap();
    assert_eq!(pkg.import_of("app.go", "http"), Some("net/http"));
    assert_eq!(
        pkg.import_of("app.go", "b"),
        Some("github.com/acme/shop/controllers/base")
    );
    assert_eq!(
        pkg.import_of("app.go", "models"),
        Some("github.com/acme/shop/models")
    );
    assert_eq!(pkg.import_of("app.go", "base"), None);
}

#[test]
fn test_syntax_error_is_fatal() {
    let err = parse_source("bad.go", "package x\nfunc (\n").unwrap_err();
    assert!(err.to_string().contains("bad.go"), "{err}");
}

#[test]
fn test_extract_package_merges_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("a.go"),
        "package web\n\nimport \"net/http\"\n\ntype A struct{}\n\nfunc (a *A) X() http.Handler { return nil }\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("b.go"),
        "package web\n\nimport h \"net/http\"\n\nfunc (a *A) Y() h.Handler { return nil }\n",
    )
    .unwrap();
    fs::write(dir.path().join("a_test.go"), "package web_test\n").unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let pkg = extract_package(dir.path()).unwrap();
    assert_eq!(pkg.name, "web");
    assert_eq!(pkg.methods_of("A").len(), 2);
    assert_eq!(pkg.imports.len(), 2);
    let b_file = dir.path().join("b.go").display().to_string();
    assert_eq!(pkg.import_of(&b_file, "h"), Some("net/http"));
}

#[test]
fn test_extract_package_errors() {
    let dir = tempfile::tempdir().unwrap();
    assert!(extract_package(dir.path()).is_err(), "empty dir");
    assert!(extract_package(&dir.path().join("missing")).is_err());
}

#[test]
fn test_type_display() {
    let ty = Type::Map {
        key: Box::new(Type::named("string")),
        value: Box::new(Type::slice(Type::pointer(Type::qualified("m", "T")))),
    };
    assert_eq!(ty.to_string(), "map[string][]*m.T");
    assert_eq!(default_alias("github.com/a/b"), "b");
    assert_eq!(default_alias("fmt"), "fmt");
}
