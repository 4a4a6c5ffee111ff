#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

pub mod go_project {
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// A throwaway Go module laid out in a temp directory
    pub struct GoProject {
        tmp: TempDir,
    }

    impl GoProject {
        /// Empty module `example.com/app`
        pub fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            fs::write(tmp.path().join("go.mod"), "module example.com/app\n\ngo 1.21\n").unwrap();
            GoProject { tmp }
        }

        pub fn root(&self) -> &Path {
            self.tmp.path()
        }

        pub fn path(&self, rel: &str) -> PathBuf {
            self.tmp.path().join(rel)
        }

        pub fn write(&self, rel: &str, contents: &str) -> &Self {
            let path = self.path(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
            self
        }

        pub fn read(&self, rel: &str) -> String {
            fs::read_to_string(self.path(rel))
                .unwrap_or_else(|e| panic!("cannot read {rel}: {e}"))
        }

        /// Every file below `rel`, relative and sorted
        pub fn files_under(&self, rel: &str) -> Vec<String> {
            let base = self.path(rel);
            let mut out: Vec<String> = walkdir::WalkDir::new(&base)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
                .map(|e| {
                    e.path()
                        .strip_prefix(&base)
                        .unwrap()
                        .to_string_lossy()
                        .replace('\\', "/")
                })
                .collect();
            out.sort();
            out
        }
    }
}

pub mod fixtures {
    /// Grandparent: a Before hook and a health route
    pub const CORE: &str = r#"package core

import "net/http"

type Core struct{}

//@get /health
func (c *Core) Health() http.Handler { return nil }

func (c *Core) Before(w http.ResponseWriter, r *http.Request) bool { return true }
"#;

    /// Parent: embeds Core, binds the request, has its own hooks
    pub const BASE: &str = r#"package base

import (
	"net/http"

	"example.com/app/core"
)

type Controller struct {
	*core.Core
	Request *http.Request `bind:"request"`
}

//@get /list
func (c *Controller) List() http.Handler { return nil }

//@post /save
func (c *Controller) Save() http.Handler { return nil }

func (c *Controller) Before(w http.ResponseWriter, r *http.Request, args []string) http.Handler { return nil }

func (c *Controller) After(w http.ResponseWriter, r *http.Request) bool { return true }

func Init() {}
"#;

    /// Root controllers with every kind of recoverable problem in them
    pub const APP: &str = r#"package controllers

import (
	"net/http"

	"example.com/app/base"
)

// App is the landing controller.
type App struct {
	*base.Controller `@post:"/api"`
	Name string `bind:"controller"`
	Bad  int    `bind:"action"`
}

// Index renders the landing page.
//@get
func (c *App) Index() http.Handler { return nil }

//@get /users/:id user_show
//@fetch /nope
func (c *App) Show(id int64, fields []string) http.Handler { return nil }

//@route /submit
func (c *App) Submit(ok bool) http.Handler { return nil }

func (c *App) Broken(m map[string]string) http.Handler { return nil }

func (c *App) Before(w http.ResponseWriter, r *http.Request) string { return "" }

func (c *App) After(w http.ResponseWriter, r *http.Request) bool { return true }
"#;

    pub const ADMIN: &str = r#"package controllers

import "net/http"

type Admin struct{}

//@get /admin
func (a *Admin) Dashboard() http.Handler { return nil }
"#;
}
