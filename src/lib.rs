//! # handlergen
//!
//! **handlergen** turns Go controller packages into ahead-of-time compiled
//! request dispatchers. It reads the controllers' source, never their
//! compiled form, so the generated code needs no runtime reflection.
//!
//! ## Overview
//!
//! A controller is a Go struct with at least one action: an exported method
//! returning the action marker type (`http.Handler` by default) whose
//! parameters are all bindable primitives. Actions declare their routes in
//! comments, controllers inherit behavior by embedding parent controllers,
//! and `Before`/`After` hooks run around every action.
//!
//! ```go
//! type App struct {
//!     *base.Controller `@post:"/api"`
//!     Req *http.Request `bind:"request"`
//! }
//!
//! //@get /users/:id user_show
//! func (c *App) Show(id int) http.Handler { ... }
//! ```
//!
//! ## Architecture
//!
//! - **[`model`]** - Go source → Package / Struct / Func / Type value model
//! - **[`classify`]** - action and lifecycle hook recognition from marker tables
//! - **[`graph`]** - parent controller resolution across packages
//! - **[`imports`]** - Go import path ⇄ directory mapping
//! - **[`routes`]** - route annotations and the prefix algebra
//! - **[`generator`]** - minijinja templates and file output
//! - **[`diagnostics`]** - recoverable warnings collected per run
//! - **[`config`]** - `handlergen.toml`
//! - **[`logging`]** - tracing subscriber setup
//! - **[`cli`]** - the `handlergen` command line
//!
//! ### Generation Flow
//!
//! ```text
//! controllers/ ──▶ model::extract_package ──▶ classify ──▶ graph::resolve
//!                        ▲                                    │
//!                        └──── embedded packages (memoized) ──┘
//!                                                             │
//!                 routes::action_routes ◀─────────────────────┤
//!                                                             ▼
//!                              generator::render_handlers ──▶ files
//! ```
//!
//! Every run starts from a clean scan and rebuilds the full output set.
//! Problems local to one method, field or route line are reported as
//! [`diagnostics::Diagnostic`]s and skipped; anything that would make the
//! output structurally invalid aborts the run with an [`anyhow::Error`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use handlergen::generator::{generate_handlers, HandlerOptions};
//!
//! let report = generate_handlers(&HandlerOptions::new(
//!     "./controllers",
//!     "./assets/handlers",
//!     "handlers",
//! ))?;
//! for warning in &report.diagnostics {
//!     eprintln!("{warning}");
//! }
//! ```

pub mod classify;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod generator;
pub mod graph;
pub mod imports;
pub mod logging;
pub mod model;
pub mod routes;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use generator::{generate_handlers, generate_listing, GenerationReport, HandlerOptions, ListingOptions};
pub use graph::{resolve, Controller, Parent, Resolution};
pub use routes::Route;
