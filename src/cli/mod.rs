//! # CLI Module
//!
//! Command-line surface of the `handlergen` binary.
//!
//! ## Commands
//!
//! ### `generate handlers`
//!
//! Scan a controller package and write one dispatcher per controller:
//!
//! ```bash
//! handlergen generate handlers --input ./controllers --output ./assets/handlers --package handlers
//! ```
//!
//! ### `generate listing`
//!
//! Write `listing.go` for every file below a directory:
//!
//! ```bash
//! handlergen generate listing --input ./views --output ./assets/views --package views
//! ```
//!
//! Both accept `--config <FILE>` and `--dry-run`. Flags that are not given
//! fall back to `handlergen.toml`, then to the built-in defaults.
//!
//! ### `routes`
//!
//! Print the route table of a controller package, optionally as JSON:
//!
//! ```bash
//! handlergen routes --input ./controllers --json
//! ```
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use handlergen::cli::{run_cli, Cli};
//! use clap::Parser;
//!
//! run_cli(Cli::parse())?;
//! ```

mod commands;


pub use commands::{
    format_route_table, handler_options, run_cli, Cli, Commands, GenerateArgs, GenerateTarget,
};
