//! # Generator Module
//!
//! Renders Go source from resolved controllers.
//!
//! ## Overview
//!
//! ```text
//! controllers dir → graph::resolve → contexts → minijinja templates → files
//! ```
//!
//! Two generators share the template environment:
//!
//! - **Handlers** ([`generate_handlers`]) - one dispatcher file per
//!   controller and an `init.go` per generated package
//! - **Listing** ([`generate_listing`]) - a `listing.go` mapping every file
//!   below a directory to its path
//!
//! ## Generated Structure
//!
//! ```text
//! assets/handlers/
//! ├── init.go                 # Route type, Routes(), Init(), conversion helpers
//! ├── app.go                  # dispatcher for controllers.App
//! ├── user_profile.go         # dispatcher for controllers.UserProfile
//! └── github.com/acme/kit/    # package of embedded parent controllers
//!     ├── init.go
//!     └── base.go
//! ```
//!
//! Every file starts with [`GENERATED_HEADER`]. Rendering never depends on
//! hash map order, so unchanged input yields byte-identical output.
//!
//! ## Template Customization
//!
//! The built-in templates live in `templates/` and are compiled into the
//! binary:
//!
//! - `handler.go.tpl` - dispatcher for one controller
//! - `init.go.tpl` - package wiring
//! - `listing.go.tpl` - file listing
//!
//! Setting `templates_dir` in `handlergen.toml` replaces any of them by file
//! name. See [`templates`] for the syntax and the helper table.

mod handlers;
mod listing;
pub mod templates;

pub use handlers::{
    generate_handlers, render_handlers, route_table, scan, write_files, GeneratedFile,
    GenerationReport, HandlerOptions, RouteEntry, GENERATED_HEADER,
};
pub use listing::{generate_listing, list_files, render_listing, ListingEntry, ListingOptions, LISTING_FILE};
pub use templates::Templates;
