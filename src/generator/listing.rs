//! Listing generation
//!
//! Emits `listing.go`: every file below the input directory, keyed by its
//! slash separated path relative to the input.

use super::handlers::{write_files, GeneratedFile, GENERATED_HEADER};
use super::templates::{Templates, LISTING_TEMPLATE};
use crate::routes::join_path;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const LISTING_FILE: &str = "listing.go";

#[derive(Debug, Clone)]
pub struct ListingOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub package: String,
    pub templates_dir: Option<PathBuf>,
    pub dry_run: bool,
}

impl ListingOptions {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, package: impl Into<String>) -> Self {
        ListingOptions {
            input: input.into(),
            output: output.into(),
            package: package.into(),
            templates_dir: None,
            dry_run: false,
        }
    }
}

/// One listed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingEntry {
    /// Path relative to the input directory
    pub key: String,
    /// Input directory joined with `key`
    pub path: String,
}

#[derive(Serialize)]
struct ListingContext<'a> {
    header: &'static str,
    package: &'a str,
    root: String,
    entries: Vec<ListingEntry>,
}

/// Every regular file below `input`, sorted by relative path.
pub fn list_files(input: &Path) -> Result<Vec<ListingEntry>> {
    anyhow::ensure!(
        input.is_dir(),
        "Listing input directory does not exist: {}",
        input.display()
    );
    let root = slash_path(input);
    let mut entries = Vec::new();
    for entry in WalkDir::new(input).follow_links(true).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", input.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(input)
            .with_context(|| format!("{} is outside {}", entry.path().display(), input.display()))?;
        let key = slash_path(rel);
        entries.push(ListingEntry {
            path: join_path(&[root.as_str(), key.as_str()]),
            key,
        });
    }
    entries.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(entries)
}

/// Render `listing.go` without writing it.
pub fn render_listing(options: &ListingOptions, templates: &Templates) -> Result<GeneratedFile> {
    let entries = list_files(&options.input)?;
    tracing::debug!(input = %options.input.display(), files = entries.len(), "listed files");
    let ctx = ListingContext {
        header: GENERATED_HEADER,
        package: &options.package,
        root: slash_path(&options.input),
        entries,
    };
    Ok(GeneratedFile {
        path: options.output.join(LISTING_FILE),
        contents: templates.render(LISTING_TEMPLATE, &ctx)?,
    })
}

/// Render and write `listing.go`, returning its path.
pub fn generate_listing(options: &ListingOptions) -> Result<PathBuf> {
    let templates = Templates::load(options.templates_dir.as_deref())?;
    let file = render_listing(options, &templates)?;
    write_files(std::slice::from_ref(&file), options.dry_run)?;
    Ok(file.path)
}

fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
