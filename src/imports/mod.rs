//! # Imports Module
//!
//! Maps Go import paths to directories on disk and back.
//!
//! Parents embedded from other packages are named by import path in the Go
//! source, so the graph resolver needs a directory to scan for each of them.
//! The generator needs the reverse mapping to compute the import path of
//! the controller package and of the output directory.
//!
//! ## Lookup order
//!
//! 1. the module declared by the nearest `go.mod` at or above the input
//! 2. `<module dir>/vendor/<import>`
//! 3. roots configured as `[[roots]]` in `handlergen.toml`
//! 4. `$GOPATH/src/<import>` for every `GOPATH` entry (default `~/go`)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// An extra import path prefix bound to a directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportRoot {
    /// Import path prefix, e.g. `github.com/acme/kit`
    pub import: String,
    pub dir: PathBuf,
}

/// The Go module enclosing the scanned directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoModule {
    pub path: String,
    pub dir: PathBuf,
}

/// Resolves import paths for one generation run
#[derive(Debug, Clone, Default)]
pub struct ImportLocator {
    module: Option<GoModule>,
    roots: Vec<ImportRoot>,
    gopath: Vec<PathBuf>,
}

impl ImportLocator {
    /// Locator for controllers living in `input_dir`.
    pub fn discover(input_dir: &Path, roots: &[ImportRoot]) -> Result<Self> {
        let start = lexical_absolute(input_dir)?;
        let module = find_module(&start)?;
        match &module {
            Some(m) => tracing::debug!(module = %m.path, dir = %m.dir.display(), "found go.mod"),
            None => tracing::debug!(input = %start.display(), "no go.mod above input directory"),
        }
        let roots = roots
            .iter()
            .map(|r| {
                Ok(ImportRoot {
                    import: r.import.trim_end_matches('/').to_string(),
                    dir: lexical_absolute(&r.dir)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ImportLocator {
            module,
            roots,
            gopath: gopath_entries(),
        })
    }

    /// Locator with explicit parts and no environment lookups.
    pub fn with_parts(module: Option<GoModule>, roots: Vec<ImportRoot>, gopath: Vec<PathBuf>) -> Self {
        ImportLocator {
            module,
            roots,
            gopath,
        }
    }

    pub fn module(&self) -> Option<&GoModule> {
        self.module.as_ref()
    }

    /// Directory holding the package `import`, if it can be found.
    pub fn dir_for(&self, import: &str) -> Option<PathBuf> {
        if let Some(module) = &self.module {
            if let Some(rel) = strip_import_prefix(import, &module.path) {
                let dir = module.dir.join(rel);
                if dir.is_dir() {
                    return Some(dir);
                }
            }
            let vendored = module.dir.join("vendor").join(import);
            if vendored.is_dir() {
                return Some(vendored);
            }
        }
        for root in &self.roots {
            if let Some(rel) = strip_import_prefix(import, &root.import) {
                let dir = root.dir.join(rel);
                if dir.is_dir() {
                    return Some(dir);
                }
            }
        }
        self.gopath
            .iter()
            .map(|entry| entry.join("src").join(import))
            .find(|dir| dir.is_dir())
    }

    /// Import path of the package that lives (or will live) in `dir`.
    pub fn import_for(&self, dir: &Path) -> Option<String> {
        let dir = lexical_absolute(dir).ok()?;
        if let Some(module) = &self.module {
            if let Some(rel) = relative_slash_path(&dir, &module.dir.join("vendor")) {
                if !rel.is_empty() {
                    return Some(rel);
                }
            }
            if let Some(rel) = relative_slash_path(&dir, &module.dir) {
                return Some(join_import(&module.path, &rel));
            }
        }
        for root in &self.roots {
            if let Some(rel) = relative_slash_path(&dir, &root.dir) {
                return Some(join_import(&root.import, &rel));
            }
        }
        self.gopath.iter().find_map(|entry| {
            relative_slash_path(&dir, &entry.join("src")).filter(|rel| !rel.is_empty())
        })
    }
}

/// Nearest `go.mod` at or above `start`.
pub fn find_module(start: &Path) -> Result<Option<GoModule>> {
    for dir in start.ancestors() {
        let go_mod = dir.join("go.mod");
        if !go_mod.is_file() {
            continue;
        }
        let contents = std::fs::read_to_string(&go_mod)
            .with_context(|| format!("Failed to read {}", go_mod.display()))?;
        let path = parse_module_path(&contents)
            .with_context(|| format!("No module directive in {}", go_mod.display()))?;
        return Ok(Some(GoModule {
            path,
            dir: dir.to_path_buf(),
        }));
    }
    Ok(None)
}

/// Module path from the `module` directive of a `go.mod` file.
pub fn parse_module_path(go_mod: &str) -> Option<String> {
    go_mod.lines().find_map(|line| {
        let line = line.split("//").next().unwrap_or_default().trim();
        let rest = line.strip_prefix("module")?;
        if !rest.starts_with([' ', '\t']) {
            return None;
        }
        let path = rest.trim().trim_matches('"');
        (!path.is_empty()).then(|| path.to_string())
    })
}

/// Absolute, `.`/`..` free form of `path` without touching symlinks.
pub fn lexical_absolute(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)
        .with_context(|| format!("Failed to make {} absolute", path.display()))?;
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}

fn gopath_entries() -> Vec<PathBuf> {
    match std::env::var_os("GOPATH") {
        Some(value) if !value.is_empty() => std::env::split_paths(&value).collect(),
        _ => std::env::var_os("HOME")
            .map(|home| vec![PathBuf::from(home).join("go")])
            .unwrap_or_default(),
    }
}

fn strip_import_prefix<'a>(import: &'a str, prefix: &str) -> Option<&'a str> {
    if import == prefix {
        return Some("");
    }
    import.strip_prefix(prefix)?.strip_prefix('/')
}

fn relative_slash_path(dir: &Path, base: &Path) -> Option<String> {
    let rel = dir.strip_prefix(base).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

fn join_import(base: &str, rel: &str) -> String {
    if rel.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{rel}")
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn module_fixture() -> (TempDir, ImportLocator) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(root.join("go.mod"), "// app\nmodule github.com/acme/shop\n\ngo 1.22\n").unwrap();
        fs::create_dir_all(root.join("controllers/admin")).unwrap();
        fs::create_dir_all(root.join("vendor/github.com/acme/kit/base")).unwrap();
        let locator = ImportLocator::discover(&root.join("controllers"), &[]).unwrap();
        (tmp, locator)
    }

    #[test]
    fn test_parse_module_path() {
        assert_eq!(
            parse_module_path("module example.com/m // trailing\n"),
            Some("example.com/m".to_string())
        );
        assert_eq!(
            parse_module_path("module \"example.com/q\""),
            Some("example.com/q".to_string())
        );
        assert_eq!(parse_module_path("modules x\n"), None);
        assert_eq!(parse_module_path("go 1.21\n"), None);
    }

    #[test]
    fn test_discover_finds_enclosing_module() {
        let (tmp, locator) = module_fixture();
        let module = locator.module().unwrap();
        assert_eq!(module.path, "github.com/acme/shop");
        assert_eq!(module.dir, lexical_absolute(tmp.path()).unwrap());
    }

    #[test]
    fn test_dir_for_module_and_vendor() {
        let (tmp, locator) = module_fixture();
        let root = lexical_absolute(tmp.path()).unwrap();
        assert_eq!(
            locator.dir_for("github.com/acme/shop/controllers/admin"),
            Some(root.join("controllers/admin"))
        );
        assert_eq!(
            locator.dir_for("github.com/acme/kit/base"),
            Some(root.join("vendor/github.com/acme/kit/base"))
        );
        assert_eq!(locator.dir_for("github.com/acme/shop/missing"), None);
    }

    #[test]
    fn test_import_for_round_trips_module_dirs() {
        let (tmp, locator) = module_fixture();
        let root = tmp.path();
        assert_eq!(
            locator.import_for(&root.join("controllers/admin")),
            Some("github.com/acme/shop/controllers/admin".to_string())
        );
        assert_eq!(
            locator.import_for(&root.join("controllers/../assets/handlers")),
            Some("github.com/acme/shop/assets/handlers".to_string())
        );
        assert_eq!(
            locator.import_for(&root.join("vendor/github.com/acme/kit/base")),
            Some("github.com/acme/kit/base".to_string())
        );
    }

    #[test]
    fn test_configured_roots_and_gopath() {
        let tmp = TempDir::new().unwrap();
        let kit = tmp.path().join("kit");
        let gopath = tmp.path().join("gopath");
        fs::create_dir_all(kit.join("base")).unwrap();
        fs::create_dir_all(gopath.join("src/example.org/lib")).unwrap();

        let locator = ImportLocator::with_parts(
            None,
            vec![ImportRoot {
                import: "github.com/acme/kit".to_string(),
                dir: kit.clone(),
            }],
            vec![gopath.clone()],
        );
        assert_eq!(locator.dir_for("github.com/acme/kit/base"), Some(kit.join("base")));
        assert_eq!(locator.dir_for("github.com/acme/kitchen"), None);
        assert_eq!(
            locator.dir_for("example.org/lib"),
            Some(gopath.join("src/example.org/lib"))
        );
        assert_eq!(
            locator.import_for(&gopath.join("src/example.org/lib")),
            Some("example.org/lib".to_string())
        );
        assert_eq!(locator.import_for(tmp.path()), None);
    }

    #[test]
    fn test_lexical_absolute_resolves_dots() {
        let abs = lexical_absolute(Path::new("a/./b/../c")).unwrap();
        assert!(abs.is_absolute());
        assert!(abs.ends_with("a/c"));
    }
}
