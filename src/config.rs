//! `handlergen.toml` configuration
//!
//! Every setting is optional. Values are layered as
//! CLI flag > configuration file > built-in default.
//!
//! ```toml
//! strconv_import = "example.com/app/strconv"
//! templates_dir = "templates/handlergen"
//!
//! [handlers]
//! input = "./controllers"
//! output = "./assets/handlers"
//! package = "handlers"
//!
//! [markers.action]
//! import = "example.com/app/web"
//! name = "Result"
//!
//! [[prefixes]]
//! method = "route"
//! path = "/api"
//!
//! [[roots]]
//! import = "github.com/acme/kit"
//! dir = "../kit"
//! ```
//!
//! Relative paths inside the file are resolved against the directory the
//! file lives in.

use crate::classify::Markers;
use crate::imports::ImportRoot;
use crate::routes::{Prefix, PrefixConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up next to the input directory and in the working directory
pub const CONFIG_FILE_NAME: &str = "handlergen.toml";

pub const DEFAULT_HANDLERS_INPUT: &str = "./controllers";
pub const DEFAULT_HANDLERS_OUTPUT: &str = "./assets/handlers";
pub const DEFAULT_HANDLERS_PACKAGE: &str = "handlers";
pub const DEFAULT_LISTING_INPUT: &str = "./views";
pub const DEFAULT_LISTING_OUTPUT: &str = "./assets/views";
pub const DEFAULT_LISTING_PACKAGE: &str = "views";

/// `[handlers]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HandlersConfig {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub package: Option<String>,
    /// Go import path of the output directory when it cannot be derived
    pub output_import: Option<String>,
}

/// `[listing]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListingConfig {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub package: Option<String>,
}

/// Whole configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub handlers: HandlersConfig,
    pub listing: ListingConfig,
    pub markers: Markers,
    /// Package providing the parameter conversion functions; when unset the
    /// generated code carries its own
    pub strconv_import: Option<String>,
    /// Directory whose `*.go.tpl` files replace the built-in templates
    pub templates_dir: Option<PathBuf>,
    /// Route prefixes active for the root package
    pub prefixes: Vec<PrefixConfig>,
    pub roots: Vec<ImportRoot>,
}

impl Config {
    /// Parse configuration text; relative paths stay as written.
    pub fn parse(contents: &str) -> Result<Config> {
        toml::from_str(contents).context("Invalid handlergen configuration")
    }

    /// Load a configuration file, resolving relative paths against its directory.
    pub fn load(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let mut config = Config::parse(&contents)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        tracing::debug!(config = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Find and load the configuration for a run, or the defaults.
    ///
    /// Priority:
    /// 1. `explicit` (must exist)
    /// 2. `handlergen.toml` in `input_dir`
    /// 3. `handlergen.toml` in the current directory
    pub fn discover(explicit: Option<&Path>, input_dir: &Path) -> Result<Config> {
        match resolve_config_path(explicit, input_dir)? {
            Some(path) => Config::load(&path),
            None => Ok(Config::default()),
        }
    }

    /// Initial route prefixes.
    pub fn prefixes(&self) -> Result<Vec<Prefix>> {
        self.prefixes
            .iter()
            .map(|p| p.to_prefix().context("Invalid [[prefixes]] entry"))
            .collect()
    }

    fn rebase(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        for path in [
            &mut self.handlers.input,
            &mut self.handlers.output,
            &mut self.listing.input,
            &mut self.listing.output,
            &mut self.templates_dir,
        ]
        .into_iter()
        .flatten()
        {
            join(path);
        }
        for root in &mut self.roots {
            join(&mut root.dir);
        }
    }
}

/// Resolve the configuration file path.
///
/// An explicit path that does not exist is an error; the automatic
/// locations are simply skipped when absent.
pub fn resolve_config_path(explicit: Option<&Path>, input_dir: &Path) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        anyhow::ensure!(path.is_file(), "Config file not found: {}", path.display());
        return Ok(Some(path.to_path_buf()));
    }
    let beside_input = input_dir.join(CONFIG_FILE_NAME);
    if beside_input.is_file() {
        return Ok(Some(beside_input));
    }
    let in_cwd = PathBuf::from(CONFIG_FILE_NAME);
    Ok(in_cwd.is_file().then_some(in_cwd))
}

/// First present value, or the default.
pub fn pick<T: Clone>(flag: Option<T>, configured: Option<&T>, default: T) -> T {
    flag.or_else(|| configured.cloned()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::classify::MarkerType;
    use crate::routes::MethodSpec;
    use http::Method;
    use std::fs;
    use tempfile::TempDir;

    const FULL: &str = r#"
strconv_import = "example.com/app/strconv"
templates_dir = "tpl"

[handlers]
input = "src/controllers"
output = "/abs/out"
package = "dispatch"
output_import = "example.com/app/out"

[listing]
package = "pages"

[markers.action]
import = "example.com/app/web"
name = "Result"

[[prefixes]]
method = "post"
path = "/api"

[[roots]]
import = "github.com/acme/kit"
dir = "../kit"
"#;

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(FULL).unwrap();
        assert_eq!(config.handlers.package.as_deref(), Some("dispatch"));
        assert_eq!(config.listing.package.as_deref(), Some("pages"));
        assert_eq!(config.strconv_import.as_deref(), Some("example.com/app/strconv"));
        assert_eq!(
            config.markers.action,
            MarkerType::new("example.com/app/web", "Result", false)
        );
        // unspecified markers keep their defaults
        assert_eq!(config.markers.request, Markers::default().request);
        assert_eq!(
            config.prefixes().unwrap(),
            vec![Prefix::new(MethodSpec::One(Method::POST), "/api")]
        );
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(Config::parse("[handlers]\ninputs = \"x\"\n").is_err());
        assert!(Config::parse("[markers.actoin]\nimport = \"web\"\nname = \"Result\"\n").is_err());
        assert!(Config::parse("[markers.action]\nimport = \"web\"\ntype = \"Result\"\n").is_err());
        assert!(Config::parse("[[prefixes]]\nmethod = \"get\"\npath = \"/\"\nlabel = \"x\"\n").is_err());
        assert!(Config::parse("[[roots]]\nimport = \"a.b/c\"\ndir = \"c\"\nalias = \"c\"\n").is_err());
    }

    #[test]
    fn test_bad_prefix_method() {
        let config = Config::parse("[[prefixes]]\nmethod = \"fetch\"\npath = \"/\"\n").unwrap();
        assert!(config.prefixes().is_err());
    }

    #[test]
    fn test_load_rebases_relative_paths() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, FULL).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.handlers.input, Some(tmp.path().join("src/controllers")));
        assert_eq!(config.handlers.output, Some(PathBuf::from("/abs/out")));
        assert_eq!(config.templates_dir, Some(tmp.path().join("tpl")));
        assert_eq!(config.roots[0].dir, tmp.path().join("../kit"));
    }

    #[test]
    fn test_resolve_config_path_priority() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("controllers");
        fs::create_dir_all(&input).unwrap();

        fs::write(input.join(CONFIG_FILE_NAME), "").unwrap();
        assert_eq!(
            resolve_config_path(None, &input).unwrap(),
            Some(input.join(CONFIG_FILE_NAME))
        );

        let explicit = tmp.path().join("custom.toml");
        fs::write(&explicit, "").unwrap();
        assert_eq!(
            resolve_config_path(Some(&explicit), &input).unwrap(),
            Some(explicit.clone())
        );

        assert!(resolve_config_path(Some(&tmp.path().join("missing.toml")), &input).is_err());
    }

    #[test]
    fn test_pick_precedence() {
        let configured = "config".to_string();
        assert_eq!(pick(Some("flag".to_string()), Some(&configured), "default".into()), "flag");
        assert_eq!(pick(None, Some(&configured), "default".into()), "config");
        assert_eq!(pick(None, None, "default".to_string()), "default");
    }
}
