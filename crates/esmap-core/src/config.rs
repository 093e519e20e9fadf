//! Runtime configuration and rewrite options.
//!
//! Options come from an optional `esmap.config.json` file and are then
//! overridden by CLI flags. The file uses the same camelCase keys as the
//! options themselves:
//!
//! ```json
//! {
//!   "dir": "web_modules",
//!   "importMap": "import-map.json",
//!   "useNodeResolver": true
//! }
//! ```

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default serving root for installed web modules.
pub const DEFAULT_DIR: &str = "web_modules";

/// Config file name discovered in the working directory.
pub const CONFIG_FILE: &str = "esmap.config.json";

/// Runtime configuration for the esmap CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Current working directory.
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }
}

/// User-facing rewrite options, as written in a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RewriteOptions {
    /// Serving root that mapped specifiers are rewritten under.
    pub dir: Option<String>,

    /// Explicit import map path. Absolute, or relative to `<cwd>/<dir>`.
    pub import_map: Option<String>,

    /// Resolve source-relative imports on disk and normalize their extension.
    pub use_node_resolver: Option<bool>,

    /// Deprecated alias that forces `use_node_resolver` on.
    pub optional_extensions: Option<bool>,

    /// Deprecated and ignored.
    pub add_version: Option<bool>,
}

/// A deprecated option that was set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deprecation {
    OptionalExtensions,
    AddVersion,
}

impl Deprecation {
    /// Human-readable notice for this deprecation.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::OptionalExtensions => {
                "\"optionalExtensions\" is deprecated, use \"useNodeResolver\" instead"
            }
            Self::AddVersion => {
                "\"addVersion\" is no longer needed: versioned paths are produced by the import map generator, the option is ignored"
            }
        }
    }
}

/// Options after defaults and deprecated aliases have been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub dir: String,
    pub import_map: Option<String>,
    pub use_node_resolver: bool,
    pub deprecations: Vec<Deprecation>,
}

impl RewriteOptions {
    /// Layer `other` on top of `self`: every field set in `other` wins.
    #[must_use]
    pub fn merge(self, other: RewriteOptions) -> RewriteOptions {
        RewriteOptions {
            dir: other.dir.or(self.dir),
            import_map: other.import_map.or(self.import_map),
            use_node_resolver: other.use_node_resolver.or(self.use_node_resolver),
            optional_extensions: other.optional_extensions.or(self.optional_extensions),
            add_version: other.add_version.or(self.add_version),
        }
    }

    /// Apply defaults and deprecated aliases.
    ///
    /// Deprecation notices are logged once here and also returned so callers
    /// can surface them in structured output.
    #[must_use]
    pub fn resolve(&self) -> ResolvedOptions {
        let mut deprecations = Vec::new();

        let optional_extensions = self.optional_extensions.unwrap_or(false);
        if optional_extensions {
            deprecations.push(Deprecation::OptionalExtensions);
        }
        if self.add_version.unwrap_or(false) {
            deprecations.push(Deprecation::AddVersion);
        }
        for deprecation in &deprecations {
            tracing::warn!("{}", deprecation.message());
        }

        ResolvedOptions {
            dir: self
                .dir
                .clone()
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| DEFAULT_DIR.to_string()),
            import_map: self.import_map.clone().filter(|p| !p.is_empty()),
            use_node_resolver: self.use_node_resolver.unwrap_or(false) || optional_extensions,
            deprecations,
        }
    }
}

/// Find the config file in `root`.
#[must_use]
pub fn find_config_file(root: &Path) -> Option<PathBuf> {
    let path = root.join(CONFIG_FILE);
    path.is_file().then_some(path)
}

/// Load rewrite options from a config file.
///
/// If `config_path` is `Some`, that file must exist (relative paths are taken
/// from `root`). Otherwise the file is discovered in `root`, and its absence
/// yields `Ok(None)`.
pub fn load_options(
    root: &Path,
    config_path: Option<&Path>,
) -> Result<Option<(PathBuf, RewriteOptions)>, Error> {
    let path = match config_path {
        Some(p) => {
            let abs = if p.is_absolute() {
                p.to_path_buf()
            } else {
                root.join(p)
            };
            if !abs.is_file() {
                return Err(Error::ConfigNotFound { path: abs });
            }
            abs
        }
        None => match find_config_file(root) {
            Some(p) => p,
            None => return Ok(None),
        },
    };

    let source = std::fs::read_to_string(&path).map_err(|source| Error::ConfigRead {
        path: path.clone(),
        source,
    })?;
    let options = serde_json::from_str(&source).map_err(|source| Error::ConfigParse {
        path: path.clone(),
        source,
    })?;

    tracing::debug!(config = %path.display(), "loaded config file");
    Ok(Some((path, options)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let resolved = RewriteOptions::default().resolve();
        assert_eq!(resolved.dir, "web_modules");
        assert_eq!(resolved.import_map, None);
        assert!(!resolved.use_node_resolver);
        assert!(resolved.deprecations.is_empty());
    }

    #[test]
    fn test_optional_extensions_forces_resolver() {
        let options = RewriteOptions {
            optional_extensions: Some(true),
            ..Default::default()
        };
        let resolved = options.resolve();
        assert!(resolved.use_node_resolver);
        assert_eq!(resolved.deprecations, vec![Deprecation::OptionalExtensions]);
    }

    #[test]
    fn test_add_version_is_ignored_with_notice() {
        let options = RewriteOptions {
            add_version: Some(true),
            ..Default::default()
        };
        let resolved = options.resolve();
        assert!(!resolved.use_node_resolver);
        assert_eq!(resolved.deprecations, vec![Deprecation::AddVersion]);
    }

    #[test]
    fn test_empty_dir_falls_back_to_default() {
        let options = RewriteOptions {
            dir: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(options.resolve().dir, DEFAULT_DIR);
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let file = RewriteOptions {
            dir: Some("vendor".into()),
            use_node_resolver: Some(true),
            ..Default::default()
        };
        let flags = RewriteOptions {
            dir: Some("lib".into()),
            ..Default::default()
        };
        let merged = file.merge(flags);
        assert_eq!(merged.dir.as_deref(), Some("lib"));
        assert_eq!(merged.use_node_resolver, Some(true));
    }

    #[test]
    fn test_load_options_camel_case() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"dir": "vendor", "importMap": "map.json", "useNodeResolver": true}"#,
        )
        .unwrap();

        let (path, options) = load_options(dir.path(), None).unwrap().unwrap();
        assert_eq!(path, dir.path().join(CONFIG_FILE));
        assert_eq!(options.dir.as_deref(), Some("vendor"));
        assert_eq!(options.import_map.as_deref(), Some("map.json"));
        assert_eq!(options.use_node_resolver, Some(true));
    }

    #[test]
    fn test_load_options_missing_discovered_file() {
        let dir = tempdir().unwrap();
        assert!(load_options(dir.path(), None).unwrap().is_none());
    }

    #[test]
    fn test_load_options_missing_explicit_file() {
        let dir = tempdir().unwrap();
        let err = load_options(dir.path(), Some(Path::new("nope.json"))).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn test_load_options_invalid_json() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "{ dir: ").unwrap();
        let err = load_options(dir.path(), None).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }
}
