//! Import map loading.
//!
//! The import map is produced by the web-module installer and lives in the
//! serving root. It is read once per run and shared read-only by every
//! rewrite afterwards.
//!
//! Lookup order when no explicit path is given:
//! 1. `<cwd>/<dir>/import-map.local.json`
//! 2. `<cwd>/<dir>/import-map.json`
//!
//! A candidate that cannot be read for any reason is skipped.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Developer-local import map, checked first.
pub const LOCAL_IMPORT_MAP: &str = "import-map.local.json";

/// Import map written by the installer.
pub const DEFAULT_IMPORT_MAP: &str = "import-map.json";

/// Parsed import map: exact specifier to served location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportMap {
    #[serde(default)]
    imports: HashMap<String, String>,
}

impl ImportMap {
    /// Parse an import map document.
    ///
    /// Unknown top-level keys (such as `scopes`) are ignored.
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    /// Look up the replacement for an exact specifier.
    #[must_use]
    pub fn get(&self, specifier: &str) -> Option<&str> {
        self.imports.get(specifier).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.imports.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ImportMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            imports: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// An import map together with the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedImportMap {
    pub path: PathBuf,
    pub map: ImportMap,
}

/// Directory the serving root maps to on disk.
///
/// `dir` is URL-like and may carry a leading `/`; it is always taken
/// relative to `cwd`.
#[must_use]
pub fn serving_root_dir(cwd: &Path, dir: &str) -> PathBuf {
    cwd.join(dir.trim_start_matches(['/', '\\']))
}

/// Locate and parse the import map for a run.
///
/// With `explicit` set, only that file is read: absolute paths as-is,
/// relative ones against `<cwd>/<dir>`. Otherwise the two well-known names
/// are tried in order.
pub fn load_import_map(
    cwd: &Path,
    dir: &str,
    explicit: Option<&str>,
) -> Result<LoadedImportMap, Error> {
    let root = serving_root_dir(cwd, dir);

    let (path, source) = match explicit {
        Some(explicit) => {
            let explicit_path = Path::new(explicit);
            let path = if explicit_path.is_absolute() {
                explicit_path.to_path_buf()
            } else {
                root.join(explicit_path)
            };
            match std::fs::read_to_string(&path) {
                Ok(source) => (path, source),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(Error::MapNotFound { tried: vec![path] });
                }
                Err(source) => return Err(Error::MapRead { path, source }),
            }
        }
        None => search_import_map(&root)?,
    };

    let map = ImportMap::from_json(&source).map_err(|source| Error::MapParse {
        path: path.clone(),
        source,
    })?;

    tracing::debug!(
        path = %path.display(),
        entries = map.len(),
        "loaded import map"
    );
    Ok(LoadedImportMap { path, map })
}

fn search_import_map(root: &Path) -> Result<(PathBuf, String), Error> {
    let candidates = [root.join(LOCAL_IMPORT_MAP), root.join(DEFAULT_IMPORT_MAP)];

    for candidate in &candidates {
        match std::fs::read_to_string(candidate) {
            Ok(source) => return Ok((candidate.clone(), source)),
            // Any unreadable candidate (missing, a directory, no permission) is skipped.
            Err(e) => {
                tracing::trace!(path = %candidate.display(), error = %e, "no import map here");
            }
        }
    }

    Err(Error::MapNotFound {
        tried: candidates.to_vec(),
    })
}
