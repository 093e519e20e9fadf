//! Filesystem resolver.
//!
//! Supports:
//! - Relative specifiers: `./`, `../` (and their `\` forms)
//! - Absolute filesystem specifiers
//! - Bare specifiers with `node_modules` lookup
//! - Extension probing, restricted to a configured allow-list
//! - Directory resolution (`package.json` main, `index.*`)

use super::{ModuleResolver, ResolveError, ResolveReasonCode};
use esmap_util::path::normalize_lexically;
use serde_json::Value;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Extensions probed when rewriting source-relative imports.
pub const REWRITE_EXTENSIONS: &[&str] = &[".js", ".ts", ".jsx", ".tsx", ".json"];

/// Maximum number of tried paths to record.
const MAX_TRIED_PATHS: usize = 20;

/// Resolver backed by the local filesystem.
#[derive(Debug, Clone)]
pub struct FsResolver {
    /// Extensions to probe (in order), with leading dot.
    extensions: Vec<String>,
}

impl Default for FsResolver {
    fn default() -> Self {
        Self::with_extensions(REWRITE_EXTENSIONS)
    }
}

impl FsResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver probing only `extensions`.
    #[must_use]
    pub fn with_extensions(extensions: &[&str]) -> Self {
        Self {
            extensions: extensions
                .iter()
                .map(|e| {
                    if e.starts_with('.') {
                        (*e).to_string()
                    } else {
                        format!(".{e}")
                    }
                })
                .collect(),
        }
    }
}

impl ModuleResolver for FsResolver {
    fn resolve(&self, from_dir: &Path, specifier: &str) -> Result<PathBuf, ResolveError> {
        let mut tried = Vec::new();
        let fail = |reason, tried: Vec<PathBuf>| {
            Err(ResolveError::new(specifier, from_dir, reason).with_tried(tried))
        };

        if specifier.is_empty() {
            return fail(ResolveReasonCode::SpecifierInvalid, tried);
        }

        if specifier.contains("://")
            || specifier.starts_with("node:")
            || specifier.starts_with("data:")
        {
            return fail(ResolveReasonCode::UnsupportedScheme, tried);
        }

        let outcome = if is_relative(specifier) {
            let base = from_dir.join(to_native(specifier));
            self.resolve_path(&base, &mut tried)
        } else if is_absolute_path(specifier) {
            let base = PathBuf::from(to_native(specifier));
            self.resolve_path(&base, &mut tried)
        } else {
            self.resolve_bare(from_dir, specifier, &mut tried)
        };

        match outcome {
            Ok(path) => {
                tracing::trace!(specifier, resolved = %path.display(), "resolved");
                Ok(normalize_lexically(&path))
            }
            Err(reason) => fail(reason, tried),
        }
    }
}

impl FsResolver {
    /// Resolve a path (exact file, extension probing, then directory resolution).
    fn resolve_path(
        &self,
        base: &Path,
        tried: &mut Vec<PathBuf>,
    ) -> Result<PathBuf, ResolveReasonCode> {
        add_tried(tried, base);
        if base.is_file() {
            return Ok(base.to_path_buf());
        }

        if let Some(found) = self.probe_extensions(base, tried) {
            return Ok(found);
        }

        self.resolve_directory(base, tried)
    }

    /// Try `base` + each extension; the existing extension is kept (`a.service` → `a.service.ts`).
    fn probe_extensions(&self, base: &Path, tried: &mut Vec<PathBuf>) -> Option<PathBuf> {
        for ext in &self.extensions {
            let mut with_ext = OsString::from(base.as_os_str());
            with_ext.push(ext);
            let with_ext = PathBuf::from(with_ext);
            add_tried(tried, &with_ext);

            if with_ext.is_file() {
                return Some(with_ext);
            }
        }
        None
    }

    /// Resolve a directory (package.json main > index.*).
    fn resolve_directory(
        &self,
        dir: &Path,
        tried: &mut Vec<PathBuf>,
    ) -> Result<PathBuf, ResolveReasonCode> {
        if !dir.is_dir() {
            return Err(ResolveReasonCode::NotFound);
        }

        let pkg_json_path = dir.join("package.json");
        if pkg_json_path.is_file() {
            add_tried(tried, &pkg_json_path);

            if let Some(main) = read_package_main(&pkg_json_path) {
                let main_path = dir.join(&main);
                add_tried(tried, &main_path);

                if main_path.is_file() {
                    return Ok(main_path);
                }
                if let Some(found) = self.probe_extensions(&main_path, tried) {
                    return Ok(found);
                }
                if main_path.is_dir() {
                    if let Some(found) = self.probe_index(&main_path, tried) {
                        return Ok(found);
                    }
                }
                tracing::debug!(
                    main = %main,
                    package = %pkg_json_path.display(),
                    "package main not found"
                );
            }
        }

        if let Some(found) = self.probe_index(dir, tried) {
            return Ok(found);
        }

        Err(ResolveReasonCode::IsDirectory)
    }

    fn probe_index(&self, dir: &Path, tried: &mut Vec<PathBuf>) -> Option<PathBuf> {
        for ext in &self.extensions {
            let index = dir.join(format!("index{ext}"));
            add_tried(tried, &index);

            if index.is_file() {
                return Some(index);
            }
        }
        None
    }

    /// Resolve a bare specifier via `node_modules`, walking up from `from_dir`.
    ///
    /// The rewriter routes every specifier starting with `.` here, so names
    /// such as `.hidden` or `.config/x` (not `./`) arrive as package requests,
    /// the same way a Node resolver treats them.
    fn resolve_bare(
        &self,
        from_dir: &Path,
        specifier: &str,
        tried: &mut Vec<PathBuf>,
    ) -> Result<PathBuf, ResolveReasonCode> {
        let (pkg_name, subpath) = parse_bare_specifier(specifier);
        let mut found_node_modules = false;
        let mut found_package = false;
        let mut current = Some(from_dir);

        while let Some(dir) = current {
            let node_modules = dir.join("node_modules");

            if node_modules.is_dir() {
                found_node_modules = true;
                let pkg_dir = node_modules.join(pkg_name);

                if pkg_dir.is_dir() {
                    found_package = true;
                    let target = match subpath {
                        Some(sub) => pkg_dir.join(sub),
                        None => pkg_dir,
                    };
                    if let Ok(found) = self.resolve_path(&target, tried) {
                        return Ok(found);
                    }
                } else {
                    add_tried(tried, &pkg_dir);
                }
            }

            current = dir.parent();
        }

        if found_package && subpath.is_none() {
            Err(ResolveReasonCode::PackageMainNotFound)
        } else if found_node_modules {
            Err(ResolveReasonCode::NotFound)
        } else {
            Err(ResolveReasonCode::NodeModulesNotFound)
        }
    }
}

fn read_package_main(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let value: Value = serde_json::from_str(&content).ok()?;
    value
        .get("main")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

/// `./x`, `../x`, `.`, `..` and their backslash forms.
fn is_relative(spec: &str) -> bool {
    spec == "."
        || spec == ".."
        || spec.starts_with("./")
        || spec.starts_with("../")
        || spec.starts_with(".\\")
        || spec.starts_with("..\\")
}

/// Check if a specifier is an absolute path.
fn is_absolute_path(spec: &str) -> bool {
    if spec.starts_with('/') || spec.starts_with('\\') {
        return true;
    }

    // Windows absolute: C:\, D:/
    let bytes = spec.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

/// Use the platform separator for specifiers written with the other one.
fn to_native(spec: &str) -> String {
    if cfg!(windows) {
        spec.replace('/', "\\")
    } else {
        spec.replace('\\', "/")
    }
}

/// Parse a bare specifier into package name and optional subpath.
fn parse_bare_specifier(spec: &str) -> (&str, Option<&str>) {
    // Scoped package: @scope/pkg or @scope/pkg/subpath
    if spec.starts_with('@') {
        let mut slash_count = 0;
        for (i, c) in spec.char_indices() {
            if c == '/' {
                slash_count += 1;
                if slash_count == 2 {
                    return (&spec[..i], Some(&spec[i + 1..]));
                }
            }
        }
        return (spec, None);
    }

    match spec.find('/') {
        Some(pos) => (&spec[..pos], Some(&spec[pos + 1..])),
        None => (spec, None),
    }
}

/// Add a path to tried list (with cap).
fn add_tried(tried: &mut Vec<PathBuf>, path: &Path) {
    if tried.len() < MAX_TRIED_PATHS {
        tried.push(path.to_path_buf());
    }
}
