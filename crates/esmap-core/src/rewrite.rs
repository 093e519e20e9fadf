//! Import specifier rewriting.
//!
//! Each specifier is classified in a fixed precedence, first match wins:
//! 1. exact key in the import map → mapped location
//! 2. `http://` / `https://` URL → unchanged
//! 3. bare specifier (no leading `/`, `.` or `\`) → unchanged, with a warning
//! 4. source-relative → resolved on disk when enabled, otherwise unchanged
//!
//! Mapped locations that are not URLs are served from `/<dir>/<value>`.
//! Resolved source files are rewritten relative to the importer with their
//! `.ts`/`.tsx`/`.jsx` extension replaced by `.js`.

use crate::config::ResolvedOptions;
use crate::error::Error;
use crate::import_map::{load_import_map, ImportMap};
use crate::resolver::{FsResolver, ModuleResolver};
use esmap_util::path::{posix_join, relative_path, to_slash};
use serde::Serialize;
use std::path::Path;

/// Extensions the browser cannot load directly, replaced by [`SCRIPT_EXTENSION`].
const COMPILED_EXTENSIONS: &[&str] = &[".tsx", ".ts", ".jsx"];

/// Extension every rewritten source import ends up with.
pub const SCRIPT_EXTENSION: &str = ".js";

/// One specifier to rewrite.
#[derive(Debug, Clone, Copy)]
pub struct RewriteRequest<'a> {
    /// Specifier exactly as written in source.
    pub specifier: &'a str,
    /// Absolute path of the importing file.
    pub source_file: &'a Path,
    /// Serving root mapped specifiers are rewritten under.
    pub serving_root: &'a str,
    /// Resolve source-relative specifiers on disk.
    pub use_resolver: bool,
}

/// Which rule produced a rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteKind {
    /// Found in the import map.
    Mapped,
    /// Remote URL, left as-is.
    Remote,
    /// Bare specifier missing from the import map, left as-is.
    UnmappedBare,
    /// Source-relative specifier left as-is (resolver disabled).
    SourceUnchanged,
    /// Source-relative specifier resolved on disk.
    Resolved,
    /// Resolver failed; `.js` was appended as a best guess.
    Degraded,
}

impl RewriteKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mapped => "mapped",
            Self::Remote => "remote",
            Self::UnmappedBare => "unmapped_bare",
            Self::SourceUnchanged => "source_unchanged",
            Self::Resolved => "resolved",
            Self::Degraded => "degraded",
        }
    }
}

impl std::fmt::Display for RewriteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of rewriting one specifier. Always carries a usable specifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rewritten {
    pub specifier: String,
    pub kind: RewriteKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl Rewritten {
    fn new(specifier: impl Into<String>, kind: RewriteKind) -> Self {
        Self {
            specifier: specifier.into(),
            kind,
            warning: None,
        }
    }

    fn warn(mut self, warning: String) -> Self {
        self.warning = Some(warning);
        self
    }
}

/// Rewrite a single specifier against an import map.
///
/// Pure apart from the resolver call: the same inputs give the same output.
#[must_use]
pub fn rewrite_specifier(
    import_map: &ImportMap,
    request: &RewriteRequest<'_>,
    resolver: &dyn ModuleResolver,
) -> Rewritten {
    let spec = request.specifier;

    // An empty mapped value counts as unmapped.
    if let Some(mapped) = import_map.get(spec).filter(|m| !m.is_empty()) {
        if is_remote(mapped) {
            return Rewritten::new(mapped, RewriteKind::Mapped);
        }
        return Rewritten::new(
            posix_join(&["/", request.serving_root, mapped]),
            RewriteKind::Mapped,
        );
    }

    if is_remote(spec) {
        return Rewritten::new(spec, RewriteKind::Remote);
    }

    if !is_source_import(spec) {
        return Rewritten::new(spec, RewriteKind::UnmappedBare).warn(format!(
            "bare import \"{spec}\" not found in import map, ignoring..."
        ));
    }

    if !request.use_resolver {
        return Rewritten::new(spec, RewriteKind::SourceUnchanged);
    }

    let from_dir = importer_dir(request.source_file);
    match resolver.resolve(from_dir, spec) {
        Ok(resolved) => {
            let relative = to_slash(&relative_path(from_dir, &resolved));
            let relative = normalize_extension(&relative);
            let specifier = if relative.starts_with('.') {
                relative
            } else {
                format!("./{relative}")
            };
            Rewritten::new(specifier, RewriteKind::Resolved)
        }
        Err(err) => {
            Rewritten::new(format!("{spec}{SCRIPT_EXTENSION}"), RewriteKind::Degraded)
                .warn(err.to_string())
        }
    }
}

/// `http://` or `https://` URL.
#[must_use]
pub fn is_remote(specifier: &str) -> bool {
    specifier.starts_with("http://") || specifier.starts_with("https://")
}

/// Specifier pointing into the project sources rather than a package.
#[must_use]
pub fn is_source_import(specifier: &str) -> bool {
    specifier.starts_with('/') || specifier.starts_with('.') || specifier.starts_with('\\')
}

fn importer_dir(source_file: &Path) -> &Path {
    match source_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn normalize_extension(path: &str) -> String {
    for ext in COMPILED_EXTENSIONS {
        if let Some(stem) = path.strip_suffix(ext) {
            return format!("{stem}{SCRIPT_EXTENSION}");
        }
    }
    path.to_string()
}

/// Per-run rewriting context: the loaded import map plus options.
///
/// Built once per run and shared by reference across every file and thread.
pub struct ImportRewriter {
    import_map: ImportMap,
    dir: String,
    use_node_resolver: bool,
    resolver: Box<dyn ModuleResolver>,
}

impl std::fmt::Debug for ImportRewriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportRewriter")
            .field("entries", &self.import_map.len())
            .field("dir", &self.dir)
            .field("use_node_resolver", &self.use_node_resolver)
            .finish_non_exhaustive()
    }
}

impl ImportRewriter {
    /// Create a rewriter over an already loaded import map.
    #[must_use]
    pub fn new(import_map: ImportMap, options: &ResolvedOptions) -> Self {
        Self {
            import_map,
            dir: options.dir.clone(),
            use_node_resolver: options.use_node_resolver,
            resolver: Box::new(FsResolver::new()),
        }
    }

    /// Load the import map for `cwd` and build a rewriter.
    pub fn load(cwd: &Path, options: &ResolvedOptions) -> Result<Self, Error> {
        let loaded = load_import_map(cwd, &options.dir, options.import_map.as_deref())?;
        Ok(Self::new(loaded.map, options))
    }

    /// Replace the resolver used for source-relative specifiers.
    #[must_use]
    pub fn with_resolver(mut self, resolver: impl ModuleResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    #[must_use]
    pub fn import_map(&self) -> &ImportMap {
        &self.import_map
    }

    /// Rewrite `specifier` as imported from `source_file`, logging any warning.
    #[must_use]
    pub fn rewrite(&self, specifier: &str, source_file: &Path) -> Rewritten {
        let request = RewriteRequest {
            specifier,
            source_file,
            serving_root: &self.dir,
            use_resolver: self.use_node_resolver,
        };
        let rewritten = rewrite_specifier(&self.import_map, &request, self.resolver.as_ref());

        if let Some(warning) = &rewritten.warning {
            tracing::warn!(file = %source_file.display(), "{warning}");
        }
        tracing::trace!(
            specifier,
            rewritten = %rewritten.specifier,
            kind = %rewritten.kind,
            "rewrote specifier"
        );
        rewritten
    }
}
