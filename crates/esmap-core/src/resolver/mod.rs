//! Module resolution for source-relative imports.
//!
//! The rewriter only depends on the [`ModuleResolver`] contract: a directory
//! and a specifier in, an absolute file path or a readable error out.
//! [`FsResolver`] is the filesystem implementation used by default.

mod fs;

pub use fs::{FsResolver, REWRITE_EXTENSIONS};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Resolves a specifier from a directory to an absolute file path.
pub trait ModuleResolver: Send + Sync {
    /// Resolve `specifier` as imported from a file in `from_dir`.
    fn resolve(&self, from_dir: &Path, specifier: &str) -> Result<PathBuf, ResolveError>;
}

impl<F> ModuleResolver for F
where
    F: Fn(&Path, &str) -> Result<PathBuf, ResolveError> + Send + Sync,
{
    fn resolve(&self, from_dir: &Path, specifier: &str) -> Result<PathBuf, ResolveError> {
        self(from_dir, specifier)
    }
}

/// Reason codes for unresolved imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveReasonCode {
    SpecifierInvalid,
    UnsupportedScheme,
    NotFound,
    IsDirectory,
    NodeModulesNotFound,
    PackageMainNotFound,
}

impl std::fmt::Display for ResolveReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SpecifierInvalid => "SPECIFIER_INVALID",
            Self::UnsupportedScheme => "UNSUPPORTED_SCHEME",
            Self::NotFound => "NOT_FOUND",
            Self::IsDirectory => "IS_DIRECTORY",
            Self::NodeModulesNotFound => "NODE_MODULES_NOT_FOUND",
            Self::PackageMainNotFound => "PACKAGE_MAIN_NOT_FOUND",
        };
        write!(f, "{s}")
    }
}

/// Resolution failure.
#[derive(Debug, Clone, Error)]
#[error("Can't resolve '{specifier}' in '{}' ({reason})", .from_dir.display())]
pub struct ResolveError {
    pub specifier: String,
    pub from_dir: PathBuf,
    pub reason: ResolveReasonCode,
    /// Candidate paths tried (capped).
    pub tried: Vec<PathBuf>,
}

impl ResolveError {
    #[must_use]
    pub fn new(specifier: &str, from_dir: &Path, reason: ResolveReasonCode) -> Self {
        Self {
            specifier: specifier.to_string(),
            from_dir: from_dir.to_path_buf(),
            reason,
            tried: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_tried(mut self, tried: Vec<PathBuf>) -> Self {
        self.tried = tried;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_names_specifier_and_dir() {
        let err = ResolveError::new("./missing", Path::new("/app/src"), ResolveReasonCode::NotFound);
        assert_eq!(
            err.to_string(),
            "Can't resolve './missing' in '/app/src' (NOT_FOUND)"
        );
    }

    #[test]
    fn test_closure_is_a_resolver() {
        let resolver = |dir: &Path, spec: &str| -> Result<PathBuf, ResolveError> {
            Ok(dir.join(format!("{spec}.ts")))
        };
        let resolved = resolver.resolve(Path::new("/app"), "util").unwrap();
        assert_eq!(resolved, PathBuf::from("/app/util.ts"));
    }
}
