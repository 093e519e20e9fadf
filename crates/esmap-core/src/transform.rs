//! Source transformation: rewrite every import site of a file in place.
//!
//! The scanner finds the sites, the [`ImportRewriter`] decides each
//! replacement, and the literal's contents are swapped while quotes and
//! surrounding code stay byte-for-byte identical.

use crate::imports::{escape_specifier, scan_import_sites, SiteKind};
use crate::rewrite::{ImportRewriter, RewriteKind, Rewritten};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// What happened at one import site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteRewrite {
    #[serde(rename = "site")]
    pub kind: SiteKind,
    pub line: u32,
    pub original: String,
    #[serde(flatten)]
    pub rewritten: Rewritten,
}

impl SiteRewrite {
    #[must_use]
    pub fn changed(&self) -> bool {
        self.original != self.rewritten.specifier
    }
}

/// Result of transforming one source text.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransformOutput {
    pub code: String,
    pub sites: Vec<SiteRewrite>,
    /// Dynamic imports left alone because their argument is not a literal.
    pub skipped_non_literal: usize,
}

impl TransformOutput {
    /// Whether any specifier was replaced.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.sites.iter().any(SiteRewrite::changed)
    }

    /// Warnings raised while rewriting, in source order.
    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.sites
            .iter()
            .filter_map(|s| s.rewritten.warning.as_deref())
    }

    /// Number of sites that took the given rewrite branch.
    #[must_use]
    pub fn count(&self, kind: RewriteKind) -> usize {
        self.sites
            .iter()
            .filter(|s| s.rewritten.kind == kind)
            .count()
    }
}

/// Rewrite every import site in `source`, which lives at `file`.
#[must_use]
pub fn transform_source(source: &str, file: &Path, rewriter: &ImportRewriter) -> TransformOutput {
    let mut output = TransformOutput {
        code: String::with_capacity(source.len()),
        ..TransformOutput::default()
    };
    let mut last = 0;

    for site in scan_import_sites(source) {
        let Some(specifier) = site.specifier else {
            tracing::trace!(
                file = %file.display(),
                line = site.line,
                "skipping non-literal dynamic import"
            );
            output.skipped_non_literal += 1;
            continue;
        };

        let rewritten = rewriter.rewrite(&specifier, file);

        output.code.push_str(&source[last..site.span.start]);
        if rewritten.specifier == specifier {
            output.code.push_str(&source[site.span.clone()]);
        } else {
            output
                .code
                .push_str(&escape_specifier(&rewritten.specifier, site.quote));
        }
        last = site.span.end;

        output.sites.push(SiteRewrite {
            kind: site.kind,
            line: site.line,
            original: specifier,
            rewritten,
        });
    }

    output.code.push_str(&source[last..]);
    output
}

/// Outcome for one file of a batch.
#[derive(Debug)]
pub struct FileTransform {
    pub path: PathBuf,
    pub result: std::io::Result<TransformOutput>,
}

/// Read and transform many files in parallel.
///
/// A file that cannot be read is reported in its own entry; the rest of the
/// batch still runs. Results keep the order of `paths`.
#[must_use]
pub fn transform_files(paths: &[PathBuf], rewriter: &ImportRewriter) -> Vec<FileTransform> {
    paths
        .par_iter()
        .map(|path| {
            let result = esmap_util::fs::read_to_string_lossy(path)
                .map(|source| transform_source(&source, path, rewriter));
            if let Err(e) = &result {
                tracing::warn!(file = %path.display(), error = %e, "failed to read source file");
            }
            FileTransform {
                path: path.clone(),
                result,
            }
        })
        .collect()
}
