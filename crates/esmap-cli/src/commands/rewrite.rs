//! `esmap rewrite`: rewrite import specifiers in source files.
//!
//! Output goes to one of three places:
//! - stdout, for a single input file (the default)
//! - back into the input files, with `--write` (only files that changed)
//! - a mirror of the input tree under `--out-dir` (every file)

use super::{absolutize, build_rewriter, OptionSource, EXIT_ERROR};
use esmap_core::{transform_files, RewriteKind, SiteRewrite, TransformOutput};
use esmap_util::fs::{atomic_write, collect_files};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// File extensions picked up when walking directories.
pub const SOURCE_EXTENSIONS: &[&str] = &["js", "mjs", "jsx", "ts", "tsx"];

/// Parsed `rewrite` invocation.
#[derive(Debug, Clone)]
pub struct RewriteAction {
    pub paths: Vec<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub write: bool,
    pub options: OptionSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Output {
    Stdout,
    InPlace,
    Mirror(PathBuf),
}

#[derive(Debug)]
struct Input {
    path: PathBuf,
    /// Path relative to the root it was found under.
    relative: PathBuf,
}

#[derive(Serialize)]
struct FileReport {
    path: String,
    changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    written: Option<String>,
    sites: Vec<SiteRewrite>,
    skipped_non_literal: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize, Default)]
struct Summary {
    files: usize,
    changed: usize,
    written: usize,
    failed: usize,
    warnings: usize,
    mapped: usize,
    remote: usize,
    unmapped_bare: usize,
    source_unchanged: usize,
    resolved: usize,
    degraded: usize,
}

impl Summary {
    fn add(&mut self, out: &TransformOutput) {
        self.files += 1;
        if out.changed() {
            self.changed += 1;
        }
        self.warnings += out.warnings().count();
        self.mapped += out.count(RewriteKind::Mapped);
        self.remote += out.count(RewriteKind::Remote);
        self.unmapped_bare += out.count(RewriteKind::UnmappedBare);
        self.source_unchanged += out.count(RewriteKind::SourceUnchanged);
        self.resolved += out.count(RewriteKind::Resolved);
        self.degraded += out.count(RewriteKind::Degraded);
    }

    fn rewritten(&self) -> usize {
        self.mapped + self.resolved + self.degraded
    }
}

#[derive(Serialize)]
struct RewriteReport {
    ok: bool,
    dir: String,
    use_node_resolver: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    deprecations: Vec<&'static str>,
    files: Vec<FileReport>,
    summary: Summary,
}

pub fn run(cwd: &Path, action: &RewriteAction, json: bool) -> Result<()> {
    let (rewriter, options) = build_rewriter(cwd, &action.options, json)?;

    let output = match (&action.out_dir, action.write) {
        (Some(dir), _) => Output::Mirror(absolutize(cwd, dir)),
        (None, true) => Output::InPlace,
        (None, false) => Output::Stdout,
    };

    let inputs = collect_inputs(cwd, &action.paths)?;
    if inputs.is_empty() {
        tracing::warn!("no source files found");
    }
    if output == Output::Stdout && inputs.len() > 1 {
        return Err(miette::miette!(
            "{} files matched; pass --out-dir or --write to rewrite more than one file",
            inputs.len()
        ));
    }

    let paths: Vec<PathBuf> = inputs.iter().map(|i| i.path.clone()).collect();
    let results = transform_files(&paths, &rewriter);

    let mut summary = Summary::default();
    let mut files = Vec::with_capacity(results.len());

    for (input, transformed) in inputs.iter().zip(results) {
        let out = match transformed.result {
            Ok(out) => out,
            Err(e) => {
                summary.failed += 1;
                files.push(FileReport {
                    path: input.path.display().to_string(),
                    changed: false,
                    written: None,
                    sites: Vec::new(),
                    skipped_non_literal: 0,
                    code: None,
                    error: Some(e.to_string()),
                });
                continue;
            }
        };
        summary.add(&out);

        let dest = match &output {
            Output::Stdout => None,
            Output::InPlace => out.changed().then(|| input.path.clone()),
            Output::Mirror(root) => Some(root.join(&input.relative)),
        };

        let mut error = None;
        let written = match dest {
            Some(dest) => match atomic_write(&dest, out.code.as_bytes()) {
                Ok(()) => {
                    tracing::debug!(file = %dest.display(), "wrote rewritten source");
                    summary.written += 1;
                    Some(dest.display().to_string())
                }
                Err(e) => {
                    tracing::warn!(file = %dest.display(), error = %e, "failed to write output");
                    summary.failed += 1;
                    error = Some(format!("failed to write {}: {e}", dest.display()));
                    None
                }
            },
            None => None,
        };

        let changed = out.changed();
        let TransformOutput {
            code,
            sites,
            skipped_non_literal,
        } = out;

        files.push(FileReport {
            path: input.path.display().to_string(),
            changed,
            written,
            sites,
            skipped_non_literal,
            code: (output == Output::Stdout).then_some(code),
            error,
        });
    }

    let failed = summary.failed;

    if json {
        let report = RewriteReport {
            ok: failed == 0,
            dir: options.dir.clone(),
            use_node_resolver: options.use_node_resolver,
            deprecations: options.deprecations.iter().map(|d| d.message()).collect(),
            files,
            summary,
        };
        println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
        if failed > 0 {
            std::process::exit(EXIT_ERROR);
        }
        return Ok(());
    }

    for file in &files {
        if let Some(err) = &file.error {
            eprintln!("error: {}: {err}", file.path);
        }
    }

    if output == Output::Stdout {
        if let Some(code) = files.iter().find_map(|f| f.code.as_deref()) {
            print!("{code}");
        }
    } else {
        println!(
            "Rewrote {} specifier(s) in {} of {} file(s), wrote {} file(s), {} warning(s)",
            summary.rewritten(),
            summary.changed,
            summary.files,
            summary.written,
            summary.warnings
        );
    }

    if failed > 0 {
        return Err(miette::miette!("{failed} file(s) could not be processed"));
    }
    Ok(())
}

/// Expand the command line paths into source files, deduplicated, in order.
fn collect_inputs(cwd: &Path, paths: &[PathBuf]) -> Result<Vec<Input>> {
    let mut seen = HashSet::new();
    let mut inputs = Vec::new();

    for path in paths {
        let root = absolutize(cwd, path);
        if !root.exists() {
            return Err(miette::miette!("path not found: {}", root.display()));
        }
        let base = if root.is_file() {
            root.parent().map_or_else(|| root.clone(), Path::to_path_buf)
        } else {
            root.clone()
        };

        for file in collect_files(&root, SOURCE_EXTENSIONS) {
            if !seen.insert(file.clone()) {
                continue;
            }
            let relative = file
                .strip_prefix(&base)
                .map_or_else(|_| file.clone(), Path::to_path_buf);
            inputs.push(Input {
                path: file,
                relative,
            });
        }
    }

    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_collect_inputs_relative_to_each_root() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("a.js"), "").unwrap();
        fs::write(src.join("nested/b.ts"), "").unwrap();
        fs::write(src.join("notes.md"), "").unwrap();

        let inputs = collect_inputs(dir.path(), &[PathBuf::from("src")]).unwrap();
        let relative: Vec<_> = inputs.iter().map(|i| i.relative.clone()).collect();
        assert_eq!(
            relative,
            vec![PathBuf::from("a.js"), PathBuf::from("nested/b.ts")]
        );
    }

    #[test]
    fn test_collect_inputs_single_file_and_dedup() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("main.mjs"), "").unwrap();

        let inputs = collect_inputs(
            dir.path(),
            &[PathBuf::from("main.mjs"), PathBuf::from("./main.mjs")],
        )
        .unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].relative, PathBuf::from("main.mjs"));
    }

    #[test]
    fn test_collect_inputs_missing_path() {
        let dir = tempdir().unwrap();
        let err = collect_inputs(dir.path(), &[PathBuf::from("nope")]).unwrap_err();
        assert!(err.to_string().contains("path not found"));
    }
}
