pub mod resolve;
pub mod rewrite;
pub mod version;

use esmap_core::config::{load_options, ResolvedOptions, RewriteOptions};
use esmap_core::{Error, ImportRewriter};
use esmap_util::path::normalize_lexically;
use miette::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Exit code for fatal errors (missing or broken import map, bad config).
pub const EXIT_ERROR: i32 = 1;

/// Rewrite options given on the command line, plus the config file to layer them on.
#[derive(Debug, Clone, Default)]
pub struct OptionSource {
    pub overrides: RewriteOptions,
    pub config: Option<PathBuf>,
}

/// Error info for JSON output.
#[derive(Serialize)]
struct ErrorInfo {
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorReport {
    ok: bool,
    error: ErrorInfo,
}

/// Merge config file and flags, load the import map, and build the rewriter.
///
/// Failures here are fatal for every command that rewrites.
pub fn build_rewriter(
    cwd: &Path,
    source: &OptionSource,
    json: bool,
) -> Result<(ImportRewriter, ResolvedOptions)> {
    let loaded = load_options(cwd, source.config.as_deref()).or_else(|e| fail(&e, json))?;
    let file_options = loaded.map(|(_, options)| options).unwrap_or_default();
    let options = file_options.merge(source.overrides.clone()).resolve();

    tracing::debug!(
        dir = %options.dir,
        import_map = ?options.import_map,
        use_node_resolver = options.use_node_resolver,
        "rewrite options"
    );

    let rewriter = ImportRewriter::load(cwd, &options).or_else(|e| fail(&e, json))?;
    tracing::debug!(entries = rewriter.import_map().len(), "import map loaded");
    Ok((rewriter, options))
}

/// Report a fatal error. In JSON mode a single error object goes to stdout
/// and the process exits; otherwise the error is returned for miette to render.
fn fail<T>(err: &Error, json: bool) -> Result<T> {
    if json {
        let report = ErrorReport {
            ok: false,
            error: ErrorInfo {
                code: err.code(),
                message: err.to_string(),
            },
        };
        match serde_json::to_string_pretty(&report) {
            Ok(out) => println!("{out}"),
            Err(_) => eprintln!("error: {err}"),
        }
        std::process::exit(EXIT_ERROR);
    }
    Err(miette::miette!("{err}"))
}

/// Anchor a user-supplied path at `cwd`.
pub fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_lexically(path)
    } else {
        normalize_lexically(&cwd.join(path))
    }
}
