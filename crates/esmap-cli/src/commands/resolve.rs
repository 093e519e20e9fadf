//! `esmap resolve`: show how one specifier would be rewritten.

use super::{absolutize, build_rewriter, OptionSource};
use esmap_core::RewriteKind;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct ResolveResult<'a> {
    ok: bool,
    specifier: &'a str,
    from: String,
    result: String,
    kind: RewriteKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

pub fn run(
    cwd: &Path,
    specifier: &str,
    from: &Path,
    source: &OptionSource,
    json: bool,
) -> Result<()> {
    let (rewriter, _) = build_rewriter(cwd, source, json)?;
    let from = absolutize(cwd, from);
    let rewritten = rewriter.rewrite(specifier, &from);

    if json {
        let result = ResolveResult {
            ok: true,
            specifier,
            from: from.display().to_string(),
            result: rewritten.specifier,
            kind: rewritten.kind,
            warning: rewritten.warning,
        };
        println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
    } else {
        println!("{}", rewritten.specifier);
        println!("  kind: {}", rewritten.kind);
    }

    Ok(())
}
