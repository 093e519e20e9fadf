use esmap_core::version::{version_string, VERSION};
use miette::{IntoDiagnostic, Result};

pub fn run(json: bool) -> Result<()> {
    if json {
        let out = serde_json::json!({ "name": "esmap", "version": VERSION });
        println!("{}", serde_json::to_string_pretty(&out).into_diagnostic()?);
    } else {
        println!("{}", version_string());
    }
    Ok(())
}
