//! Integration tests for `esmap rewrite`.

use serial_test::serial;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-p", "esmap-cli", "--bin", "esmap", "--"]);
    cmd
}

fn run_in(cwd: &Path, args: &[&str]) -> Output {
    cargo_bin()
        .arg("--cwd")
        .arg(cwd)
        .args(args)
        .output()
        .expect("Failed to run esmap")
}

/// Project with `web_modules/import-map.json` and a couple of sources.
fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("web_modules")).unwrap();
    fs::create_dir_all(root.join("src/lib")).unwrap();
    fs::write(
        root.join("web_modules/import-map.json"),
        r#"{"imports":{"react":"react.js","lit":"https://cdn.example.com/lit.js"}}"#,
    )
    .unwrap();
    fs::write(
        root.join("src/main.js"),
        "import React from \"react\";\nimport { html } from 'lit';\nimport './lib/util';\n",
    )
    .unwrap();
    fs::write(root.join("src/lib/util.ts"), "export const x = 1;\n").unwrap();
    dir
}

#[test]
#[serial]
fn test_single_file_to_stdout() {
    let dir = project();
    let output = run_in(dir.path(), &["rewrite", "src/main.js"]);

    assert!(output.status.success(), "rewrite should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout,
        "import React from \"/web_modules/react.js\";\nimport { html } from 'https://cdn.example.com/lit.js';\nimport './lib/util';\n"
    );

    // Source untouched without --write.
    let source = fs::read_to_string(dir.path().join("src/main.js")).unwrap();
    assert!(source.contains("from \"react\""));
}

#[test]
#[serial]
fn test_write_in_place_with_node_resolver() {
    let dir = project();
    let output = run_in(
        dir.path(),
        &["rewrite", "src", "--write", "--use-node-resolver"],
    );

    assert!(output.status.success(), "rewrite --write should succeed");
    let main = fs::read_to_string(dir.path().join("src/main.js")).unwrap();
    assert!(main.contains("\"/web_modules/react.js\""));
    assert!(main.contains("'./lib/util.js'"));

    // Nothing to rewrite in util.ts, so it is left alone.
    let util = fs::read_to_string(dir.path().join("src/lib/util.ts")).unwrap();
    assert_eq!(util, "export const x = 1;\n");
}

#[test]
#[serial]
fn test_out_dir_mirrors_tree() {
    let dir = project();
    let output = run_in(dir.path(), &["rewrite", "src", "--out-dir", "dist"]);

    assert!(output.status.success(), "rewrite --out-dir should succeed");
    let main = fs::read_to_string(dir.path().join("dist/main.js")).unwrap();
    assert!(main.contains("\"/web_modules/react.js\""));
    assert!(dir.path().join("dist/lib/util.ts").is_file());
}

#[test]
#[serial]
fn test_json_report() {
    let dir = project();
    let output = run_in(dir.path(), &["--json", "rewrite", "src/main.js"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("stdout should be valid JSON");

    assert_eq!(json["ok"], true);
    assert_eq!(json["dir"], "web_modules");
    let file = &json["files"][0];
    assert_eq!(file["changed"], true);
    assert!(file["code"]
        .as_str()
        .unwrap()
        .contains("/web_modules/react.js"));

    let sites = file["sites"].as_array().unwrap();
    assert_eq!(sites.len(), 3);
    assert_eq!(sites[0]["site"], "import");
    assert_eq!(sites[0]["original"], "react");
    assert_eq!(sites[0]["specifier"], "/web_modules/react.js");
    assert_eq!(sites[0]["kind"], "mapped");
    assert_eq!(sites[2]["kind"], "source_unchanged");

    assert_eq!(json["summary"]["mapped"], 2);
    assert_eq!(json["summary"]["warnings"], 0);
}

#[test]
#[serial]
fn test_unmapped_bare_import_warns_and_continues() {
    let dir = project();
    fs::write(dir.path().join("src/main.js"), "import Vue from 'vue';\n").unwrap();

    let output = run_in(dir.path(), &["rewrite", "src/main.js"]);

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "import Vue from 'vue';\n"
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("bare import \"vue\" not found in import map, ignoring..."),
        "stderr should carry the warning: {stderr}"
    );
}

#[test]
#[serial]
fn test_missing_import_map_is_fatal() {
    let dir = project();
    fs::remove_file(dir.path().join("web_modules/import-map.json")).unwrap();

    let output = run_in(dir.path(), &["rewrite", "src/main.js"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Import map not found"));
    assert!(stderr.contains("import-map.local.json"));
    assert!(stderr.contains("import-map.json"));
}

#[test]
#[serial]
fn test_missing_import_map_json_error() {
    let dir = project();
    fs::remove_file(dir.path().join("web_modules/import-map.json")).unwrap();

    let output = run_in(dir.path(), &["--json", "rewrite", "src/main.js"]);

    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_str(&String::from_utf8_lossy(&output.stdout))
        .expect("stdout should be valid JSON");
    assert_eq!(json["ok"], false);
    assert_eq!(json["error"]["code"], "MAP_NOT_FOUND");
}

#[test]
#[serial]
fn test_local_import_map_takes_precedence() {
    let dir = project();
    fs::write(
        dir.path().join("web_modules/import-map.local.json"),
        r#"{"imports":{"react":"react.development.js"}}"#,
    )
    .unwrap();

    let output = run_in(dir.path(), &["rewrite", "src/main.js"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("/web_modules/react.development.js"));
}

#[test]
#[serial]
fn test_config_file_and_flag_override() {
    let dir = project();
    fs::create_dir_all(dir.path().join("static")).unwrap();
    fs::write(
        dir.path().join("static/deps.json"),
        r#"{"imports":{"react":"react.js"}}"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("esmap.config.json"),
        r#"{"dir":"static","importMap":"deps.json"}"#,
    )
    .unwrap();

    let output = run_in(dir.path(), &["rewrite", "src/main.js"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("\"/static/react.js\""));

    // The flag wins over the config file; the import map path still comes from it.
    let output = run_in(dir.path(), &["rewrite", "src/main.js", "--dir", "web_modules"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
#[serial]
fn test_multiple_files_need_an_output_mode() {
    let dir = project();
    fs::write(dir.path().join("src/other.js"), "import 'react';\n").unwrap();

    let output = run_in(dir.path(), &["rewrite", "src"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--out-dir or --write"));
}

#[test]
#[serial]
fn test_deprecated_optional_extensions_enables_resolver() {
    let dir = project();
    fs::write(
        dir.path().join("esmap.config.json"),
        r#"{"optionalExtensions":true}"#,
    )
    .unwrap();

    let output = run_in(dir.path(), &["--json", "rewrite", "src/main.js"]);

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_str(&String::from_utf8_lossy(&output.stdout))
        .expect("stdout should be valid JSON");
    assert_eq!(json["use_node_resolver"], true);
    assert!(json["deprecations"][0]
        .as_str()
        .unwrap()
        .contains("optionalExtensions"));
    assert!(json["files"][0]["code"]
        .as_str()
        .unwrap()
        .contains("'./lib/util.js'"));
    assert_eq!(json["files"][0]["sites"][2]["kind"], "resolved");
}

#[test]
#[serial]
fn test_flag_turns_off_resolver_enabled_in_config() {
    let dir = project();
    fs::write(
        dir.path().join("esmap.config.json"),
        r#"{"useNodeResolver":true}"#,
    )
    .unwrap();

    let output = run_in(dir.path(), &["rewrite", "src/main.js"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("'./lib/util.js'"));

    let output = run_in(
        dir.path(),
        &["rewrite", "src/main.js", "--no-use-node-resolver"],
    );
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("'./lib/util'"));
}
