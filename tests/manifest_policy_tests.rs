#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Manifest policy tests.
//!
//! The crate promises panic-free library code; these tests keep the lint
//! table and the feature wiring that enforce it from drifting.

use std::path::PathBuf;

fn manifest() -> toml::Table {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml");
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read '{}': {e}", path.display()));
    text.parse::<toml::Table>()
        .unwrap_or_else(|e| panic!("Cargo.toml does not parse: {e}"))
}

fn table<'a>(value: &'a toml::Table, key: &str) -> &'a toml::Table {
    value
        .get(key)
        .and_then(toml::Value::as_table)
        .unwrap_or_else(|| panic!("Cargo.toml is missing [{key}]"))
}

#[test]
fn panic_prone_lints_are_denied() {
    let manifest = manifest();
    let clippy = table(table(&manifest, "lints"), "clippy");
    for lint in [
        "unwrap_used",
        "expect_used",
        "panic",
        "todo",
        "unimplemented",
        "indexing_slicing",
    ] {
        assert_eq!(
            clippy.get(lint).and_then(toml::Value::as_str),
            Some("deny"),
            "[lints.clippy] must set `{lint} = \"deny\"`"
        );
    }
}

#[test]
fn websocket_transport_is_default_and_optional() {
    let manifest = manifest();
    let features = table(&manifest, "features");
    let default: Vec<&str> = features["default"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(toml::Value::as_str)
        .collect();
    assert!(default.contains(&"transport-websocket"));

    let deps = table(&manifest, "dependencies");
    for dep in ["tokio-tungstenite", "futures-util"] {
        let optional = deps[dep]
            .as_table()
            .and_then(|t| t.get("optional"))
            .and_then(toml::Value::as_bool);
        assert_eq!(optional, Some(true), "`{dep}` must stay optional");
    }
}

#[test]
fn rust_version_is_declared() {
    let manifest = manifest();
    let package = table(&manifest, "package");
    let msrv = package
        .get("rust-version")
        .and_then(toml::Value::as_str)
        .expect("Cargo.toml must declare a rust-version");
    assert!(msrv.split('.').count() >= 2, "malformed rust-version '{msrv}'");
}

#[test]
fn demos_are_registered() {
    let manifest = manifest();
    let examples = manifest["example"].as_array().unwrap();
    for example in examples {
        let path = example["path"].as_str().unwrap();
        let full = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(path);
        assert!(full.is_file(), "example path '{path}' does not exist");
    }
}

#[test]
fn futures_util_is_not_a_dev_dependency() {
    let manifest = manifest();
    let dev = table(&manifest, "dev-dependencies");
    assert!(
        !dev.contains_key("futures-util"),
        "`futures-util` is only needed by the optional WebSocket transport"
    );
}

fn rust_sources(dir: &std::path::Path, out: &mut Vec<PathBuf>) {
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            rust_sources(&path, out);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            out.push(path);
        }
    }
}

#[test]
fn function_signatures_fit_the_line_width() {
    let mut files = Vec::new();
    rust_sources(&PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src"), &mut files);
    assert!(!files.is_empty());

    for file in files {
        let text = std::fs::read_to_string(&file).unwrap();
        for (n, line) in text.lines().enumerate() {
            let code = line.trim_start();
            let is_signature = ["fn ", "pub fn ", "async fn ", "pub async fn "]
                .iter()
                .any(|prefix| code.starts_with(prefix));
            assert!(
                !is_signature || line.chars().count() <= 100,
                "{}:{} exceeds 100 columns",
                file.display(),
                n + 1
            );
        }
    }
}
