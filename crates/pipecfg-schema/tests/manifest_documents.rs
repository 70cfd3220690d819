//! Integration tests: manifests and operator documents loaded from disk.

use std::path::{Path, PathBuf};

use pipecfg_core::{ConfigValue, NodeHandle};
use pipecfg_schema::{load_document, load_manifest, EnvironmentSchema, ErrorKind};

const MANIFEST: &str = r#"
name: ingest
definitions:
  fetch:
    config:
      fields:
        url: String
        timeout_secs: { type: Float, default: 30 }
        headers: { type: "[String]", required: false }
    inputs:
      since: { type: String, default: "1970-01-01" }
  store:
    config: { type: "String?", description: Target table }
    inputs:
      rows: { type: Any }
  fetch_and_store:
    solids:
      - { definition: fetch }
      - { definition: store, connected: [rows] }
nodes:
  - { definition: fetch_and_store, alias: daily }
resources:
  warehouse:
    config: { fields: { dsn: String } }
"#;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn environment(dir: &Path) -> EnvironmentSchema {
    let pipeline = load_manifest(&write(dir, "pipeline.yaml", MANIFEST)).unwrap();
    EnvironmentSchema::compose(&pipeline).unwrap()
}

#[test]
fn yaml_document_evaluates_against_manifest_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let env = environment(dir.path());
    let doc = load_document(&write(
        dir.path(),
        "env.yaml",
        r#"
solids:
  daily:
    solids:
      fetch:
        config:
          url: https://example.invalid/feed
          headers: [accept-json]
      store:
        config: null
resources:
  warehouse:
    config: { dsn: "postgres://localhost/wh" }
"#,
    ))
    .unwrap();

    let config = env.evaluate(Some(&doc)).unwrap();
    let fetch = NodeHandle::parse("daily.fetch").unwrap();
    let fetch_config = config.node_config(&fetch).unwrap();
    assert_eq!(fetch_config.get("timeout_secs").and_then(ConfigValue::as_f64), Some(30.0));
    assert_eq!(
        config.input_value(&fetch, "since").and_then(ConfigValue::as_str),
        Some("1970-01-01")
    );

    let store = NodeHandle::parse("daily.store").unwrap();
    assert!(config.node_config(&store).is_some_and(ConfigValue::is_null));
    assert!(config.input_value(&store, "rows").is_none());

    assert_eq!(
        config
            .resource_config("warehouse")
            .and_then(|c| c.get("dsn"))
            .and_then(ConfigValue::as_str),
        Some("postgres://localhost/wh")
    );
}

#[test]
fn json_document_errors_are_all_reported() {
    let dir = tempfile::tempdir().unwrap();
    let env = environment(dir.path());
    let doc = load_document(&write(
        dir.path(),
        "env.json",
        r#"{
            "solids": {"daily": {"solids": {
                "fetch": {"config": {"timeout_secs": "soon", "retries": 2}},
                "store": {"config": "t"}
            }}},
            "execution": {"multiprocess": {"config": {"max_concurrent": "four"}}}
        }"#,
    ))
    .unwrap();

    let errors = env.evaluate(Some(&doc)).unwrap_err();
    let found: Vec<(ErrorKind, String)> = errors
        .iter()
        .map(|e| (e.kind(), e.path().to_string()))
        .collect();
    assert_eq!(
        found,
        vec![
            (
                ErrorKind::TypeMismatch,
                "root:execution:multiprocess:config:max_concurrent".to_string()
            ),
            (ErrorKind::MissingRequiredField, "root:resources".to_string()),
            (
                ErrorKind::TypeMismatch,
                "root:solids:daily:solids:fetch:config:timeout_secs".to_string()
            ),
            (
                ErrorKind::MissingRequiredField,
                "root:solids:daily:solids:fetch:config:url".to_string()
            ),
            (
                ErrorKind::UnknownField,
                "root:solids:daily:solids:fetch:config:retries".to_string()
            ),
        ]
    );
}
