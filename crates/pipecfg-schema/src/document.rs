//! # Document Loading
//!
//! Reads operator documents and pipeline manifests from disk into
//! [`RawValue`]. The format follows the file extension: `.yaml`/`.yml` are
//! YAML, anything else is JSON.
//!
//! YAML input is restricted to its JSON-compatible subset. Tags are dropped
//! and non-string keys are stringified.

use std::path::Path;

use pipecfg_core::{ConfigPath, RawValue};
use serde_json::Value;
use thiserror::Error;

/// Failure to turn a file into a [`RawValue`].
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The file could not be read.
    #[error("cannot read '{path}': {source}")]
    Read {
        /// Path to the document.
        path: String,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The content is not valid YAML/JSON or uses unsupported YAML.
    #[error("document load error for '{path}': {reason}")]
    Parse {
        /// Path to the document, or `<inline>`.
        path: String,
        /// Reason the document could not be parsed.
        reason: String,
    },
}

/// Load a YAML or JSON document.
///
/// An empty YAML file loads as `null`, which the evaluator treats as the
/// empty document.
pub fn load_document(path: &Path) -> Result<RawValue, DocumentError> {
    let content = std::fs::read_to_string(path).map_err(|source| DocumentError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parsed = match ext {
        "yaml" | "yml" => parse_yaml_document(&content),
        _ => parse_json_document(&content),
    };
    parsed.map_err(|e| match e {
        DocumentError::Parse { reason, .. } => DocumentError::Parse {
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })
}

/// Parse YAML text.
pub fn parse_yaml_document(content: &str) -> Result<RawValue, DocumentError> {
    if content.trim().is_empty() {
        return Ok(Value::Null);
    }
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| inline(format!("invalid YAML: {e}")))?;
    yaml_to_json_value(&yaml).map_err(|e| inline(format!("YAML-to-JSON conversion failed: {e}")))
}

/// Parse JSON text.
pub fn parse_json_document(content: &str) -> Result<RawValue, DocumentError> {
    serde_json::from_str(content).map_err(|e| inline(format!("invalid JSON: {e}")))
}

fn inline(reason: String) -> DocumentError {
    DocumentError::Parse {
        path: "<inline>".to_string(),
        reason,
    }
}

/// Convert a `serde_yaml::Value` to a `serde_json::Value`.
///
/// Errors name the offending location as a [`ConfigPath`] so they read like
/// evaluation errors.
pub fn yaml_to_json_value(yaml: &serde_yaml::Value) -> Result<Value, String> {
    convert(yaml, &ConfigPath::root())
}

fn convert(yaml: &serde_yaml::Value, at: &ConfigPath) -> Result<Value, String> {
    use serde_yaml::Value as Yaml;

    match yaml {
        Yaml::Null => Ok(Value::Null),
        Yaml::Bool(b) => Ok(Value::Bool(*b)),
        Yaml::Number(n) => {
            let number = if let Some(i) = n.as_i64() {
                Some(serde_json::Number::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(serde_json::Number::from(u))
            } else {
                n.as_f64().and_then(serde_json::Number::from_f64)
            };
            number
                .map(Value::Number)
                .ok_or_else(|| format!("number {n} at {at} has no JSON form"))
        }
        Yaml::String(s) => Ok(Value::String(s.clone())),
        Yaml::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| convert(item, &at.index(i)))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Yaml::Mapping(map) => {
            let mut object = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                // Config keys are field names; scalars read as their text.
                let key = match k {
                    Yaml::String(s) => s.clone(),
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    _ => return Err(format!("mapping key at {at} is not a scalar")),
                };
                let value = convert(v, &at.child(key.as_str()))?;
                object.insert(key, value);
            }
            Ok(Value::Object(object))
        }
        // Operator documents carry no type tags; the schema decides types.
        Yaml::Tagged(tagged) => convert(&tagged.value, at),
    }
}
