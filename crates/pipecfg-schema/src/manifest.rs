//! # Pipeline Manifests
//!
//! A YAML (or JSON) description of a pipeline, for pipelines whose
//! composites do not need a mapping function. Mapping functions are code
//! and can only be attached through the Rust API.
//!
//! ```yaml
//! name: nested
//! definitions:
//!   basic:
//!     config: { fields: { override_str: String, retries: { type: Int, default: 3 } } }
//!     inputs: { number: { type: Int, default: 1 } }
//!   wrap:
//!     solids:
//!       - { definition: basic, alias: inner }
//! nodes:
//!   - { definition: wrap }
//! resources:
//!   db: { config: { fields: { url: String } } }
//! ```
//!
//! Type expressions are scalar names (`String`, `Int`, `Float`, `Bool`,
//! `Any`), `[T]` for lists and `T?` for nullable values.
//!
//! Manifests are checked against the embedded `manifest.schema.json`
//! (Draft 2020-12) before they are interpreted, so structural mistakes are
//! reported with their JSON Pointer location.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use pipecfg_core::{RawValue, ScalarKind};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::document::{load_document, DocumentError};
use crate::field::{Field, FieldType, Schema};
use crate::pipeline::{
    InputDefinition, NodeDefinition, NodeInvocation, PipelineDefinition, ResourceDefinition,
};

const MANIFEST_SCHEMA: &str = include_str!("../schemas/manifest.schema.json");

/// Failure to turn a manifest into a [`PipelineDefinition`].
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The manifest file could not be loaded.
    #[error(transparent)]
    Load(#[from] DocumentError),

    /// The embedded manifest schema could not be compiled.
    #[error("manifest schema could not be compiled: {0}")]
    SchemaBuild(String),

    /// The manifest does not conform to the manifest schema.
    #[error("manifest validation failed:\n{}", .0.join("\n"))]
    Invalid(Vec<String>),

    /// The manifest is well-formed but inconsistent.
    #[error("invalid manifest: {0}")]
    Structure(String),

    /// A type expression names no known type.
    #[error("unknown type \"{0}\"")]
    UnknownType(String),
}

#[derive(Debug, Deserialize)]
struct ManifestSpec {
    name: String,
    #[serde(default)]
    definitions: BTreeMap<String, DefinitionSpec>,
    nodes: Vec<InvocationSpec>,
    #[serde(default)]
    resources: BTreeMap<String, ResourceSpec>,
}

#[derive(Debug, Deserialize)]
struct DefinitionSpec {
    config: Option<FieldSpec>,
    #[serde(default)]
    inputs: BTreeMap<String, InputSpec>,
    solids: Option<Vec<InvocationSpec>>,
}

#[derive(Debug, Deserialize)]
struct InvocationSpec {
    definition: String,
    alias: Option<String>,
    #[serde(default)]
    connected: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct InputSpec {
    #[serde(rename = "type")]
    kind: String,
    default: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ResourceSpec {
    config: Option<FieldSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TypeSpec {
    Named(String),
    Fields { fields: BTreeMap<String, FieldSpec> },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldSpec {
    Detailed {
        #[serde(rename = "type")]
        field_type: TypeSpec,
        required: Option<bool>,
        default: Option<Value>,
        description: Option<String>,
    },
    Short(TypeSpec),
}

/// Load, validate and interpret a manifest file.
pub fn load_manifest(path: &Path) -> Result<PipelineDefinition, ManifestError> {
    let raw = load_document(path)?;
    tracing::debug!(path = %path.display(), "loaded pipeline manifest");
    parse_manifest(&raw)
}

/// Validate and interpret an already parsed manifest.
pub fn parse_manifest(raw: &RawValue) -> Result<PipelineDefinition, ManifestError> {
    validate_manifest(raw)?;
    let spec: ManifestSpec = serde_json::from_value(raw.clone())
        .map_err(|e| ManifestError::Structure(e.to_string()))?;

    let mut builder = DefinitionBuilder::new(&spec.definitions);
    let nodes = spec
        .nodes
        .iter()
        .map(|inv| builder.invocation(inv))
        .collect::<Result<Vec<_>, _>>()?;

    let mut pipeline = PipelineDefinition::new(spec.name.clone(), nodes);
    for (name, resource) in &spec.resources {
        let mut definition = ResourceDefinition::new(name.clone());
        if let Some(config) = &resource.config {
            definition = definition.with_config(build_field(config)?);
        }
        pipeline = pipeline.with_resource(definition);
    }

    tracing::debug!(
        pipeline = pipeline.name(),
        definitions = spec.definitions.len(),
        nodes = pipeline.nodes().len(),
        "interpreted pipeline manifest"
    );
    Ok(pipeline)
}

/// Check a manifest against the embedded manifest schema.
pub fn validate_manifest(raw: &RawValue) -> Result<(), ManifestError> {
    let schema: Value = serde_json::from_str(MANIFEST_SCHEMA)
        .map_err(|e| ManifestError::SchemaBuild(e.to_string()))?;
    let mut opts = jsonschema::options();
    opts.with_draft(jsonschema::Draft::Draft202012);
    let validator = opts
        .build(&schema)
        .map_err(|e| ManifestError::SchemaBuild(e.to_string()))?;

    let violations: Vec<String> = validator
        .iter_errors(raw)
        .map(|e| {
            let location = e.instance_path.to_string();
            if location.is_empty() {
                format!("  (root): {e}")
            } else {
                format!("  {location}: {e}")
            }
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ManifestError::Invalid(violations))
    }
}

/// Resolves definitions by name, sharing each built definition between its
/// invocations and rejecting reference cycles.
struct DefinitionBuilder<'a> {
    specs: &'a BTreeMap<String, DefinitionSpec>,
    built: HashMap<String, Arc<NodeDefinition>>,
    visiting: Vec<String>,
}

impl<'a> DefinitionBuilder<'a> {
    fn new(specs: &'a BTreeMap<String, DefinitionSpec>) -> Self {
        Self {
            specs,
            built: HashMap::new(),
            visiting: Vec::new(),
        }
    }

    fn invocation(&mut self, spec: &InvocationSpec) -> Result<NodeInvocation, ManifestError> {
        let definition = self.definition(&spec.definition)?;
        let mut invocation = NodeInvocation::new(Arc::clone(&definition));
        if let Some(alias) = &spec.alias {
            invocation = invocation.alias(alias.clone());
        }
        for input in &spec.connected {
            if !definition.inputs().iter().any(|i| i.name() == input) {
                return Err(ManifestError::Structure(format!(
                    "input \"{input}\" is not declared by definition \"{}\"",
                    definition.name()
                )));
            }
            invocation = invocation.connect_input(input.clone());
        }
        Ok(invocation)
    }

    fn definition(&mut self, name: &str) -> Result<Arc<NodeDefinition>, ManifestError> {
        if let Some(built) = self.built.get(name) {
            return Ok(Arc::clone(built));
        }
        if self.visiting.iter().any(|v| v == name) {
            return Err(ManifestError::Structure(format!(
                "definition cycle: {} -> {name}",
                self.visiting.join(" -> ")
            )));
        }
        let specs = self.specs;
        let spec = specs
            .get(name)
            .ok_or_else(|| ManifestError::Structure(format!("unknown definition \"{name}\"")))?;

        self.visiting.push(name.to_string());
        let result = self.build(name, spec);
        self.visiting.pop();

        let definition = Arc::new(result?);
        self.built.insert(name.to_string(), Arc::clone(&definition));
        Ok(definition)
    }

    fn build(
        &mut self,
        name: &str,
        spec: &DefinitionSpec,
    ) -> Result<NodeDefinition, ManifestError> {
        let mut definition = match &spec.solids {
            Some(inner) => {
                let nodes = inner
                    .iter()
                    .map(|inv| self.invocation(inv))
                    .collect::<Result<Vec<_>, _>>()?;
                NodeDefinition::composite(name, nodes)
            }
            None => {
                let mut leaf = NodeDefinition::leaf(name);
                if let Some(config) = &spec.config {
                    leaf = leaf.with_config(build_field(config)?);
                }
                leaf
            }
        };

        for (input_name, input) in &spec.inputs {
            let kind = ScalarKind::from_name(&input.kind)
                .ok_or_else(|| ManifestError::UnknownType(input.kind.clone()))?;
            let mut declared = InputDefinition::new(input_name.clone(), kind);
            if let Some(default) = &input.default {
                declared = declared.with_default(default.clone());
            }
            definition = definition.with_input(declared);
        }
        Ok(definition)
    }
}

fn build_field(spec: &FieldSpec) -> Result<Field, ManifestError> {
    match spec {
        FieldSpec::Short(type_spec) => Ok(field_of(build_type(type_spec)?)),
        FieldSpec::Detailed {
            field_type,
            required,
            default,
            description,
        } => {
            let mut field = field_of(build_type(field_type)?);
            if *required == Some(false) {
                field = field.optional();
            }
            if let Some(default) = default {
                field = field.with_default(default.clone());
            }
            if let Some(description) = description {
                field = field.with_description(description.clone());
            }
            Ok(field)
        }
    }
}

fn field_of(field_type: FieldType) -> Field {
    match field_type {
        FieldType::Mapping(schema) => Field::mapping(schema),
        other => Field::new(other),
    }
}

fn build_type(spec: &TypeSpec) -> Result<FieldType, ManifestError> {
    match spec {
        TypeSpec::Named(expr) => parse_type_expr(expr),
        TypeSpec::Fields { fields } => {
            let mut schema = Schema::new();
            for (name, field) in fields {
                schema.insert(name.clone(), build_field(field)?);
            }
            Ok(FieldType::Mapping(schema))
        }
    }
}

/// Parse `String`, `[Int]`, `Bool?`, `[Float?]`, ...
fn parse_type_expr(expr: &str) -> Result<FieldType, ManifestError> {
    let unknown = || ManifestError::UnknownType(expr.to_string());
    if let Some(inner) = expr.strip_suffix('?') {
        return Ok(FieldType::Nullable(Box::new(parse_type_expr(inner)?)));
    }
    if let Some(inner) = expr.strip_prefix('[') {
        let inner = inner.strip_suffix(']').ok_or_else(unknown)?;
        return Ok(FieldType::List(Box::new(parse_type_expr(inner)?)));
    }
    ScalarKind::from_name(expr)
        .map(FieldType::Scalar)
        .ok_or_else(unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::document::parse_yaml_document;

    const NESTED: &str = r#"
name: nested
definitions:
  basic:
    config:
      fields:
        override_str: String
        retries: { type: Int, default: 3 }
        tags: { type: "[String]", required: false, description: Labels }
    inputs:
      number: { type: Int, default: 1 }
      text: { type: String }
  wrap:
    solids:
      - { definition: basic, alias: inner, connected: [text] }
nodes:
  - { definition: wrap }
  - { definition: basic }
resources:
  db:
    config: { fields: { url: String } }
"#;

    #[test]
    fn test_parse_nested_manifest() {
        let raw = parse_yaml_document(NESTED).unwrap();
        let pipeline = parse_manifest(&raw).unwrap();
        assert_eq!(pipeline.name(), "nested");
        assert_eq!(pipeline.nodes().len(), 2);
        assert_eq!(pipeline.resources().len(), 1);

        let wrap = pipeline.nodes()[0].definition();
        assert!(wrap.is_composite());
        let inner = &wrap.inner_nodes()[0];
        assert_eq!(inner.name(), "inner");
        let open: Vec<&str> = inner.unconnected_inputs().map(InputDefinition::name).collect();
        assert_eq!(open, vec!["number"]);

        let config = pipeline.nodes()[1].definition().config_field().unwrap();
        assert!(config.is_required());
        let schema = config.schema().unwrap();
        assert!(!schema.get("retries").unwrap().is_required());
        assert_eq!(schema.get("tags").unwrap().description(), Some("Labels"));
        assert_eq!(schema.get("tags").unwrap().field_type().type_name(), "[String]");
    }

    #[test]
    fn test_type_expressions() {
        assert_eq!(parse_type_expr("[Float?]").unwrap().type_name(), "[Float?]");
        assert_eq!(parse_type_expr("[[Int]]").unwrap().type_name(), "[[Int]]");
        assert!(matches!(
            parse_type_expr("Decimal"),
            Err(ManifestError::UnknownType(t)) if t == "Decimal"
        ));
        assert!(parse_type_expr("[Int").is_err());
    }

    #[test]
    fn test_schema_violation_is_located() {
        let raw = json!({"name": "p", "nodes": [{"alias": "x"}]});
        match parse_manifest(&raw).unwrap_err() {
            ManifestError::Invalid(violations) => {
                assert!(violations.iter().any(|v| v.contains("/nodes/0")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_config_and_solids_are_exclusive() {
        let raw = json!({
            "name": "p",
            "definitions": {"c": {"config": "String", "solids": []}},
            "nodes": []
        });
        assert!(matches!(parse_manifest(&raw), Err(ManifestError::Invalid(_))));
    }

    #[test]
    fn test_unknown_definition() {
        let raw = json!({"name": "p", "nodes": [{"definition": "ghost"}]});
        assert!(matches!(
            parse_manifest(&raw),
            Err(ManifestError::Structure(m)) if m.contains("ghost")
        ));
    }

    #[test]
    fn test_definition_cycle() {
        let raw = json!({
            "name": "p",
            "definitions": {
                "a": {"solids": [{"definition": "b"}]},
                "b": {"solids": [{"definition": "a"}]}
            },
            "nodes": [{"definition": "a"}]
        });
        match parse_manifest(&raw).unwrap_err() {
            ManifestError::Structure(m) => assert_eq!(m, "definition cycle: a -> b -> a"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_undeclared_connected_input() {
        let raw = json!({
            "name": "p",
            "definitions": {"leaf": {}},
            "nodes": [{"definition": "leaf", "connected": ["x"]}]
        });
        assert!(matches!(parse_manifest(&raw), Err(ManifestError::Structure(_))));
    }

    #[test]
    fn test_load_manifest_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");
        std::fs::write(&path, NESTED).unwrap();
        assert_eq!(load_manifest(&path).unwrap().name(), "nested");
    }
}
