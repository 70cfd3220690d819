//! # Environment Schema and Config
//!
//! [`EnvironmentSchema`] is the composed, immutable root schema of one
//! pipeline. It is cheap to clone and safe to share across threads; every
//! call to [`EnvironmentSchema::evaluate`] owns its own context.
//!
//! [`EnvironmentConfig`] is the validated result, addressed by
//! [`NodeHandle`] so the execution engine does not have to know how
//! composites nest their entries.

use std::sync::Arc;

use pipecfg_core::{ConfigValue, NodeHandle, PipecfgError, RawValue, SchemaFingerprint};

use crate::compose::{compose_environment_schema, CompositionError};
use crate::errors::EvaluationErrors;
use crate::evaluate::evaluate_document;
use crate::field::Schema;
use crate::pipeline::PipelineDefinition;
use crate::sections::{RESOURCES_SECTION, SOLIDS_SECTION};

/// The composed root schema of a pipeline.
#[derive(Debug, Clone)]
pub struct EnvironmentSchema {
    pipeline_name: String,
    schema: Arc<Schema>,
}

impl EnvironmentSchema {
    /// Compose the schema of `pipeline`.
    pub fn compose(pipeline: &PipelineDefinition) -> Result<Self, CompositionError> {
        Ok(Self {
            pipeline_name: pipeline.name().to_string(),
            schema: Arc::new(compose_environment_schema(pipeline)?),
        })
    }

    /// Name of the pipeline this schema was composed from.
    pub fn pipeline_name(&self) -> &str {
        &self.pipeline_name
    }

    /// The root schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// SHA-256 over the canonical rendering of the root schema.
    pub fn fingerprint(&self) -> Result<SchemaFingerprint, PipecfgError> {
        self.schema.fingerprint()
    }

    /// Evaluate an operator document. `None` is the empty document.
    pub fn evaluate(&self, raw: Option<&RawValue>) -> Result<EnvironmentConfig, EvaluationErrors> {
        let _span =
            tracing::debug_span!("evaluate", pipeline = %self.pipeline_name).entered();
        evaluate_document(&self.schema, raw).map(EnvironmentConfig::new)
    }
}

/// A fully validated environment.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentConfig {
    value: ConfigValue,
}

impl EnvironmentConfig {
    fn new(value: ConfigValue) -> Self {
        Self { value }
    }

    /// The entry of a node: its `config`, `inputs`, and (for composites)
    /// `solids`. Mapped composites expose the translated inner config under
    /// `solids` too.
    pub fn node_entry(&self, handle: &NodeHandle) -> Option<&ConfigValue> {
        let mut entries = self.value.get(SOLIDS_SECTION)?;
        let mut entry: Option<&ConfigValue> = None;
        for alias in handle.aliases() {
            if let Some(current) = entry {
                entries = current.get(SOLIDS_SECTION)?;
            }
            entry = Some(entries.get(alias)?);
        }
        entry
    }

    /// The validated config of a node. For a mapped composite this is the
    /// value the operator wrote against the exposed schema.
    pub fn node_config(&self, handle: &NodeHandle) -> Option<&ConfigValue> {
        self.node_entry(handle)?.get("config")
    }

    /// The configured value of a node's unconnected input.
    pub fn input_value(&self, handle: &NodeHandle, input: &str) -> Option<&ConfigValue> {
        self.node_entry(handle)?.get_path(["inputs", input, "value"])
    }

    /// A root section (`loggers`, `execution`, ...).
    pub fn section(&self, name: &str) -> Option<&ConfigValue> {
        self.value.get(name)
    }

    /// The validated config of a resource.
    pub fn resource_config(&self, name: &str) -> Option<&ConfigValue> {
        self.value.get_path([RESOURCES_SECTION, name, "config"])
    }

    /// The whole value tree.
    pub fn as_value(&self) -> &ConfigValue {
        &self.value
    }

    /// Consume into the whole value tree.
    pub fn into_value(self) -> ConfigValue {
        self.value
    }
}
