//! # Schema Composer
//!
//! Builds the root [`Schema`] an operator document is evaluated against,
//! from the structure of a [`PipelineDefinition`].
//!
//! Each node invocation contributes a *node entry* under its alias:
//!
//! - `config`: the leaf's config field, or for a mapped composite the
//!   exposed schema.
//! - `inputs`: one `{ value: <scalar> }` entry per unconnected input.
//! - `solids`: for a composite without a mapping, the entries of its inner
//!   nodes, composed recursively.
//!
//! A mapped composite's inner nodes are composed too, but only the resolver
//! sees them: they live in the entry's [`MappedComposite`] attachment.
//!
//! Composition is pure. The same pipeline always yields an equal schema with
//! an equal fingerprint.

use pipecfg_core::NodeHandle;
use thiserror::Error;

use crate::field::{Field, Schema};
use crate::mapping::MappedComposite;
use crate::pipeline::{NodeInvocation, PipelineDefinition};
use crate::sections::{RESOURCES_SECTION, SOLIDS_SECTION};

/// Deepest composite nesting the composer accepts.
pub const MAX_COMPOSITION_DEPTH: usize = 64;

/// Structural problems found while composing a pipeline's schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositionError {
    /// Two invocations at the same level share an alias.
    #[error("duplicate node alias \"{alias}\" in {scope}")]
    DuplicateAlias {
        /// The repeated alias.
        alias: String,
        /// Enclosing composite handle, or the pipeline name.
        scope: String,
    },

    /// Composites nest deeper than [`MAX_COMPOSITION_DEPTH`].
    #[error("composite nesting at \"{handle}\" exceeds the maximum depth of {max}")]
    DepthExceeded {
        /// Handle of the first node past the limit.
        handle: String,
        /// The limit.
        max: usize,
    },

    /// Two resources share a name.
    #[error("duplicate resource \"{0}\"")]
    DuplicateResource(String),

    /// An engine section uses a name reserved for nodes or resources.
    #[error("root section \"{0}\" is reserved")]
    ReservedSection(String),
}

/// Compose the root schema of `pipeline`.
///
/// The root holds `solids` (required iff some node entry is required),
/// `resources`, and each engine section from the pipeline's
/// [`RootSections`](crate::sections::RootSections).
pub fn compose_environment_schema(
    pipeline: &PipelineDefinition,
) -> Result<Schema, CompositionError> {
    let mut root = Schema::new();

    let solids = compose_solids_schema(pipeline.nodes(), None, pipeline.name(), 1)?;
    root.insert(SOLIDS_SECTION, Field::mapping(solids));

    let mut resources = Schema::new();
    for resource in pipeline.resources() {
        let mut entry = Schema::new();
        if let Some(config) = resource.config_field() {
            entry.insert("config", config.clone());
        }
        if !resources.insert(resource.name(), Field::mapping(entry)) {
            return Err(CompositionError::DuplicateResource(resource.name().to_string()));
        }
    }
    root.insert(RESOURCES_SECTION, Field::mapping(resources));

    for (name, field) in pipeline.sections().iter() {
        if !root.insert(name, field.clone()) {
            return Err(CompositionError::ReservedSection(name.to_string()));
        }
    }

    tracing::debug!(
        pipeline = pipeline.name(),
        nodes = pipeline.nodes().len(),
        sections = root.len(),
        "composed environment schema"
    );
    Ok(root)
}

/// Compose one level of node entries, keyed by alias.
///
/// `parent` is the enclosing composite (`None` at the pipeline root) and
/// `scope` names it in duplicate-alias errors.
pub fn compose_solids_schema(
    invocations: &[NodeInvocation],
    parent: Option<&NodeHandle>,
    scope: &str,
    depth: usize,
) -> Result<Schema, CompositionError> {
    let mut schema = Schema::new();
    for invocation in invocations {
        let handle = match parent {
            Some(p) => p.child(invocation.name()),
            None => NodeHandle::new(invocation.name()),
        };
        if depth > MAX_COMPOSITION_DEPTH {
            return Err(CompositionError::DepthExceeded {
                handle: handle.to_string(),
                max: MAX_COMPOSITION_DEPTH,
            });
        }
        let entry = compose_node_entry(invocation, &handle, depth)?;
        if !schema.insert(invocation.name(), Field::mapping(entry)) {
            return Err(CompositionError::DuplicateAlias {
                alias: invocation.name().to_string(),
                scope: scope.to_string(),
            });
        }
    }
    Ok(schema)
}

fn compose_node_entry(
    invocation: &NodeInvocation,
    handle: &NodeHandle,
    depth: usize,
) -> Result<Schema, CompositionError> {
    let definition = invocation.definition();
    let mut entry = Schema::new();

    let inputs = compose_inputs(invocation);
    if !inputs.is_empty() {
        entry.insert("inputs", Field::mapping(inputs));
    }

    if !definition.is_composite() {
        if let Some(config) = definition.config_field() {
            entry.insert("config", config.clone());
        }
        return Ok(entry);
    }

    let scope = handle.to_string();
    let inner = compose_solids_schema(definition.inner_nodes(), Some(handle), &scope, depth + 1)?;

    match definition.config_mapping() {
        None => {
            entry.insert("solids", Field::mapping(inner));
            Ok(entry)
        }
        Some(mapping) => {
            entry.insert("config", Field::mapping(mapping.exposed_schema().clone()));
            tracing::trace!(
                handle = %handle,
                function = mapping.fn_name(),
                "composed mapped composite"
            );
            Ok(entry.with_mapped_composite(MappedComposite {
                handle: handle.clone(),
                definition_name: definition.name().to_string(),
                mapping: mapping.clone(),
                inner,
            }))
        }
    }
}

fn compose_inputs(invocation: &NodeInvocation) -> Schema {
    let mut inputs = Schema::new();
    for input in invocation.unconnected_inputs() {
        let value = match input.default_value() {
            Some(default) => Field::scalar(input.kind()).with_default(default.clone()),
            None => Field::scalar(input.kind()),
        };
        inputs.insert(input.name(), Field::mapping(Schema::new().with_field("value", value)));
    }
    inputs
}
