//! # Pipeline Structure
//!
//! The read-only view of a pipeline that schema composition needs: which
//! nodes exist under which alias, what config each declares, which inputs are
//! left for the operator to supply, and which composites translate their
//! config through a [`ConfigMapping`].
//!
//! Graph construction and dependency wiring belong to the pipeline
//! collaborator; here a wired input is simply marked as connected.

use std::collections::BTreeSet;
use std::sync::Arc;

use pipecfg_core::{RawValue, ScalarKind};

use crate::field::Field;
use crate::mapping::ConfigMapping;
use crate::sections::RootSections;

/// An input a node consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct InputDefinition {
    name: String,
    kind: ScalarKind,
    default: Option<RawValue>,
}

impl InputDefinition {
    /// An input of the given scalar kind.
    pub fn new(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
        }
    }

    /// Value used when the input is neither connected nor configured.
    pub fn with_default(mut self, default: impl Into<RawValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Input name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared scalar kind.
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    /// Default value, if any.
    pub fn default_value(&self) -> Option<&RawValue> {
        self.default.as_ref()
    }
}

/// Leaf or composite.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// A node that runs user code with its own config.
    Leaf {
        /// Declared config field; `None` means the node takes no config.
        config: Option<Field>,
    },
    /// A node bundling an inner sub-pipeline.
    Composite {
        /// Inner invocations, in declaration order.
        nodes: Vec<NodeInvocation>,
        /// Optional translation from an exposed schema to inner config.
        mapping: Option<ConfigMapping>,
    },
}

/// A reusable node definition.
#[derive(Debug, Clone)]
pub struct NodeDefinition {
    name: String,
    inputs: Vec<InputDefinition>,
    kind: NodeKind,
}

impl NodeDefinition {
    /// A leaf definition without config.
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            kind: NodeKind::Leaf { config: None },
        }
    }

    /// A composite definition over `nodes`, without a mapping.
    pub fn composite(name: impl Into<String>, nodes: Vec<NodeInvocation>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            kind: NodeKind::Composite {
                nodes,
                mapping: None,
            },
        }
    }

    /// Set the config field of a leaf. Ignored for composites, whose config
    /// is defined by their mapping.
    pub fn with_config(mut self, field: Field) -> Self {
        if let NodeKind::Leaf { config } = &mut self.kind {
            *config = Some(field);
        }
        self
    }

    /// Attach a config mapping to a composite. Ignored for leaves.
    pub fn with_mapping(mut self, config_mapping: ConfigMapping) -> Self {
        if let NodeKind::Composite { mapping, .. } = &mut self.kind {
            *mapping = Some(config_mapping);
        }
        self
    }

    /// Declare an input.
    pub fn with_input(mut self, input: InputDefinition) -> Self {
        self.inputs.push(input);
        self
    }

    /// Definition name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared inputs.
    pub fn inputs(&self) -> &[InputDefinition] {
        &self.inputs
    }

    /// Leaf or composite payload.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Whether this definition bundles inner nodes.
    pub fn is_composite(&self) -> bool {
        matches!(self.kind, NodeKind::Composite { .. })
    }

    /// The config mapping, for composites that declare one.
    pub fn config_mapping(&self) -> Option<&ConfigMapping> {
        match &self.kind {
            NodeKind::Composite { mapping, .. } => mapping.as_ref(),
            NodeKind::Leaf { .. } => None,
        }
    }

    /// The leaf's own config field.
    pub fn config_field(&self) -> Option<&Field> {
        match &self.kind {
            NodeKind::Leaf { config } => config.as_ref(),
            NodeKind::Composite { .. } => None,
        }
    }

    /// Inner invocations of a composite; empty for leaves.
    pub fn inner_nodes(&self) -> &[NodeInvocation] {
        match &self.kind {
            NodeKind::Composite { nodes, .. } => nodes,
            NodeKind::Leaf { .. } => &[],
        }
    }
}

/// A use of a definition under an alias.
#[derive(Debug, Clone)]
pub struct NodeInvocation {
    alias: String,
    definition: Arc<NodeDefinition>,
    connected_inputs: BTreeSet<String>,
}

impl NodeInvocation {
    /// Invoke `definition` under its own name.
    pub fn new(definition: impl Into<Arc<NodeDefinition>>) -> Self {
        let definition = definition.into();
        Self {
            alias: definition.name().to_string(),
            definition,
            connected_inputs: BTreeSet::new(),
        }
    }

    /// Rename the invocation.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    /// Mark an input as satisfied by an upstream dependency.
    pub fn connect_input(mut self, input: impl Into<String>) -> Self {
        self.connected_inputs.insert(input.into());
        self
    }

    /// The alias.
    pub fn name(&self) -> &str {
        &self.alias
    }

    /// The invoked definition.
    pub fn definition(&self) -> &NodeDefinition {
        &self.definition
    }

    /// Inputs the operator must (or may) supply through `inputs`.
    pub fn unconnected_inputs(&self) -> impl Iterator<Item = &InputDefinition> {
        self.definition
            .inputs()
            .iter()
            .filter(|i| !self.connected_inputs.contains(i.name()))
    }
}

/// A resource the pipeline uses, with its config field.
#[derive(Debug, Clone)]
pub struct ResourceDefinition {
    name: String,
    config: Option<Field>,
}

impl ResourceDefinition {
    /// A resource without config.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: None,
        }
    }

    /// Set the config field.
    pub fn with_config(mut self, field: Field) -> Self {
        self.config = Some(field);
        self
    }

    /// Resource name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Config field, if any.
    pub fn config_field(&self) -> Option<&Field> {
        self.config.as_ref()
    }
}

/// The pipeline as the composer sees it.
#[derive(Debug, Clone)]
pub struct PipelineDefinition {
    name: String,
    nodes: Vec<NodeInvocation>,
    resources: Vec<ResourceDefinition>,
    sections: RootSections,
}

impl PipelineDefinition {
    /// A pipeline with the standard root sections and no resources.
    pub fn new(name: impl Into<String>, nodes: Vec<NodeInvocation>) -> Self {
        Self {
            name: name.into(),
            nodes,
            resources: Vec::new(),
            sections: RootSections::standard(),
        }
    }

    /// Declare a resource.
    pub fn with_resource(mut self, resource: ResourceDefinition) -> Self {
        self.resources.push(resource);
        self
    }

    /// Replace the non-node root sections.
    pub fn with_sections(mut self, sections: RootSections) -> Self {
        self.sections = sections;
        self
    }

    /// Pipeline name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Top-level invocations.
    pub fn nodes(&self) -> &[NodeInvocation] {
        &self.nodes
    }

    /// Declared resources.
    pub fn resources(&self) -> &[ResourceDefinition] {
        &self.resources
    }

    /// Root sections besides `solids` and `resources`.
    pub fn sections(&self) -> &RootSections {
        &self.sections
    }
}
