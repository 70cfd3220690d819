//! # pipecfg-schema — Config Schemas, Composition & Evaluation
//!
//! Turns a pipeline's structure into the schema its configuration document
//! must satisfy, and evaluates operator documents against it.
//!
//! ## Pipeline
//!
//! 1. [`compose`] derives an [`EnvironmentSchema`] from a
//!    [`PipelineDefinition`]: one node entry per alias, nested through
//!    composites, plus `resources` and the engine [`sections`].
//! 2. [`evaluate`] walks a raw document against that schema. Every problem
//!    is recorded with its path; siblings keep evaluating.
//! 3. [`mapping`] runs the config mapping of a composite behind a boundary
//!    that captures both returned errors and panics, then validates the
//!    function's output against the composite's inner schema.
//! 4. [`errors`] aggregates. The caller gets a complete
//!    [`EnvironmentConfig`] or a complete [`EvaluationErrors`] report.
//!
//! Pipelines come from the builder API in [`pipeline`] or from a YAML
//! [`manifest`]; operator documents load through [`document`].
//!
//! ## Crate Policy
//!
//! - Depends only on `pipecfg-core` internally.
//! - Configuration problems are data, never panics or `Err` from inner
//!   evaluation functions.
//! - Composed schemas are immutable and `Send + Sync`.

pub mod compose;
pub mod document;
pub mod environment;
pub mod errors;
pub mod evaluate;
pub mod field;
pub mod manifest;
pub mod mapping;
pub mod pipeline;
pub mod sections;

pub use compose::{
    compose_environment_schema, compose_solids_schema, CompositionError, MAX_COMPOSITION_DEPTH,
};
pub use document::{load_document, parse_json_document, parse_yaml_document, DocumentError};
pub use environment::{EnvironmentConfig, EnvironmentSchema};
pub use errors::{ErrorCollector, ErrorKind, EvaluationError, EvaluationErrors};
pub use evaluate::{evaluate_document, EvaluationContext};
pub use field::{Field, FieldType, Schema};
pub use manifest::{load_manifest, parse_manifest, validate_manifest, ManifestError};
pub use mapping::{ConfigMapping, ExceptionInfo, MappedComposite, MappingResult};
pub use pipeline::{
    InputDefinition, NodeDefinition, NodeInvocation, NodeKind, PipelineDefinition,
    ResourceDefinition,
};
pub use sections::RootSections;
