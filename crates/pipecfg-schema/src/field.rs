//! # Schema Model
//!
//! [`Field`] and [`Schema`] describe the shape operators must write. They
//! carry no validation logic; the evaluator interprets them.
//!
//! ## Invariants
//!
//! - Field names within one `Schema` are unique (they are map keys).
//! - A field with a default is never required.
//! - Field names enumerate in sorted order, which is also the order in which
//!   the evaluator visits them and reports errors.
//! - Nesting is acyclic: schemas are values, built bottom-up.

use std::collections::BTreeMap;
use std::sync::Arc;

use pipecfg_core::{CanonicalBytes, PipecfgError, RawValue, ScalarKind, SchemaFingerprint};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::mapping::MappedComposite;

/// The declared type of a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// A scalar from the closed tag set.
    Scalar(ScalarKind),
    /// A homogeneous list.
    List(Box<FieldType>),
    /// The inner type, or an explicit `null`.
    Nullable(Box<FieldType>),
    /// A nested mapping of named fields.
    Mapping(Schema),
}

impl FieldType {
    /// The type name used in operator-facing messages.
    pub fn type_name(&self) -> String {
        match self {
            Self::Scalar(kind) => kind.as_str().to_string(),
            Self::List(inner) => format!("[{}]", inner.type_name()),
            Self::Nullable(inner) => format!("{}?", inner.type_name()),
            Self::Mapping(_) => "Dict".to_string(),
        }
    }

    /// The nested schema, if this is a mapping.
    pub fn schema(&self) -> Option<&Schema> {
        match self {
            Self::Mapping(schema) => Some(schema),
            _ => None,
        }
    }

    /// Whether `null` is an acceptable value.
    pub fn is_nullable(&self) -> bool {
        matches!(self, Self::Nullable(_) | Self::Scalar(ScalarKind::Any))
    }
}

impl From<ScalarKind> for FieldType {
    fn from(kind: ScalarKind) -> Self {
        Self::Scalar(kind)
    }
}

/// One schema node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    #[serde(rename = "type")]
    field_type: FieldType,
    required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl Field {
    /// A required field of the given type.
    pub fn new(field_type: impl Into<FieldType>) -> Self {
        Self {
            field_type: field_type.into(),
            required: true,
            default: None,
            description: None,
        }
    }

    /// A required scalar field.
    pub fn scalar(kind: ScalarKind) -> Self {
        Self::new(FieldType::Scalar(kind))
    }

    /// A nested mapping field, required iff `schema` has a required field.
    pub fn mapping(schema: Schema) -> Self {
        let required = schema.has_required_fields();
        Self {
            required,
            ..Self::new(FieldType::Mapping(schema))
        }
    }

    /// Mark the field optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Set a default value. The field becomes optional.
    pub fn with_default(mut self, default: impl Into<RawValue>) -> Self {
        self.default = Some(default.into());
        self.required = false;
        self
    }

    /// Attach a human-readable description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether operators must supply this field.
    pub fn is_required(&self) -> bool {
        self.required && self.default.is_none()
    }

    /// The default value, if any.
    pub fn default_value(&self) -> Option<&RawValue> {
        self.default.as_ref()
    }

    /// The declared type.
    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    /// The nested schema, if this field is a mapping.
    pub fn schema(&self) -> Option<&Schema> {
        self.field_type.schema()
    }

    /// The description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// A mapping from unique field names to [`Field`]s.
///
/// A schema may carry a [`MappedComposite`] attachment: it then describes the
/// config entry of a composite node whose `config` is translated by a user
/// mapping function into configuration for the composite's inner nodes.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: BTreeMap<String, Field>,
    mapped: Option<Arc<MappedComposite>>,
}

impl Schema {
    /// An empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add or replace a field.
    pub fn with_field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    /// Add a field. Returns `false` (and leaves the schema unchanged) if the
    /// name is already taken.
    pub fn insert(&mut self, name: impl Into<String>, field: Field) -> bool {
        let name = name.into();
        if self.fields.contains_key(&name) {
            return false;
        }
        self.fields.insert(name, field);
        true
    }

    pub(crate) fn with_mapped_composite(mut self, mapped: MappedComposite) -> Self {
        self.mapped = Some(Arc::new(mapped));
        self
    }

    /// Look a field up by name.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Whether a field of this name is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Field names, sorted.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    /// Fields in evaluation order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no fields are declared.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether any field must be supplied by the operator.
    pub fn has_required_fields(&self) -> bool {
        self.fields.values().any(Field::is_required)
    }

    /// Whether every field may be omitted.
    pub fn all_optional(&self) -> bool {
        !self.has_required_fields()
    }

    /// The config-mapping attachment, if this schema is a mapped composite's
    /// config entry.
    pub fn mapped_composite(&self) -> Option<&MappedComposite> {
        self.mapped.as_deref()
    }

    /// SHA-256 over the canonical rendering of this schema.
    ///
    /// Structurally identical schemas (same names, types, required flags,
    /// defaults, descriptions, mapping attachments) have equal fingerprints.
    pub fn fingerprint(&self) -> Result<SchemaFingerprint, PipecfgError> {
        Ok(SchemaFingerprint::of(&CanonicalBytes::new(self)?))
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields && self.mapped.as_deref() == other.mapped.as_deref()
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.mapped.is_some() { 2 } else { 1 };
        let mut state = serializer.serialize_struct("Schema", len)?;
        state.serialize_field("fields", &self.fields)?;
        if let Some(mapped) = self.mapped.as_deref() {
            state.serialize_field("config_mapping", mapped)?;
        }
        state.end()
    }
}
