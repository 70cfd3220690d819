//! # Validator / Evaluator
//!
//! Walks a raw operator document against a composed [`Schema`], producing a
//! typed [`ConfigValue`] or recording path-qualified errors.
//!
//! ## Rules, per field in sorted order
//!
//! | raw value                         | outcome                                         |
//! |-----------------------------------|-------------------------------------------------|
//! | absent, required                  | `MissingRequiredField`, siblings continue       |
//! | absent, default                   | default, type-checked like a supplied value     |
//! | absent, all-optional mapping      | recurse with `{}` so nested defaults appear     |
//! | absent, otherwise optional        | omitted                                         |
//! | present, wrong runtime tag        | `TypeMismatch`, siblings continue               |
//! | present, mapping                  | recurse; errors join the same report            |
//! | undeclared key                    | `UnknownField`, siblings continue               |
//!
//! A JSON `null` counts as absent unless the field's type accepts null.
//!
//! A schema carrying a [`MappedComposite`](crate::mapping::MappedComposite)
//! hands its validated `config` to [`resolve_mapping`] and stores the
//! translated inner configuration under `solids`.
//!
//! An empty or absent document yields exactly one error: the first required
//! root section, in sorted order. Nothing below it is visited. Documents
//! with content get the per-field rules at every level, root included.

use std::collections::BTreeMap;

use pipecfg_core::{ConfigPath, ConfigValue, RawValue};
use serde_json::{Map, Value};

use crate::errors::{ErrorCollector, EvaluationError, EvaluationErrors};
use crate::field::{FieldType, Schema};
use crate::mapping::resolve_mapping;

/// Per-call evaluation state: the error collector. Paths are threaded
/// through the recursion as immutable values, so a context holds no
/// location of its own.
#[derive(Debug, Default)]
pub struct EvaluationContext {
    errors: ErrorCollector,
}

impl EvaluationContext {
    /// A fresh context for one top-level evaluation.
    pub fn new() -> Self {
        Self::default()
    }

    /// A separate context whose errors the caller inspects before merging,
    /// used to validate a mapping function's output.
    pub(crate) fn child(&self) -> Self {
        Self::new()
    }

    /// Record an error.
    pub fn record(&mut self, error: EvaluationError) {
        self.errors.push(error);
    }

    /// Consume into the recorded errors.
    pub fn into_errors(self) -> Vec<EvaluationError> {
        self.errors.into_errors()
    }

    /// Release `value` iff no error was recorded.
    pub fn finish<T>(self, value: Option<T>) -> Result<T, EvaluationErrors> {
        self.errors.finish(value)
    }
}

/// Evaluate a whole document against a root schema.
///
/// `None` and `null` are the empty document. Returns the full value tree or
/// the full, non-empty error report; never both, never a panic.
pub fn evaluate_document(
    schema: &Schema,
    raw: Option<&RawValue>,
) -> Result<ConfigValue, EvaluationErrors> {
    let empty = Value::Object(Map::new());
    let raw = match raw {
        None | Some(Value::Null) => &empty,
        Some(raw) => raw,
    };

    tracing::debug!(fields = schema.len(), "evaluating config document");
    let mut ctx = EvaluationContext::new();
    let root = ConfigPath::root();
    if raw.as_object().is_some_and(Map::is_empty) {
        if let Some((name, _)) = schema.fields().find(|(_, field)| field.is_required()) {
            ctx.record(EvaluationError::missing_field(&root, name, owned_names(schema)));
            let result = ctx.finish::<ConfigValue>(None);
            tracing::debug!("config document is empty");
            return result;
        }
    }
    let value = evaluate(schema, raw, &root, &mut ctx);
    let result = ctx.finish(value);
    match &result {
        Ok(_) => tracing::debug!("config document is valid"),
        Err(errors) => tracing::debug!(errors = errors.len(), "config document is invalid"),
    }
    result
}

/// Evaluate `raw` against `schema` at `path`, recording errors in `ctx`.
///
/// Returns `None` if anything in this subtree failed.
pub fn evaluate(
    schema: &Schema,
    raw: &RawValue,
    path: &ConfigPath,
    ctx: &mut EvaluationContext,
) -> Option<ConfigValue> {
    evaluate_mapping(schema, raw, path, ctx)
}

pub(crate) fn evaluate_mapping(
    schema: &Schema,
    raw: &RawValue,
    path: &ConfigPath,
    ctx: &mut EvaluationContext,
) -> Option<ConfigValue> {
    match raw {
        Value::Object(map) => evaluate_fields(schema, map, path, ctx),
        _ => {
            ctx.record(EvaluationError::not_a_mapping(path, owned_names(schema)));
            None
        }
    }
}

/// Evaluate a raw value against a field type.
pub fn evaluate_value(
    field_type: &FieldType,
    raw: &RawValue,
    path: &ConfigPath,
    ctx: &mut EvaluationContext,
) -> Option<ConfigValue> {
    match field_type {
        FieldType::Scalar(kind) => {
            let value = kind.coerce(raw);
            if value.is_none() {
                ctx.record(EvaluationError::scalar_mismatch(path, kind.as_str().to_string()));
            }
            value
        }
        FieldType::Nullable(inner) => match raw {
            Value::Null => Some(ConfigValue::Null),
            _ => evaluate_value(inner, raw, path, ctx),
        },
        FieldType::List(inner) => match raw {
            Value::Array(items) => {
                let mut ok = true;
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match evaluate_value(inner, item, &path.index(i), ctx) {
                        Some(v) => out.push(v),
                        None => ok = false,
                    }
                }
                ok.then_some(ConfigValue::List(out))
            }
            _ => {
                ctx.record(EvaluationError::not_a_list(path, field_type.type_name()));
                None
            }
        },
        FieldType::Mapping(schema) => evaluate_mapping(schema, raw, path, ctx),
    }
}

fn evaluate_fields(
    schema: &Schema,
    map: &Map<String, Value>,
    path: &ConfigPath,
    ctx: &mut EvaluationContext,
) -> Option<ConfigValue> {
    let mut ok = true;
    let mut out = BTreeMap::new();

    for (name, field) in schema.fields() {
        let child = path.child(name);
        let supplied = map
            .get(name)
            .filter(|v| !v.is_null() || field.field_type().is_nullable());

        let value = match supplied {
            Some(raw) => evaluate_value(field.field_type(), raw, &child, ctx),
            None => {
                if let Some(default) = field.default_value() {
                    evaluate_value(field.field_type(), default, &child, ctx)
                } else if field.is_required() {
                    ctx.record(EvaluationError::missing_field(path, name, owned_names(schema)));
                    None
                } else {
                    match field.schema() {
                        Some(inner) if inner.all_optional() => {
                            evaluate_fields(inner, &Map::new(), &child, ctx)
                        }
                        _ => continue,
                    }
                }
            }
        };

        match value {
            Some(v) => {
                out.insert(name.to_string(), v);
            }
            None => ok = false,
        }
    }

    let mut undeclared: Vec<&String> = map.keys().filter(|k| !schema.contains(k)).collect();
    undeclared.sort();
    for key in undeclared {
        ctx.record(EvaluationError::unknown_field(path, key, owned_names(schema)));
        ok = false;
    }

    if !ok {
        return None;
    }

    if let Some(mapped) = schema.mapped_composite() {
        let outer = out.get("config").cloned().unwrap_or(ConfigValue::Null);
        let inner = resolve_mapping(mapped, &outer, path, ctx)?;
        out.insert("solids".to_string(), inner);
    }

    Some(ConfigValue::Mapping(out))
}

fn owned_names(schema: &Schema) -> Vec<String> {
    schema.field_names().into_iter().map(str::to_string).collect()
}
