//! # Raw and Typed Configuration Values
//!
//! [`RawValue`] is whatever the document collaborator parsed: an untyped
//! JSON-shaped tree. [`ConfigValue`] is the validated counterpart, produced
//! by the evaluator field by field as each raw leaf passes its type check.
//!
//! Scalar type checks use the closed tag set [`ScalarKind`]. Adding a scalar
//! type means adding a variant here and a match arm in
//! [`ScalarKind::coerce`]; the compiler then points at every other place that
//! needs to learn about it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An untyped configuration tree as supplied by the operator.
pub type RawValue = Value;

/// The closed set of scalar types a schema field may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    /// Accepts any value, including mappings and lists, without descent.
    Any,
    /// `true` / `false`.
    Bool,
    /// Signed 64-bit integer.
    Int,
    /// 64-bit float; integers widen.
    Float,
    /// UTF-8 string.
    String,
}

impl ScalarKind {
    /// Every kind, in declaration order.
    pub const ALL: [ScalarKind; 5] = [
        ScalarKind::Any,
        ScalarKind::Bool,
        ScalarKind::Int,
        ScalarKind::Float,
        ScalarKind::String,
    ];

    /// The type name used in operator-facing messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "Any",
            Self::Bool => "Bool",
            Self::Int => "Int",
            Self::Float => "Float",
            Self::String => "String",
        }
    }

    /// Look a kind up by its type name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// Convert a raw leaf into a typed value if its runtime tag matches.
    ///
    /// Returns `None` on mismatch. `Int` rejects integers that do not fit in
    /// `i64` and all non-integral numbers.
    pub fn coerce(&self, raw: &RawValue) -> Option<ConfigValue> {
        match (self, raw) {
            (Self::Any, v) => Some(ConfigValue::from_raw(v)),
            (Self::Bool, Value::Bool(b)) => Some(ConfigValue::Bool(*b)),
            (Self::Int, Value::Number(n)) => n.as_i64().map(ConfigValue::Int),
            (Self::Float, Value::Number(n)) => n.as_f64().map(ConfigValue::Float),
            (Self::String, Value::String(s)) => Some(ConfigValue::String(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated configuration value.
///
/// Serializes to the natural JSON shape (`Mapping` as an object, `Null` as
/// `null`, and so on).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// Explicit null (only produced for `Nullable` fields and `Any`).
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// String.
    String(String),
    /// Ordered list.
    List(Vec<ConfigValue>),
    /// Named fields.
    Mapping(BTreeMap<String, ConfigValue>),
}

impl ConfigValue {
    /// An empty mapping.
    pub fn empty_mapping() -> Self {
        Self::Mapping(BTreeMap::new())
    }

    /// Structural conversion of a raw tree, used for `Any`-typed fields.
    ///
    /// Integers outside the `i64` range become floats.
    pub fn from_raw(raw: &RawValue) -> Self {
        match raw {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::String(s.clone()),
            Value::Array(items) => Self::List(items.iter().map(Self::from_raw).collect()),
            Value::Object(map) => Self::Mapping(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_raw(v)))
                    .collect(),
            ),
        }
    }

    /// Convert back into an untyped tree, e.g. to build a mapping function's
    /// output from its input. Non-finite floats become `null`.
    pub fn to_raw(&self) -> RawValue {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::String(s) => Value::String(s.clone()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_raw).collect()),
            Self::Mapping(map) => Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_raw())).collect(),
            ),
        }
    }

    /// Field lookup on a mapping; `None` for other variants.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        match self {
            Self::Mapping(map) => map.get(key),
            _ => None,
        }
    }

    /// Follow a sequence of field names through nested mappings.
    pub fn get_path<'a, I>(&self, keys: I) -> Option<&ConfigValue>
    where
        I: IntoIterator<Item = &'a str>,
    {
        keys.into_iter().try_fold(self, |value, key| value.get(key))
    }

    /// The string payload, if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The integer payload, if this is an `Int`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The numeric payload as a float, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// The boolean payload, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The fields, if this is a `Mapping`.
    pub fn as_mapping(&self) -> Option<&BTreeMap<String, ConfigValue>> {
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// The items, if this is a `List`.
    pub fn as_list(&self) -> Option<&[ConfigValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Whether this is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}
