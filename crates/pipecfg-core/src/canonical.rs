//! # Canonical Serialization — JCS-Compatible Byte Production
//!
//! `CanonicalBytes` is the only input accepted by
//! [`crate::digest::SchemaFingerprint::of`]. Schema fingerprints must be
//! stable across processes and across semantically identical constructions,
//! so every fingerprint flows through one normalization pipeline:
//!
//! 1. **Serialize to a JSON value tree** via `serde_json::to_value`.
//! 2. **Drop null object members**: an absent `Option` and an explicit
//!    `None` that was serialized as `null` describe the same structure.
//! 3. **Render with `serde_jcs`** (RFC 8785): sorted keys, compact
//!    separators, deterministic number formatting.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// # Invariants
///
/// - The only constructor is `CanonicalBytes::new()`.
/// - Object keys are sorted; separators are compact.
/// - Object members whose value is `null` are absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::SerializationFailed` if the value cannot
    /// be represented as JSON, or `CanonicalizationError::Rendering` if JCS
    /// rendering fails.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        let normalized = drop_null_members(value);
        let rendered = serde_jcs::to_string(&normalized)
            .map_err(|e| CanonicalizationError::Rendering(e.to_string()))?;
        Ok(Self(rendered.into_bytes()))
    }

    /// Access the canonical bytes for fingerprinting.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Recursively remove `null` members from objects. Array elements are kept
/// as-is (a `null` inside a list is positional data).
fn drop_null_members(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, drop_null_members(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(drop_null_members).collect()),
        other => other,
    }
}
