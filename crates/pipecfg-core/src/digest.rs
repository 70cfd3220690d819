//! # Schema Fingerprints
//!
//! A [`SchemaFingerprint`] identifies a composed schema by the SHA-256 of its
//! canonical bytes. Two compositions of the same pipeline structure produce
//! the same fingerprint, so it can key a cache of composed schemas or be
//! recorded next to a validated document.
//!
//! Fingerprints render as `sha256:<64 lowercase hex digits>` and parse back
//! from that form. Only [`CanonicalBytes`] can be fingerprinted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::canonical::CanonicalBytes;

const PREFIX: &str = "sha256:";

/// SHA-256 over the canonical rendering of a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaFingerprint([u8; 32]);

impl SchemaFingerprint {
    /// Fingerprint canonical bytes.
    pub fn of(data: &CanonicalBytes) -> Self {
        Self(Sha256::digest(data.as_bytes()).into())
    }

    /// The raw digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex, without the algorithm prefix.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for SchemaFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}{}", self.to_hex())
    }
}

/// A string that is not `sha256:` followed by 64 hex digits.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid schema fingerprint {0:?}: expected sha256:<64 hex digits>")]
pub struct FingerprintParseError(String);

impl FromStr for SchemaFingerprint {
    type Err = FingerprintParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FingerprintParseError(s.to_string());
        let hex = s.strip_prefix(PREFIX).ok_or_else(invalid)?;
        if hex.len() != 64 || !hex.is_ascii() {
            return Err(invalid());
        }
        let mut bytes = [0u8; 32];
        for (byte, pair) in bytes.iter_mut().zip(hex.as_bytes().chunks(2)) {
            let pair = std::str::from_utf8(pair).map_err(|_| invalid())?;
            *byte = u8::from_str_radix(pair, 16).map_err(|_| invalid())?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for SchemaFingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SchemaFingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fingerprint(value: serde_json::Value) -> SchemaFingerprint {
        SchemaFingerprint::of(&CanonicalBytes::new(&value).unwrap())
    }

    #[test]
    fn test_empty_mapping_vector() {
        assert_eq!(
            fingerprint(json!({})).to_hex(),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let a = fingerprint(json!({"solids": {"a": 1}, "loggers": null}));
        let b: serde_json::Value =
            serde_json::from_str(r#"{"loggers": null, "solids": {"a": 1}}"#).unwrap();
        assert_eq!(a, fingerprint(b));
        assert_ne!(a, fingerprint(json!({"solids": {"a": 2}})));
    }

    #[test]
    fn test_display_parses_back() {
        let fp = fingerprint(json!({"fields": {"solids": "required"}}));
        let rendered = fp.to_string();
        assert!(rendered.starts_with("sha256:"));
        assert_eq!(rendered.len(), 7 + 64);
        assert_eq!(rendered.parse::<SchemaFingerprint>().unwrap(), fp);
    }

    #[test]
    fn test_serde_uses_string_form() {
        let fp = fingerprint(json!([1, 2, 3]));
        let encoded = serde_json::to_value(fp).unwrap();
        assert_eq!(encoded, json!(fp.to_string()));
        let decoded: SchemaFingerprint = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, fp);
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in [
            "",
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a",
            "sha256:abc",
            "sha256:zz136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a",
            "md5:44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a",
        ] {
            assert!(bad.parse::<SchemaFingerprint>().is_err(), "{bad}");
        }
    }
}
