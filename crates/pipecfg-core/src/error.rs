//! # Error Types — Structured Error Hierarchy
//!
//! Infrastructure errors shared across the workspace. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! Configuration problems found while evaluating an operator document are
//! *not* represented here: those are data (`EvaluationError` in
//! `pipecfg-schema`) and are always collected, never raised.

use thiserror::Error;

/// Top-level error type for pipecfg infrastructure failures.
#[derive(Error, Debug)]
pub enum PipecfgError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// The value could not be converted to a JSON value tree.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// JCS rendering of the value tree failed.
    #[error("JCS rendering failed: {0}")]
    Rendering(String),
}
