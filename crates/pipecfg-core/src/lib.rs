//! # pipecfg-core — Foundational Types for Pipeline Configuration
//!
//! This crate holds the primitives every other `pipecfg` crate builds on.
//! It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Closed scalar tag set.** `ScalarKind` is the complete list of scalar
//!    types a schema can declare. Type checks compare the declared tag with
//!    the runtime shape of a raw value; there is no open-ended reflection.
//!
//! 2. **Raw vs. typed values.** Operator documents arrive as `RawValue`
//!    (`serde_json::Value`). Only the evaluator produces `ConfigValue`, and
//!    only after the whole document validated.
//!
//! 3. **Paths are values.** `ConfigPath` is immutable and append-only;
//!    recursion threads `path.child(..)` instead of mutating shared state.
//!
//! 4. **`CanonicalBytes` for digests.** Schema fingerprints are computed over
//!    JCS-canonical bytes only, so equal structures always hash equally.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `pipecfg-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod path;
pub mod value;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{FingerprintParseError, SchemaFingerprint};
pub use error::{CanonicalizationError, PipecfgError};
pub use path::{ConfigPath, NodeHandle, PathSegment};
pub use value::{ConfigValue, RawValue, ScalarKind};
