//! # pipecfg-cli — Command-Line Interface
//!
//! Provides the `pipecfg` binary.
//!
//! ## Subcommands
//!
//! - `pipecfg validate --pipeline <manifest> --config <document>`: evaluate a
//!   config document and print either a summary or the full error report.
//! - `pipecfg schema --pipeline <manifest>`: print the composed schema and
//!   its fingerprint.
//!
//! ## Exit codes
//!
//! `0` success, `1` the document is invalid, `2` the manifest or document
//! could not be loaded.
//!
//! ## Crate Policy
//!
//! - Argument parsing lives here; evaluation lives in `pipecfg-schema`.
//! - Handlers return `anyhow::Result<u8>` and never exit the process.

pub mod schema;
pub mod validate;

use clap::ValueEnum;

/// Output format shared by the subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}
