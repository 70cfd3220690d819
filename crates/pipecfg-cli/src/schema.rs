//! # Schema Subcommand
//!
//! Prints the composed config schema of a pipeline manifest together with
//! its fingerprint, so operators can see every field a document may set.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use pipecfg_core::SchemaFingerprint;
use pipecfg_schema::{load_manifest, EnvironmentSchema, Schema};

use crate::OutputFormat;

/// Arguments for the schema subcommand.
#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Pipeline manifest (YAML or JSON).
    #[arg(long)]
    pub pipeline: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct SchemaReport<'a> {
    pipeline: &'a str,
    fingerprint: SchemaFingerprint,
    schema: &'a Schema,
}

/// Execute the schema subcommand, writing to stdout.
pub fn run_schema(args: &SchemaArgs) -> Result<u8> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    schema_to(args, &mut out)
}

/// Execute the schema subcommand, writing to `out`.
pub fn schema_to(args: &SchemaArgs, out: &mut impl Write) -> Result<u8> {
    let pipeline = load_manifest(&args.pipeline)
        .with_context(|| format!("loading pipeline manifest {}", args.pipeline.display()))?;
    let env = EnvironmentSchema::compose(&pipeline)
        .with_context(|| format!("composing config schema of pipeline {}", pipeline.name()))?;
    let fingerprint = env.fingerprint().context("fingerprinting composed schema")?;
    tracing::info!(pipeline = env.pipeline_name(), %fingerprint, "composed config schema");

    match args.format {
        OutputFormat::Text => {
            let rendered = serde_json::to_string_pretty(env.schema())
                .context("serializing composed schema")?;
            writeln!(out, "{rendered}")?;
            writeln!(out, "fingerprint: {fingerprint}")?;
        }
        OutputFormat::Json => {
            let report = SchemaReport {
                pipeline: env.pipeline_name(),
                fingerprint,
                schema: env.schema(),
            };
            serde_json::to_writer_pretty(&mut *out, &report).context("serializing schema report")?;
            writeln!(out)?;
        }
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "name": "greet",
        "definitions": {"hello": {"config": {"fields": {"name": "String"}}}},
        "nodes": [{"definition": "hello"}]
    }"#;

    fn args(dir: &std::path::Path, format: OutputFormat) -> SchemaArgs {
        let pipeline = dir.join("pipeline.json");
        std::fs::write(&pipeline, MANIFEST).unwrap();
        SchemaArgs { pipeline, format }
    }

    #[test]
    fn test_text_output_ends_with_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        let code = schema_to(&args(dir.path(), OutputFormat::Text), &mut out).unwrap();
        assert_eq!(code, 0);
        let text = String::from_utf8(out).unwrap();
        let last = text.lines().last().unwrap();
        assert!(last.starts_with("fingerprint: sha256:"));
        assert_eq!(last.len(), "fingerprint: sha256:".len() + 64);
        assert!(text.contains("\"solids\""));
    }

    #[test]
    fn test_json_output_matches_library_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(dir.path(), OutputFormat::Json);
        let mut out = Vec::new();
        schema_to(&args, &mut out).unwrap();
        let report: serde_json::Value = serde_json::from_slice(&out).unwrap();

        let env = EnvironmentSchema::compose(&load_manifest(&args.pipeline).unwrap()).unwrap();
        assert_eq!(report["pipeline"], "greet");
        let reported: SchemaFingerprint =
            serde_json::from_value(report["fingerprint"].clone()).unwrap();
        assert_eq!(reported, env.fingerprint().unwrap());
        assert!(report["schema"]["fields"]["solids"].is_object());
    }
}
