//! # Validate Subcommand
//!
//! Evaluates a config document against the pipeline described by a manifest.
//!
//! ```bash
//! pipecfg validate --pipeline pipeline.yaml --config env.yaml
//! pipecfg validate --pipeline pipeline.yaml --config env.json --format json
//! ```

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use pipecfg_schema::{load_document, load_manifest, EnvironmentSchema, EvaluationErrors};

use crate::OutputFormat;

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Pipeline manifest (YAML or JSON).
    #[arg(long)]
    pub pipeline: PathBuf,

    /// Operator config document (YAML or JSON). Omit to validate the empty
    /// document.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct ValidationReport<'a> {
    pipeline: &'a str,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a EvaluationErrors>,
}

/// Execute the validate subcommand, writing the report to stdout.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    validate_to(args, &mut out)
}

/// Execute the validate subcommand, writing the report to `out`.
///
/// Returns `0` when the document is valid and `1` when it is not.
pub fn validate_to(args: &ValidateArgs, out: &mut impl Write) -> Result<u8> {
    let pipeline = load_manifest(&args.pipeline)
        .with_context(|| format!("loading pipeline manifest {}", args.pipeline.display()))?;
    let env = EnvironmentSchema::compose(&pipeline)
        .with_context(|| format!("composing config schema of pipeline {}", pipeline.name()))?;

    let document = match &args.config {
        Some(path) => Some(
            load_document(path)
                .with_context(|| format!("loading config document {}", path.display()))?,
        ),
        None => None,
    };

    let result = env.evaluate(document.as_ref());
    tracing::info!(
        pipeline = env.pipeline_name(),
        valid = result.is_ok(),
        "validated config document"
    );

    match args.format {
        OutputFormat::Text => match &result {
            Ok(_) => writeln!(out, "pipeline {}: config is valid", env.pipeline_name())?,
            Err(errors) => {
                writeln!(
                    out,
                    "pipeline {}: config is invalid ({} error{})",
                    env.pipeline_name(),
                    errors.len(),
                    if errors.len() == 1 { "" } else { "s" }
                )?;
                writeln!(out, "{errors}")?;
            }
        },
        OutputFormat::Json => {
            let report = ValidationReport {
                pipeline: env.pipeline_name(),
                valid: result.is_ok(),
                config: result.as_ref().ok().map(|c| c.as_value().to_raw()),
                errors: result.as_ref().err(),
            };
            serde_json::to_writer_pretty(&mut *out, &report)
                .context("serializing validation report")?;
            writeln!(out)?;
        }
    }

    Ok(if result.is_ok() { 0 } else { 1 })
}
