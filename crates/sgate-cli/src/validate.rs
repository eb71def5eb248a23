//! # Validate Command
//!
//! Resolves configuration, runs the gate, and writes the result document.
//!
//! stdout carries exactly one JSON result for every run; diagnostics go to
//! stderr through `tracing`.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use sgate_schema::{run, GateError, GateOptions, Location, Outcome};

use crate::config::GateConfig;

/// Shown when either location is missing.
pub const USAGE: &str = "sgate [OPTIONS] <SCHEMA> <DATA>";

/// Arguments for a validation run.
#[derive(Args, Debug, Default)]
pub struct ValidateArgs {
    /// Schema document location (`-` for stdin).
    #[arg(value_name = "SCHEMA")]
    pub schema: Option<PathBuf>,

    /// Data document location (`-` for stdin).
    #[arg(value_name = "DATA")]
    pub data: Option<PathBuf>,

    /// Path to a YAML or JSON configuration file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Pretty-print the result document.
    #[arg(long)]
    pub pretty: bool,

    /// Extra directory for `$ref` resolution. Repeatable.
    #[arg(long = "ref-root", value_name = "DIR")]
    pub ref_roots: Vec<PathBuf>,
}

/// A resolved run: what to validate and how to print it.
#[derive(Debug)]
pub struct Invocation {
    pub schema: Location,
    pub data: Location,
    pub options: GateOptions,
    pub pretty: bool,
}

impl ValidateArgs {
    /// Merge defaults, the config file, and flags.
    ///
    /// # Errors
    ///
    /// [`GateError::Usage`] for a missing location or unknown draft,
    /// [`GateError::Read`] for an unreadable config file.
    pub fn resolve(&self) -> Result<Invocation, GateError> {
        let (schema, data) = match (&self.schema, &self.data) {
            (Some(schema), Some(data)) => (Location::new(schema), Location::new(data)),
            (None, _) => {
                return Err(GateError::Usage(format!(
                    "missing <SCHEMA> and <DATA> locations; usage: {USAGE}"
                )))
            }
            (Some(_), None) => {
                return Err(GateError::Usage(format!(
                    "missing <DATA> location; usage: {USAGE}"
                )))
            }
        };

        let config = match &self.config {
            Some(path) => GateConfig::load(path)?,
            None => GateConfig::default(),
        };

        let mut ref_roots = config.ref_roots.clone();
        ref_roots.extend(self.ref_roots.iter().cloned());

        Ok(Invocation {
            schema,
            data,
            options: GateOptions {
                dialect: config.dialect()?,
                ref_roots,
            },
            pretty: self.pretty || config.pretty,
        })
    }
}

/// Run the gate for `args`, returning the outcome and whether to
/// pretty-print it.
pub fn run_validate(args: &ValidateArgs) -> (Outcome, bool) {
    match args.resolve() {
        Ok(invocation) => {
            tracing::debug!(
                schema = %invocation.schema,
                data = %invocation.data,
                draft = %invocation.options.dialect,
                "starting validation"
            );
            let outcome = run(&invocation.schema, &invocation.data, &invocation.options);
            (outcome, invocation.pretty)
        }
        Err(err) => (Outcome::Fatal(err), args.pretty),
    }
}

/// Log `outcome`, write its report to `out`, and return the exit status.
///
/// # Errors
///
/// Fails only if the report cannot be serialized or written.
pub fn emit(outcome: &Outcome, pretty: bool, out: &mut impl Write) -> Result<u8> {
    log_outcome(outcome);
    let document = outcome
        .report()
        .to_json(pretty)
        .context("failed to serialize validation result")?;
    writeln!(out, "{document}").context("failed to write validation result")?;
    out.flush().context("failed to flush validation result")?;
    Ok(outcome.exit_code())
}

fn log_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Valid => tracing::info!(valid = true, violation_count = 0, "document accepted"),
        Outcome::Invalid(violations) => {
            for violation in violations {
                tracing::warn!("{violation}");
            }
            tracing::info!(
                valid = false,
                violation_count = violations.len(),
                "document rejected"
            );
        }
        Outcome::Fatal(err) => tracing::error!(kind = err.keyword(), "{err}"),
    }
}
