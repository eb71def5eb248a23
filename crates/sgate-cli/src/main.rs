//! # sgate CLI entry point
//!
//! Parses arguments, initializes tracing on stderr, runs one validation and
//! translates the [`Outcome`] into the process exit status.

use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sgate_cli::validate::{emit, run_validate, ValidateArgs};
use sgate_schema::{GateError, Outcome, EXIT_COMPILE};

/// Schema gate: validate a data document against a JSON Schema.
///
/// Prints one JSON result (`valid`, `fatal`, `errors`) to stdout and exits
/// 0 (valid), 1 (invalid), 2 (usage or read failure) or 3 (schema does not
/// compile).
#[derive(Parser, Debug)]
#[command(name = "sgate", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit diagnostic logs as JSON lines.
    #[arg(long)]
    log_json: bool,

    #[command(flatten)]
    validate: ValidateArgs,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            init_tracing(0, false);
            let usage = GateError::Usage(e.to_string().trim().to_string());
            return finish(&Outcome::Fatal(usage), false);
        }
    };

    init_tracing(cli.verbose, cli.log_json);
    tracing::debug!("sgate v{} starting", env!("CARGO_PKG_VERSION"));

    let (outcome, pretty) = run_validate(&cli.validate);
    finish(&outcome, pretty)
}

fn finish(outcome: &Outcome, pretty: bool) -> ExitCode {
    match emit(outcome, pretty, &mut std::io::stdout().lock()) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_COMPILE)
        }
    }
}

/// `RUST_LOG` wins; otherwise the level follows `-v`.
fn init_tracing(verbose: u8, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
