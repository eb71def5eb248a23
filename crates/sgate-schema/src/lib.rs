//! # sgate-schema — Schema Gate Core
//!
//! Decides whether an untrusted data document conforms to a JSON Schema and
//! reports every violation, never just the first.
//!
//! ## Pipeline (`gate`)
//!
//! [`run`] performs one linear pass: load schema → load data → compile →
//! validate, and returns an [`Outcome`]. Nothing is cached between runs.
//!
//! ## Outcomes (`report`)
//!
//! | Outcome | `valid` | `fatal` | exit |
//! |---|---|---|---|
//! | data conforms | true | false | 0 |
//! | data violates the schema | false | false | 1 |
//! | bad usage, unreadable or unparseable input | false | true | 2 |
//! | schema does not compile | false | true | 3 |
//!
//! The exit status is only a number here; turning it into a process exit
//! is the binary's job.
//!
//! ## Crate Policy
//!
//! - Schema violations are data, never errors. Only [`GateError`] is fatal.
//! - `$ref`s are resolved from local files only; no network access.

pub mod compile;
pub mod document;
pub mod error;
pub mod gate;
pub mod report;

pub use compile::{compile, CompileOptions, CompiledSchema, Dialect};
pub use document::{load, DocumentFormat, Location};
pub use error::GateError;
pub use gate::{run, validate_documents, GateOptions};
pub use report::{
    Outcome, ValidationReport, Violation, EXIT_COMPILE, EXIT_INVALID, EXIT_USAGE, EXIT_VALID,
};
