//! # Fatal Errors
//!
//! Failures that prevent validation from running at all. A document that
//! merely fails schema rules is not an error here; it is reported as
//! [`Violation`](crate::Violation)s inside an
//! [`Outcome::Invalid`](crate::Outcome::Invalid).

use thiserror::Error;

use crate::report::{EXIT_COMPILE, EXIT_USAGE};

/// Fatal failure of a gate run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// Arguments were missing, malformed, or contradictory.
    #[error("usage error: {0}")]
    Usage(String),

    /// A document or configuration file could not be read or parsed.
    #[error("cannot read '{location}': {reason}")]
    Read {
        /// Location that failed (`<stdin>` for standard input).
        location: String,
        /// Reason the location could not be loaded.
        reason: String,
    },

    /// The schema could not be turned into a validator.
    #[error("schema failed to compile: {reason}")]
    Compile {
        /// Reason reported by the schema compiler.
        reason: String,
    },
}

impl GateError {
    /// Keyword placed in the single fatal descriptor of a report.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Usage(_) => "usage",
            Self::Read { .. } => "read",
            Self::Compile { .. } => "compile",
        }
    }

    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) | Self::Read { .. } => EXIT_USAGE,
            Self::Compile { .. } => EXIT_COMPILE,
        }
    }
}
