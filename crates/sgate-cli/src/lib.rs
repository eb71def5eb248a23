//! # sgate-cli — Schema Gate Command-Line Interface
//!
//! Provides the `sgate` binary, invoked by a generation pipeline as a gate
//! between producing a candidate document and rendering it:
//!
//! ```bash
//! sgate schemas/page.schema.json out/landing.json
//! generate-page | sgate schemas/page.schema.json -
//! ```
//!
//! Any non-zero exit means "reject, do not render".
//!
//! ## Crate Policy
//!
//! - Argument parsing and output live here; validation logic lives in
//!   `sgate-schema`.
//! - stdout carries only the result document.

pub mod config;
pub mod validate;

use std::path::{Path, PathBuf};

/// Resolve `path` against `base` unless it is already absolute.
pub fn resolve_path(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_path_absolute_path_returned_as_is() {
        let result = resolve_path(Path::new("/schemas/shared"), Path::new("/etc/sgate"));
        assert_eq!(result, PathBuf::from("/schemas/shared"));
    }

    #[test]
    fn resolve_path_relative_joins_base() {
        let result = resolve_path(Path::new("shared/defs"), Path::new("/etc/sgate"));
        assert_eq!(result, PathBuf::from("/etc/sgate/shared/defs"));
    }
}
