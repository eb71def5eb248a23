//! # Gate Pipeline
//!
//! One linear pass: load schema, load data, compile, validate. Every step
//! that fails ends the pass with [`Outcome::Fatal`]; a data document that
//! merely violates the schema ends with [`Outcome::Invalid`].

use std::path::PathBuf;

use serde_json::Value;

use crate::compile::{compile, CompileOptions, Dialect};
use crate::document::{self, Location};
use crate::error::GateError;
use crate::report::Outcome;

/// Per-run settings that do not come from the documents themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateOptions {
    pub dialect: Dialect,
    pub ref_roots: Vec<PathBuf>,
}

/// Validate the data at `data` against the schema at `schema`.
pub fn run(schema: &Location, data: &Location, options: &GateOptions) -> Outcome {
    match try_run(schema, data, options) {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::debug!(error = %err, "gate run aborted");
            Outcome::Fatal(err)
        }
    }
}

fn try_run(
    schema_location: &Location,
    data_location: &Location,
    options: &GateOptions,
) -> Result<Outcome, GateError> {
    if schema_location.is_stdin() && data_location.is_stdin() {
        return Err(GateError::Usage(
            "only one of <SCHEMA> and <DATA> may be read from stdin".to_string(),
        ));
    }

    let schema = document::load(schema_location)?;
    let data = document::load(data_location)?;

    let compile_options = CompileOptions::for_location(schema_location)
        .with_dialect(options.dialect)
        .with_ref_roots(options.ref_roots.iter().cloned());

    validate_documents(&schema, &data, &compile_options)
}

/// Compile `schema` and validate `data` against it, for callers that
/// already hold both documents in memory.
///
/// # Errors
///
/// Returns [`GateError::Compile`] if the schema cannot be compiled.
pub fn validate_documents(
    schema: &Value,
    data: &Value,
    options: &CompileOptions,
) -> Result<Outcome, GateError> {
    let compiled = compile(schema, options)?;
    Ok(Outcome::from_violations(compiled.validate(data)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::Path;

    fn write(dir: &Path, name: &str, content: &str) -> Location {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        Location::Path(path)
    }

    #[test]
    fn both_stdin_is_usage_error() {
        let outcome = run(&Location::Stdin, &Location::Stdin, &GateOptions::default());
        assert!(matches!(outcome, Outcome::Fatal(GateError::Usage(_))));
        assert_eq!(outcome.exit_code(), 2);
    }

    #[test]
    fn unreadable_schema_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let data = write(dir.path(), "data.json", "{}");
        let outcome = run(
            &Location::Path(dir.path().join("absent.json")),
            &data,
            &GateOptions::default(),
        );
        match outcome {
            Outcome::Fatal(GateError::Read { location, .. }) => {
                assert!(location.ends_with("absent.json"))
            }
            other => panic!("expected read failure, got {other:?}"),
        }
    }

    #[test]
    fn unreadable_data_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(dir.path(), "schema.json", r#"{"type": "object"}"#);
        let data = write(dir.path(), "data.json", "[1, 2");
        let outcome = run(&schema, &data, &GateOptions::default());
        assert!(matches!(outcome, Outcome::Fatal(GateError::Read { .. })));
        assert_eq!(outcome.exit_code(), 2);
    }

    #[test]
    fn read_error_wins_over_compile_error() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(dir.path(), "schema.json", r#"{"type": 12}"#);
        let data = write(dir.path(), "data.json", "nope");
        let outcome = run(&schema, &data, &GateOptions::default());
        assert!(matches!(outcome, Outcome::Fatal(GateError::Read { .. })));
    }

    #[test]
    fn uncompilable_schema_is_status_three() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(dir.path(), "schema.json", r#"{"required": "name"}"#);
        let data = write(dir.path(), "data.json", "{}");
        let outcome = run(&schema, &data, &GateOptions::default());
        assert!(matches!(outcome, Outcome::Fatal(GateError::Compile { .. })));
        assert_eq!(outcome.exit_code(), 3);
    }

    #[test]
    fn yaml_data_against_json_schema() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(
            dir.path(),
            "page.schema.json",
            r#"{"type": "object", "required": ["route"], "properties": {"route": {"type": "string", "pattern": "^/"}}}"#,
        );
        let good = write(dir.path(), "good.yaml", "route: /cars\n");
        let bad = write(dir.path(), "bad.yml", "route: cars\n");
        assert_eq!(run(&schema, &good, &GateOptions::default()), Outcome::Valid);
        let outcome = run(&schema, &bad, &GateOptions::default());
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(outcome.violations()[0].instance_path, "/route");
        assert_eq!(outcome.violations()[0].keyword, "pattern");
    }

    #[test]
    fn ref_roots_are_forwarded() {
        let schemas = tempfile::tempdir().unwrap();
        let shared = tempfile::tempdir().unwrap();
        std::fs::write(shared.path().join("id.json"), r#"{"type": "integer"}"#).unwrap();
        let schema = write(schemas.path(), "s.json", r#"{"$ref": "id.json"}"#);
        let data = write(schemas.path(), "d.json", "7");

        let without = run(&schema, &data, &GateOptions::default());
        assert_eq!(without.exit_code(), 3);

        let options = GateOptions {
            ref_roots: vec![shared.path().to_path_buf()],
            ..GateOptions::default()
        };
        assert_eq!(run(&schema, &data, &options), Outcome::Valid);
    }

    #[test]
    fn parent_directory_reference_is_status_three() {
        let root = tempfile::tempdir().unwrap();
        let sub = root.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(root.path().join("x.json"), r#"{"type": "string"}"#).unwrap();
        std::fs::write(sub.join("x.json"), r#"{"type": "integer"}"#).unwrap();
        let schema = write(&sub, "s.json", r#"{"$ref": "../x.json"}"#);
        let data = write(root.path(), "d.json", r#""hello""#);

        let outcome = run(&schema, &data, &GateOptions::default());
        assert!(
            matches!(outcome, Outcome::Fatal(GateError::Compile { .. })),
            "{outcome:?}"
        );
        assert_eq!(outcome.exit_code(), 3);
    }

    #[test]
    fn in_memory_validation() {
        let outcome = validate_documents(
            &json!({"type": "array", "items": {"type": "integer"}, "maxItems": 2}),
            &json!([1, "two", 3]),
            &CompileOptions::default(),
        )
        .unwrap();
        let keywords: Vec<&str> = outcome.violations().iter().map(|v| v.keyword.as_str()).collect();
        assert_eq!(keywords.len(), 2, "{keywords:?}");
        assert!(keywords.contains(&"type"));
        assert!(keywords.contains(&"maxItems"));
    }
}
