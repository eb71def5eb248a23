//! # Validation Report
//!
//! The structured result of a gate run and its mapping to exit statuses.
//!
//! The report is the only thing the binary writes to stdout:
//!
//! ```json
//! {"valid":false,"fatal":false,"errors":[
//!   {"instancePath":"","schemaPath":"/required","keyword":"required",
//!    "message":"\"name\" is a required property"}]}
//! ```

use std::fmt;

use jsonschema::error::ValidationErrorKind;
use serde::{Deserialize, Serialize};

use crate::error::GateError;

/// Data conforms to the schema.
pub const EXIT_VALID: u8 = 0;
/// Schema compiled and ran, data violated at least one rule.
pub const EXIT_INVALID: u8 = 1;
/// Bad arguments, or a document that could not be read or parsed.
pub const EXIT_USAGE: u8 = 2;
/// Schema could not be compiled.
pub const EXIT_COMPILE: u8 = 3;

/// Keyword reported when a schema path carries no keyword segment.
const FALLBACK_KEYWORD: &str = "schema";
/// Keyword reported when the data hit a `false` subschema.
const FALSE_SCHEMA_KEYWORD: &str = "false schema";

/// Keywords whose value maps names to subschemas.
const NAMED_SUBSCHEMAS: &[&str] = &[
    "properties",
    "patternProperties",
    "dependentSchemas",
    "dependencies",
    "$defs",
    "definitions",
];

/// Keywords that may hold `false` directly and name the failure themselves.
const BOOLEAN_APPLICATORS: &[&str] = &[
    "additionalProperties",
    "additionalItems",
    "items",
    "propertyNames",
    "unevaluatedProperties",
    "unevaluatedItems",
];

/// A single schema-rule failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// JSON Pointer to the failing value in the data document.
    pub instance_path: String,
    /// JSON Pointer to the failing keyword in the schema.
    pub schema_path: String,
    /// The violated keyword (`required`, `type`, `format`, ...).
    pub keyword: String,
    /// Human-readable description.
    pub message: String,
}

impl Violation {
    /// Descriptor for a fatal error: empty paths, the error class as keyword.
    pub fn fatal(error: &GateError) -> Self {
        Self {
            instance_path: String::new(),
            schema_path: String::new(),
            keyword: error.keyword().to_string(),
            message: error.to_string(),
        }
    }

    /// Instance path rendered as `$.a.b.0`, or `$` for the root.
    pub fn dotted_path(&self) -> String {
        let mut out = String::from("$");
        for segment in self.instance_path.split('/').skip(1) {
            out.push('.');
            out.push_str(&unescape_pointer_segment(segment));
        }
        out
    }
}

impl From<jsonschema::ValidationError<'_>> for Violation {
    fn from(err: jsonschema::ValidationError<'_>) -> Self {
        let schema_path = err.schema_path.to_string();
        Self {
            instance_path: err.instance_path.to_string(),
            keyword: keyword_for(&err.kind, &schema_path),
            schema_path,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.dotted_path(), self.message, self.keyword)
    }
}

/// Name of the rule behind an error of `kind` raised at `schema_path`.
fn keyword_for(kind: &ValidationErrorKind, schema_path: &str) -> String {
    use ValidationErrorKind as Kind;

    let keyword = match kind {
        Kind::AdditionalItems { .. } => "additionalItems",
        Kind::AdditionalProperties { .. } => "additionalProperties",
        Kind::AnyOf => "anyOf",
        Kind::BacktrackLimitExceeded { .. } | Kind::Pattern { .. } => "pattern",
        Kind::Constant { .. } => "const",
        Kind::Contains => "contains",
        Kind::ContentEncoding { .. } | Kind::FromUtf8 { .. } => "contentEncoding",
        Kind::ContentMediaType { .. } => "contentMediaType",
        Kind::Enum { .. } => "enum",
        Kind::ExclusiveMaximum { .. } => "exclusiveMaximum",
        Kind::ExclusiveMinimum { .. } => "exclusiveMinimum",
        Kind::FalseSchema => return false_schema_keyword(schema_path),
        Kind::Format { .. } => "format",
        Kind::MaxItems { .. } => "maxItems",
        Kind::Maximum { .. } => "maximum",
        Kind::MaxLength { .. } => "maxLength",
        Kind::MaxProperties { .. } => "maxProperties",
        Kind::MinItems { .. } => "minItems",
        Kind::Minimum { .. } => "minimum",
        Kind::MinLength { .. } => "minLength",
        Kind::MinProperties { .. } => "minProperties",
        Kind::MultipleOf { .. } => "multipleOf",
        Kind::Not { .. } => "not",
        Kind::OneOfMultipleValid | Kind::OneOfNotValid => "oneOf",
        Kind::PropertyNames { .. } => "propertyNames",
        Kind::Required { .. } => match keyword_from_schema_path(schema_path).as_str() {
            "dependentRequired" => "dependentRequired",
            "dependencies" => "dependencies",
            _ => "required",
        },
        Kind::Type { .. } => "type",
        Kind::UnevaluatedItems { .. } => "unevaluatedItems",
        Kind::UnevaluatedProperties { .. } => "unevaluatedProperties",
        Kind::UniqueItems => "uniqueItems",
        Kind::Custom { .. } | Kind::Referencing(_) => return keyword_from_schema_path(schema_path),
    };
    keyword.to_string()
}

/// A `false` subschema reached through a named or indexed slot is reported
/// as `false schema`; one held directly by an applicator such as
/// `additionalProperties` is reported under that applicator.
fn false_schema_keyword(schema_path: &str) -> String {
    let mut segments = schema_path.split('/').skip(1);
    let mut last_keyword = None;
    while let Some(segment) = segments.next() {
        if NAMED_SUBSCHEMAS.contains(&segment) {
            segments.next();
            last_keyword = None;
        } else if segment.parse::<usize>().is_ok() {
            last_keyword = None;
        } else {
            last_keyword = Some(segment);
        }
    }
    match last_keyword {
        Some(keyword) if BOOLEAN_APPLICATORS.contains(&keyword) => keyword.to_string(),
        _ => FALSE_SCHEMA_KEYWORD.to_string(),
    }
}

/// Last schema-path segment that is not an array index.
fn keyword_from_schema_path(schema_path: &str) -> String {
    schema_path
        .rsplit('/')
        .find(|segment| !segment.is_empty() && segment.parse::<usize>().is_err())
        .map(unescape_pointer_segment)
        .unwrap_or_else(|| FALLBACK_KEYWORD.to_string())
}

fn unescape_pointer_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// The document written for every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub fatal: bool,
    pub errors: Vec<Violation>,
}

impl ValidationReport {
    /// Serialize as a single JSON document.
    pub fn to_json(&self, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

/// What a gate run concluded.
///
/// Translated into a process exit status only at the binary boundary, so
/// the pipeline stays testable in-process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Schema compiled and the data conforms.
    Valid,
    /// Schema compiled and the data violates one or more rules, in
    /// evaluation order.
    Invalid(Vec<Violation>),
    /// Validation could not run.
    Fatal(GateError),
}

impl Outcome {
    /// Build the outcome for a finished validation pass.
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        if violations.is_empty() {
            Self::Valid
        } else {
            Self::Invalid(violations)
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    /// Violations of a non-fatal run; empty otherwise.
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Invalid(violations) => violations,
            _ => &[],
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Valid => EXIT_VALID,
            Self::Invalid(_) => EXIT_INVALID,
            Self::Fatal(err) => err.exit_code(),
        }
    }

    pub fn report(&self) -> ValidationReport {
        match self {
            Self::Valid => ValidationReport {
                valid: true,
                fatal: false,
                errors: Vec::new(),
            },
            Self::Invalid(violations) => ValidationReport {
                valid: false,
                fatal: false,
                errors: violations.clone(),
            },
            Self::Fatal(err) => ValidationReport {
                valid: false,
                fatal: true,
                errors: vec![Violation::fatal(err)],
            },
        }
    }
}

impl From<GateError> for Outcome {
    fn from(err: GateError) -> Self {
        Self::Fatal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn violation(instance_path: &str, schema_path: &str) -> Violation {
        Violation {
            instance_path: instance_path.to_string(),
            keyword: keyword_from_schema_path(schema_path),
            schema_path: schema_path.to_string(),
            message: "failed".to_string(),
        }
    }

    #[test]
    fn keyword_is_last_schema_segment() {
        assert_eq!(keyword_from_schema_path("/properties/name/type"), "type");
        assert_eq!(keyword_from_schema_path("/required"), "required");
        assert_eq!(keyword_from_schema_path("/allOf/1/minLength"), "minLength");
    }

    #[test]
    fn keyword_skips_trailing_index() {
        assert_eq!(keyword_from_schema_path("/prefixItems/0"), "prefixItems");
    }

    #[test]
    fn keyword_falls_back_for_root() {
        assert_eq!(keyword_from_schema_path(""), "schema");
        assert_eq!(keyword_from_schema_path("/0"), "schema");
    }

    #[test]
    fn false_schema_keyword_ignores_names() {
        assert_eq!(false_schema_keyword("/properties/secret"), "false schema");
        assert_eq!(false_schema_keyword("/patternProperties/^x_"), "false schema");
        assert_eq!(false_schema_keyword("/dependentSchemas/card"), "false schema");
        assert_eq!(false_schema_keyword("/allOf/0"), "false schema");
        assert_eq!(false_schema_keyword(""), "false schema");
        assert_eq!(
            false_schema_keyword("/properties/items"),
            "false schema",
            "a property named like a keyword is still a name"
        );
    }

    #[test]
    fn false_schema_keyword_keeps_direct_applicators() {
        assert_eq!(false_schema_keyword("/additionalProperties"), "additionalProperties");
        assert_eq!(
            false_schema_keyword("/properties/meta/additionalProperties"),
            "additionalProperties"
        );
        assert_eq!(false_schema_keyword("/items"), "items");
    }

    fn keywords_for(schema: serde_json::Value, data: serde_json::Value) -> Vec<String> {
        let validator = jsonschema::validator_for(&schema).unwrap();
        validator
            .iter_errors(&data)
            .map(|e| Violation::from(e).keyword)
            .collect()
    }

    #[test]
    fn false_subschemas_report_false_schema() {
        assert_eq!(
            keywords_for(json!({"properties": {"secret": false}}), json!({"secret": 1})),
            vec!["false schema"]
        );
        assert_eq!(
            keywords_for(json!({"patternProperties": {"^x_": false}}), json!({"x_debug": true})),
            vec!["false schema"]
        );
        assert_eq!(
            keywords_for(
                json!({"dependentSchemas": {"card": false}}),
                json!({"card": "4111"})
            ),
            vec!["false schema"]
        );
    }

    #[test]
    fn keyword_comes_from_error_kind() {
        let schema = json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "tags": {"type": "array", "uniqueItems": true},
                "kind": {"enum": ["hero", "grid"]}
            },
            "additionalProperties": false
        });
        let mut keywords = keywords_for(
            schema,
            json!({"tags": ["a", "a"], "kind": "footer", "extra": 1}),
        );
        keywords.sort();
        assert_eq!(
            keywords,
            vec!["additionalProperties", "enum", "required", "uniqueItems"]
        );
    }

    #[test]
    fn dotted_path_rendering() {
        assert_eq!(violation("", "/required").dotted_path(), "$");
        assert_eq!(
            violation("/sections/2/title", "/type").dotted_path(),
            "$.sections.2.title"
        );
        assert_eq!(violation("/a~1b/c~0d", "/type").dotted_path(), "$.a/b.c~d");
    }

    #[test]
    fn display_matches_readable_line() {
        let v = Violation {
            instance_path: "/meta/email".to_string(),
            schema_path: "/properties/meta/properties/email/format".to_string(),
            keyword: "format".to_string(),
            message: r#""nope" is not a "email""#.to_string(),
        };
        assert_eq!(v.to_string(), r#"$.meta.email: "nope" is not a "email" (format)"#);
    }

    #[test]
    fn valid_report_shape() {
        let report = Outcome::Valid.report();
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value, json!({"valid": true, "fatal": false, "errors": []}));
        assert_eq!(Outcome::Valid.exit_code(), EXIT_VALID);
    }

    #[test]
    fn invalid_report_uses_camel_case_fields() {
        let outcome = Outcome::from_violations(vec![violation("/name", "/properties/name/type")]);
        assert_eq!(outcome.exit_code(), EXIT_INVALID);
        let value = serde_json::to_value(outcome.report()).unwrap();
        assert_eq!(value["valid"], false);
        assert_eq!(value["fatal"], false);
        assert_eq!(value["errors"][0]["instancePath"], "/name");
        assert_eq!(value["errors"][0]["schemaPath"], "/properties/name/type");
        assert_eq!(value["errors"][0]["keyword"], "type");
    }

    #[test]
    fn empty_violations_is_valid() {
        assert_eq!(Outcome::from_violations(Vec::new()), Outcome::Valid);
    }

    #[test]
    fn fatal_report_has_single_descriptor() {
        let outcome = Outcome::from(GateError::Compile {
            reason: "unresolvable reference".to_string(),
        });
        assert!(outcome.is_fatal());
        assert_eq!(outcome.exit_code(), EXIT_COMPILE);
        let report = outcome.report();
        assert!(!report.valid);
        assert!(report.fatal);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].keyword, "compile");
        assert!(report.errors[0].message.contains("unresolvable reference"));
        assert!(outcome.violations().is_empty());
    }

    #[test]
    fn pretty_and_compact_parse_identically() {
        let report = Outcome::from_violations(vec![violation("", "/required")]).report();
        let compact = report.to_json(false).unwrap();
        let pretty = report.to_json(true).unwrap();
        assert!(!compact.contains('\n'));
        assert!(pretty.contains('\n'));
        let a: ValidationReport = serde_json::from_str(&compact).unwrap();
        let b: ValidationReport = serde_json::from_str(&pretty).unwrap();
        assert_eq!(a, b);
    }
}
