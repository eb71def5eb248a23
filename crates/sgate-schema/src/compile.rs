//! # Schema Compilation
//!
//! Turns a schema document into a [`CompiledSchema`]. Compilation is a pure
//! function of the schema and [`CompileOptions`]; nothing is cached.
//!
//! Fixed validator settings:
//!
//! - every violation is collected (`iter_errors`, never first-error-only);
//! - unknown keywords and unknown formats are tolerated;
//! - known `format`s (`date-time`, `email`, `uri`, ...) are asserted, not
//!   treated as annotations.
//!
//! ## Reference Resolution
//!
//! `$ref`s are never fetched over the network. Relative references resolve
//! to files under the schema's own directory and then under each configured
//! ref root, in order. `file://` references name an absolute file. Anything
//! else, a path escaping with `..`, or a missing file makes compilation fail.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use jsonschema::{Draft, Retrieve, Uri, Validator};
use serde_json::Value;

use crate::document::{parse_document, DocumentFormat, Location};
use crate::error::GateError;
use crate::report::Violation;

/// Base URI the validator assigns to schemas without an `$id`.
const DEFAULT_BASE_PREFIX: &str = "json-schema:///";
const FILE_PREFIX: &str = "file://";

/// JSON Schema dialect used when a schema has no `$schema` declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    Draft4,
    Draft6,
    Draft7,
    Draft201909,
    #[default]
    Draft202012,
}

impl Dialect {
    fn draft(self) -> Draft {
        match self {
            Self::Draft4 => Draft::Draft4,
            Self::Draft6 => Draft::Draft6,
            Self::Draft7 => Draft::Draft7,
            Self::Draft201909 => Draft::Draft201909,
            Self::Draft202012 => Draft::Draft202012,
        }
    }
}

impl FromStr for Dialect {
    type Err = GateError;

    /// Accepts `2020-12`, `2019-09`, `7`, `6`, `4`, optionally prefixed
    /// with `draft` / `draft-`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_ascii_lowercase();
        let bare = trimmed
            .strip_prefix("draft-")
            .or_else(|| trimmed.strip_prefix("draft"))
            .unwrap_or(&trimmed);
        match bare {
            "2020-12" => Ok(Self::Draft202012),
            "2019-09" => Ok(Self::Draft201909),
            "7" | "07" => Ok(Self::Draft7),
            "6" | "06" => Ok(Self::Draft6),
            "4" | "04" => Ok(Self::Draft4),
            _ => Err(GateError::Usage(format!(
                "unknown JSON Schema draft '{s}' (expected 2020-12, 2019-09, 7, 6 or 4)"
            ))),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Draft4 => "4",
            Self::Draft6 => "6",
            Self::Draft7 => "7",
            Self::Draft201909 => "2019-09",
            Self::Draft202012 => "2020-12",
        })
    }
}

/// Settings that vary between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Dialect for schemas without `$schema`.
    pub dialect: Dialect,
    /// Directory of the schema document; searched first for `$ref` targets.
    pub base_dir: Option<PathBuf>,
    /// Additional directories searched for `$ref` targets, in order.
    pub ref_roots: Vec<PathBuf>,
}

impl CompileOptions {
    /// Options for a schema loaded from `location`.
    pub fn for_location(location: &Location) -> Self {
        Self {
            base_dir: location.base_dir(),
            ..Self::default()
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_ref_roots(mut self, roots: impl IntoIterator<Item = PathBuf>) -> Self {
        self.ref_roots.extend(roots);
        self
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        self.base_dir
            .iter()
            .chain(self.ref_roots.iter())
            .cloned()
            .collect()
    }
}

/// Resolves `$ref` URIs to files on disk.
struct FileRefRetriever {
    search_dirs: Vec<PathBuf>,
}

impl Retrieve for FileRefRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();
        let path = self.resolve(uri_str)?;
        tracing::debug!(uri = uri_str, path = %path.display(), "resolved schema reference");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| format!("cannot read referenced schema {}: {e}", path.display()))?;
        let document = parse_document(&content, DocumentFormat::for_path(&path))
            .map_err(|e| format!("referenced schema {}: {e}", path.display()))?;
        if let Some(reference) = parent_reference(&document) {
            return Err(format!(
                "referenced schema {}: reference escapes the schema directories: {reference}",
                path.display()
            )
            .into());
        }
        Ok(document)
    }
}

impl FileRefRetriever {
    fn resolve(&self, uri: &str) -> Result<PathBuf, String> {
        let uri = uri.split('#').next().unwrap_or(uri);

        if let Some(absolute) = uri.strip_prefix(FILE_PREFIX) {
            let path = PathBuf::from(absolute);
            return if path.is_file() {
                Ok(path)
            } else {
                Err(format!("referenced schema not found: {uri}"))
            };
        }

        let relative = uri.strip_prefix(DEFAULT_BASE_PREFIX).ok_or_else(|| {
            format!("remote reference retrieval is disabled: {uri}")
        })?;
        let relative = Path::new(relative);
        if relative.as_os_str().is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(format!("reference escapes the schema directories: {uri}"));
        }

        self.search_dirs
            .iter()
            .map(|dir| dir.join(relative))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| {
                format!(
                    "referenced schema '{}' not found in {} search director{}",
                    relative.display(),
                    self.search_dirs.len(),
                    if self.search_dirs.len() == 1 { "y" } else { "ies" },
                )
            })
    }
}

/// An executable validator.
pub struct CompiledSchema {
    validator: Validator,
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema").finish_non_exhaustive()
    }
}

impl CompiledSchema {
    /// Every violation of `instance`, in evaluation order.
    pub fn validate(&self, instance: &Value) -> Vec<Violation> {
        self.validator
            .iter_errors(instance)
            .map(Violation::from)
            .collect()
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }
}

/// Compile `schema` into a validator.
///
/// A `$schema` declaration in the document selects its dialect; otherwise
/// `options.dialect` applies.
///
/// # Errors
///
/// Returns [`GateError::Compile`] if the schema violates its meta-schema or
/// a `$ref` cannot be resolved.
pub fn compile(schema: &Value, options: &CompileOptions) -> Result<CompiledSchema, GateError> {
    // `..` is normalized away against the validator's default base URI
    // before the retriever sees it, so it has to be caught here.
    if let Some(reference) = parent_reference(schema) {
        return Err(GateError::Compile {
            reason: format!("reference escapes the schema directories: {reference}"),
        });
    }

    let mut opts = jsonschema::options();
    opts.should_validate_formats(true)
        .should_ignore_unknown_formats(true)
        .with_retriever(FileRefRetriever {
            search_dirs: options.search_dirs(),
        });

    if declares_dialect(schema) {
        tracing::debug!("schema declares its own dialect");
    } else {
        tracing::debug!(draft = %options.dialect, "using default dialect");
        opts.with_draft(options.dialect.draft());
    }

    let validator = opts.build(schema).map_err(|e| GateError::Compile {
        reason: e.to_string(),
    })?;
    Ok(CompiledSchema { validator })
}

fn declares_dialect(schema: &Value) -> bool {
    schema.get("$schema").and_then(Value::as_str).is_some()
}

/// Keywords whose values are data, not subschemas.
const DATA_KEYWORDS: &[&str] = &["const", "enum", "default", "examples"];

/// First `$ref` / `$dynamicRef` in `schema` whose path has a `..` segment.
fn parent_reference(schema: &Value) -> Option<&str> {
    match schema {
        Value::Object(map) => {
            let own = ["$ref", "$dynamicRef"]
                .iter()
                .filter_map(|key| map.get(*key).and_then(Value::as_str))
                .find(|reference| {
                    let path = reference.split('#').next().unwrap_or(*reference);
                    path.split(['/', '\\']).any(|segment| segment == "..")
                });
            own.or_else(|| {
                map.iter()
                    .filter(|(key, _)| !DATA_KEYWORDS.contains(&key.as_str()))
                    .find_map(|(_, value)| parent_reference(value))
            })
        }
        Value::Array(items) => items.iter().find_map(parent_reference),
        _ => None,
    }
}
