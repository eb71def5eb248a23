//! # Document Loading
//!
//! Resolves a location (a filesystem path, or `-` for standard input) and
//! parses its contents into a `serde_json::Value`.
//!
//! Paths ending in `.yaml` / `.yml` are parsed as YAML and converted to the
//! JSON data model; everything else, including stdin, is parsed as JSON.
//! Any failure here is a [`GateError::Read`].

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::GateError;

/// Location string that selects standard input.
pub const STDIN_LOCATION: &str = "-";

/// Where a document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Standard input.
    Stdin,
    /// A file on disk.
    Path(PathBuf),
}

/// Syntax used to parse a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl Location {
    /// Interpret a raw argument; `-` means standard input.
    pub fn new(raw: impl Into<PathBuf>) -> Self {
        let path = raw.into();
        if path.as_os_str() == STDIN_LOCATION {
            Self::Stdin
        } else {
            Self::Path(path)
        }
    }

    pub fn is_stdin(&self) -> bool {
        matches!(self, Self::Stdin)
    }

    /// Format inferred from the file extension. Stdin is always JSON.
    pub fn format(&self) -> DocumentFormat {
        match self {
            Self::Stdin => DocumentFormat::Json,
            Self::Path(path) => DocumentFormat::for_path(path),
        }
    }

    /// Directory that relative `$ref`s in a schema from this location
    /// resolve against.
    ///
    /// For stdin this is the current directory.
    pub fn base_dir(&self) -> Option<PathBuf> {
        match self {
            Self::Stdin => std::env::current_dir().ok(),
            Self::Path(path) => match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => Some(parent.to_path_buf()),
                _ => Some(PathBuf::from(".")),
            },
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => f.write_str("<stdin>"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

impl DocumentFormat {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

/// Load and parse the document at `location`.
///
/// # Errors
///
/// Returns [`GateError::Read`] if the location does not exist, cannot be
/// read as UTF-8 text, is empty, or does not parse.
pub fn load(location: &Location) -> Result<Value, GateError> {
    tracing::debug!(location = %location, "loading document");
    match location {
        Location::Stdin => load_from_reader(std::io::stdin().lock(), location),
        Location::Path(path) => {
            let content = std::fs::read_to_string(path).map_err(|e| GateError::Read {
                location: location.to_string(),
                reason: format!("cannot read file: {e}"),
            })?;
            parse_document(&content, location.format()).map_err(|reason| GateError::Read {
                location: location.to_string(),
                reason,
            })
        }
    }
}

/// Load a document from an arbitrary reader, using `location` for the
/// format and for error messages.
pub fn load_from_reader(mut reader: impl Read, location: &Location) -> Result<Value, GateError> {
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .map_err(|e| GateError::Read {
            location: location.to_string(),
            reason: format!("cannot read input: {e}"),
        })?;
    parse_document(&content, location.format()).map_err(|reason| GateError::Read {
        location: location.to_string(),
        reason,
    })
}

/// Parse document text in the given format.
pub fn parse_document(content: &str, format: DocumentFormat) -> Result<Value, String> {
    if content.trim().is_empty() {
        return Err("document is empty".to_string());
    }
    match format {
        DocumentFormat::Json => {
            serde_json::from_str(content).map_err(|e| format!("invalid JSON: {e}"))
        }
        DocumentFormat::Yaml => {
            let yaml: serde_yaml::Value =
                serde_yaml::from_str(content).map_err(|e| format!("invalid YAML: {e}"))?;
            yaml_to_json_value(&yaml).map_err(|e| format!("YAML-to-JSON conversion failed: {e}"))
        }
    }
}

/// Convert a `serde_yaml::Value` tree into the equivalent JSON tree.
///
/// Tags are dropped. Scalar map keys are stringified; sequence or mapping
/// keys and non-finite floats have no JSON form and are rejected.
fn yaml_to_json_value(yaml: &serde_yaml::Value) -> Result<Value, String> {
    use serde_yaml::Value as Yaml;

    Ok(match yaml {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(*b),
        Yaml::Number(n) => Value::Number(json_number(n)?),
        Yaml::String(s) => Value::String(s.clone()),
        Yaml::Sequence(items) => Value::Array(
            items
                .iter()
                .map(yaml_to_json_value)
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(entries) => Value::Object(
            entries
                .iter()
                .map(|(key, value)| Ok((json_key(key)?, yaml_to_json_value(value)?)))
                .collect::<Result<_, String>>()?,
        ),
        Yaml::Tagged(tagged) => yaml_to_json_value(&tagged.value)?,
    })
}

fn json_number(n: &serde_yaml::Number) -> Result<serde_json::Number, String> {
    if let Some(i) = n.as_i64() {
        return Ok(i.into());
    }
    if let Some(u) = n.as_u64() {
        return Ok(u.into());
    }
    n.as_f64()
        .and_then(serde_json::Number::from_f64)
        .ok_or_else(|| format!("cannot represent float {n} in JSON"))
}

/// JSON object keys are strings; YAML scalars are stringified.
fn json_key(key: &serde_yaml::Value) -> Result<String, String> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s.clone()),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Null => Ok("null".to_string()),
        Yaml::Tagged(tagged) => json_key(&tagged.value),
        other => Err(format!("unsupported YAML map key: {other:?}")),
    }
}
