//! # Configuration File
//!
//! Optional YAML or JSON file passed with `--config`. Values here sit
//! between the built-in defaults and command-line flags.
//!
//! ```yaml
//! draft: "2020-12"
//! ref_roots:
//!   - schemas/shared
//! pretty: true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};

use sgate_schema::{Dialect, GateError, Location};

use crate::resolve_path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    /// Dialect for schemas without `$schema`. `7` and `"7"` are equivalent.
    #[serde(deserialize_with = "string_or_number")]
    pub draft: Option<String>,
    /// Extra `$ref` lookup directories. Relative entries are relative to
    /// the config file.
    pub ref_roots: Vec<PathBuf>,
    /// Pretty-print the result document.
    pub pretty: bool,
}

impl GateConfig {
    /// Load and normalize a config file.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Read`] if the file cannot be read, parsed, or
    /// contains unknown fields.
    pub fn load(path: &Path) -> Result<Self, GateError> {
        let location = Location::Path(path.to_path_buf());
        let value = sgate_schema::load(&location)?;
        let mut config: Self = serde_json::from_value(value).map_err(|e| GateError::Read {
            location: location.to_string(),
            reason: format!("invalid configuration: {e}"),
        })?;

        let config_dir = location.base_dir().unwrap_or_else(|| PathBuf::from("."));
        config.ref_roots = config
            .ref_roots
            .iter()
            .map(|root| resolve_path(root, &config_dir))
            .collect();

        tracing::debug!(path = %path.display(), ?config, "loaded configuration");
        Ok(config)
    }

    /// Parsed `draft`, or the default dialect when unset.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Usage`] for an unrecognized draft name.
    pub fn dialect(&self) -> Result<Dialect, GateError> {
        match &self.draft {
            Some(draft) => draft.parse(),
            None => Ok(Dialect::default()),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Number(n) => n.to_string(),
    }))
}
