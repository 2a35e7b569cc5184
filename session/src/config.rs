//! Session configuration.
//!
//! Defines the YAML-serializable settings shared by the editor listener and
//! the schema loader.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! watched_files:
//!   - nx.json
//!   - workspace.json
//!   - angular.json
//! array_style: commaJoined
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use generator_form_core::{ArrayStyle, NormalizeOptions};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration file names that trigger a language-service connection
/// when none are configured.
pub const DEFAULT_WATCHED_FILES: &[&str] = &["nx.json", "workspace.json", "project.json"];

/// Settings for form sessions and editor integration.
///
/// Every field is optional in YAML; missing fields take their defaults.
///
/// # Examples
///
/// ```
/// use generator_form_core::ArrayStyle;
/// use generator_form_session::FormConfig;
///
/// let config: FormConfig = serde_yaml::from_str("array_style: commaJoined").unwrap();
/// assert_eq!(config.array_style, ArrayStyle::CommaJoined);
/// assert!(config.watches("nx.json"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    /// File names whose opening connects the language service.
    pub watched_files: Vec<String>,
    /// Array serialization for schemas that do not declare a style.
    pub array_style: ArrayStyle,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            version: "1.0".into(),
            watched_files: DEFAULT_WATCHED_FILES.iter().map(|f| f.to_string()).collect(),
            array_style: ArrayStyle::default(),
        }
    }
}

impl FormConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::SessionError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::SessionError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Returns `true` if `file_name` is one of the watched file names.
    pub fn watches(&self, file_name: &str) -> bool {
        self.watched_files.iter().any(|f| f == file_name)
    }

    /// Normalizer settings derived from this configuration.
    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            array_style: self.array_style,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: FormConfig = serde_yaml::from_str("version: \"2.0\"").unwrap();
        assert_eq!(config.version, "2.0");
        assert_eq!(config.watched_files, vec!["nx.json", "workspace.json", "project.json"]);
        assert_eq!(config.array_style, ArrayStyle::Repeated);
    }

    #[test]
    fn test_custom_watch_list_replaces_defaults() {
        let yaml = "watched_files:\n  - angular.json\n";
        let config: FormConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.watches("angular.json"));
        assert!(!config.watches("nx.json"));
    }

    #[test]
    fn test_normalize_options_carry_array_style() {
        let config = FormConfig {
            array_style: ArrayStyle::CommaJoined,
            ..FormConfig::default()
        };
        assert_eq!(config.normalize_options().array_style, ArrayStyle::CommaJoined);
    }
}
