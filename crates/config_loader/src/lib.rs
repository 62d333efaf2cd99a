//! # Config Loader
//!
//! Configuration loading and parsing.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate descriptor tables, groups and parser settings
//! - Produce a `ConcentratorConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("concentrator.toml")).unwrap();
//! println!("Data source: {}", config.data_source.name);
//! ```

mod parser;
mod validator;

pub use contracts::ConcentratorConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    ///
    /// The format is detected from the extension (.toml / .json), or sniffed
    /// from the content when the file has none.
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<ConcentratorConfig, ContractError> {
        let content = Self::read_file(path)?;
        let format = Self::detect_format(path, &content)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from a string
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<ConcentratorConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Validate an already built configuration
    pub fn validate(config: &ConcentratorConfig) -> Result<(), ContractError> {
        validator::validate(config)
    }

    pub fn to_toml(config: &ConcentratorConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    pub fn to_json(config: &ConcentratorConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    fn detect_format(path: &Path, content: &str) -> Result<ConfigFormat, ContractError> {
        let Some(ext) = path.extension() else {
            return Ok(ConfigFormat::sniff(content));
        };
        let ext = ext.to_str().ok_or_else(|| {
            ContractError::config_parse("config file extension is not valid UTF-8")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL_TOML: &str = r#"
[data_source]
name = "openPDC"

[[data_source.tables.InputAdapters]]
id = 1
name = "pmu_a"
component_kind = "mock"
connection_string = "initializationTimeout=500; inputs=1,2"

[[data_source.tables.InputAdapters]]
id = 2
name = "pmu_b"
component_kind = "mock"
temporal_session = true

[[data_source.tables.OutputAdapters]]
id = 10
name = "archive"
component_kind = "mock"

[[groups]]
name = "inputs"
role = "source"

[[groups]]
name = "outputs"
role = "sink"
monitor_interval_secs = 10

[parser]
channels = ["tcp:4712", "udp:4713"]
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.groups.len(), 2);
        assert_eq!(config.groups[1].monitor_interval_secs, 10);
        assert_eq!(config.parser.channels.len(), 2);
    }

    #[test]
    fn test_round_trip_toml() {
        let config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&config).unwrap();
        let again = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(config.data_source.tables, again.data_source.tables);
        assert_eq!(config.groups, again.groups);
    }

    #[test]
    fn test_round_trip_json() {
        let config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&config).unwrap();
        let again = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(config.parser, again.parser);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[data_source]
name = "openPDC"

[[groups]]
name = "inputs"
role = "source"
"#;
        let err = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("InputAdapters"));
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(MINIMAL_TOML.as_bytes()).unwrap();

        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(config.data_source.name, "openPDC");
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn test_extensionless_file_is_sniffed() {
        let config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&config).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("concentrator");
        std::fs::write(&path, json).unwrap();

        let loaded = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(loaded.groups, config.groups);
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::load_from_path(Path::new("/nonexistent/concentrator.toml"))
            .unwrap_err();
        assert!(matches!(err, ContractError::Io(_)));
    }
}
