//! Configuration parsing
//!
//! TOML (primary) and JSON. Files without an extension are sniffed. TOML
//! errors name the table section they occurred in, so a bad descriptor row
//! points at its `[[data_source.tables.<member>]]` block.

use contracts::{ConcentratorConfig, ContractError};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer the format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Guess the format from content: a JSON document opens with `{`
    pub fn sniff(content: &str) -> Self {
        match content.trim_start().chars().next() {
            Some('{') => Self::Json,
            _ => Self::Toml,
        }
    }
}

pub fn parse_toml(content: &str) -> Result<ConcentratorConfig, ContractError> {
    toml::from_str(content).map_err(|e| {
        let location = match e.span() {
            Some(span) => section_at(content, span.start),
            None => "document".to_string(),
        };
        ContractError::ConfigParse {
            message: format!("TOML parse error in {location}: {}", e.message()),
            source: Some(Box::new(e)),
        }
    })
}

pub fn parse_json(content: &str) -> Result<ConcentratorConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse according to `format`
pub fn parse(content: &str, format: ConfigFormat) -> Result<ConcentratorConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

/// `"[[groups]] (line 7)"` for the header enclosing byte `offset`
fn section_at(content: &str, offset: usize) -> String {
    let before = content.get(..offset).unwrap_or(content);
    let line = before.matches('\n').count() + 1;
    let section = before
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.starts_with('[') && l.ends_with(']') && !l.contains('='))
        .unwrap_or("top level");
    format!("{section} (line {line})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ComponentRole;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[data_source]
name = "openPDC"

[[data_source.tables.InputAdapters]]
id = 1
name = "pmu_a"
component_kind = "mock"
connection_string = "initializationTimeout=500"

[[groups]]
name = "inputs"
role = "source"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.data_source.name, "openPDC");
        assert_eq!(config.data_source.tables["InputAdapters"].len(), 1);
        assert_eq!(config.groups[0].role, ComponentRole::Source);
        assert!(config.parser.verify_checksum);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "data_source": {
                "name": "openPDC",
                "tables": {
                    "OutputAdapters": [
                        { "id": 10, "name": "archive", "component_kind": "mock" }
                    ]
                }
            },
            "groups": [{ "name": "outputs", "role": "sink" }],
            "parser": { "max_frame_length": 1024, "channels": ["tcp:4712"] }
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.parser.max_frame_length, 1024);
        assert_eq!(config.groups[0].table(), "OutputAdapters");
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result = parse_toml("invalid toml [[[");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_toml_error_names_enclosing_table() {
        let content = "[data_source]\nname = \"openPDC\"\n\n[[groups]]\nname = \n";
        let err = parse_toml(content).unwrap_err().to_string();
        assert!(err.contains("[[groups]]"), "got: {err}");
        assert!(err.contains("line"), "got: {err}");
    }

    #[test]
    fn test_section_lookup() {
        let content = "[data_source]\nname = \"x\"\n\n[[data_source.tables.InputAdapters]]\nid = 1\n";
        let offset = content.find("id = 1").unwrap();
        assert_eq!(
            section_at(content, offset),
            "[[data_source.tables.InputAdapters]] (line 5)"
        );
        assert_eq!(section_at("name = 1", 0), "top level (line 1)");
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }

    #[test]
    fn test_sniff_format() {
        assert_eq!(ConfigFormat::sniff("  \n{ \"data_source\": {} }"), ConfigFormat::Json);
        assert_eq!(ConfigFormat::sniff("[data_source]\nname = \"x\""), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::sniff(""), ConfigFormat::Toml);
    }
}
