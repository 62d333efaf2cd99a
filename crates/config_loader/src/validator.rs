//! Configuration validation
//!
//! Rules:
//! - derive rules (`validator`): non-empty data source and group names,
//!   monitor interval >= 1 s
//! - table names are not blank
//! - every descriptor passes `Descriptor::check` and has a parsable
//!   connection string
//! - descriptor ids are unique per table, except for temporal alternatives
//! - group names are unique
//! - every group's table exists in the data source
//! - parser maximum frame length can hold a minimal frame

use std::collections::HashSet;

use contracts::{ConcentratorConfig, ContractError};
use validator::Validate;

/// Smallest frame the sync-word envelope can carry
const MIN_FRAME_LENGTH: usize = 8;

/// Validate a configuration
///
/// Returns the first error found.
pub fn validate(config: &ConcentratorConfig) -> Result<(), ContractError> {
    validate_derived(config)?;
    validate_tables(config)?;
    validate_group_names(config)?;
    validate_group_tables(config)?;
    validate_parser(config)?;
    Ok(())
}

fn validate_derived(config: &ConcentratorConfig) -> Result<(), ContractError> {
    config
        .validate()
        .map_err(|e| ContractError::config_validation("config", e.to_string().replace('\n', "; ")))
}

fn validate_tables(config: &ConcentratorConfig) -> Result<(), ContractError> {
    for (table, rows) in &config.data_source.tables {
        if table.trim().is_empty() {
            return Err(ContractError::config_validation(
                "data_source.tables",
                "table name cannot be empty",
            ));
        }

        let mut seen = HashSet::new();
        for (idx, row) in rows.iter().enumerate() {
            let field = format!("data_source.tables.{table}[{idx}]");

            row.check()
                .map_err(|e| ContractError::config_validation(&field, e.to_string()))?;
            row.settings()
                .map_err(|e| ContractError::config_validation(&field, e.to_string()))?;

            // Rows sharing an id are alternatives only when temporal
            if !seen.insert(row.id) && !row.temporal_session {
                return Err(ContractError::config_validation(
                    field,
                    format!("duplicate component id {}", row.id),
                ));
            }
        }
    }
    Ok(())
}

fn validate_group_names(config: &ConcentratorConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for group in &config.groups {
        if !seen.insert(group.name.to_lowercase()) {
            return Err(ContractError::config_validation(
                format!("groups[name={}]", group.name),
                "duplicate group name",
            ));
        }
    }
    Ok(())
}

fn validate_group_tables(config: &ConcentratorConfig) -> Result<(), ContractError> {
    for group in &config.groups {
        if !config.data_source.contains_table(group.table()) {
            return Err(ContractError::config_validation(
                format!("groups[{}].table", group.name),
                format!(
                    "table '{}' not found in data source '{}'",
                    group.table(),
                    config.data_source.name
                ),
            ));
        }
    }
    Ok(())
}

fn validate_parser(config: &ConcentratorConfig) -> Result<(), ContractError> {
    if config.parser.max_frame_length < MIN_FRAME_LENGTH {
        return Err(ContractError::config_validation(
            "parser.max_frame_length",
            format!(
                "max_frame_length must be >= {MIN_FRAME_LENGTH}, got {}",
                config.parser.max_frame_length
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ComponentRole, DataSource, Descriptor, GroupDefinition, ParserDefinition};

    fn config() -> ConcentratorConfig {
        ConcentratorConfig {
            data_source: DataSource::new("openPDC")
                .with_table(
                    "InputAdapters",
                    vec![
                        Descriptor::new(1, "pmu_a", "mock", ""),
                        Descriptor::new(2, "pmu_b", "mock", "initializationTimeout=250"),
                    ],
                )
                .with_table("OutputAdapters", vec![Descriptor::new(10, "archive", "mock", "")]),
            groups: vec![
                GroupDefinition::new("inputs", ComponentRole::Source),
                GroupDefinition::new("outputs", ComponentRole::Sink),
            ],
            parser: ParserDefinition::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&config()).is_ok());
    }

    #[test]
    fn test_duplicate_group_name() {
        let mut config = config();
        config.groups.push(GroupDefinition::new("Inputs", ComponentRole::Source));
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate group name"));
    }

    #[test]
    fn test_missing_group_table() {
        let mut config = config();
        config.groups.push(GroupDefinition::new("calc", ComponentRole::Transform));
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("ActionAdapters"));
    }

    #[test]
    fn test_descriptor_without_kind() {
        let mut config = config();
        config
            .data_source
            .tables
            .get_mut("InputAdapters")
            .unwrap()
            .push(Descriptor::new(3, "pmu_c", "", ""));
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("no component kind was defined"));
    }

    #[test]
    fn test_unbalanced_connection_string() {
        let mut config = config();
        config
            .data_source
            .tables
            .get_mut("InputAdapters")
            .unwrap()
            .push(Descriptor::new(3, "pmu_c", "mock", "inputs={1,2"));
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ContractError::ConfigValidation { .. }));
        assert!(err.to_string().contains("InputAdapters[2]"));
    }

    #[test]
    fn test_duplicate_id_allowed_for_temporal_alternative() {
        let mut config = config();
        let rows = config.data_source.tables.get_mut("InputAdapters").unwrap();
        rows.push(Descriptor::new(2, "pmu_b_replay", "mock", "").with_temporal_session(true));
        assert!(validate(&config).is_ok());

        let rows = config.data_source.tables.get_mut("InputAdapters").unwrap();
        rows.push(Descriptor::new(1, "pmu_a_copy", "mock", ""));
        assert!(validate(&config).unwrap_err().to_string().contains("duplicate component id 1"));
    }

    #[test]
    fn test_empty_data_source_name() {
        let mut config = config();
        config.data_source.name.clear();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("data source name cannot be empty"));
    }

    #[test]
    fn test_tiny_frame_length() {
        let mut config = config();
        config.parser.max_frame_length = 4;
        assert!(validate(&config).is_err());
    }
}
